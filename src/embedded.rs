// ── EmbeddedFile ─────────────────────────────────────────────────────────────

/// An attachment read back out of a PDF document.
///
/// Returned by [`crate::AttachmentReader::extract_all`].
#[derive(Debug, Clone)]
pub struct EmbeddedFile {
    /// The filename declared in the file specification (`/UF` preferred over
    /// `/F`), falling back to the name-tree key.
    pub filename: String,

    /// The decompressed file content.
    pub data: Vec<u8>,

    pub metadata: EmbeddedFileMetadata,
}

// ── EmbeddedFileMetadata ──────────────────────────────────────────────────────

/// Metadata associated with an [`EmbeddedFile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedFileMetadata {
    /// Uncompressed file size in bytes, from the stream's `/Params/Size`.
    /// Only present when the document was written with
    /// [`crate::EmbedConfig::record_size_param`] set.
    pub size: Option<usize>,
}
