use crate::allocator::{allocate, Mode};
use crate::builder::{build, BuildInput};
use crate::payload::Payload;
use crate::{scanner, writer, EmbedConfig, EmbedError, Result};
use log::{debug, info};
use std::path::Path;

// ── PdfEmbedder ──────────────────────────────────────────────────────────────

/// Entry point for embedding files into PDF documents.
///
/// # Creating an embedder
///
/// ```no_run
/// use embedfilepdf::{EmbedConfig, PdfEmbedder};
///
/// // Default configuration
/// let embedder = PdfEmbedder::new();
/// embedder.embed_file("invoice.xml", "out.pdf").unwrap();
///
/// // With custom configuration
/// let cfg = EmbedConfig {
///     max_source_size: Some(10 * 1024 * 1024),
///     record_size_param: true,
///     ..Default::default()
/// };
/// PdfEmbedder::with_config(cfg)
///     .embed_file("invoice.xml", "out.pdf")
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct PdfEmbedder {
    config: EmbedConfig,
}

/// The document produced by [`PdfEmbedder::embed_bytes`].
#[derive(Debug, Clone)]
pub struct EmbedOutcome {
    /// Complete serialized document.
    pub document: Vec<u8>,
    /// Whether a new document was synthesized or a prior one extended.
    pub mode: Mode,
    /// Name the attachment was stored under.
    pub filename: String,
    /// Source size before compression.
    pub original_size: usize,
    /// Value of the EmbeddedFile stream's `/Length`.
    pub compressed_size: usize,
    /// Number of indirect objects in the document.
    pub object_count: usize,
}

impl PdfEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EmbedConfig) -> Self {
        Self { config }
    }

    /// Returns a reference to the active [`EmbedConfig`].
    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    /// Embed `data` under `filename` into `existing`, or into a new document
    /// when `existing` is `None`. Performs no I/O.
    ///
    /// Every object of `existing` is carried over byte-for-byte and the new
    /// objects are appended after it.
    pub fn embed_bytes(
        &self,
        existing: Option<&[u8]>,
        filename: &str,
        data: &[u8],
    ) -> Result<EmbedOutcome> {
        self.check_size(data.len())?;

        let extraction = scanner::extract(existing)?;
        let allocation = allocate(&extraction.objects)?;
        debug!(
            "{:?} mode, new objects start at {}",
            allocation.mode, allocation.next
        );

        let payload = Payload::compress(data, self.config.compression)?;
        let built = build(BuildInput {
            allocation,
            extraction,
            filename,
            payload: &payload,
            record_size_param: self.config.record_size_param,
        })?;

        let document = writer::serialize(&built.table, built.root);

        Ok(EmbedOutcome {
            document,
            mode: allocation.mode,
            filename: filename.to_string(),
            original_size: payload.original_len(),
            compressed_size: payload.compressed_len(),
            object_count: built.table.len(),
        })
    }

    /// Embed the file at `source` into the document at `destination`.
    ///
    /// The destination is extended when it exists and created otherwise; it is
    /// only written after the new document has been fully built, so a missing
    /// source or a corrupt destination leaves it untouched.
    pub fn embed_file<P, Q>(&self, source: P, destination: Q) -> Result<EmbedOutcome>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let source = source.as_ref();
        let destination = destination.as_ref();

        if !source.is_file() {
            return Err(EmbedError::MissingSourceFile(source.to_path_buf()));
        }

        let filename = match &self.config.attachment_name {
            Some(name) => name.clone(),
            None => source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| EmbedError::MissingSourceFile(source.to_path_buf()))?,
        };

        self.check_size(usize::try_from(std::fs::metadata(source)?.len()).unwrap_or(usize::MAX))?;
        let data = std::fs::read(source)?;

        let existing = match std::fs::read(destination) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let outcome = self.embed_bytes(existing.as_deref(), &filename, &data)?;
        std::fs::write(destination, &outcome.document)?;

        info!(
            "embedded '{}' into {} ({} -> {} bytes, {} objects)",
            outcome.filename,
            destination.display(),
            outcome.original_size,
            outcome.compressed_size,
            outcome.object_count
        );
        Ok(outcome)
    }

    fn check_size(&self, size: usize) -> Result<()> {
        match self.config.max_source_size {
            Some(limit) if size > limit => Err(EmbedError::FileSizeExceeded { size, limit }),
            _ => Ok(()),
        }
    }
}
