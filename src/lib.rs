//! # embedfilepdf
//!
//! A Rust library for embedding arbitrary files as attachments into PDF
//! documents.
//!
//! ## What this crate does
//!
//! 1. **Extract** — when the destination already exists, every indirect object
//!    is located and kept as an opaque byte span, and the current
//!    `/EmbeddedFiles` name list is recovered.
//! 2. **Allocate** — new objects are numbered after the highest existing one,
//!    or after the three baseline objects of a fresh document.
//! 3. **Build** — a merged `/Names` array, a Filespec and a compressed
//!    EmbeddedFile stream are created for the new attachment.
//! 4. **Serialize** — existing objects (untouched) and new objects are written
//!    out with a fresh cross-reference table and trailer.
//!
//! Attachments can be read back with [`AttachmentReader`].
//!
//! ## Quick example
//!
//! ```no_run
//! use embedfilepdf::{AttachmentReader, PdfEmbedder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! PdfEmbedder::new().embed_file("invoice.xml", "bundle.pdf")?;
//!
//! for file in AttachmentReader::from_path("bundle.pdf")?.extract_all()? {
//!     println!("  {}: {} bytes", file.filename, file.data.len());
//! }
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use thiserror::Error;

mod allocator;
mod attachments;
mod builder;
mod embedded;
mod embedder;
mod object;
mod payload;
mod scanner;
mod writer;

pub use allocator::Mode;
pub use attachments::AttachmentReader;
pub use embedded::{EmbeddedFile, EmbeddedFileMetadata};
pub use embedder::{EmbedOutcome, PdfEmbedder};
pub use object::{IndirectObject, ObjectRef};
pub use scanner::{extract, Extraction, NameEntry};

// ── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration for [`PdfEmbedder`].
#[derive(Debug, Clone, Default)]
pub struct EmbedConfig {
    /// Deflate level used for the EmbeddedFile stream.
    pub compression: flate2::Compression,

    /// If set, [`PdfEmbedder::embed_file`] and [`PdfEmbedder::embed_bytes`]
    /// return [`EmbedError::FileSizeExceeded`] for sources larger than this
    /// many bytes.
    pub max_source_size: Option<usize>,

    /// Store the attachment under this name instead of the source file's
    /// basename.
    pub attachment_name: Option<String>,

    /// Write `/Params << /Size N >>` with the uncompressed size into the
    /// EmbeddedFile stream dictionary.
    pub record_size_param: bool,
}

// ── Error type ───────────────────────────────────────────────────────────────

/// Every error that this crate can produce.
#[derive(Error, Debug)]
pub enum EmbedError {
    /// A filesystem I/O error occurred while reading or writing a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file to embed does not exist.
    #[error("Embed file does not exist: {}", .0.display())]
    MissingSourceFile(PathBuf),

    /// The existing destination cannot be split into well-formed
    /// `N 0 obj ... endobj` objects. Nothing is written.
    #[error("Structurally corrupt PDF: {0}")]
    StructuralCorruption(String),

    /// The source exceeds the configured `max_source_size`.
    #[error("Source file is {size} bytes, exceeding the limit of {limit} bytes")]
    FileSizeExceeded { size: usize, limit: usize },

    /// The underlying lopdf parser returned an error.
    #[error("PDF parse error: {0}")]
    ParseError(#[from] lopdf::Error),

    /// The document was parsed but has no decodable attachments.
    #[error("No embedded files found in this PDF")]
    NoEmbeddedFiles,

    /// An attachment was found but could not be decoded.
    #[error("Failed to extract embedded file '{0}': {1}")]
    ExtractionError(String, String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, EmbedError>;
