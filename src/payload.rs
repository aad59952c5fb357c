use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

use crate::Result;

/// The bytes of the file being embedded, after FlateDecode-compatible
/// compression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    original_len: usize,
    compressed: Vec<u8>,
}

impl Payload {
    /// Compress `data` into a zlib stream, the encoding `/FlateDecode` expects.
    pub fn compress(data: &[u8], level: Compression) -> Result<Self> {
        let mut encoder = ZlibEncoder::new(Vec::new(), level);
        encoder.write_all(data)?;
        let compressed = encoder.finish()?;

        Ok(Self {
            original_len: data.len(),
            compressed,
        })
    }

    /// Size of the source file before compression.
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    /// The value written to the stream's `/Length`.
    pub fn compressed_len(&self) -> usize {
        self.compressed.len()
    }

    pub fn compressed(&self) -> &[u8] {
        &self.compressed
    }
}
