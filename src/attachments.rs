//! Reading attachments back out of a document with `lopdf`.
//!
//! Only the catalog's `/Names/EmbeddedFiles` name tree is searched, the
//! structure this crate writes.

use crate::{EmbedError, EmbeddedFile, EmbeddedFileMetadata, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use log::warn;
use std::collections::HashSet;
use std::path::Path;

/// Loads a PDF and decodes the files attached through its name tree.
///
/// ```no_run
/// use embedfilepdf::AttachmentReader;
///
/// let reader = AttachmentReader::from_path("out.pdf").unwrap();
/// for file in reader.extract_all().unwrap() {
///     println!("{}: {} bytes", file.filename, file.data.len());
/// }
/// ```
pub struct AttachmentReader {
    document: Document,
}

impl AttachmentReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            document: Document::load(path)?,
        })
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self {
            document: Document::load_mem(data)?,
        })
    }

    /// Name-tree keys in tree order.
    pub fn names(&self) -> Vec<String> {
        self.collect_file_specs()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    /// Decode every attachment.
    ///
    /// A file specification that cannot be decoded is skipped with a warning.
    /// Returns [`EmbedError::NoEmbeddedFiles`] when nothing could be decoded.
    pub fn extract_all(&self) -> Result<Vec<EmbeddedFile>> {
        let mut files = Vec::new();

        for (name, spec_id) in self.collect_file_specs() {
            match self.parse_file_spec(&name, spec_id) {
                Ok(file) => files.push(file),
                Err(e) => warn!("skipping attachment '{name}': {e}"),
            }
        }

        if files.is_empty() {
            return Err(EmbedError::NoEmbeddedFiles);
        }
        Ok(files)
    }

    // ── Name tree ─────────────────────────────────────────────────────────────

    fn collect_file_specs(&self) -> Vec<(String, ObjectId)> {
        let embedded_files = self
            .document
            .catalog()
            .ok()
            .and_then(|catalog| catalog.get(b"Names").ok())
            .and_then(|names| self.resolve_dict(names))
            .and_then(|names| names.get(b"EmbeddedFiles").ok().cloned());

        let mut out = Vec::new();
        match embedded_files {
            Some(Object::Reference(id)) => self.walk_name_tree(id, &mut HashSet::new(), &mut out),
            Some(Object::Dictionary(node)) => {
                self.walk_node(&node, &mut HashSet::new(), &mut out)
            }
            _ => {}
        }
        out
    }

    fn walk_name_tree(
        &self,
        node_id: ObjectId,
        visited: &mut HashSet<ObjectId>,
        out: &mut Vec<(String, ObjectId)>,
    ) {
        if !visited.insert(node_id) {
            return;
        }
        if let Ok(node) = self.document.get_object(node_id).and_then(Object::as_dict) {
            self.walk_node(node, visited, out);
        }
    }

    /// Leaf nodes carry `/Names [key value ...]`, intermediate nodes `/Kids`.
    fn walk_node(
        &self,
        node: &Dictionary,
        visited: &mut HashSet<ObjectId>,
        out: &mut Vec<(String, ObjectId)>,
    ) {
        if let Ok(pairs) = node.get(b"Names").and_then(Object::as_array) {
            for pair in pairs.chunks_exact(2) {
                if let (Ok(raw), Ok(spec_id)) = (pair[0].as_str(), pair[1].as_reference()) {
                    out.push((String::from_utf8_lossy(raw).into_owned(), spec_id));
                }
            }
        }

        if let Ok(kids) = node.get(b"Kids").and_then(Object::as_array) {
            for kid in kids {
                if let Ok(kid_id) = kid.as_reference() {
                    self.walk_name_tree(kid_id, visited, out);
                }
            }
        }
    }

    fn resolve_dict(&self, value: &Object) -> Option<Dictionary> {
        match value.as_reference() {
            Ok(id) => self
                .document
                .get_object(id)
                .ok()
                .and_then(|o| o.as_dict().ok().cloned()),
            Err(_) => value.as_dict().ok().cloned(),
        }
    }

    // ── File specifications ───────────────────────────────────────────────────

    fn parse_file_spec(&self, name: &str, spec_id: ObjectId) -> Result<EmbeddedFile> {
        let fail = |reason: &str| EmbedError::ExtractionError(name.into(), reason.into());

        let spec = self
            .document
            .get_object(spec_id)?
            .as_dict()
            .map_err(|_| fail("file spec is not a dictionary"))?;

        let ef = spec
            .get(b"EF")
            .ok()
            .and_then(|v| self.resolve_dict(v))
            .ok_or_else(|| fail("missing /EF dictionary"))?;

        let stream_id = ef
            .get(b"UF")
            .or_else(|_| ef.get(b"F"))
            .and_then(Object::as_reference)
            .map_err(|_| fail("/EF has no stream reference"))?;

        let stream = self
            .document
            .get_object(stream_id)?
            .as_stream()
            .map_err(|_| fail("embedded file object is not a stream"))?;

        let data = if stream.dict.has(b"Filter") {
            stream
                .decompressed_content()
                .map_err(|e| fail(&format!("cannot decode stream: {e}")))?
        } else {
            stream.content.clone()
        };

        Ok(EmbeddedFile {
            filename: best_filename(spec).unwrap_or_else(|| name.to_string()),
            data,
            metadata: read_metadata(&stream.dict),
        })
    }
}

/// `/UF` over `/F`.
fn best_filename(spec: &Dictionary) -> Option<String> {
    [b"UF" as &[u8], b"F"]
        .into_iter()
        .find_map(|key| string_entry(spec, key))
}

fn read_metadata(stream_dict: &Dictionary) -> EmbeddedFileMetadata {
    let size = stream_dict
        .get(b"Params")
        .and_then(Object::as_dict)
        .and_then(|params| params.get(b"Size"))
        .and_then(Object::as_i64)
        .ok()
        .and_then(|n| usize::try_from(n).ok());

    EmbeddedFileMetadata { size }
}

fn string_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|v| v.as_str().ok())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .filter(|s| !s.is_empty())
}
