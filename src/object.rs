//! Indirect objects and the ordered table they are written from.

use crate::{EmbedError, Result};
use std::collections::HashSet;
use std::fmt;

// ── Baseline numbering ───────────────────────────────────────────────────────

/// Objects pre-numbered in a freshly synthesized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineObject {
    /// `/Type /Catalog`, always the trailer `/Root`.
    Catalog = 1,
    /// The catalog's `/Names` dictionary.
    NamesDictionary = 2,
    /// The `/EmbeddedFiles` name tree root.
    EmbeddedFiles = 3,
}

impl BaselineObject {
    pub fn number(self) -> u32 {
        self as u32
    }

    pub fn reference(self) -> ObjectRef {
        ObjectRef::new(self.number())
    }
}

/// First object number handed out after the baseline objects.
pub const FIRST_FREE_OBJECT: u32 = 4;

// ── ObjectRef ────────────────────────────────────────────────────────────────

/// A reference to an indirect object of generation 0 (`N 0 R`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectRef {
    pub number: u32,
}

impl ObjectRef {
    pub fn new(number: u32) -> Self {
        Self { number }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 0 R", self.number)
    }
}

// ── IndirectObject ───────────────────────────────────────────────────────────

/// One `N 0 obj ... endobj` unit, stored as its complete serialized span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectObject {
    number: u32,
    bytes: Vec<u8>,
}

impl IndirectObject {
    /// Wrap a span found in an existing document. The bytes are never
    /// re-encoded.
    pub fn inherited(number: u32, span: Vec<u8>) -> Self {
        Self {
            number,
            bytes: span,
        }
    }

    /// Frame `body` as `N 0 obj\n<body>\nendobj\n`.
    pub fn build(number: u32, body: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(body.len() + 32);
        bytes.extend_from_slice(format!("{number} 0 obj\n").as_bytes());
        bytes.extend_from_slice(body);
        bytes.extend_from_slice(b"\nendobj\n");
        Self { number, bytes }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// ── ObjectTable ──────────────────────────────────────────────────────────────

/// Insertion-ordered objects with unique numbers.
///
/// Insertion order is the order objects are written, and therefore the order
/// their xref offsets are recorded in.
#[derive(Debug, Clone, Default)]
pub struct ObjectTable {
    objects: Vec<IndirectObject>,
    numbers: HashSet<u32>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an object. A number already present is structural corruption:
    /// two definitions of one object cannot be written to a single xref.
    pub fn push(&mut self, object: IndirectObject) -> Result<()> {
        if !self.numbers.insert(object.number) {
            return Err(EmbedError::StructuralCorruption(format!(
                "object {} is defined more than once",
                object.number
            )));
        }
        self.objects.push(object);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndirectObject> {
        self.objects.iter()
    }

    /// Highest object number in the table.
    pub fn max_number(&self) -> Option<u32> {
        self.objects.iter().map(|o| o.number).max()
    }
}

impl<'a> IntoIterator for &'a ObjectTable {
    type Item = &'a IndirectObject;
    type IntoIter = std::slice::Iter<'a, IndirectObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}

// ── String literals ──────────────────────────────────────────────────────────

/// Encode `s` as a PDF literal string, escaping backslashes and parentheses.
pub fn literal_string(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 2);
    out.push(b'(');
    for &b in s.as_bytes() {
        if matches!(b, b'\\' | b'(' | b')') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out.push(b')');
    out
}
