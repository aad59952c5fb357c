//! Serialization of an [`ObjectTable`] into a complete document.

use crate::object::{ObjectRef, ObjectTable};
use std::collections::BTreeMap;

/// `%PDF-1.7` followed by a comment of high-bit bytes marking the file as
/// binary.
pub const HEADER: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";

const FREE_HEAD_ENTRY: &[u8] = b"0000000000 65535 f \n";

/// Write header, objects, xref table and trailer into one byte buffer.
///
/// Each object's xref offset is the position of its `N 0 obj` token. Xref
/// entries are emitted in object-number order; a number missing from an
/// inherited table gets a dead free entry so every in-use entry stays at its
/// own index.
pub fn serialize(table: &ObjectTable, root: ObjectRef) -> Vec<u8> {
    debug_assert!(!table.is_empty(), "serializing a document without objects");

    let capacity = HEADER.len() + table.iter().map(|o| o.bytes().len() + 1).sum::<usize>();
    let mut out = Vec::with_capacity(capacity + 64 + 20 * (table.len() + 1));
    out.extend_from_slice(HEADER);

    let mut offsets = BTreeMap::new();
    for object in table {
        offsets.insert(object.number(), out.len());
        out.extend_from_slice(object.bytes());
        if !object.bytes().last().is_some_and(|b| b.is_ascii_whitespace()) {
            out.push(b'\n');
        }
    }

    let size = table.max_number().unwrap_or(0) + 1;
    let xref_start = out.len();

    out.extend_from_slice(format!("xref\n0 {size}\n").as_bytes());
    out.extend_from_slice(FREE_HEAD_ENTRY);
    for number in 1..size {
        match offsets.get(&number) {
            Some(offset) => out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes()),
            None => out.extend_from_slice(FREE_HEAD_ENTRY),
        }
    }

    out.extend_from_slice(
        format!("trailer\n<< /Size {size} /Root {root} >>\nstartxref\n{xref_start}\n%%EOF\n")
            .as_bytes(),
    );
    out
}
