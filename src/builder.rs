//! Construction of the objects that represent one new attachment.
//!
//! Layout of what gets appended, with `n` the first free object number:
//!
//! ```text
//! n     << /Names [ <prior pairs> (name) n+1 0 R ] /Limits [ (least) (greatest) ] >>
//! n+1   << /Type /Filespec /F (name) /EF << /F n+2 0 R >> >>
//! n+2   << /Type /EmbeddedFile /Filter /FlateDecode /Length L >> stream ... endstream
//! ```
//!
//! A fresh document additionally gets the catalog (1), its `/Names`
//! dictionary (2) and the `/EmbeddedFiles` root (3) ahead of those.

use crate::allocator::{Allocation, Mode};
use crate::object::{literal_string, BaselineObject, IndirectObject, ObjectRef, ObjectTable};
use crate::payload::Payload;
use crate::scanner::{Extraction, NameEntry};
use crate::Result;

/// Everything the builder needs for one run.
#[derive(Debug)]
pub struct BuildInput<'a> {
    pub allocation: Allocation,
    pub extraction: Extraction,
    pub filename: &'a str,
    pub payload: &'a Payload,
    /// Add `/Params << /Size N >>` with the uncompressed size to the stream.
    pub record_size_param: bool,
}

/// The final table plus the object the trailer should name as `/Root`.
#[derive(Debug)]
pub struct BuiltDocument {
    pub table: ObjectTable,
    pub root: ObjectRef,
}

pub fn build(input: BuildInput<'_>) -> Result<BuiltDocument> {
    let BuildInput {
        allocation,
        extraction,
        filename,
        payload,
        record_size_param,
    } = input;

    let names_obj = ObjectRef::new(allocation.next);
    let filespec_obj = ObjectRef::new(allocation.next + 1);
    let stream_obj = ObjectRef::new(allocation.next + 2);

    let mut table = ObjectTable::new();
    let mut entries = match allocation.mode {
        Mode::Fresh => {
            for object in baseline_objects(names_obj) {
                table.push(object)?;
            }
            Vec::new()
        }
        Mode::Extend => {
            for object in extraction.objects {
                table.push(object)?;
            }
            extraction.names
        }
    };

    let name = literal_string(filename);
    entries.push(NameEntry {
        name: name.clone(),
        filespec: filespec_obj,
    });

    table.push(IndirectObject::build(names_obj.number, &names_array(&entries)))?;
    table.push(IndirectObject::build(
        filespec_obj.number,
        &filespec(&name, stream_obj),
    ))?;
    table.push(IndirectObject::build(
        stream_obj.number,
        &embedded_file_stream(payload, record_size_param),
    ))?;

    Ok(BuiltDocument {
        table,
        root: BaselineObject::Catalog.reference(),
    })
}

/// Catalog, `/Names` dictionary and `/EmbeddedFiles` root of a new document.
fn baseline_objects(names_obj: ObjectRef) -> [IndirectObject; 3] {
    [
        IndirectObject::build(
            BaselineObject::Catalog.number(),
            format!(
                "<< /Type /Catalog /Names {} >>",
                BaselineObject::NamesDictionary.reference()
            )
            .as_bytes(),
        ),
        IndirectObject::build(
            BaselineObject::NamesDictionary.number(),
            format!(
                "<< /EmbeddedFiles {} >>",
                BaselineObject::EmbeddedFiles.reference()
            )
            .as_bytes(),
        ),
        IndirectObject::build(
            BaselineObject::EmbeddedFiles.number(),
            format!("<< /Kids [ {names_obj} ] >>").as_bytes(),
        ),
    ]
}

/// Pairs stay in insertion order; `/Limits` names the least and greatest key
/// so the node is a valid leaf under `/Kids`.
fn names_array(entries: &[NameEntry]) -> Vec<u8> {
    let mut body = b"<< /Names [ ".to_vec();
    for entry in entries {
        body.extend_from_slice(&entry.name);
        body.extend_from_slice(format!(" {} ", entry.filespec).as_bytes());
    }
    body.extend_from_slice(b"]");

    let least = entries.iter().min_by_key(|e| e.key());
    let greatest = entries.iter().max_by_key(|e| e.key());
    if let (Some(least), Some(greatest)) = (least, greatest) {
        body.extend_from_slice(b" /Limits [ ");
        body.extend_from_slice(&least.name);
        body.push(b' ');
        body.extend_from_slice(&greatest.name);
        body.extend_from_slice(b" ]");
    }
    body.extend_from_slice(b" >>");
    body
}

fn filespec(name: &[u8], stream_obj: ObjectRef) -> Vec<u8> {
    let mut body = b"<< /Type /Filespec /F ".to_vec();
    body.extend_from_slice(name);
    body.extend_from_slice(format!(" /EF << /F {stream_obj} >> >>").as_bytes());
    body
}

fn embedded_file_stream(payload: &Payload, record_size_param: bool) -> Vec<u8> {
    let params = if record_size_param {
        format!(" /Params << /Size {} >>", payload.original_len())
    } else {
        String::new()
    };

    let mut body = format!(
        "<< /Type /EmbeddedFile /Filter /FlateDecode /Length {}{params} >>\nstream\n",
        payload.compressed_len()
    )
    .into_bytes();
    body.extend_from_slice(payload.compressed());
    body.extend_from_slice(b"\nendstream");
    body
}
