// Integration tests for embedfilepdf.
//
// Documents are produced in temporary directories and checked twice: by
// slicing the raw bytes (object spans, xref offsets, trailer) and by loading
// them with lopdf through `AttachmentReader`.

use embedfilepdf::{
    extract, AttachmentReader, EmbedConfig, EmbedError, Mode, NameEntry, ObjectRef, PdfEmbedder,
};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn write_source(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Decimal number starting at `at` and running to the end of the line.
fn number_at(doc: &[u8], at: usize) -> usize {
    let end = at + doc[at..].iter().position(|b| *b == b'\n').unwrap();
    std::str::from_utf8(&doc[at..end]).unwrap().trim().parse().unwrap()
}

struct Xref {
    start: usize,
    declared: usize,
    entries: Vec<String>,
}

fn read_xref(doc: &[u8]) -> Xref {
    let start = number_at(doc, rfind(doc, b"startxref\n").unwrap() + "startxref\n".len());
    assert!(doc[start..].starts_with(b"xref\n0 "), "startxref does not point at xref");

    let declared = number_at(doc, start + "xref\n0 ".len());
    let first_entry = start + doc[start..].iter().position(|b| *b == b'\n').unwrap() + 1;
    let first_entry = first_entry + doc[first_entry..].iter().position(|b| *b == b'\n').unwrap() + 1;

    let trailer = find(&doc[first_entry..], b"trailer").unwrap();
    let table = &doc[first_entry..first_entry + trailer];
    assert_eq!(table.len() % 20, 0, "xref entries must be 20 bytes each");
    let entries = table
        .chunks(20)
        .map(|e| String::from_utf8(e.to_vec()).unwrap())
        .collect();

    Xref {
        start,
        declared,
        entries,
    }
}

fn trailer_size(doc: &[u8]) -> usize {
    let at = rfind(doc, b"/Size ").unwrap() + "/Size ".len();
    let end = at + doc[at..].iter().position(|b| *b == b' ').unwrap();
    std::str::from_utf8(&doc[at..end]).unwrap().parse().unwrap()
}

fn object_text(doc: &[u8], number: u32) -> String {
    let extraction = extract(Some(doc)).unwrap();
    let object = extraction
        .objects
        .iter()
        .find(|o| o.number() == number)
        .unwrap_or_else(|| panic!("object {number} missing"));
    String::from_utf8_lossy(object.bytes()).into_owned()
}

fn inflate_stream(doc: &[u8], number: u32) -> Vec<u8> {
    let extraction = extract(Some(doc)).unwrap();
    let span = extraction
        .objects
        .iter()
        .find(|o| o.number() == number)
        .unwrap()
        .bytes();
    let start = find(span, b"stream\n").unwrap() + "stream\n".len();
    let end = rfind(span, b"\nendstream").unwrap();

    let mut out = Vec::new();
    ZlibDecoder::new(&span[start..end]).read_to_end(&mut out).unwrap();
    out
}

// ── EmbedConfig ───────────────────────────────────────────────────────────────

#[test]
fn default_config_is_permissive() {
    let cfg = EmbedConfig::default();
    assert_eq!(cfg.compression, Compression::default());
    assert!(cfg.max_source_size.is_none());
    assert!(cfg.attachment_name.is_none());
    assert!(!cfg.record_size_param);
}

// ── Fresh documents ───────────────────────────────────────────────────────────

#[test]
fn hello_txt_into_missing_destination() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), "hello.txt", b"0123456789");
    let dest = dir.path().join("out.pdf");

    let outcome = PdfEmbedder::new().embed_file(&source, &dest).unwrap();
    let doc = std::fs::read(&dest).unwrap();

    assert_eq!(outcome.mode, Mode::Fresh);
    assert_eq!(outcome.filename, "hello.txt");
    assert_eq!(outcome.original_size, 10);
    assert_eq!(outcome.object_count, 6);
    assert_eq!(outcome.document, doc);

    let numbers: Vec<u32> = extract(Some(&doc))
        .unwrap()
        .objects
        .iter()
        .map(|o| o.number())
        .collect();
    assert_eq!(numbers, [1, 2, 3, 4, 5, 6]);

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"0123456789").unwrap();
    let compressed = encoder.finish().unwrap().len();
    assert_ne!(compressed, 10);
    assert_eq!(outcome.compressed_size, compressed);
    assert!(object_text(&doc, 6).contains(&format!("/Length {compressed} ")));

    assert_eq!(
        object_text(&doc, 4),
        "4 0 obj\n<< /Names [ (hello.txt) 5 0 R ] /Limits [ (hello.txt) (hello.txt) ] >>\nendobj\n"
    );
    assert_eq!(
        object_text(&doc, 1),
        "1 0 obj\n<< /Type /Catalog /Names 2 0 R >>\nendobj\n"
    );
}

#[test]
fn document_starts_with_binary_header() {
    let outcome = PdfEmbedder::new()
        .embed_bytes(None, "a.bin", &[0, 1, 2])
        .unwrap();
    let header = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";
    assert!(outcome.document.starts_with(header));
    assert!(outcome.document[header.len()..].starts_with(b"1 0 obj"));
    assert!(outcome.document.ends_with(b"%%EOF\n"));
}

#[test]
fn embedded_bytes_round_trip() {
    let data: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
    let outcome = PdfEmbedder::new()
        .embed_bytes(None, "table.bin", &data)
        .unwrap();

    assert_eq!(inflate_stream(&outcome.document, 6), data);

    let files = AttachmentReader::from_bytes(&outcome.document)
        .unwrap()
        .extract_all()
        .unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].filename, "table.bin");
    assert_eq!(files[0].data, data);
    assert_eq!(files[0].metadata.size, None);
}

// ── Extending documents ───────────────────────────────────────────────────────

#[test]
fn second_attachment_accumulates() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_source(dir.path(), "a.txt", b"first attachment");
    let b = write_source(dir.path(), "b.txt", b"second attachment");
    let dest = dir.path().join("bundle.pdf");

    let embedder = PdfEmbedder::new();
    embedder.embed_file(&a, &dest).unwrap();
    let outcome = embedder.embed_file(&b, &dest).unwrap();
    let doc = std::fs::read(&dest).unwrap();

    assert_eq!(outcome.mode, Mode::Extend);
    assert_eq!(outcome.object_count, 3 + 3 + 3);

    let extraction = extract(Some(&doc)).unwrap();
    assert_eq!(extraction.objects.len(), 9);
    assert_eq!(
        extraction.names,
        vec![
            NameEntry {
                name: b"(a.txt)".to_vec(),
                filespec: ObjectRef::new(5),
            },
            NameEntry {
                name: b"(b.txt)".to_vec(),
                filespec: ObjectRef::new(8),
            },
        ]
    );

    assert_eq!(inflate_stream(&doc, 6), b"first attachment");
    assert_eq!(inflate_stream(&doc, 9), b"second attachment");
    assert!(object_text(&doc, 8).contains("/F (b.txt) /EF << /F 9 0 R >>"));
}

#[test]
fn three_runs_keep_every_name() {
    let embedder = PdfEmbedder::new();
    let mut doc: Option<Vec<u8>> = None;
    for name in ["one.txt", "two.txt", "three.txt"] {
        let outcome = embedder
            .embed_bytes(doc.as_deref(), name, name.as_bytes())
            .unwrap();
        doc = Some(outcome.document);
    }
    let doc = doc.unwrap();

    let names: Vec<Vec<u8>> = extract(Some(&doc))
        .unwrap()
        .names
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(
        names,
        [b"(one.txt)".to_vec(), b"(two.txt)".to_vec(), b"(three.txt)".to_vec()]
    );
    assert_eq!(
        object_text(&doc, 10),
        "10 0 obj\n<< /Names [ (one.txt) 5 0 R (two.txt) 8 0 R (three.txt) 11 0 R ] \
/Limits [ (one.txt) (two.txt) ] >>\nendobj\n"
    );
}

#[test]
fn existing_objects_are_preserved_byte_for_byte() {
    let embedder = PdfEmbedder::new();
    let first = embedder
        .embed_bytes(None, "a.txt", b"alpha")
        .unwrap()
        .document;
    let second = embedder
        .embed_bytes(Some(&first), "b.txt", b"beta")
        .unwrap()
        .document;

    let before = extract(Some(&first)).unwrap().objects;
    let after = extract(Some(&second)).unwrap().objects;
    for object in &before {
        let kept = after
            .iter()
            .find(|o| o.number() == object.number())
            .unwrap();
        assert_eq!(kept.bytes(), object.bytes());
    }

    // The whole object region of the first document is a prefix of the second.
    let body = &first[..read_xref(&first).start];
    assert!(second.starts_with(body));
}

#[test]
fn stored_payload_containing_endobj_survives_extension() {
    let cfg = EmbedConfig {
        compression: Compression::none(),
        ..Default::default()
    };
    let embedder = PdfEmbedder::with_config(cfg);
    let tricky = b"endobj\n9 0 obj\n<< /Names [ (evil) 1 0 R ] >>\nendobj\n";

    let first = embedder.embed_bytes(None, "tricky.txt", tricky).unwrap();
    let second = embedder
        .embed_bytes(Some(&first.document), "next.txt", b"next")
        .unwrap();

    assert_eq!(second.object_count, 9);
    assert_eq!(inflate_stream(&second.document, 6), tricky);
    let extraction = extract(Some(&second.document)).unwrap();
    assert_eq!(
        extraction.names,
        vec![
            NameEntry {
                name: b"(tricky.txt)".to_vec(),
                filespec: ObjectRef::new(5),
            },
            NameEntry {
                name: b"(next.txt)".to_vec(),
                filespec: ObjectRef::new(8),
            },
        ]
    );
}

#[test]
fn foreign_document_without_names_is_extended() {
    let foreign = b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n\
5 0 obj\n<< /Producer (test) >>\nendobj\n\
xref\n0 6\ntrailer\n<< /Size 6 /Root 1 0 R >>\n%%EOF\n";

    let outcome = PdfEmbedder::new()
        .embed_bytes(Some(foreign), "new.txt", b"payload")
        .unwrap();
    let doc = &outcome.document;

    assert_eq!(outcome.mode, Mode::Extend);
    assert_eq!(outcome.object_count, 6);
    assert_eq!(
        object_text(doc, 6),
        "6 0 obj\n<< /Names [ (new.txt) 7 0 R ] /Limits [ (new.txt) (new.txt) ] >>\nendobj\n"
    );
    assert_eq!(
        object_text(doc, 1),
        "1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n"
    );

    // Numbers 3 and 4 never existed; their xref slots are free.
    let xref = read_xref(doc);
    assert_eq!(xref.declared, 9);
    assert_eq!(xref.entries[3], "0000000000 65535 f \n");
    assert_eq!(xref.entries[4], "0000000000 65535 f \n");
}

#[test]
fn foreign_stream_with_wrong_length_keeps_following_objects() {
    let foreign = b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog >>\nendobj\n\
2 0 obj\n<< /Length 30 >>\nstream\nabc\nendstream\nendobj\n\
3 0 obj\n<< /Producer (test) >>\nendobj\n\
4 0 obj\n<< /Length 1 >>\nstream\nx\nendstream\nendobj\n";

    let outcome = PdfEmbedder::new()
        .embed_bytes(Some(foreign), "new.txt", b"payload")
        .unwrap();
    let doc = &outcome.document;

    assert_eq!(outcome.object_count, 7);
    let numbers: Vec<u32> = extract(Some(doc))
        .unwrap()
        .objects
        .iter()
        .map(|o| o.number())
        .collect();
    assert_eq!(numbers, [1, 2, 3, 4, 5, 6, 7]);

    let xref = read_xref(doc);
    let offset: usize = xref.entries[3][..10].parse().unwrap();
    assert!(doc[offset..].starts_with(b"3 0 obj\n<< /Producer (test) >>"));
}

#[test]
fn filename_spelling_a_names_array_is_only_a_name() {
    let embedder = PdfEmbedder::new();
    let first = embedder
        .embed_bytes(None, "x/Names [<62> 3 0 R]", b"first")
        .unwrap();
    assert_eq!(
        extract(Some(&first.document)).unwrap().names,
        vec![NameEntry {
            name: b"(x/Names [<62> 3 0 R])".to_vec(),
            filespec: ObjectRef::new(5),
        }]
    );

    let second = embedder
        .embed_bytes(Some(&first.document), "b.txt", b"second")
        .unwrap();
    let filespecs: Vec<ObjectRef> = extract(Some(&second.document))
        .unwrap()
        .names
        .iter()
        .map(|e| e.filespec)
        .collect();
    assert_eq!(filespecs, [ObjectRef::new(5), ObjectRef::new(8)]);
}

// ── Cross-reference table and trailer ─────────────────────────────────────────

#[test]
fn xref_offsets_point_at_object_headers() {
    let embedder = PdfEmbedder::new();
    let first = embedder.embed_bytes(None, "a.txt", b"alpha").unwrap();
    let second = embedder
        .embed_bytes(Some(&first.document), "b.txt", b"beta")
        .unwrap();

    for doc in [&first.document, &second.document] {
        let xref = read_xref(doc);
        assert_eq!(xref.entries[0], "0000000000 65535 f \n");
        for (number, entry) in xref.entries.iter().enumerate().skip(1) {
            assert!(entry.ends_with(" 00000 n \n"), "entry {number}: {entry:?}");
            let offset: usize = entry[..10].parse().unwrap();
            assert!(
                doc[offset..].starts_with(format!("{number} 0 obj").as_bytes()),
                "offset of object {number} is wrong"
            );
        }
    }
}

#[test]
fn trailer_size_matches_object_count() {
    let embedder = PdfEmbedder::new();
    let mut doc: Option<Vec<u8>> = None;
    for round in 0..3 {
        let outcome = embedder
            .embed_bytes(doc.as_deref(), &format!("f{round}.txt"), b"x")
            .unwrap();
        let xref = read_xref(&outcome.document);

        assert_eq!(outcome.object_count, 6 + 3 * round);
        assert_eq!(trailer_size(&outcome.document), outcome.object_count + 1);
        assert_eq!(xref.declared, outcome.object_count + 1);
        assert_eq!(xref.entries.len(), outcome.object_count + 1);
        assert!(find(&outcome.document, b"/Root 1 0 R").is_some());

        doc = Some(outcome.document);
    }
}

// ── Error handling ────────────────────────────────────────────────────────────

#[test]
fn missing_source_leaves_destination_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.pdf");

    let err = PdfEmbedder::new()
        .embed_file(dir.path().join("nope.txt"), &dest)
        .unwrap_err();
    assert!(matches!(err, EmbedError::MissingSourceFile(_)));
    assert!(!dest.exists());
}

#[test]
fn corrupt_destination_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), "a.txt", b"data");
    let dest = write_source(dir.path(), "out.pdf", b"%PDF-1.7\n3 0 obj\n<< /Broken");

    let err = PdfEmbedder::new().embed_file(&source, &dest).unwrap_err();
    assert!(matches!(err, EmbedError::StructuralCorruption(_)));
    assert_eq!(
        std::fs::read(&dest).unwrap(),
        b"%PDF-1.7\n3 0 obj\n<< /Broken"
    );
}

#[test]
fn empty_destination_is_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), "a.txt", b"data");
    let dest = write_source(dir.path(), "out.pdf", b"");

    let err = PdfEmbedder::new().embed_file(&source, &dest).unwrap_err();
    assert!(matches!(err, EmbedError::StructuralCorruption(_)));
}

#[test]
fn oversized_source_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), "big.bin", &[7u8; 2048]);
    let dest = dir.path().join("out.pdf");

    let cfg = EmbedConfig {
        max_source_size: Some(1024),
        ..Default::default()
    };
    let err = PdfEmbedder::with_config(cfg)
        .embed_file(&source, &dest)
        .unwrap_err();
    assert!(matches!(
        err,
        EmbedError::FileSizeExceeded {
            size: 2048,
            limit: 1024
        }
    ));
    assert!(!dest.exists());
}

#[test]
fn error_display_is_non_empty() {
    let errors: &[EmbedError] = &[
        EmbedError::MissingSourceFile(PathBuf::from("x")),
        EmbedError::StructuralCorruption("test".into()),
        EmbedError::FileSizeExceeded { size: 2, limit: 1 },
        EmbedError::NoEmbeddedFiles,
        EmbedError::ExtractionError("f".into(), "reason".into()),
    ];
    for e in errors {
        assert!(!e.to_string().is_empty(), "empty display for {e:?}");
    }
}

// ── Configuration options ─────────────────────────────────────────────────────

#[test]
fn name_override_and_size_param_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), "TERMS", b"terms and conditions");
    let dest = dir.path().join("out.pdf");

    let cfg = EmbedConfig {
        attachment_name: Some("terms (2024).txt".into()),
        record_size_param: true,
        ..Default::default()
    };
    PdfEmbedder::with_config(cfg)
        .embed_file(&source, &dest)
        .unwrap();

    let reader = AttachmentReader::from_path(&dest).unwrap();
    assert_eq!(reader.names(), ["terms (2024).txt"]);

    let files = reader.extract_all().unwrap();
    assert_eq!(files[0].filename, "terms (2024).txt");
    assert_eq!(files[0].data, b"terms and conditions");
    assert_eq!(files[0].metadata.size, Some(20));
}

// ── AttachmentReader ──────────────────────────────────────────────────────────

#[test]
fn reader_rejects_empty_slice() {
    assert!(AttachmentReader::from_bytes(&[]).is_err());
}

#[test]
fn reader_rejects_non_pdf() {
    assert!(AttachmentReader::from_bytes(b"not a pdf").is_err());
}
