//! Recovers the indirect objects and the attachment name list of an existing
//! document.
//!
//! This is deliberately not a PDF parser. Objects are located by a byte-level
//! scan between the `N 0 obj` header and its `endobj` keyword and kept as
//! opaque spans; only the `/Names [ ... ]` array is tokenized.

use crate::object::{IndirectObject, ObjectRef};
use crate::{EmbedError, Result};
use log::debug;

/// Producers may put junk before the header; readers look this far for it.
const HEADER_SEARCH_LIMIT: usize = 1024;

// ── Output types ─────────────────────────────────────────────────────────────

/// One `(name, filespec)` pair of an EmbeddedFiles `/Names` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    /// The string token exactly as it appears in the document, delimiters
    /// included (`(report.csv)` or `<...>`).
    pub name: Vec<u8>,
    pub filespec: ObjectRef,
}

impl NameEntry {
    /// The decoded string bytes of [`name`](Self::name), the value name-tree
    /// keys are ordered by.
    pub fn key(&self) -> Vec<u8> {
        match (self.name.first(), self.name.last()) {
            (Some(b'('), Some(b')')) if self.name.len() >= 2 => {
                decode_literal(&self.name[1..self.name.len() - 1])
            }
            (Some(b'<'), Some(b'>')) if self.name.len() >= 2 => {
                decode_hex(&self.name[1..self.name.len() - 1])
            }
            _ => self.name.clone(),
        }
    }
}

/// Everything recovered from a prior document.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Verbatim object spans in document order.
    pub objects: Vec<IndirectObject>,
    /// Existing attachment pairs, in array order.
    pub names: Vec<NameEntry>,
}

impl Extraction {
    /// `true` when there was no prior document to extend.
    pub fn is_fresh(&self) -> bool {
        self.objects.is_empty()
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

/// Extract objects and attachment names from `existing`.
///
/// `None` means no prior document exists and yields an empty extraction.
/// A prior document that cannot be split into well-formed `N 0 obj ... endobj`
/// spans is [`EmbedError::StructuralCorruption`]. A document without a
/// recognizable `/Names [ ... ]` array yields an empty name list.
pub fn extract(existing: Option<&[u8]>) -> Result<Extraction> {
    let data = match existing {
        Some(data) => data,
        None => return Ok(Extraction::default()),
    };

    let window = &data[..data.len().min(HEADER_SEARCH_LIMIT)];
    if find(window, b"%PDF-", 0).is_none() {
        return Err(corrupt("missing %PDF- header"));
    }

    let objects = scan_objects(data)?;
    if objects.is_empty() {
        return Err(corrupt("no indirect objects found"));
    }

    let names = match recover_names(&objects) {
        Some(names) => names,
        None => {
            debug!("no /Names array found; treating document as having no attachments");
            Vec::new()
        }
    };

    debug!(
        "extracted {} objects and {} attachment names",
        objects.len(),
        names.len()
    );

    Ok(Extraction { objects, names })
}

fn corrupt(msg: impl Into<String>) -> EmbedError {
    EmbedError::StructuralCorruption(msg.into())
}

// ── Object scan ──────────────────────────────────────────────────────────────

struct Header {
    start: usize,
    number: u32,
    body_start: usize,
}

/// Split `data` into verbatim `N 0 obj ... endobj` spans.
pub fn scan_objects(data: &[u8]) -> Result<Vec<IndirectObject>> {
    let mut objects = Vec::new();
    let mut pos = 0;

    while let Some(header) = find_header(data, pos)? {
        let end = find_object_end(data, &header)?;
        objects.push(IndirectObject::inherited(
            header.number,
            data[header.start..end].to_vec(),
        ));
        pos = end;
    }

    Ok(objects)
}

fn find_header(data: &[u8], from: usize) -> Result<Option<Header>> {
    for i in from..data.len() {
        if data[i].is_ascii_digit() && (i == 0 || is_whitespace(data[i - 1])) {
            if let Some(header) = match_header(data, i)? {
                return Ok(Some(header));
            }
        }
    }
    Ok(None)
}

/// Match `<digits> <digits> obj` at `start`.
fn match_header(data: &[u8], start: usize) -> Result<Option<Header>> {
    let num_end = skip_while(data, start, |b| b.is_ascii_digit());
    let gen_start = skip_while(data, num_end, is_whitespace);
    if gen_start == num_end {
        return Ok(None);
    }
    let gen_end = skip_while(data, gen_start, |b| b.is_ascii_digit());
    let kw_start = skip_while(data, gen_end, is_whitespace);
    if gen_end == gen_start || kw_start == gen_end {
        return Ok(None);
    }
    if !data[kw_start..].starts_with(b"obj") {
        return Ok(None);
    }
    let body_start = kw_start + 3;
    if data.get(body_start).is_some_and(|b| b.is_ascii_alphanumeric()) {
        return Ok(None);
    }

    let number = parse_u32(&data[start..num_end])
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            corrupt(format!(
                "object number `{}` at offset {start} is not a valid integer",
                String::from_utf8_lossy(&data[start..num_end])
            ))
        })?;

    match parse_u32(&data[gen_start..gen_end]) {
        Some(0) => {}
        _ => {
            return Err(corrupt(format!(
                "object {number} has unsupported generation `{}`",
                String::from_utf8_lossy(&data[gen_start..gen_end])
            )))
        }
    }

    Ok(Some(Header {
        start,
        number,
        body_start,
    }))
}

/// Offset one past the object's `endobj` and its end-of-line.
///
/// A stream whose direct `/Length` lands exactly on `endstream` is skipped by
/// that length, so payload bytes that happen to spell `endobj` do not cut the
/// object short. Any other stream ends at its first `endstream`.
///
/// Outside trusted stream data, another `N 0 obj` header before the end is
/// corruption: the object would otherwise swallow its successors.
fn find_object_end(data: &[u8], header: &Header) -> Result<usize> {
    let missing_endobj = || corrupt(format!("object {} has no endobj", header.number));

    let first_endobj = find(data, b"endobj", header.body_start).ok_or_else(missing_endobj)?;
    let mut search_from = header.body_start;

    if let Some(stream_kw) = find_stream_keyword(data, header.body_start, first_endobj) {
        ensure_unbroken(data, header, header.body_start, stream_kw)?;
        let data_start = skip_eol(data, stream_kw + b"stream".len());
        let endstream = match direct_length(&data[header.body_start..stream_kw])
            .and_then(|len| endstream_at(data, data_start, len))
        {
            Some(at) => at,
            None => {
                let at = find(data, b"endstream", data_start).ok_or_else(|| {
                    corrupt(format!("object {} has no endstream", header.number))
                })?;
                ensure_unbroken(data, header, data_start, at)?;
                at
            }
        };
        search_from = endstream + b"endstream".len();
    }

    let endobj = find(data, b"endobj", search_from).ok_or_else(missing_endobj)?;
    ensure_unbroken(data, header, search_from, endobj)?;
    Ok(skip_eol(data, endobj + b"endobj".len()))
}

/// `endstream` exactly `len` bytes after `data_start`, optionally preceded by
/// one EOL.
fn endstream_at(data: &[u8], data_start: usize, len: usize) -> Option<usize> {
    let at = data_start.checked_add(len).filter(|at| *at <= data.len())?;
    let at = skip_eol(data, at);
    data[at..].starts_with(b"endstream").then_some(at)
}

/// Fails if an object header starts in `from..to`.
fn ensure_unbroken(data: &[u8], header: &Header, from: usize, to: usize) -> Result<()> {
    match find_header(&data[..to], from)? {
        Some(next) => Err(corrupt(format!(
            "object {} is not closed before object {} at offset {}",
            header.number, next.number, next.start
        ))),
        None => Ok(()),
    }
}

/// The `stream` keyword: not part of a longer word, followed by an EOL.
fn find_stream_keyword(data: &[u8], from: usize, to: usize) -> Option<usize> {
    let mut pos = from;
    while let Some(at) = find(&data[..to], b"stream", pos) {
        let after = at + b"stream".len();
        let standalone = at == 0 || !data[at - 1].is_ascii_alphabetic();
        if standalone && matches!(data.get(after), Some(b'\r') | Some(b'\n')) {
            return Some(at);
        }
        pos = after;
    }
    None
}

/// A direct integer `/Length` in a stream dictionary; `None` for indirect
/// (`N 0 R`) lengths.
fn direct_length(dict: &[u8]) -> Option<usize> {
    let mut pos = 0;
    while let Some(at) = find(dict, b"/Length", pos) {
        pos = at + b"/Length".len();
        if !dict.get(pos).is_some_and(|b| is_whitespace(*b)) {
            continue; // /Length1, /Length2 ...
        }
        let digits_start = skip_while(dict, pos, is_whitespace);
        let digits_end = skip_while(dict, digits_start, |b| b.is_ascii_digit());
        if digits_end == digits_start {
            continue;
        }
        if reference_follows(dict, digits_end) {
            return None;
        }
        return std::str::from_utf8(&dict[digits_start..digits_end])
            .ok()?
            .parse()
            .ok();
    }
    None
}

/// ` <digits> R` directly after a number.
fn reference_follows(data: &[u8], from: usize) -> bool {
    let gen_start = skip_while(data, from, is_whitespace);
    let gen_end = skip_while(data, gen_start, |b| b.is_ascii_digit());
    if gen_start == from || gen_end == gen_start {
        return false;
    }
    let r = skip_while(data, gen_end, is_whitespace);
    r > gen_end && data.get(r) == Some(&b'R')
}

// ── Name list recovery ───────────────────────────────────────────────────────

/// The most recent `/Names [ ... ]` array that tokenizes into
/// `(string, N 0 R)` pairs.
///
/// Every run writes the full merged list into a new object after all existing
/// ones, so the last array in document order is the complete one.
fn recover_names(objects: &[IndirectObject]) -> Option<Vec<NameEntry>> {
    objects.iter().rev().find_map(|o| last_names_array(o.bytes()))
}

/// Stream data is opaque, so only the part before a `stream` keyword is
/// searched. String tokens and comments are skipped whole: a filename such as
/// `(x/Names [<62> 3 0 R])` is data, not structure.
fn last_names_array(span: &[u8]) -> Option<Vec<NameEntry>> {
    let span = match find_stream_keyword(span, 0, span.len()) {
        Some(stream_kw) => &span[..stream_kw],
        None => span,
    };
    let mut starts = Vec::new();
    let mut pos = 0;
    while pos < span.len() {
        pos = match span[pos] {
            b'(' => match literal_end(span, pos) {
                Some(end) => end,
                None => break,
            },
            b'<' if span.get(pos + 1) == Some(&b'<') => pos + 2,
            b'<' => match find(span, b">", pos) {
                Some(end) => end + 1,
                None => break,
            },
            b'%' => skip_while(span, pos, |b| b != b'\r' && b != b'\n'),
            _ if span[pos..].starts_with(b"/Names") => {
                starts.push(pos + b"/Names".len());
                pos + b"/Names".len()
            }
            _ => pos + 1,
        };
    }
    starts
        .into_iter()
        .rev()
        .find_map(|start| parse_names_array(&span[start..]))
}

#[derive(Debug)]
enum Token {
    Str(Vec<u8>),
    Int(u32),
    Ref,
}

/// Parse `[ (name) N 0 R ... ]` at the start of `rest` (after optional
/// whitespace).
fn parse_names_array(rest: &[u8]) -> Option<Vec<NameEntry>> {
    let mut pos = skip_while(rest, 0, is_whitespace);
    if rest.get(pos) != Some(&b'[') {
        return None;
    }
    pos += 1;

    let mut tokens = Vec::new();
    loop {
        pos = skip_while(rest, pos, is_whitespace);
        let (token, next) = match *rest.get(pos)? {
            b']' => break,
            b'(' => {
                let end = literal_end(rest, pos)?;
                (Token::Str(rest[pos..end].to_vec()), end)
            }
            b'<' if rest.get(pos + 1) != Some(&b'<') => {
                let end = pos + rest[pos..].iter().position(|b| *b == b'>')? + 1;
                (Token::Str(rest[pos..end].to_vec()), end)
            }
            b'R' => (Token::Ref, pos + 1),
            b if b.is_ascii_digit() => {
                let end = skip_while(rest, pos, |b| b.is_ascii_digit());
                (Token::Int(parse_u32(&rest[pos..end])?), end)
            }
            _ => return None,
        };
        tokens.push(token);
        pos = next;
    }

    if tokens.is_empty() || tokens.len() % 4 != 0 {
        return None;
    }

    tokens
        .chunks(4)
        .map(|chunk| match chunk {
            [Token::Str(name), Token::Int(number), Token::Int(0), Token::Ref] if *number > 0 => {
                Some(NameEntry {
                    name: name.clone(),
                    filespec: ObjectRef::new(*number),
                })
            }
            _ => None,
        })
        .collect()
}

/// One past the `)` closing the literal string opened at `start`.
fn literal_end(data: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start;
    while i < data.len() {
        match data[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn decode_literal(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        if body[i] != b'\\' {
            out.push(body[i]);
            i += 1;
            continue;
        }
        i += 1;
        match body.get(i) {
            Some(b'n') => out.push(b'\n'),
            Some(b'r') => out.push(b'\r'),
            Some(b't') => out.push(b'\t'),
            Some(b'b') => out.push(0x08),
            Some(b'f') => out.push(0x0c),
            Some(b'0'..=b'7') => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 3 && matches!(body.get(i), Some(b'0'..=b'7')) {
                    value = value * 8 + u32::from(body[i] - b'0');
                    i += 1;
                    digits += 1;
                }
                out.push(value as u8);
                continue;
            }
            // Line continuation.
            Some(b'\r') | Some(b'\n') => {
                i = skip_eol(body, i);
                continue;
            }
            Some(b) => out.push(*b),
            None => {}
        }
        i += 1;
    }
    out
}

fn decode_hex(digits: &[u8]) -> Vec<u8> {
    let nibbles: Vec<u8> = digits
        .iter()
        .filter_map(|b| char::from(*b).to_digit(16))
        .map(|d| d as u8)
        .collect();
    nibbles
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

// ── Byte helpers ─────────────────────────────────────────────────────────────

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' | b'\0')
}

fn skip_while(data: &[u8], from: usize, pred: impl Fn(u8) -> bool) -> usize {
    let mut i = from;
    while i < data.len() && pred(data[i]) {
        i += 1;
    }
    i
}

fn skip_eol(data: &[u8], from: usize) -> usize {
    let mut i = from;
    if data.get(i) == Some(&b'\r') {
        i += 1;
    }
    if data.get(i) == Some(&b'\n') {
        i += 1;
    }
    i
}

fn parse_u32(digits: &[u8]) -> Option<u32> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}
