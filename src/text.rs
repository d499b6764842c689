//! Canonical text handling for S/MIME content.

use std::io::Write;

use crate::bio::Bio;
use crate::errors::{Error, Result};
use crate::flags::Flags;

const TEXT_PLAIN_HEADER: &[u8] = b"Content-Type: text/plain\r\n\r\n";

/// Write `data` into `bio` in canonical form.
///
/// With [`Flags::BINARY`] the bytes are copied as they are. Otherwise every
/// line ending becomes CRLF, and [`Flags::TEXT`] prepends a `text/plain`
/// MIME header. A final line without a newline gets no line ending.
pub fn crlf_copy(data: &[u8], bio: &mut Bio, flags: Flags) -> Result<()> {
    if flags.contains(Flags::BINARY) {
        return bio.feed(data);
    }
    if flags.contains(Flags::TEXT) {
        bio.feed(TEXT_PLAIN_HEADER)?;
    }

    let mut out = Vec::with_capacity(data.len() + data.len() / 32);
    for line in data.split_inclusive(|&b| b == b'\n') {
        let (body, eol) = strip_eol(line);
        out.extend_from_slice(body);
        if eol {
            out.extend_from_slice(b"\r\n");
        }
    }
    bio.feed(&out)
}

/// Trailing CR and LF removed; reports whether a LF was present.
fn strip_eol(line: &[u8]) -> (&[u8], bool) {
    let mut len = line.len();
    let mut eol = false;
    while len > 0 {
        match line[len - 1] {
            b'\n' => eol = true,
            b'\r' => {}
            _ => break,
        }
        len -= 1;
    }
    (&line[..len], eol)
}

/// Copy the body of a `text/plain` MIME entity to `out`.
///
/// Fails with [`Error::InvalidMimeType`] when the headers carry no
/// `Content-Type` or a type other than `text/plain`.
pub fn strip_text_header(data: &[u8], out: &mut dyn Write) -> Result<()> {
    let (headers, body) = split_headers(data);

    let mut content_type = None;
    let mut current: Option<String> = None;
    for line in headers {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.starts_with([' ', '\t']) {
            if let Some(header) = current.as_mut() {
                header.push_str(line);
            }
            continue;
        }
        if let Some(header) = current.take() {
            content_type = content_type.or_else(|| header_value(&header, "content-type"));
        }
        current = Some(line.to_owned());
    }
    if let Some(header) = current {
        content_type = content_type.or_else(|| header_value(&header, "content-type"));
    }

    let content_type = content_type.ok_or(Error::InvalidMimeType)?;
    let mime_type = content_type.split(';').next().unwrap_or_default().trim();
    if !mime_type.eq_ignore_ascii_case("text/plain") {
        return Err(Error::InvalidMimeType);
    }
    out.write_all(body)?;
    Ok(())
}

/// Header lines and the body following the first empty line.
fn split_headers(data: &[u8]) -> (Vec<&[u8]>, &[u8]) {
    let mut headers = Vec::new();
    let mut offset = 0;
    for line in data.split_inclusive(|&b| b == b'\n') {
        offset += line.len();
        if strip_eol(line).0.is_empty() {
            return (headers, &data[offset..]);
        }
        headers.push(line);
    }
    (headers, &data[data.len()..])
}

fn header_value(header: &str, name: &str) -> Option<String> {
    let (key, value) = header.split_once(':')?;
    key.trim()
        .eq_ignore_ascii_case(name)
        .then(|| value.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bio::Stage;

    fn canonical(data: &[u8], flags: Flags) -> Vec<u8> {
        let mut bio = Bio::new(Stage::mem());
        crlf_copy(data, &mut bio, flags).unwrap();
        bio.mem().unwrap().as_bytes().to_vec()
    }

    #[test]
    fn line_endings_become_crlf() {
        assert_eq!(canonical(b"a\nb\r\nc", Flags::empty()), b"a\r\nb\r\nc");
        assert_eq!(canonical(b"a\r\r\n\n", Flags::empty()), b"a\r\n\r\n");
        assert_eq!(canonical(b"tail\r", Flags::empty()), b"tail");
    }

    #[test]
    fn binary_is_verbatim() {
        assert_eq!(canonical(b"a\nb\r", Flags::BINARY), b"a\nb\r");
    }

    #[test]
    fn text_adds_header() {
        assert_eq!(
            canonical(b"hi\n", Flags::TEXT),
            b"Content-Type: text/plain\r\n\r\nhi\r\n"
        );
    }

    #[test]
    fn strip_header_round_trip() {
        let framed = canonical(b"line one\nline two\n", Flags::TEXT);
        let mut out = Vec::new();
        strip_text_header(&framed, &mut out).unwrap();
        assert_eq!(out, b"line one\r\nline two\r\n");
    }

    #[test]
    fn strip_header_accepts_parameters_and_folding() {
        let entity = b"MIME-Version: 1.0\nContent-Type:\n  TEXT/PLAIN; charset=us-ascii\n\nbody";
        let mut out = Vec::new();
        strip_text_header(entity, &mut out).unwrap();
        assert_eq!(out, b"body");
    }

    #[test]
    fn strip_header_rejects_other_types() {
        let mut out = Vec::new();
        assert!(matches!(
            strip_text_header(b"Content-Type: text/html\r\n\r\n<p>", &mut out),
            Err(Error::InvalidMimeType)
        ));
        assert!(matches!(
            strip_text_header(b"Subject: none\r\n\r\nbody", &mut out),
            Err(Error::InvalidMimeType)
        ));
        assert!(out.is_empty());
    }
}
