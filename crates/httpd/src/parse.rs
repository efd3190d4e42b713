//! Request-line parsing and `Connection` header scanning.
//!
//! Only the request line is tokenized; everything else in the header
//! block is treated as opaque bytes except for the keep-alive scan.

use crate::method::Method;
use crate::request::Request;

pub enum ParseOutcome {
    /// A well-formed, routable request line.
    Ok(Request),
    /// The request line was missing a required space.
    BadRequest,
    /// The method isn't `GET`/`POST`.
    NotImplemented,
}

/// Finds the end of the header block (`\r\n\r\n`) within `buf[..len]`,
/// returning the offset of the first byte after it. `None` means more
/// data must be read before a request can be parsed.
pub fn find_headers_end(buf: &[u8], len: usize) -> Option<usize> {
    buf[..len].windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

/// Parses the request line `METHOD SP PATH SP VERSION CRLF` out of
/// `buf[..len]`. Assumes a full header block is already present.
pub fn parse_request_line(buf: &[u8], len: usize) -> ParseOutcome {
    let line_end = match buf[..len].windows(2).position(|w| w == b"\r\n") {
        Some(p) => p,
        None => return ParseOutcome::BadRequest,
    };
    let line = &buf[..line_end];

    let sp1 = match line.iter().position(|&b| b == b' ') {
        Some(p) => p,
        None => return ParseOutcome::BadRequest,
    };
    let rest = &line[sp1 + 1..];
    let sp2 = match rest.iter().position(|&b| b == b' ') {
        Some(p) => p,
        None => return ParseOutcome::BadRequest,
    };

    let method_bytes = &line[..sp1];
    let path_bytes = &rest[..sp2];

    let method = match Method::from_bytes(method_bytes) {
        Some(m) => m,
        None => return ParseOutcome::NotImplemented,
    };

    let path = match std::str::from_utf8(path_bytes) {
        Ok(s) => s.to_string(),
        Err(_) => return ParseOutcome::BadRequest,
    };

    ParseOutcome::Ok(Request { method, path })
}

/// Case-insensitive scan for a `Connection:` header whose value starts
/// with `close`. Defaults to keep-alive on any other value or absence.
pub fn scan_keep_alive(buf: &[u8], len: usize) -> bool {
    let data = &buf[..len];
    let mut start = 0usize;
    while let Some(rel_end) = data[start..].windows(2).position(|w| w == b"\r\n") {
        let line = &data[start..start + rel_end];
        if line.len() >= 11 && line[..11].eq_ignore_ascii_case(b"connection:") {
            let value = line[11..].iter().position(|&b| b != b' ' && b != b'\t')
                .map(|skip| &line[11 + skip..])
                .unwrap_or(&line[11..]);
            if value.len() >= 5 && value[..5].eq_ignore_ascii_case(b"close") {
                return false;
            }
            return true;
        }
        start += rel_end + 2;
        if line.is_empty() {
            break;
        }
    }
    true
}
