//! Text decoding of buffered response bodies.
//!
//! Bytes are optionally gunzipped, decoded with the requested charset and
//! re-assembled line by line with `\n` terminators. A character limit stops
//! decompression and decoding early.

use encoding_rs::{CoderResult, Encoding};
use flate2::read::GzDecoder;
use std::io::Read;
use thiserror::Error;

/// Charset used when the response does not name one.
pub const DEFAULT_CHARSET: &str = "utf-8";

const READ_CHUNK: usize = 8192;

/// Failure to turn response bytes into text.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecodeError {
    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),
}

/// Extract the `charset` parameter from a `Content-Type` value.
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then_some(value)
    })
}

/// Decode `body` as text.
///
/// `max_chars == 0` means no limit. Otherwise reading stops once the text
/// grows past `max_chars` and the result is cut to exactly `max_chars`
/// characters.
pub fn decode_text(
    body: &[u8],
    gzip: bool,
    charset: &str,
    max_chars: usize,
) -> Result<String, DecodeError> {
    let encoding = Encoding::for_label(charset.trim().as_bytes())
        .ok_or_else(|| DecodeError::UnsupportedCharset(charset.to_string()))?;

    let mut reader: Box<dyn Read + '_> = if gzip {
        Box::new(GzDecoder::new(body))
    } else {
        Box::new(body)
    };

    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut lines = LineJoiner::new(max_chars);
    let mut pending = String::new();
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        let (n, last) = match reader.read(&mut chunk) {
            Ok(0) => (0, true),
            Ok(n) => (n, false),
            Err(e) => {
                tracing::warn!(error = %e, charset = %encoding.name(), "body decoding stopped early");
                (0, true)
            }
        };

        let mut input = &chunk[..n];
        loop {
            let needed = decoder
                .max_utf8_buffer_length(input.len())
                .unwrap_or(input.len() * 3 + 16);
            pending.reserve(needed);
            let (result, read, _) = decoder.decode_to_string(input, &mut pending, last);
            input = &input[read..];
            if let CoderResult::InputEmpty = result {
                break;
            }
        }

        if lines.push(&mut pending, last) || last {
            break;
        }
    }

    Ok(lines.finish())
}

struct LineJoiner {
    text: String,
    chars: usize,
    max_chars: usize,
}

impl LineJoiner {
    fn new(max_chars: usize) -> Self {
        Self {
            text: String::new(),
            chars: 0,
            max_chars,
        }
    }

    /// Move every complete line out of `pending`. Returns true once the
    /// character limit has been exceeded.
    fn push(&mut self, pending: &mut String, eof: bool) -> bool {
        let mut consumed = 0;
        let mut limit_hit = false;

        while let Some((end, next)) = next_line(&pending[consumed..], eof) {
            let line = &pending[consumed..consumed + end];
            self.text.push_str(line);
            self.text.push('\n');
            self.chars += line.chars().count() + 1;
            consumed += next;

            if self.max_chars > 0 && self.chars > self.max_chars {
                limit_hit = true;
                break;
            }
        }

        pending.drain(..consumed);
        limit_hit
    }

    fn finish(self) -> String {
        if self.max_chars > 0 && self.chars > self.max_chars {
            self.text.chars().take(self.max_chars).collect()
        } else {
            self.text
        }
    }
}

/// Locate the next line in `buf` as (line length, bytes to consume).
///
/// Lines end at `\n`, `\r` or `\r\n`. A trailing `\r` is held back until
/// more input shows whether a `\n` follows.
fn next_line(buf: &str, eof: bool) -> Option<(usize, usize)> {
    let bytes = buf.as_bytes();
    match buf.find(|c: char| c == '\n' || c == '\r') {
        Some(idx) if bytes[idx] == b'\n' => Some((idx, idx + 1)),
        Some(idx) => match bytes.get(idx + 1) {
            Some(b'\n') => Some((idx, idx + 2)),
            Some(_) => Some((idx, idx + 1)),
            None if eof => Some((idx, idx + 1)),
            None => None,
        },
        None if eof && !buf.is_empty() => Some((buf.len(), buf.len())),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_plain_utf8() {
        let text = decode_text("héllo\nwörld\n".as_bytes(), false, "utf-8", 0).unwrap();
        assert_eq!(text, "héllo\nwörld\n");
    }

    #[test]
    fn test_missing_final_newline_is_added() {
        assert_eq!(decode_text(b"hello", false, "utf-8", 0).unwrap(), "hello\n");
        assert_eq!(decode_text(b"", false, "utf-8", 0).unwrap(), "");
    }

    #[test]
    fn test_line_terminators_normalized() {
        let text = decode_text(b"a\r\nb\rc\n\nd", false, "utf-8", 0).unwrap();
        assert_eq!(text, "a\nb\nc\n\nd\n");
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let mut body = vec![b'x'; READ_CHUNK - 1];
        body.extend_from_slice(b"\r\ny");
        let text = decode_text(&body, false, "utf-8", 0).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with("\ny\n"));
        assert!(!text.contains('\r'));
    }

    #[test]
    fn test_gzip_roundtrip() {
        let compressed = gzip(b"hello\n");
        assert_eq!(decode_text(&compressed, true, "utf-8", 0).unwrap(), "hello\n");
    }

    #[test]
    fn test_latin1() {
        let body = [b'c', b'a', b'f', 0xE9];
        assert_eq!(decode_text(&body, false, "ISO-8859-1", 0).unwrap(), "café\n");
    }

    #[test]
    fn test_latin1_label_maps_to_windows_1252() {
        let body = [0x80, b'1'];
        assert_eq!(decode_text(&body, false, "ISO-8859-1", 0).unwrap(), "\u{20ac}1\n");
    }

    #[test]
    fn test_max_chars_truncates_exactly() {
        let body = "0123456789".repeat(10);
        let text = decode_text(body.as_bytes(), false, "utf-8", 10).unwrap();
        assert_eq!(text, "0123456789");

        let lines = "abc\n".repeat(25);
        let text = decode_text(lines.as_bytes(), false, "utf-8", 10).unwrap();
        assert_eq!(text.chars().count(), 10);
        assert_eq!(text, "abc\nabc\nab");
    }

    #[test]
    fn test_max_chars_larger_than_text() {
        let text = decode_text(b"short", false, "utf-8", 100).unwrap();
        assert_eq!(text, "short\n");
    }

    #[test]
    fn test_max_chars_counts_characters_not_bytes() {
        let body = "ééééé".repeat(4);
        let text = decode_text(body.as_bytes(), false, "utf-8", 3).unwrap();
        assert_eq!(text, "ééé");
    }

    #[test]
    fn test_unsupported_charset() {
        let err = decode_text(b"x", false, "x-no-such-charset", 0).unwrap_err();
        assert_eq!(err, DecodeError::UnsupportedCharset("x-no-such-charset".into()));
    }

    #[test]
    fn test_corrupt_gzip_yields_partial_text() {
        let text = decode_text(b"definitely not gzip", true, "utf-8", 0).unwrap();
        assert_eq!(text, "");
    }

    #[test]
    fn test_charset_from_content_type() {
        assert_eq!(
            charset_from_content_type("text/html; charset=ISO-8859-1"),
            Some("ISO-8859-1")
        );
        assert_eq!(
            charset_from_content_type("text/plain;Charset=\"koi8-r\""),
            Some("koi8-r")
        );
        assert_eq!(charset_from_content_type("text/html"), None);
        assert_eq!(charset_from_content_type(""), None);
    }
}
