//! HTTP Response with buffered body.

use crate::base::status::RequestStatus;
use crate::http::content::ContentBuffer;
use crate::http::decode::{self, DecodeError, DEFAULT_CHARSET};
use http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use http::HeaderMap;
use std::fmt::Write as _;

const GZIP: &str = "gzip";

/// Outcome of one request: metadata plus the whole (possibly capped) body.
///
/// Created fresh for every request and fully populated before the executor
/// returns it.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    url: String,
    code: u16,
    status: RequestStatus,
    message: String,
    headers: Option<HeaderMap>,
    content: ContentBuffer,
}

impl HttpResponse {
    /// Create an empty record for `url`.
    ///
    /// The status reads as [`RequestStatus::ErrorIo`] until an exchange
    /// completes.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            code: 0,
            status: RequestStatus::ErrorIo,
            message: String::new(),
            headers: None,
            content: ContentBuffer::new(),
        }
    }

    /// Get the requested address.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Numeric status code, 0 when no response was received.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Record the status code and derive the classified status from it.
    pub fn set_code(&mut self, code: u16) {
        self.code = code;
        self.status = RequestStatus::from_code(code);
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn set_status(&mut self, status: RequestStatus) {
        self.status = status;
    }

    /// True iff the request finished with [`RequestStatus::NoError`].
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Response reason phrase.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// Response headers, `None` when no response was received.
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.headers.as_ref()
    }

    pub fn set_headers(&mut self, headers: HeaderMap) {
        self.headers = Some(headers);
    }

    /// All values of header `key`, in received order.
    pub fn header_field_values(&self, key: &str) -> Vec<String> {
        self.headers
            .as_ref()
            .map(|headers| {
                headers
                    .get_all(key)
                    .iter()
                    .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First value of header `key`, or an empty string.
    pub fn header_field_first_value(&self, key: &str) -> String {
        self.headers
            .as_ref()
            .and_then(|headers| headers.get(key))
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default()
    }

    /// One `key = value` line per header value, in header map order.
    pub fn dump_headers(&self) -> String {
        let mut out = String::new();
        if let Some(headers) = &self.headers {
            for (key, value) in headers.iter() {
                let _ = writeln!(
                    out,
                    "{} = {}",
                    key.as_str(),
                    String::from_utf8_lossy(value.as_bytes())
                );
            }
        }
        out
    }

    pub fn content_length(&self) -> usize {
        self.content.len()
    }

    /// Copy up to `len` body bytes starting at `offset` into `dest`.
    /// See [`ContentBuffer::read_range`].
    pub fn read_content(&self, dest: &mut [u8], offset: usize, len: usize) -> Option<usize> {
        self.content.read_range(dest, offset, len)
    }

    /// Full copy of the body.
    pub fn content(&self) -> Vec<u8> {
        self.content.to_vec()
    }

    pub fn content_bytes(&self) -> &[u8] {
        self.content.as_slice()
    }

    /// Append `buf[..len]` to the body. See [`ContentBuffer::append`].
    pub fn write_content(&mut self, buf: &[u8], len: usize) -> bool {
        self.content.append(buf, len)
    }

    pub fn clean_content(&mut self) {
        self.content.clear();
    }

    /// Body as text, charset taken from `Content-Type` or UTF-8.
    pub fn text(&self) -> Result<String, DecodeError> {
        let content_type = self.header_field_first_value(CONTENT_TYPE.as_str());
        let charset = decode::charset_from_content_type(&content_type).unwrap_or(DEFAULT_CHARSET);
        self.text_with_limit(charset, 0)
    }

    /// Body as text decoded with `charset`.
    ///
    /// Labels resolve by WHATWG rules, so `ISO-8859-1` and `latin1` decode as
    /// windows-1252: bytes 0x80-0x9F become typographic characters rather
    /// than C1 controls.
    pub fn text_with_charset(&self, charset: &str) -> Result<String, DecodeError> {
        self.text_with_limit(charset, 0)
    }

    /// Body as text decoded with `charset`, at most `max_chars` characters
    /// (0 for no limit). Gzip bodies are decompressed first.
    pub fn text_with_limit(&self, charset: &str, max_chars: usize) -> Result<String, DecodeError> {
        let gzip = self
            .header_field_first_value(CONTENT_ENCODING.as_str())
            .trim()
            .eq_ignore_ascii_case(GZIP);
        decode::decode_text(self.content.as_slice(), gzip, charset, max_chars)
    }
}
