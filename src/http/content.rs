//! In-memory response body storage.

use bytes::BytesMut;

/// Append-only byte accumulator holding a whole response body.
///
/// Bytes are stored contiguously and addressed by offset. The executor fills
/// it while streaming and never touches it again once the response has been
/// handed to the caller.
#[derive(Debug, Clone, Default)]
pub struct ContentBuffer {
    data: BytesMut,
}

impl ContentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
        }
    }

    /// Append the first `len` bytes of `buf`.
    ///
    /// Returns `false` and leaves the buffer untouched when `len` exceeds
    /// the data actually supplied.
    pub fn append(&mut self, buf: &[u8], len: usize) -> bool {
        if buf.len() < len {
            return false;
        }
        self.data.extend_from_slice(&buf[..len]);
        true
    }

    /// Copy up to `len` bytes starting at `offset` into `dest`.
    ///
    /// Returns `None` when `offset` is past the end or `dest` cannot hold
    /// `len` bytes. A range running past the end is clamped and the clamped
    /// count is returned.
    pub fn read_range(&self, dest: &mut [u8], offset: usize, len: usize) -> Option<usize> {
        let size = self.data.len();
        if offset > size || dest.len() < len {
            return None;
        }
        let n = len.min(size - offset);
        dest[..n].copy_from_slice(&self.data[offset..offset + n]);
        Some(n)
    }

    /// Full copy of the accumulated bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
