//! Caller-owned response buffer.

/// Fixed-capacity byte buffer the engine writes each step payload into.
///
/// Allocated once and never resized: the native engine holds a raw pointer
/// to it for the duration of a step call.  The payload is NUL-terminated;
/// [`payload`](Self::payload) returns the bytes before the first NUL.
#[derive(Debug)]
pub struct ResponseBuffer {
    data: Box<[u8]>,
}

impl ResponseBuffer {
    /// Allocate a zeroed buffer of `capacity` bytes (at least one, for the
    /// terminator).
    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: vec![0u8; capacity.max(1)].into_boxed_slice() }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes written by the last step, up to the first NUL.
    pub fn payload(&self) -> &[u8] {
        let end = self.data.iter().position(|&b| b == 0).unwrap_or(self.data.len());
        &self.data[..end]
    }

    /// Zero the leading byte so the buffer reads as empty.
    pub fn clear(&mut self) {
        self.data[0] = 0;
    }

    /// Copy `bytes` in, NUL-terminated.  Anything beyond `capacity - 1`
    /// bytes is cut, like an engine overrunning a short buffer.  Returns the
    /// number of payload bytes kept.
    pub fn fill(&mut self, bytes: &[u8]) -> usize {
        let kept = bytes.len().min(self.data.len() - 1);
        self.data[..kept].copy_from_slice(&bytes[..kept]);
        self.data[kept] = 0;
        kept
    }

    /// Raw pointer handed to the engine.
    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.data.as_mut_ptr()
    }
}
