use crate::Error;

/// Append-only cursor over caller-owned memory that receives the generated code.
///
/// Every write is bounds-checked; a write that does not fit fails and leaves the buffer untouched.
pub struct CodeBuffer<'a> {
    bytes: &'a mut [u8],
    position: usize,
}

impl<'a> CodeBuffer<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Offset of the next byte to be written
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn remaining(&self) -> usize {
        self.capacity() - self.position
    }

    /// The bytes written so far
    pub fn written(&self) -> &[u8] {
        &self.bytes[..self.position]
    }

    /// Fails unless `len` more bytes fit
    pub fn reserve(&self, len: usize) -> Result<(), Error> {
        if len > self.remaining() {
            return Err(Error::BufferOverflow(len, self.remaining()));
        }
        Ok(())
    }

    /// Appends one little-endian word
    pub fn write_word(&mut self, word: u32) -> Result<(), Error> {
        self.reserve(4)?;
        self.bytes[self.position..self.position + 4].copy_from_slice(&word.to_le_bytes());
        self.position += 4;
        Ok(())
    }
}
