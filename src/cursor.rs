//! Positional reader over an immutable byte buffer.

use crate::error::{Error, Result};

/// Reads fixed-width fields out of an archive image.
///
/// The position may be moved past the end of the buffer with [`seek`] or
/// [`set_position`]; only reads check bounds.
///
/// [`seek`]: ByteCursor::seek
/// [`set_position`]: ByteCursor::set_position
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Borrows the next `n` bytes or fails with [`Error::Truncated`].
    fn window(&self, n: usize) -> Result<&'a [u8]> {
        let end = self.position.checked_add(n);
        match end {
            Some(end) if end <= self.data.len() => Ok(&self.data[self.position..end]),
            _ => Err(Error::Truncated {
                offset: self.position,
                needed: n,
                available: self.remaining_size(),
            }),
        }
    }

    /// Consumes `n` bytes and returns the text before the first NUL.
    ///
    /// Bytes are taken as raw character codes, not UTF-8.
    pub fn read_fixed_string(&mut self, n: usize) -> Result<String> {
        let field = self.window(n)?;
        self.seek(n);
        Ok(field
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| char::from(b))
            .collect())
    }

    /// Copies the next `n` bytes out of the buffer.
    pub fn read_buffer(&mut self, n: usize) -> Result<Vec<u8>> {
        let bytes = self.window(n)?.to_vec();
        self.seek(n);
        Ok(bytes)
    }

    pub fn seek(&mut self, n: usize) {
        self.position = self.position.saturating_add(n);
    }

    /// Little-endian u32 at the current position, without advancing.
    pub fn peek_u32(&self) -> Result<u32> {
        let bytes = self.window(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn remaining_size(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }
}
