use crate::error::{GpmfError, Result};

/// Big-endian cursor over a GPMF byte buffer
pub struct GpmfDataStream<'a> {
    data: &'a [u8],
    pub pos: usize,
    end: usize,
    pub eof: bool,
}

impl<'a> GpmfDataStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len(),
            eof: data.is_empty(),
        }
    }

    /// Cursor over `data[start..end]`, positions stay absolute
    pub fn with_bounds(data: &'a [u8], start: usize, end: usize) -> Self {
        let end = end.min(data.len());
        Self {
            data,
            pos: start.min(end),
            end,
            eof: start >= end,
        }
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.end);
        self.eof = self.pos >= self.end;
    }

    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    fn ensure(&mut self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            self.eof = true;
            return Err(GpmfError::Truncated {
                offset: self.pos,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Borrow the next `len` bytes and advance past them
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        self.eof = self.pos >= self.end;
        Ok(bytes)
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32_be(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64_be(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_f32_be(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    /// Skip `len` bytes without interpreting them
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Consume the padding that aligns a payload of `payload_len` bytes to 4
    ///
    /// A stream that ends inside the padding is accepted.
    pub fn skip_padding(&mut self, payload_len: usize) {
        let padding = padding_for(payload_len);
        let new_pos = (self.pos + padding).min(self.end);
        self.set_position(new_pos);
    }
}

/// Bytes needed after a payload to reach the next 4-byte boundary
pub fn padding_for(payload_len: usize) -> usize {
    (4 - payload_len % 4) % 4
}
