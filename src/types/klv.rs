use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Type tag of a container record: its payload is a sequence of records
pub const TYPE_NESTED: u8 = 0;

/// Size in bytes of a KLV header (label, type, element size, repeat)
pub const KLV_HEADER_LEN: usize = 8;

/// Four-character record label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Fixed 8-byte KLV header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KlvHeader {
    pub fourcc: FourCC,
    pub type_tag: u8,
    pub element_size: u8,
    pub repeat: u16,
}

impl KlvHeader {
    /// Declared payload length, excluding alignment padding
    pub fn payload_len(&self) -> usize {
        self.element_size as usize * self.repeat as usize
    }

    pub fn is_container(&self) -> bool {
        self.type_tag == TYPE_NESTED
    }

    /// Type tag as printed in decode logs; containers print as `0`
    pub fn type_char(&self) -> char {
        if self.is_container() {
            '0'
        } else if self.type_tag.is_ascii_graphic() {
            self.type_tag as char
        } else {
            '?'
        }
    }
}

/// One record produced by the KLV reader
///
/// Containers are yielded too (before their children) so the decode log can
/// show the full tree; `payload` then holds the raw nested bytes.
#[derive(Debug, Clone, Copy)]
pub struct KlvRecord<'a> {
    pub header: KlvHeader,
    /// Offset of the header within the source buffer
    pub offset: usize,
    /// Nesting depth, 0 for top-level records
    pub depth: usize,
    pub payload: &'a [u8],
}

impl KlvRecord<'_> {
    /// Payload split into `repeat` elements of `element_size` bytes
    pub fn elements(&self) -> impl Iterator<Item = &[u8]> {
        let size = (self.header.element_size as usize).max(1);
        self.payload.chunks_exact(size)
    }
}
