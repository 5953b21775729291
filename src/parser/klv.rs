//! KLV record reader
//!
//! Walks a GPMF buffer depth-first. Every record is 8 header bytes (label,
//! type, element size, big-endian repeat count) followed by
//! `element_size * repeat` payload bytes padded to a 4-byte boundary.
//! Records of type 0 are containers whose payload is itself a record
//! sequence; the reader yields the container and then descends into it.

use crate::error::Result;
use crate::parser::stream::{padding_for, GpmfDataStream};
use crate::types::{FourCC, KlvHeader, KlvRecord, KLV_HEADER_LEN};

/// Lazy, finite iterator over the records of a buffer
///
/// Yields `Err` at most once (the buffer ended inside a header or payload)
/// and then stops. Not restartable: build a new reader to walk again.
pub struct KlvReader<'a> {
    data: &'a [u8],
    pos: usize,
    /// End offsets of the containers currently being walked, innermost last
    open: Vec<usize>,
    finished: bool,
    trailing_bytes: usize,
}

impl<'a> KlvReader<'a> {
    pub fn new(data: &'a [u8], offset: usize) -> Self {
        Self {
            data,
            pos: offset.min(data.len()),
            open: Vec::new(),
            finished: false,
            trailing_bytes: 0,
        }
    }

    /// Bytes that could not be read as a complete record
    pub fn trailing_bytes(&self) -> usize {
        self.trailing_bytes
    }

    fn limit(&self) -> usize {
        self.open.last().copied().unwrap_or(self.data.len())
    }

    fn read_header(stream: &mut GpmfDataStream<'_>) -> Result<KlvHeader> {
        let fourcc = FourCC(stream.read_array::<4>()?);
        let type_tag = stream.read_byte()?;
        let element_size = stream.read_byte()?;
        let repeat = stream.read_u16_be()?;
        Ok(KlvHeader {
            fourcc,
            type_tag,
            element_size,
            repeat,
        })
    }

    fn read_record(&mut self) -> Result<KlvRecord<'a>> {
        let limit = self.limit();
        let offset = self.pos;
        let mut stream = GpmfDataStream::with_bounds(self.data, offset, limit);

        let header = Self::read_header(&mut stream)?;
        let payload_len = header.payload_len();
        let depth = self.open.len();

        // A cut-off container is still walked: its complete children are
        // kept and the walk ends at the first incomplete one.
        let available = stream.remaining();
        if header.is_container() && available < payload_len {
            let payload = stream.read_bytes(available)?;
            self.open.push(limit);
            self.pos = offset + KLV_HEADER_LEN;
            return Ok(KlvRecord {
                header,
                offset,
                depth,
                payload,
            });
        }

        let payload = stream.read_bytes(payload_len)?;
        if header.is_container() {
            let end = (stream.pos + padding_for(payload_len)).min(limit);
            self.open.push(end);
            self.pos = offset + KLV_HEADER_LEN;
        } else {
            stream.skip_padding(payload_len);
            self.pos = stream.pos;
        }

        Ok(KlvRecord {
            header,
            offset,
            depth,
            payload,
        })
    }
}

impl<'a> Iterator for KlvReader<'a> {
    type Item = Result<KlvRecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        // Leave every container whose payload has been consumed
        while let Some(&end) = self.open.last() {
            if self.pos < end {
                break;
            }
            self.open.pop();
            self.pos = self.pos.max(end);
        }

        if self.pos >= self.data.len() {
            self.finished = true;
            return None;
        }

        match self.read_record() {
            Ok(record) => Some(Ok(record)),
            Err(err) => {
                self.finished = true;
                self.trailing_bytes = self.data.len() - self.pos;
                Some(Err(err))
            }
        }
    }
}

/// Collect every record until the end of the buffer or the first truncation
///
/// Truncation is the normal end of device-written streams, so it is not an
/// error here; any other failure is.
pub fn read_all_records(data: &[u8]) -> Result<Vec<KlvRecord<'_>>> {
    let mut records = Vec::new();
    for item in KlvReader::new(data, 0) {
        match item {
            Ok(record) => records.push(record),
            Err(err) if err.is_truncation() => break,
            Err(err) => return Err(err),
        }
    }
    Ok(records)
}

/// Returns true when the buffer starts with something that parses as a record
pub fn looks_like_gpmf(data: &[u8]) -> bool {
    match KlvReader::new(data, 0).next() {
        Some(Ok(record)) => record
            .header
            .fourcc
            .as_bytes()
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || *b == b' '),
        _ => false,
    }
}
