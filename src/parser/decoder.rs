//! Telemetry decoder
//!
//! Flattens the KLV tree into typed events in source byte order. Containers
//! only steer the walk and are never emitted.

use crate::parser::klv::KlvReader;
use crate::parser::registry::{decode_record, describe_payload, lookup, opaque};
use crate::types::{DecodeStats, KlvRecord, TelemetryEvent, TelemetryValue};
use log::{debug, warn};

/// Iterator of [`TelemetryEvent`]s over one GPMF buffer
///
/// A truncated tail ends the sequence quietly. Records whose payload does not
/// match the shape registered for their label are passed on as `Opaque` and
/// counted as malformed.
pub struct TelemetryDecoder<'a> {
    reader: KlvReader<'a>,
    stats: DecodeStats,
}

impl<'a> TelemetryDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_offset(data, 0)
    }

    pub fn with_offset(data: &'a [u8], offset: usize) -> Self {
        Self {
            reader: KlvReader::new(data, offset),
            stats: DecodeStats::default(),
        }
    }

    pub fn into_stats(self) -> DecodeStats {
        self.stats
    }

    fn decode_leaf(&mut self, record: &KlvRecord<'a>) -> TelemetryEvent {
        let fourcc = record.header.fourcc;
        let data = match decode_record(record) {
            Ok(value) => value,
            Err(err) => {
                warn!("{} at offset {}: {}", fourcc, record.offset, err);
                self.stats.malformed += 1;
                opaque(record)
            }
        };
        if matches!(data, TelemetryValue::Opaque { .. }) {
            self.stats.opaque += 1;
        }
        debug!(
            "{:>8} {}{} -> {}",
            record.offset,
            "  ".repeat(record.depth),
            fourcc,
            data.preview()
        );
        TelemetryEvent { fourcc, data }
    }
}

impl<'a> Iterator for TelemetryDecoder<'a> {
    type Item = TelemetryEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.reader.next()? {
                Ok(record) => record,
                Err(err) => {
                    self.stats.trailing_bytes = self.reader.trailing_bytes();
                    if err.is_truncation() {
                        debug!("End of telemetry stream: {}", err);
                    } else {
                        warn!("Stopped decoding telemetry: {}", err);
                    }
                    return None;
                }
            };

            self.stats.records += 1;
            if record.header.is_container() {
                self.stats.containers += 1;
                debug!(
                    "{:>8} {}{} ({} bytes)",
                    record.offset,
                    "  ".repeat(record.depth),
                    record.header.fourcc,
                    record.payload.len()
                );
                continue;
            }

            return Some(self.decode_leaf(&record));
        }
    }
}

/// Decode a whole buffer into its event sequence and decode counters
pub fn decode_telemetry(data: &[u8]) -> (Vec<TelemetryEvent>, DecodeStats) {
    let mut decoder = TelemetryDecoder::new(data);
    let events: Vec<TelemetryEvent> = decoder.by_ref().collect();
    (events, decoder.into_stats())
}

/// Render every record, containers included, as one line of text
///
/// Lines look like `    GPSF L 4x1 3` with two spaces of indent per nesting
/// level. Known labels show their decoded value, other typed payloads a
/// generic rendering.
pub fn format_klv_log(data: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut reader = KlvReader::new(data, 0);

    for item in reader.by_ref() {
        let record = match item {
            Ok(record) => record,
            Err(err) => {
                lines.push(format!("-- end of stream: {}", err));
                break;
            }
        };

        let header = &record.header;
        let indent = "  ".repeat(record.depth);
        if header.is_container() {
            lines.push(format!(
                "{}{} {} {}x{}",
                indent,
                header.fourcc,
                header.type_char(),
                header.element_size,
                header.repeat
            ));
            continue;
        }

        let value = if lookup(&header.fourcc).is_some() {
            match decode_record(&record) {
                Ok(value) => value.preview(),
                Err(err) => format!("<{}>", err),
            }
        } else {
            describe_payload(&record)
        };
        lines.push(format!(
            "{}{} {} {}x{} {}",
            indent,
            header.fourcc,
            header.type_char(),
            header.element_size,
            header.repeat,
            value
        ));
    }

    if reader.trailing_bytes() > 0 {
        lines.push(format!("-- {} trailing bytes", reader.trailing_bytes()));
    }
    lines
}
