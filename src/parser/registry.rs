//! FourCC type registry
//!
//! Maps the labels the GPS builder cares about to a decode function. Every
//! multi-byte field is big-endian. Labels missing from [`REGISTRY`] decode to
//! [`TelemetryValue::Opaque`] so the walk can carry on.

use crate::conversion::parse_gps_time;
use crate::error::{GpmfError, Result};
use crate::parser::stream::GpmfDataStream;
use crate::types::{
    FourCC, Gps5Sample, GpriSample, KlvRecord, SystSample, TelemetryValue,
};

type DecodeFn = fn(&KlvRecord<'_>) -> Result<TelemetryValue>;

/// One registry entry
pub struct LabelSpec {
    pub fourcc: FourCC,
    pub description: &'static str,
    pub decode: DecodeFn,
}

pub const SCAL: FourCC = FourCC::new(b"SCAL");
pub const GPSU: FourCC = FourCC::new(b"GPSU");
pub const GPSF: FourCC = FourCC::new(b"GPSF");
pub const GPSP: FourCC = FourCC::new(b"GPSP");
pub const GPS5: FourCC = FourCC::new(b"GPS5");
pub const DVNM: FourCC = FourCC::new(b"DVNM");
pub const TMPC: FourCC = FourCC::new(b"TMPC");
pub const TSMP: FourCC = FourCC::new(b"TSMP");
pub const SYST: FourCC = FourCC::new(b"SYST");
pub const GPRI: FourCC = FourCC::new(b"GPRI");

/// Size of one GPS5 element: five signed 32-bit fields
pub const GPS5_ELEMENT_SIZE: usize = 20;

pub static REGISTRY: &[LabelSpec] = &[
    LabelSpec {
        fourcc: SCAL,
        description: "scale divisors",
        decode: decode_scal,
    },
    LabelSpec {
        fourcc: GPSU,
        description: "GPS time anchor",
        decode: decode_gpsu,
    },
    LabelSpec {
        fourcc: GPSF,
        description: "GPS fix",
        decode: decode_gpsf,
    },
    LabelSpec {
        fourcc: GPSP,
        description: "GPS precision (DOP x100)",
        decode: decode_gpsp,
    },
    LabelSpec {
        fourcc: GPS5,
        description: "GPS lat/lon/alt/speed2d/speed3d",
        decode: decode_gps5,
    },
    LabelSpec {
        fourcc: DVNM,
        description: "device name",
        decode: decode_dvnm,
    },
    LabelSpec {
        fourcc: TMPC,
        description: "temperature (C)",
        decode: decode_tmpc,
    },
    LabelSpec {
        fourcc: TSMP,
        description: "total samples",
        decode: decode_tsmp,
    },
    LabelSpec {
        fourcc: SYST,
        description: "system time",
        decode: decode_syst,
    },
    LabelSpec {
        fourcc: GPRI,
        description: "GPS raw (Karma)",
        decode: decode_gpri,
    },
];

pub fn lookup(fourcc: &FourCC) -> Option<&'static LabelSpec> {
    REGISTRY.iter().find(|spec| spec.fourcc == *fourcc)
}

/// Decode a leaf record through the registry
///
/// Unknown labels are not an error: their raw bytes come back as `Opaque`.
pub fn decode_record(record: &KlvRecord<'_>) -> Result<TelemetryValue> {
    match lookup(&record.header.fourcc) {
        Some(spec) => (spec.decode)(record),
        None => Ok(opaque(record)),
    }
}

pub fn opaque(record: &KlvRecord<'_>) -> TelemetryValue {
    TelemetryValue::Opaque {
        type_tag: record.header.type_tag,
        bytes: record.payload.to_vec(),
    }
}

fn invalid(record: &KlvRecord<'_>, reason: String) -> GpmfError {
    GpmfError::InvalidRecord {
        fourcc: record.header.fourcc.to_string(),
        reason,
    }
}

fn require_size(record: &KlvRecord<'_>, sizes: &[usize]) -> Result<usize> {
    let size = record.header.element_size as usize;
    if !sizes.contains(&size) {
        return Err(invalid(
            record,
            format!("element size {} (expected one of {:?})", size, sizes),
        ));
    }
    if record.header.repeat == 0 {
        return Err(invalid(record, "no elements".to_string()));
    }
    Ok(size)
}

fn text(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload)
        .trim_end_matches(['\0', ' '])
        .to_string()
}

fn decode_scal(record: &KlvRecord<'_>) -> Result<TelemetryValue> {
    let size = require_size(record, &[1, 2, 4])?;
    let signed = record.header.type_tag.is_ascii_lowercase();
    let mut stream = GpmfDataStream::new(record.payload);
    let mut values = Vec::with_capacity(record.header.repeat as usize);
    for _ in 0..record.header.repeat {
        let value = match (size, signed) {
            (1, false) => stream.read_byte()? as f64,
            (1, true) => stream.read_byte()? as i8 as f64,
            (2, false) => stream.read_u16_be()? as f64,
            (2, true) => stream.read_u16_be()? as i16 as f64,
            (_, false) => stream.read_u32_be()? as f64,
            (_, true) => stream.read_i32_be()? as f64,
        };
        values.push(value);
    }
    Ok(TelemetryValue::Scale(values))
}

fn decode_gpsu(record: &KlvRecord<'_>) -> Result<TelemetryValue> {
    let raw = std::str::from_utf8(record.payload)?;
    Ok(TelemetryValue::TimeAnchor(parse_gps_time(raw)?))
}

fn decode_gpsf(record: &KlvRecord<'_>) -> Result<TelemetryValue> {
    require_size(record, &[4])?;
    Ok(TelemetryValue::Fix(GpmfDataStream::new(record.payload).read_u32_be()?))
}

fn decode_gpsp(record: &KlvRecord<'_>) -> Result<TelemetryValue> {
    require_size(record, &[2])?;
    Ok(TelemetryValue::Precision(
        GpmfDataStream::new(record.payload).read_u16_be()?,
    ))
}

fn decode_gps5(record: &KlvRecord<'_>) -> Result<TelemetryValue> {
    require_size(record, &[GPS5_ELEMENT_SIZE])?;
    let mut samples = Vec::with_capacity(record.header.repeat as usize);
    for element in record.elements() {
        let mut stream = GpmfDataStream::new(element);
        samples.push(Gps5Sample {
            lat: stream.read_i32_be()?,
            lon: stream.read_i32_be()?,
            alt: stream.read_i32_be()?,
            speed2d: stream.read_i32_be()?,
            speed3d: stream.read_i32_be()?,
        });
    }
    Ok(TelemetryValue::Gps5(samples))
}

fn decode_dvnm(record: &KlvRecord<'_>) -> Result<TelemetryValue> {
    Ok(TelemetryValue::DeviceName(text(record.payload)))
}

fn decode_tmpc(record: &KlvRecord<'_>) -> Result<TelemetryValue> {
    require_size(record, &[4])?;
    Ok(TelemetryValue::Temperature(
        GpmfDataStream::new(record.payload).read_f32_be()?,
    ))
}

fn decode_tsmp(record: &KlvRecord<'_>) -> Result<TelemetryValue> {
    require_size(record, &[4])?;
    Ok(TelemetryValue::SampleCount(
        GpmfDataStream::new(record.payload).read_u32_be()?,
    ))
}

/// Two integers: either two elements of 4/8 bytes, or one element holding both
fn decode_syst(record: &KlvRecord<'_>) -> Result<TelemetryValue> {
    let size = record.header.element_size as usize;
    let width = match (record.header.repeat, size) {
        (r, 4) | (r, 8) if r >= 2 => size,
        (_, 8) | (_, 16) => size / 2,
        _ => {
            return Err(invalid(
                record,
                format!(
                    "cannot split {} x {} bytes into seconds and milliseconds",
                    record.header.repeat, size
                ),
            ))
        }
    };
    let mut stream = GpmfDataStream::new(record.payload);
    let mut read = || -> Result<i64> {
        Ok(match width {
            4 if record.header.type_tag == b'l' => stream.read_i32_be()? as i64,
            4 => stream.read_u32_be()? as i64,
            _ => stream.read_u64_be()? as i64,
        })
    };
    let seconds = read()?;
    let millis = read()?;
    Ok(TelemetryValue::SystemTime(SystSample { seconds, millis }))
}

/// Single sample of signed 32-bit fields: lat, lon, alt, speed, then extras
fn decode_gpri(record: &KlvRecord<'_>) -> Result<TelemetryValue> {
    let size = record.header.element_size as usize;
    if size < 16 || size % 4 != 0 || record.header.repeat == 0 {
        return Err(invalid(
            record,
            format!("element size {} is not 4-byte fields lat/lon/alt/speed", size),
        ));
    }
    let first = record
        .payload
        .get(..size)
        .ok_or_else(|| invalid(record, "payload shorter than one element".to_string()))?;
    let mut stream = GpmfDataStream::new(first);
    let lat = stream.read_i32_be()?;
    let lon = stream.read_i32_be()?;
    let alt = stream.read_i32_be()?;
    let speed = stream.read_i32_be()?;
    let mut extra = Vec::with_capacity(size / 4 - 4);
    while stream.remaining() >= 4 {
        extra.push(stream.read_i32_be()?);
    }
    Ok(TelemetryValue::Gpri(GpriSample {
        lat,
        lon,
        alt,
        speed,
        extra,
    }))
}

/// Best-effort rendering of a record's payload by its type tag, for logs
pub fn describe_payload(record: &KlvRecord<'_>) -> String {
    let type_tag = record.header.type_tag;
    let width = match type_tag {
        b'c' | b'U' => return format!("{:?}", text(record.payload)),
        b'b' | b'B' => 1,
        b's' | b'S' => 2,
        b'l' | b'L' | b'f' => 4,
        _ => return opaque(record).preview(),
    };

    let mut stream = GpmfDataStream::new(record.payload);
    let total = record.payload.len() / width;
    let shown = total.min(16);
    let mut values = Vec::with_capacity(shown);
    for _ in 0..shown {
        let value = match type_tag {
            b'b' => stream.read_byte().map(|v| (v as i8).to_string()),
            b'B' => stream.read_byte().map(|v| v.to_string()),
            b's' => stream.read_u16_be().map(|v| (v as i16).to_string()),
            b'S' => stream.read_u16_be().map(|v| v.to_string()),
            b'l' => stream.read_i32_be().map(|v| v.to_string()),
            b'L' => stream.read_u32_be().map(|v| v.to_string()),
            _ => stream.read_f32_be().map(|v| v.to_string()),
        };
        match value {
            Ok(v) => values.push(v),
            Err(_) => break,
        }
    }

    if total > shown {
        format!("[{} ...] ({} values)", values.join(", "), total)
    } else {
        format!("[{}]", values.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KlvHeader;
    use chrono::{Datelike, Timelike};

    fn record<'a>(label: &[u8; 4], type_tag: u8, size: u8, repeat: u16, payload: &'a [u8]) -> KlvRecord<'a> {
        KlvRecord {
            header: KlvHeader {
                fourcc: FourCC::new(label),
                type_tag,
                element_size: size,
                repeat,
            },
            offset: 0,
            depth: 0,
            payload,
        }
    }

    #[test]
    fn test_registry_has_unique_labels() {
        for (i, a) in REGISTRY.iter().enumerate() {
            for b in &REGISTRY[i + 1..] {
                assert_ne!(a.fourcc, b.fourcc);
            }
        }
        assert!(lookup(&GPS5).is_some());
        assert!(lookup(&FourCC::new(b"ACCL")).is_none());
    }

    #[test]
    fn test_decode_scal_u16_and_i32() {
        let payload = [0, 1, 0, 10, 0x27, 0x10];
        let value = decode_record(&record(b"SCAL", b'S', 2, 3, &payload)).unwrap();
        assert_eq!(value, TelemetryValue::Scale(vec![1.0, 10.0, 10000.0]));

        let payload: Vec<u8> = [10_000_000i32, 1000]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect();
        let value = decode_record(&record(b"SCAL", b'l', 4, 2, &payload)).unwrap();
        assert_eq!(value, TelemetryValue::Scale(vec![10_000_000.0, 1000.0]));
    }

    #[test]
    fn test_decode_scal_rejects_odd_size() {
        let payload = [0u8; 3];
        assert!(matches!(
            decode_record(&record(b"SCAL", b'?', 3, 1, &payload)),
            Err(GpmfError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_decode_gpsu() {
        let value = decode_record(&record(b"GPSU", b'U', 16, 1, b"200314123456.789")).unwrap();
        match value {
            TelemetryValue::TimeAnchor(t) => {
                assert_eq!((t.year(), t.month(), t.day()), (2020, 3, 14));
                assert_eq!((t.hour(), t.minute(), t.second()), (12, 34, 56));
                assert_eq!(t.timestamp_subsec_millis(), 789);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_fix_precision_temperature_counter() {
        assert_eq!(
            decode_record(&record(b"GPSF", b'L', 4, 1, &3u32.to_be_bytes())).unwrap(),
            TelemetryValue::Fix(3)
        );
        assert_eq!(
            decode_record(&record(b"GPSP", b'S', 2, 1, &1234u16.to_be_bytes())).unwrap(),
            TelemetryValue::Precision(1234)
        );
        assert_eq!(
            decode_record(&record(b"TMPC", b'f', 4, 1, &41.5f32.to_be_bytes())).unwrap(),
            TelemetryValue::Temperature(41.5)
        );
        assert_eq!(
            decode_record(&record(b"TSMP", b'L', 4, 1, &90u32.to_be_bytes())).unwrap(),
            TelemetryValue::SampleCount(90)
        );
    }

    #[test]
    fn test_decode_gps5_burst() {
        let payload: Vec<u8> = [100i32, 200, 300, 10, 12, -1, -2, -3, 0, 0]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect();
        let value = decode_record(&record(b"GPS5", b'l', 20, 2, &payload)).unwrap();
        match value {
            TelemetryValue::Gps5(samples) => {
                assert_eq!(samples.len(), 2);
                assert_eq!(samples[0].fields(), [100, 200, 300, 10, 12]);
                assert_eq!(samples[1].lat, -1);
                assert_eq!(samples[1].alt, -3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_gps5_wrong_shape() {
        let payload = [0u8; 16];
        assert!(matches!(
            decode_record(&record(b"GPS5", b'l', 16, 1, &payload)),
            Err(GpmfError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_decode_dvnm_trims_padding() {
        assert_eq!(
            decode_record(&record(b"DVNM", b'c', 1, 12, b"Camera\0\0\0\0\0\0")).unwrap(),
            TelemetryValue::DeviceName("Camera".to_string())
        );
    }

    #[test]
    fn test_decode_syst_layouts() {
        let two_elements: Vec<u8> = [1_550_000_000u32, 250]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect();
        assert_eq!(
            decode_record(&record(b"SYST", b'L', 4, 2, &two_elements)).unwrap(),
            TelemetryValue::SystemTime(SystSample {
                seconds: 1_550_000_000,
                millis: 250
            })
        );

        let one_element: Vec<u8> = [60u64, 5]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect();
        assert_eq!(
            decode_record(&record(b"SYST", b'?', 16, 1, &one_element)).unwrap(),
            TelemetryValue::SystemTime(SystSample {
                seconds: 60,
                millis: 5
            })
        );
    }

    #[test]
    fn test_decode_gpri() {
        let payload: Vec<u8> = [473_000_000i32, 190_000_000, 150_000, 500, 7]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect();
        match decode_record(&record(b"GPRI", b'?', 20, 1, &payload)).unwrap() {
            TelemetryValue::Gpri(sample) => {
                assert_eq!(sample.lat, 473_000_000);
                assert_eq!(sample.speed, 500);
                assert_eq!(sample.extra, vec![7]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_label_is_opaque() {
        let payload = [1u8, 2, 3, 4];
        assert_eq!(
            decode_record(&record(b"ACCL", b's', 2, 2, &payload)).unwrap(),
            TelemetryValue::Opaque {
                type_tag: b's',
                bytes: vec![1, 2, 3, 4]
            }
        );
    }

    #[test]
    fn test_describe_payload() {
        let payload: Vec<u8> = [1i16, -2, 3].iter().flat_map(|v| v.to_be_bytes()).collect();
        assert_eq!(
            describe_payload(&record(b"ACCL", b's', 6, 1, &payload)),
            "[1, -2, 3]"
        );
        assert_eq!(
            describe_payload(&record(b"STNM", b'c', 1, 3, b"GPS")),
            "\"GPS\""
        );
    }
}
