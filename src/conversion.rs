//! Unit and value conversions for GPMF telemetry
//!
//! Scale application, time anchor parsing and the human-readable labels used
//! in diagnostics.

use crate::error::{GpmfError, Result};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

/// Parse a GPSU anchor such as `240101123059.250` (YYMMDDHHMMSS.fff) as UTC
pub fn parse_gps_time(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    let naive = NaiveDateTime::parse_from_str(trimmed, "%y%m%d%H%M%S%.f")
        .map_err(|_| GpmfError::InvalidTimestamp(raw.to_string()))?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Divide raw integer fields by the matching scale components
///
/// A single-element scale applies to every field. A longer scale must cover
/// every field, and no component may be zero.
pub fn apply_scale(fourcc: &str, raw: &[i64], scale: &[f64]) -> Result<Vec<f64>> {
    let divisor = |i: usize| -> Result<f64> {
        let d = match scale.len() {
            0 => 1.0,
            1 => scale[0],
            n if i < n => scale[i],
            n => {
                return Err(GpmfError::InvalidScale {
                    fourcc: fourcc.to_string(),
                    reason: format!("scale has {} components, record has {} fields", n, raw.len()),
                })
            }
        };
        if d == 0.0 || !d.is_finite() {
            return Err(GpmfError::InvalidScale {
                fourcc: fourcc.to_string(),
                reason: format!("scale component {} is {}", i, d),
            });
        }
        Ok(d)
    };

    raw.iter()
        .enumerate()
        .map(|(i, &value)| Ok(value as f64 / divisor(i)?))
        .collect()
}

/// Timestamp of a scaled SYST record: seconds since the epoch plus milliseconds
pub fn system_time_to_utc(seconds: f64, millis: f64) -> Option<DateTime<Utc>> {
    let micros = (seconds * 1_000_000.0 + millis * 1_000.0).round();
    if !micros.is_finite() || micros < 0.0 || micros > i64::MAX as f64 {
        return None;
    }
    Utc.timestamp_opt(0, 0)
        .single()?
        .checked_add_signed(Duration::microseconds(micros as i64))
}

/// Offset of sample `index` within a burst of `len` samples spanning one second
pub fn burst_offset(index: usize, len: usize) -> Duration {
    if len == 0 {
        return Duration::zero();
    }
    Duration::microseconds((index as i64 * 1_000_000) / len as i64)
}

/// Quality band of a GPSP value (dilution of precision x100)
pub fn dop_label(dop: u16) -> &'static str {
    match dop {
        0..=99 => "Ideal",
        100..=199 => "Excellent",
        200..=499 => "Good",
        500..=999 => "Moderate",
        1000..=1999 => "Fair",
        _ => "Poor",
    }
}

/// ISO-8601 UTC timestamp with microseconds, as written to GPX
pub fn format_utc_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// DashWare CSV time column: `2014/05/30 20:11:17.200`
pub fn format_csv_time(time: &DateTime<Utc>) -> String {
    time.format("%Y/%m/%d %H:%M:%S%.3f").to_string()
}

/// Convert m/s to km/h
pub fn mps_to_kmh(speed: f64) -> f64 {
    speed * 3.6
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_gps_time() {
        let t = parse_gps_time("240101123059.250").unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2024, 1, 1));
        assert_eq!((t.hour(), t.minute(), t.second()), (12, 30, 59));
        assert_eq!(t.timestamp_subsec_millis(), 250);

        // GPSU payloads are 16 bytes and may carry NUL padding
        let padded = parse_gps_time("190217101500.000\0").unwrap();
        assert_eq!(padded.year(), 2019);

        assert!(matches!(
            parse_gps_time("not a time"),
            Err(GpmfError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_apply_scale_per_field() {
        let scaled = apply_scale("GPS5", &[473_000_000, 190_000_000, 150_000, 1_000, 1_200], &[
            10_000_000.0,
            10_000_000.0,
            1000.0,
            1000.0,
            100.0,
        ])
        .unwrap();
        assert_eq!(scaled, vec![47.3, 19.0, 150.0, 1.0, 12.0]);
    }

    #[test]
    fn test_apply_scale_broadcast_and_unity() {
        assert_eq!(apply_scale("X", &[10, 20], &[10.0]).unwrap(), vec![1.0, 2.0]);
        assert_eq!(apply_scale("X", &[10, 20], &[]).unwrap(), vec![10.0, 20.0]);
    }

    #[test]
    fn test_apply_scale_rejects_zero_and_short_scale() {
        assert!(matches!(
            apply_scale("GPS5", &[1, 2, 3], &[1.0, 0.0, 1.0]),
            Err(GpmfError::InvalidScale { .. })
        ));
        assert!(matches!(
            apply_scale("GPS5", &[1, 2, 3, 4, 5], &[1.0, 1.0, 1.0]),
            Err(GpmfError::InvalidScale { .. })
        ));
    }

    #[test]
    fn test_burst_offset() {
        assert_eq!(burst_offset(0, 18), Duration::zero());
        assert_eq!(burst_offset(9, 18), Duration::milliseconds(500));
        assert_eq!(burst_offset(1, 18), Duration::microseconds(55_555));
        assert_eq!(burst_offset(3, 0), Duration::zero());
    }

    #[test]
    fn test_system_time_to_utc() {
        let t = system_time_to_utc(1_550_000_000.0, 250.0).unwrap();
        assert_eq!(t.timestamp(), 1_550_000_000);
        assert_eq!(t.timestamp_subsec_millis(), 250);
        assert!(system_time_to_utc(-5.0, 0.0).is_none());
    }

    #[test]
    fn test_system_time_past_max_date() {
        // Representable as i64 microseconds, but beyond the last valid date
        assert!(system_time_to_utc(9_000_000_000_000.0, 1.0).is_none());
        assert!(system_time_to_utc(f64::MAX, 0.0).is_none());
        assert!(system_time_to_utc(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_dop_label() {
        assert_eq!(dop_label(50), "Ideal");
        assert_eq!(dop_label(150), "Excellent");
        assert_eq!(dop_label(499), "Good");
        assert_eq!(dop_label(500), "Moderate");
        assert_eq!(dop_label(1500), "Fair");
        assert_eq!(dop_label(9999), "Poor");
    }

    #[test]
    fn test_time_formats() {
        let t = parse_gps_time("240101000000.500").unwrap();
        assert_eq!(format_utc_time(&t), "2024-01-01T00:00:00.500000Z");
        assert_eq!(format_csv_time(&t), "2024/01/01 00:00:00.500");
        assert!((mps_to_kmh(10.0) - 36.0).abs() < 1e-9);
    }
}
