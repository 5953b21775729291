use crate::types::klv::FourCC;
use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Raw GPS5 sample: latitude, longitude, altitude, 2D speed, 3D speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gps5Sample {
    pub lat: i32,
    pub lon: i32,
    pub alt: i32,
    pub speed2d: i32,
    pub speed3d: i32,
}

impl Gps5Sample {
    pub fn fields(&self) -> [i32; 5] {
        [self.lat, self.lon, self.alt, self.speed2d, self.speed3d]
    }

    /// All three position fields are exactly zero
    pub fn is_empty(&self) -> bool {
        self.lat == 0 && self.lon == 0 && self.alt == 0
    }
}

/// Raw GPRI sample written by the Karma drone family
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpriSample {
    pub lat: i32,
    pub lon: i32,
    pub alt: i32,
    pub speed: i32,
    /// Trailing fields the record carries beyond the four above
    pub extra: Vec<i32>,
}

impl GpriSample {
    pub fn fields(&self) -> Vec<i32> {
        let mut fields = vec![self.lat, self.lon, self.alt, self.speed];
        fields.extend_from_slice(&self.extra);
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.lat == 0 && self.lon == 0 && self.alt == 0
    }
}

/// Raw SYST record: seconds and milliseconds, still unscaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SystSample {
    pub seconds: i64,
    pub millis: i64,
}

/// Decoded value of one telemetry record, one variant per known label
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TelemetryValue {
    /// SCAL: per-field divisors for the following record
    Scale(Vec<f64>),
    /// GPSU: absolute time anchor
    TimeAnchor(DateTime<Utc>),
    /// GPSF: raw fix quality (0 none, 2 2D, 3 3D)
    Fix(u32),
    /// GPSP: dilution of precision x100
    Precision(u16),
    /// GPS5: burst of position samples
    Gps5(Vec<Gps5Sample>),
    /// DVNM: device name
    DeviceName(String),
    /// TMPC: temperature in degrees Celsius
    Temperature(f32),
    /// TSMP: total samples delivered so far
    SampleCount(u32),
    /// SYST: system time record
    SystemTime(SystSample),
    /// GPRI: single GPS sample
    Gpri(GpriSample),
    /// Anything the registry does not know, kept as raw bytes
    Opaque { type_tag: u8, bytes: Vec<u8> },
}

impl TelemetryValue {
    /// Short rendering for decode logs
    pub fn preview(&self) -> String {
        match self {
            TelemetryValue::Scale(values) => format!("{:?}", values),
            TelemetryValue::TimeAnchor(time) => time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            TelemetryValue::Fix(fix) => fix.to_string(),
            TelemetryValue::Precision(dop) => dop.to_string(),
            TelemetryValue::Gps5(samples) => match samples.first() {
                Some(first) => format!("{} samples, first {:?}", samples.len(), first.fields()),
                None => "0 samples".to_string(),
            },
            TelemetryValue::DeviceName(name) => format!("{:?}", name),
            TelemetryValue::Temperature(t) => format!("{:.2}", t),
            TelemetryValue::SampleCount(n) => n.to_string(),
            TelemetryValue::SystemTime(syst) => format!("{}s {}ms", syst.seconds, syst.millis),
            TelemetryValue::Gpri(sample) => format!("{:?}", sample.fields()),
            TelemetryValue::Opaque { bytes, .. } => {
                let shown: Vec<String> = bytes.iter().take(16).map(|b| format!("{:02X}", b)).collect();
                if bytes.len() > 16 {
                    format!("[{} ...] ({} bytes)", shown.join(" "), bytes.len())
                } else {
                    format!("[{}]", shown.join(" "))
                }
            }
        }
    }
}

/// One decoded label/value pair, in stream order
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TelemetryEvent {
    pub fourcc: FourCC,
    pub data: TelemetryValue,
}

/// Counters describing one pass of the telemetry decoder
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecodeStats {
    pub records: u32,
    pub containers: u32,
    pub opaque: u32,
    pub malformed: u32,
    /// Bytes left over when the stream ended mid-record
    pub trailing_bytes: usize,
}
