use crate::types::{BuildStats, DecodeStats, GpsPoint};
use chrono::{DateTime, Duration, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Device name used until a DVNM record is seen
pub const UNKNOWN_DEVICE: &str = "Unknown";

/// GPS track reconstructed from one or more GPMF streams
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    /// Source file names in decode order
    pub sources: Vec<String>,
    pub device_name: String,
    /// First GPSU anchor seen, if any
    pub start_time: Option<DateTime<Utc>>,
    pub points: Vec<GpsPoint>,
    pub stats: BuildStats,
    pub decode_stats: DecodeStats,
}

impl Track {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            sources: vec![source.into()],
            device_name: UNKNOWN_DEVICE.to_string(),
            start_time: None,
            points: Vec::new(),
            stats: BuildStats::default(),
            decode_stats: DecodeStats::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Explicit start time, falling back to the first point
    pub fn effective_start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
            .or_else(|| self.points.first().map(|p| p.timestamp))
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|p| p.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|p| p.timestamp)
    }

    /// Time between the first and last point
    pub fn duration(&self) -> Duration {
        match (self.first_timestamp(), self.last_timestamp()) {
            (Some(first), Some(last)) => last - first,
            _ => Duration::zero(),
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration()
            .num_microseconds()
            .map(|us| us as f64 / 1_000_000.0)
            .unwrap_or(0.0)
    }

    /// Highest 2D speed in m/s
    pub fn max_speed(&self) -> Option<f64> {
        self.points.iter().map(|p| p.speed).reduce(f64::max)
    }

    /// Lowest and highest elevation in metres
    pub fn elevation_range(&self) -> Option<(f64, f64)> {
        let mut iter = self.points.iter().map(|p| p.elevation);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), e| (lo.min(e), hi.max(e))))
    }

    /// Concatenate the next chapter's points after this track's
    ///
    /// No merging or re-sorting happens: callers pass chapters in recording
    /// order. The start time and device name of the first track win.
    pub fn append(&mut self, mut other: Track) {
        if self.start_time.is_none() {
            self.start_time = other.start_time;
        }
        if self.device_name == UNKNOWN_DEVICE {
            self.device_name = other.device_name.clone();
            self.stats.device_name = other.device_name.clone();
        }
        self.sources.append(&mut other.sources);
        self.points.append(&mut other.points);
        self.stats.merge(&other.stats);
        self.decode_stats.records += other.decode_stats.records;
        self.decode_stats.containers += other.decode_stats.containers;
        self.decode_stats.opaque += other.decode_stats.opaque;
        self.decode_stats.malformed += other.decode_stats.malformed;
        self.decode_stats.trailing_bytes += other.decode_stats.trailing_bytes;
    }
}
