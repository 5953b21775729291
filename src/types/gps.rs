use chrono::{DateTime, Utc};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// GPS fix quality as reported by GPSF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GpsFix {
    #[default]
    NoLock,
    Lock2D,
    Lock3D,
    Other(u32),
}

impl GpsFix {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => GpsFix::NoLock,
            2 => GpsFix::Lock2D,
            3 => GpsFix::Lock3D,
            other => GpsFix::Other(other),
        }
    }

    pub fn raw(&self) -> u32 {
        match self {
            GpsFix::NoLock => 0,
            GpsFix::Lock2D => 2,
            GpsFix::Lock3D => 3,
            GpsFix::Other(raw) => *raw,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GpsFix::NoLock => "no lock",
            GpsFix::Lock2D => "2D lock",
            GpsFix::Lock3D => "3D lock",
            GpsFix::Other(_) => "unknown",
        }
    }
}

impl fmt::Display for GpsFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.raw(), self.label())
    }
}

/// A reconstructed, scaled and timestamped GPS fix
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Metres above the WGS84 ellipsoid
    pub elevation: f64,
    pub timestamp: DateTime<Utc>,
    /// 2D ground speed in m/s
    pub speed: f64,
    pub speed3d: Option<f64>,
    pub temperature: Option<f32>,
    /// Dilution of precision x100
    pub precision: Option<u16>,
    pub fix: GpsFix,
}

/// Per-pass counters of the point builder
///
/// Every sample lands in exactly one of `ok`, `empty`, `bad_fix_skipped`,
/// `bad_dop_skipped`, `bad_speed`, `out_of_order` or `no_anchor`;
/// `bad_fix` and `bad_dop` also count samples that were only flagged.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BuildStats {
    pub device_name: String,
    pub dop_limit: u16,
    pub samples: u32,
    pub ok: u32,
    pub bad_fix: u32,
    pub bad_fix_skipped: u32,
    pub bad_dop: u32,
    pub bad_dop_skipped: u32,
    pub empty: u32,
    pub bad_speed: u32,
    pub out_of_order: u32,
    pub no_anchor: u32,
}

impl Default for BuildStats {
    fn default() -> Self {
        Self {
            device_name: crate::types::track::UNKNOWN_DEVICE.to_string(),
            dop_limit: 0,
            samples: 0,
            ok: 0,
            bad_fix: 0,
            bad_fix_skipped: 0,
            bad_dop: 0,
            bad_dop_skipped: 0,
            empty: 0,
            bad_speed: 0,
            out_of_order: 0,
            no_anchor: 0,
        }
    }
}

impl BuildStats {
    /// Sum of the ok/fix/dop/empty counters, printed as "Total points".
    /// Flagged-but-kept samples are counted twice here; see `samples`.
    pub fn total(&self) -> u32 {
        self.ok
            + self.bad_fix
            + self.bad_fix_skipped
            + self.bad_dop
            + self.bad_dop_skipped
            + self.empty
    }

    /// Fold another pass into this one (used when chapters are combined)
    pub fn merge(&mut self, other: &BuildStats) {
        self.samples += other.samples;
        self.ok += other.ok;
        self.bad_fix += other.bad_fix;
        self.bad_fix_skipped += other.bad_fix_skipped;
        self.bad_dop += other.bad_dop;
        self.bad_dop_skipped += other.bad_dop_skipped;
        self.empty += other.empty;
        self.bad_speed += other.bad_speed;
        self.out_of_order += other.out_of_order;
        self.no_anchor += other.no_anchor;
    }
}

impl fmt::Display for BuildStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- stats -----------------")?;
        writeln!(f, "Device: {}", self.device_name)?;
        writeln!(f, "- Ok:              {:5}", self.ok)?;
        writeln!(
            f,
            "- GPSFIX bad:      {:5} (skipped: {})",
            self.bad_fix, self.bad_fix_skipped
        )?;
        writeln!(
            f,
            "- GPSP>{:<4} (bad): {:5} (skipped: {})",
            self.dop_limit, self.bad_dop, self.bad_dop_skipped
        )?;
        writeln!(f, "- Empty (No data): {:5}", self.empty)?;
        writeln!(f, "- Speed too high:  {:5}", self.bad_speed)?;
        writeln!(f, "- Out of order:    {:5}", self.out_of_order)?;
        writeln!(f, "- No time anchor:  {:5}", self.no_anchor)?;
        writeln!(f, "Samples seen:      {:5}", self.samples)?;
        writeln!(f, "Total points:      {:5}", self.total())?;
        write!(f, "--------------------------")
    }
}
