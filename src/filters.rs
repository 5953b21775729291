//! Sample acceptance policies and export filtering
//!
//! The point builder consults [`BuildOptions`] for every GPS sample: fix
//! quality, dilution of precision and an optional speed ceiling. Device
//! firmwares disagree on what a usable fix is, so each threshold is a policy
//! parameter rather than a constant.
//!
//! # Usage
//!
//! Library callers build `BuildOptions` directly; the CLI maps its
//! `--fix-policy`, `--dop-limit`, `--max-speed` and `--skip-bad-*` flags onto
//! the same struct.

use crate::types::{GpsFix, Track};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default GPSP ceiling (dilution of precision x100)
pub const DEFAULT_DOP_LIMIT: u16 = 2000;

/// Which GPSF values count as a usable fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FixPolicy {
    /// Reject only fix 0 (no lock)
    #[default]
    RejectNoLock,
    /// Reject anything below a 2D lock
    Require2D,
    /// Reject anything below a 3D lock
    Require3D,
}

impl FixPolicy {
    pub fn accepts(&self, fix: GpsFix) -> bool {
        let raw = fix.raw();
        match self {
            FixPolicy::RejectNoLock => raw != 0,
            FixPolicy::Require2D => raw >= 2,
            FixPolicy::Require3D => raw >= 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FixPolicy::RejectNoLock => "no-lock",
            FixPolicy::Require2D => "2d",
            FixPolicy::Require3D => "3d",
        }
    }
}

impl fmt::Display for FixPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FixPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "no-lock" | "nolock" | "0" => Ok(FixPolicy::RejectNoLock),
            "2d" | "2" => Ok(FixPolicy::Require2D),
            "3d" | "3" => Ok(FixPolicy::Require3D),
            other => Err(format!(
                "unknown fix policy '{}' (expected no-lock, 2d or 3d)",
                other
            )),
        }
    }
}

/// Point builder policy
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BuildOptions {
    pub fix_policy: FixPolicy,
    /// Drop samples with a rejected fix instead of only counting them
    pub skip_bad_fix: bool,
    /// Highest acceptable GPSP value
    pub dop_limit: u16,
    /// Drop samples above `dop_limit` instead of only counting them
    pub skip_bad_dop: bool,
    /// Samples faster than this (m/s) are treated as corrupt
    pub max_speed: Option<f64>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            fix_policy: FixPolicy::default(),
            skip_bad_fix: false,
            dop_limit: DEFAULT_DOP_LIMIT,
            skip_bad_dop: false,
            max_speed: None,
        }
    }
}

impl BuildOptions {
    pub fn fix_rejected(&self, fix: GpsFix) -> bool {
        !self.fix_policy.accepts(fix)
    }

    /// An unset precision never fails the check
    pub fn dop_rejected(&self, precision: Option<u16>) -> bool {
        precision.is_some_and(|dop| dop > self.dop_limit)
    }

    pub fn speed_rejected(&self, speed: f64) -> bool {
        self.max_speed.is_some_and(|limit| speed > limit)
    }
}

/// Determines if a track should be skipped for export
///
/// A track without points is never exported, not even when forced: there is
/// nothing to write. A single point makes a degenerate track and is skipped
/// unless `force_export` is set.
///
/// # Returns
/// Tuple of (should_skip, reason_description)
pub fn should_skip_export(track: &Track, force_export: bool) -> (bool, String) {
    if track.points.is_empty() {
        return (
            true,
            format!(
                "no GPS points ({} samples seen, {} rejected)",
                track.stats.samples,
                track.stats.samples.saturating_sub(track.stats.ok)
            ),
        );
    }

    if force_export {
        return (false, String::new());
    }

    if track.points.len() == 1 {
        return (true, "only one GPS point".to_string());
    }

    (false, String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GpsPoint;
    use chrono::{TimeZone, Utc};

    fn point() -> GpsPoint {
        GpsPoint {
            latitude: 1.0,
            longitude: 2.0,
            elevation: 3.0,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            speed: 0.0,
            speed3d: None,
            temperature: None,
            precision: None,
            fix: GpsFix::Lock3D,
        }
    }

    #[test]
    fn test_fix_policies() {
        let fixes = [
            GpsFix::NoLock,
            GpsFix::Other(1),
            GpsFix::Lock2D,
            GpsFix::Lock3D,
        ];
        let accepted = |policy: FixPolicy| -> Vec<bool> {
            fixes.iter().map(|f| policy.accepts(*f)).collect()
        };
        assert_eq!(accepted(FixPolicy::RejectNoLock), vec![false, true, true, true]);
        assert_eq!(accepted(FixPolicy::Require2D), vec![false, false, true, true]);
        assert_eq!(accepted(FixPolicy::Require3D), vec![false, false, false, true]);
    }

    #[test]
    fn test_fix_policy_parsing() {
        assert_eq!("3d".parse::<FixPolicy>(), Ok(FixPolicy::Require3D));
        assert_eq!("2D".parse::<FixPolicy>(), Ok(FixPolicy::Require2D));
        assert_eq!("no-lock".parse::<FixPolicy>(), Ok(FixPolicy::RejectNoLock));
        assert!("4d".parse::<FixPolicy>().is_err());
        assert_eq!(FixPolicy::Require2D.to_string(), "2d");
    }

    #[test]
    fn test_build_option_checks() {
        let options = BuildOptions {
            dop_limit: 500,
            max_speed: Some(35.0),
            ..Default::default()
        };
        assert!(!options.dop_rejected(None));
        assert!(!options.dop_rejected(Some(500)));
        assert!(options.dop_rejected(Some(501)));
        assert!(options.speed_rejected(35.5));
        assert!(!options.speed_rejected(35.0));
        assert!(!BuildOptions::default().speed_rejected(1000.0));
    }

    #[test]
    fn test_should_skip_export() {
        let mut track = Track::new("GH010001.bin");
        let (skip, reason) = should_skip_export(&track, true);
        assert!(skip);
        assert!(reason.contains("no GPS points"));

        track.points.push(point());
        assert!(should_skip_export(&track, false).0);
        assert!(!should_skip_export(&track, true).0);

        track.points.push(point());
        assert_eq!(should_skip_export(&track, false), (false, String::new()));
    }
}
