//! GPS point builder
//!
//! Folds the decoded event sequence into scaled, timestamped GPS points.
//! Stateful labels (`SCAL`, `GPSF`, `GPSP`, `GPSU`, `TMPC`, `DVNM`, `SYST`)
//! update a [`BuilderState`] that applies to every sample that follows until
//! superseded. `GPS5` bursts and `GPRI` records are filtered against
//! [`BuildOptions`] and emitted in stream order.

use crate::conversion::{apply_scale, burst_offset, dop_label, system_time_to_utc};
use crate::error::Result;
use crate::filters::BuildOptions;
use crate::types::{
    BuildStats, Gps5Sample, GpriSample, GpsFix, GpsPoint, SystSample, TelemetryEvent,
    TelemetryValue,
};
use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};

/// Running decode state of one pass
///
/// Starts from unity scale, no lock and no precision. Never shared between
/// input streams: every pass builds a fresh one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuilderState {
    /// Divisors for the next data record; empty means unity
    pub scale: Vec<f64>,
    pub fix: GpsFix,
    pub precision: Option<u16>,
    pub temperature: Option<f32>,
    pub time_anchor: Option<DateTime<Utc>>,
    pub device_name: Option<String>,
    /// Last TSMP value and its difference to the one before
    pub sample_counter: Option<u32>,
    pub sample_delta: u32,
    /// Last non-zero SYST time
    pub system_time: Option<DateTime<Utc>>,
    /// Timestamp of the last emitted point
    pub last_timestamp: Option<DateTime<Utc>>,
}

/// Points, start time and counters of one finished pass
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub points: Vec<GpsPoint>,
    /// First GPSU anchor seen
    pub start_time: Option<DateTime<Utc>>,
    pub stats: BuildStats,
}

/// Outcome of the per-sample filter chain before a point is emitted
enum Verdict {
    Keep,
    Drop,
}

pub struct GpsPointBuilder<'o> {
    options: &'o BuildOptions,
    state: BuilderState,
    points: Vec<GpsPoint>,
    start_time: Option<DateTime<Utc>>,
    stats: BuildStats,
}

impl<'o> GpsPointBuilder<'o> {
    pub fn new(options: &'o BuildOptions) -> Self {
        let stats = BuildStats {
            dop_limit: options.dop_limit,
            ..Default::default()
        };
        Self {
            options,
            state: BuilderState::default(),
            points: Vec::new(),
            start_time: None,
            stats,
        }
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    pub fn points(&self) -> &[GpsPoint] {
        &self.points
    }

    /// Apply one event to the running state, emitting points for GPS records
    ///
    /// Fails only when a scale cannot be applied to the record that follows
    /// it; policy rejections are counted, not returned.
    pub fn process(&mut self, event: &TelemetryEvent) -> Result<()> {
        match &event.data {
            TelemetryValue::Scale(scale) => self.state.scale = scale.clone(),
            TelemetryValue::DeviceName(name) => {
                if self.state.device_name.as_deref() != Some(name.as_str()) {
                    debug!("Device: {}", name);
                }
                self.state.device_name = Some(name.clone());
            }
            TelemetryValue::Temperature(t) => self.state.temperature = Some(*t),
            TelemetryValue::TimeAnchor(time) => {
                debug!("GPSU {}", time);
                self.state.time_anchor = Some(*time);
                if self.start_time.is_none() {
                    self.start_time = Some(*time);
                }
            }
            TelemetryValue::Fix(raw) => {
                let fix = GpsFix::from_raw(*raw);
                if fix != self.state.fix {
                    info!("GPSFIX change to {}", fix);
                }
                self.state.fix = fix;
            }
            TelemetryValue::Precision(dop) => {
                if self.state.precision != Some(*dop) {
                    info!("GPSP change to {} [{}]", dop, dop_label(*dop));
                }
                self.state.precision = Some(*dop);
            }
            TelemetryValue::SampleCount(count) => {
                if let Some(previous) = self.state.sample_counter {
                    self.state.sample_delta = count.wrapping_sub(previous);
                    trace!("TSMP {} (+{})", count, self.state.sample_delta);
                }
                self.state.sample_counter = Some(*count);
            }
            TelemetryValue::Gps5(samples) => self.process_burst(samples)?,
            TelemetryValue::SystemTime(syst) => self.process_system_time(syst)?,
            TelemetryValue::Gpri(sample) => self.process_gpri(sample)?,
            TelemetryValue::Opaque { .. } => {}
        }
        Ok(())
    }

    /// Empty, fix and precision checks shared by GPS5 and GPRI samples
    fn check_quality(&mut self, empty: bool, check_dop: bool) -> Verdict {
        self.stats.samples += 1;

        if empty {
            trace!("Skipping empty point");
            self.stats.empty += 1;
            return Verdict::Drop;
        }

        if self.options.fix_rejected(self.state.fix) {
            self.stats.bad_fix += 1;
            if self.options.skip_bad_fix {
                trace!("Skipping point due to GPSFIX {}", self.state.fix);
                self.stats.bad_fix_skipped += 1;
                return Verdict::Drop;
            }
        }

        if check_dop && self.options.dop_rejected(self.state.precision) {
            self.stats.bad_dop += 1;
            if self.options.skip_bad_dop {
                trace!(
                    "Skipping point due to GPSP>limit. GPSP: {:?}, limit: {}",
                    self.state.precision,
                    self.options.dop_limit
                );
                self.stats.bad_dop_skipped += 1;
                return Verdict::Drop;
            }
        }

        Verdict::Keep
    }

    /// Append a point unless it would go back in time
    fn emit(&mut self, point: GpsPoint) {
        if let Some(last) = self.state.last_timestamp {
            if point.timestamp < last {
                warn!(
                    "Dropping out-of-order point at {} (previous {})",
                    point.timestamp, last
                );
                self.stats.out_of_order += 1;
                return;
            }
        }
        self.state.last_timestamp = Some(point.timestamp);
        self.stats.ok += 1;
        self.points.push(point);
    }

    fn process_burst(&mut self, samples: &[Gps5Sample]) -> Result<()> {
        let len = samples.len();
        for (index, sample) in samples.iter().enumerate() {
            if let Verdict::Drop = self.check_quality(sample.is_empty(), true) {
                continue;
            }

            let raw: Vec<i64> = sample.fields().iter().map(|&v| v as i64).collect();
            let scaled = apply_scale("GPS5", &raw, &self.state.scale)?;
            let (speed, speed3d) = (scaled[3], scaled[4]);

            if self.options.speed_rejected(speed) {
                trace!("Skipping point with implausible speed {:.2} m/s", speed);
                self.stats.bad_speed += 1;
                continue;
            }

            let Some(anchor) = self.state.time_anchor else {
                trace!("Skipping point without GPSU time anchor");
                self.stats.no_anchor += 1;
                continue;
            };

            self.emit(GpsPoint {
                latitude: scaled[0],
                longitude: scaled[1],
                elevation: scaled[2],
                timestamp: anchor + burst_offset(index, len),
                speed,
                speed3d: Some(speed3d),
                temperature: self.state.temperature,
                precision: self.state.precision,
                fix: self.state.fix,
            });
        }
        Ok(())
    }

    fn process_system_time(&mut self, syst: &SystSample) -> Result<()> {
        let scaled = apply_scale("SYST", &[syst.seconds, syst.millis], &self.state.scale)?;
        if scaled[0] != 0.0 && scaled[1] != 0.0 {
            self.state.system_time = system_time_to_utc(scaled[0], scaled[1]);
            if self.state.system_time.is_none() {
                warn!("SYST {:?} is out of range", scaled);
            }
        }
        Ok(())
    }

    /// Single-sample record timestamped from SYST rather than GPSU
    fn process_gpri(&mut self, sample: &GpriSample) -> Result<()> {
        if let Verdict::Drop = self.check_quality(sample.is_empty(), false) {
            return Ok(());
        }

        let raw = [
            sample.lat as i64,
            sample.lon as i64,
            sample.alt as i64,
            sample.speed as i64,
        ];
        let scaled = apply_scale("GPRI", &raw, &self.state.scale)?;

        let Some(timestamp) = self.state.system_time else {
            trace!("Skipping GPRI point without system time");
            self.stats.no_anchor += 1;
            return Ok(());
        };

        self.emit(GpsPoint {
            latitude: scaled[0],
            longitude: scaled[1],
            elevation: scaled[2],
            timestamp,
            speed: scaled[3],
            speed3d: None,
            temperature: self.state.temperature,
            precision: self.state.precision,
            fix: self.state.fix,
        });
        Ok(())
    }

    pub fn finish(self) -> BuildOutput {
        let mut stats = self.stats;
        if let Some(name) = self.state.device_name {
            stats.device_name = name;
        }
        info!(
            "Built {} GPS points from {} samples ({})",
            stats.ok, stats.samples, stats.device_name
        );
        BuildOutput {
            points: self.points,
            start_time: self.start_time,
            stats,
        }
    }
}

/// Run a full builder pass over an event sequence
pub fn build_gps_points(events: &[TelemetryEvent], options: &BuildOptions) -> Result<BuildOutput> {
    let mut builder = GpsPointBuilder::new(options);
    for event in events {
        builder.process(event)?;
    }
    Ok(builder.finish())
}
