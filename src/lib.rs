//! GPMF Track Library
//!
//! A Rust library for decoding GoPro GPMF telemetry (the KLV metadata track
//! embedded in GoPro videos) and turning its GPS records into tracks.
//! This library provides both in-memory data access and export capabilities.
//!
//! # Features
//!
//! - **`csv`** (default): Enable DashWare CSV export
//! - **`cli`** (default): Build the `gpmf2gpx` command-line binary
//! - **`json`**: Enable track export in JSON format
//! - **`serde`**: Enable serialization/deserialization of types
//!
//! # Quick Start
//!
//! Decode a telemetry stream and inspect its points:
//! ```rust,no_run
//! use gpmf_track::{parse_gpmf_file, BuildOptions};
//! use std::path::Path;
//!
//! let track = parse_gpmf_file(Path::new("GH010042.bin"), &BuildOptions::default()).unwrap();
//! println!("{} points from {}", track.points.len(), track.device_name);
//! println!("{}", track.stats);
//! ```
//!
//! Export to GPX and KML:
//! ```rust,no_run
//! use gpmf_track::{export_track, parse_gpmf_file, BuildOptions, ExportOptions, ExportOutcome};
//! use std::path::Path;
//!
//! let input = Path::new("GH010042.bin");
//! let track = parse_gpmf_file(input, &BuildOptions::default()).unwrap();
//! let export_options = ExportOptions {
//!     gpx: true,
//!     kml: true,
//!     ..Default::default()
//! };
//! match export_track(&track, input, &export_options).unwrap() {
//!     ExportOutcome::Written(report) => println!("Wrote {:?}", report.written()),
//!     ExportOutcome::NoData { reason } => println!("Nothing to export: {}", reason),
//! }
//! ```
//!
//! # Public API
//!
//! ## Parsing Functions
//! - [`parse_gpmf_file`] - Decode a GPMF file into a [`Track`]
//! - [`parse_gpmf_bytes`] - Decode GPMF data from memory
//! - [`parse_gpmf_files`] - Decode chapter files in order and concatenate them
//! - [`decode_telemetry`] / [`TelemetryDecoder`] - Typed events without point building
//! - [`KlvReader`] - Low-level record iterator
//! - [`build_gps_points`] / [`GpsPointBuilder`] - Point builder state machine
//!
//! ## Data Types
//! - [`Track`] - Points, start time, device name and counters
//! - [`GpsPoint`] - One scaled, timestamped fix
//! - [`BuildStats`] / [`DecodeStats`] - Per-pass counters
//! - [`BuildOptions`] / [`FixPolicy`] - Sample acceptance policy
//! - [`ExportOptions`] / [`ExportReport`] / [`ExportOutcome`] - Export configuration and results
//!
//! ## Export Functions
//! - [`export_track`] - Write every selected format, or report `NoData`
//! - [`export_to_gpx`], [`export_to_kml`], [`export_summary`], [`export_klv_log`]
//! - [`generate_gpx`] / [`generate_kml`] - In-memory documents
//! - [`compute_export_paths`] - Helper for consistent path computation
//!
//! ## Filtering Functions
//! - [`should_skip_export`] - Determine if a track should be skipped
//!
//! ## Chapter Handling
//! - [`chapters::sort_chapters`] / [`chapters::group_recordings`] - GoPro file ordering

// Module declarations
pub mod chapters;
pub mod conversion;
pub mod error;
pub mod export;
pub mod filters;
pub mod parser;
pub mod types;

// Re-export everything from modules for convenience
#[allow(ambiguous_glob_reexports)]
pub use conversion::*;
#[allow(ambiguous_glob_reexports)]
pub use error::*;
#[allow(ambiguous_glob_reexports)]
pub use export::*;
#[allow(ambiguous_glob_reexports)]
pub use filters::*;
#[allow(ambiguous_glob_reexports)]
pub use parser::*;
#[allow(ambiguous_glob_reexports)]
pub use types::*;

// Re-export Result type for convenience
pub use anyhow::Result;
