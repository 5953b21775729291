use crate::filters::BuildOptions;
use crate::parser::decoder::decode_telemetry;
use crate::parser::gps::build_gps_points;
use crate::parser::klv::looks_like_gpmf;
use crate::types::Track;
use crate::Result;
use anyhow::{anyhow, Context};
use log::{debug, info, warn};
use std::path::Path;

/// Parse a GPMF file and build its GPS track
///
/// The file must hold the raw telemetry stream (for example extracted from
/// an MP4 with `ffmpeg -map 0:3 -f rawvideo`), not the video container.
pub fn parse_gpmf_file(file_path: &Path, options: &BuildOptions) -> Result<Track> {
    let metadata = std::fs::metadata(file_path)
        .with_context(|| format!("Failed to stat GPMF file: {:?}", file_path))?;
    debug!(
        "File size: {} bytes ({:.2} MB)",
        metadata.len(),
        metadata.len() as f64 / 1024.0 / 1024.0
    );

    let file_data = std::fs::read(file_path)
        .with_context(|| format!("Failed to read GPMF file: {:?}", file_path))?;

    let source = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.display().to_string());

    parse_gpmf_bytes(&file_data, &source, options)
        .with_context(|| format!("Failed to decode GPMF file: {:?}", file_path))
}

/// Parse GPMF data from memory
///
/// Decoding and point building always start from fresh state, so calls never
/// influence each other.
pub fn parse_gpmf_bytes(data: &[u8], source: &str, options: &BuildOptions) -> Result<Track> {
    debug!("=== PARSING GPMF DATA ({} bytes) ===", data.len());
    if !data.is_empty() && !looks_like_gpmf(data) {
        warn!("{} does not start with a GPMF record", source);
    }

    let (events, decode_stats) = decode_telemetry(data);
    debug!(
        "Decoded {} events from {} records ({} opaque, {} malformed)",
        events.len(),
        decode_stats.records,
        decode_stats.opaque,
        decode_stats.malformed
    );

    let output = build_gps_points(&events, options)?;

    let mut track = Track::new(source);
    track.device_name = output.stats.device_name.clone();
    track.start_time = output.start_time;
    track.points = output.points;
    track.stats = output.stats;
    track.decode_stats = decode_stats;
    Ok(track)
}

/// Parse several chapter files and concatenate them into one track
///
/// Files are decoded one after another in the given order, each from fresh
/// state; callers sort them first (see [`crate::chapters::sort_chapters`]).
/// The first chapter that cannot be read fails the whole call, so a
/// recording is never concatenated around a missing chapter.
pub fn parse_gpmf_files(file_paths: &[&Path], options: &BuildOptions) -> Result<Track> {
    let mut files = file_paths.iter();
    let first = files
        .next()
        .ok_or_else(|| anyhow!("No input files given"))?;

    let mut track = parse_gpmf_file(first, options)?;
    for path in files {
        let next = parse_gpmf_file(path, options)?;
        info!(
            "Appending {} points from {:?}",
            next.points.len(),
            path
        );
        track.append(next);
    }
    Ok(track)
}
