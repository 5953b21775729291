//! Export functionality for GPS tracks
//!
//! Contains functions for writing a [`Track`] to GPX, KML, DashWare CSV and
//! JSON, plus the decode log and run summary text files. Exporters are a
//! straight projection of already-filtered points: nothing is dropped or
//! reordered here.

#[cfg(feature = "csv")]
use crate::conversion::format_csv_time;
use crate::conversion::{format_utc_time, mps_to_kmh};
use crate::filters::should_skip_export;
use crate::parser::format_klv_log;
use crate::types::{GpsFix, GpsPoint, Track};
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use log::info;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Export options for controlling output formats
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub gpx: bool,
    pub kml: bool,
    pub csv: bool,
    pub json: bool,
    /// Write the record-by-record decode log
    pub klv_log: bool,
    /// Write the stats table to a text file
    pub summary: bool,
    /// Defaults to the input file's directory
    pub output_dir: Option<String>,
    /// Export single-point tracks too
    pub force_export: bool,
    /// GPX/KML track name; defaults to the device name
    pub track_name: Option<String>,
}

impl ExportOptions {
    /// True when at least one track format is selected
    pub fn any_track_format(&self) -> bool {
        self.gpx || self.kml || self.csv || self.json || self.summary
    }
}

/// Output file locations for one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub output_dir: PathBuf,
    pub gpx: PathBuf,
    pub kml: PathBuf,
    pub csv: PathBuf,
    pub json: PathBuf,
    pub klv_log: PathBuf,
    pub summary: PathBuf,
}

/// Files written by [`export_track`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub gpx_path: Option<PathBuf>,
    pub kml_path: Option<PathBuf>,
    pub csv_path: Option<PathBuf>,
    pub json_path: Option<PathBuf>,
    pub summary_path: Option<PathBuf>,
}

impl ExportReport {
    pub fn written(&self) -> Vec<&Path> {
        [
            &self.gpx_path,
            &self.kml_path,
            &self.csv_path,
            &self.json_path,
            &self.summary_path,
        ]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .collect()
    }
}

/// Result of an export request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Nothing worth exporting; no files were written
    NoData { reason: String },
    Written(ExportReport),
}

/// Compute every output path for `input_path`
///
/// Files are named after the input stem and placed in `output_dir`, or next
/// to the input when no directory is given.
pub fn compute_export_paths(input_path: &Path, export_options: &ExportOptions) -> ExportPaths {
    let base_name = input_path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");

    let output_dir = match &export_options.output_dir {
        Some(dir) => PathBuf::from(dir),
        None => input_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let file = |suffix: &str| output_dir.join(format!("{}{}", base_name, suffix));
    ExportPaths {
        gpx: file(".gpx"),
        kml: file(".kml"),
        csv: file(".csv"),
        json: file(".json"),
        klv_log: file(".klv.txt"),
        summary: file(".summary.txt"),
        output_dir,
    }
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn gpx_fix(fix: GpsFix) -> Option<&'static str> {
    match fix {
        GpsFix::NoLock => Some("none"),
        GpsFix::Lock2D => Some("2d"),
        GpsFix::Lock3D => Some("3d"),
        GpsFix::Other(_) => None,
    }
}

const GPX_NAMESPACES: &str = concat!(
    r#"xmlns="http://www.topografix.com/GPX/1/1" "#,
    r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
    r#"xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v2" "#,
    r#"xsi:schemaLocation="http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd "#,
    r#"http://www.garmin.com/xmlschemas/TrackPointExtension/v2 http://www.garmin.com/xmlschemas/TrackPointExtensionv2.xsd""#
);

/// Write a GPX 1.1 document with a single track segment
///
/// `start_time` goes into the metadata and falls back to the first point.
/// An empty point list still produces a valid document with an empty
/// `trkseg`.
pub fn write_gpx<W: Write>(
    writer: &mut W,
    points: &[GpsPoint],
    start_time: Option<DateTime<Utc>>,
    track_name: &str,
) -> std::io::Result<()> {
    writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        writer,
        r#"<gpx creator="gpmf2gpx {}" version="1.1" {}>"#,
        env!("CARGO_PKG_VERSION"),
        GPX_NAMESPACES
    )?;
    writeln!(writer, "<metadata>")?;
    writeln!(writer, "  <name>{}</name>", xml_escape(track_name))?;
    if let Some(time) = start_time.or_else(|| points.first().map(|p| p.timestamp)) {
        writeln!(writer, "  <time>{}</time>", format_utc_time(&time))?;
    }
    writeln!(writer, "</metadata>")?;
    writeln!(writer, "<trk>")?;
    writeln!(writer, "  <name>{}</name>", xml_escape(track_name))?;
    writeln!(writer, "  <trkseg>")?;

    for point in points {
        writeln!(
            writer,
            r#"    <trkpt lat="{:.7}" lon="{:.7}">"#,
            point.latitude, point.longitude
        )?;
        writeln!(writer, "      <ele>{:.3}</ele>", point.elevation)?;
        writeln!(writer, "      <time>{}</time>", format_utc_time(&point.timestamp))?;
        if let Some(fix) = gpx_fix(point.fix) {
            writeln!(writer, "      <fix>{}</fix>", fix)?;
        }
        if let Some(dop) = point.precision {
            writeln!(writer, "      <pdop>{:.2}</pdop>", dop as f64 / 100.0)?;
        }
        writeln!(writer, "      <extensions>")?;
        writeln!(writer, "        <gpxtpx:TrackPointExtension>")?;
        if let Some(temp) = point.temperature {
            writeln!(writer, "          <gpxtpx:atemp>{:.1}</gpxtpx:atemp>", temp)?;
        }
        writeln!(writer, "          <gpxtpx:speed>{:.3}</gpxtpx:speed>", point.speed)?;
        writeln!(writer, "        </gpxtpx:TrackPointExtension>")?;
        writeln!(writer, "      </extensions>")?;
        writeln!(writer, "    </trkpt>")?;
    }

    writeln!(writer, "  </trkseg>")?;
    writeln!(writer, "</trk>")?;
    writeln!(writer, "</gpx>")
}

pub fn generate_gpx(
    points: &[GpsPoint],
    start_time: Option<DateTime<Utc>>,
    track_name: &str,
) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_gpx(&mut buf, points, start_time, track_name);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Write a KML document with one `LineString` of `lon,lat,ele` tuples
pub fn write_kml<W: Write>(
    writer: &mut W,
    points: &[GpsPoint],
    track_name: &str,
) -> std::io::Result<()> {
    let name = xml_escape(track_name);
    writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(writer, r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#)?;
    writeln!(writer, "<Document>")?;
    writeln!(writer, "  <name>{}</name>", name)?;
    writeln!(writer, r#"  <Style id="track">"#)?;
    writeln!(writer, "    <LineStyle><color>FF1400BE</color><width>4</width></LineStyle>")?;
    writeln!(writer, "    <PolyStyle><color>7f00ff00</color></PolyStyle>")?;
    writeln!(writer, "  </Style>")?;
    writeln!(writer, "  <Placemark>")?;
    writeln!(writer, "    <name>{}</name>", name)?;
    writeln!(writer, "    <styleUrl>#track</styleUrl>")?;
    writeln!(writer, "    <LineString>")?;
    writeln!(writer, "      <extrude>1</extrude>")?;
    writeln!(writer, "      <tessellate>1</tessellate>")?;
    writeln!(writer, "      <altitudeMode>absolute</altitudeMode>")?;
    writeln!(writer, "      <coordinates>")?;
    for point in points {
        writeln!(
            writer,
            "        {:.7},{:.7},{:.3}",
            point.longitude, point.latitude, point.elevation
        )?;
    }
    writeln!(writer, "      </coordinates>")?;
    writeln!(writer, "    </LineString>")?;
    writeln!(writer, "  </Placemark>")?;
    writeln!(writer, "</Document>")?;
    writeln!(writer, "</kml>")
}

pub fn generate_kml(points: &[GpsPoint], track_name: &str) -> String {
    let mut buf = Vec::new();
    let _ = write_kml(&mut buf, points, track_name);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Plain-text run summary: the builder stats table plus track figures
pub fn format_summary(track: &Track) -> String {
    let mut lines = vec![track.stats.to_string()];
    lines.push(format!("Sources: {}", track.sources.join(", ")));
    if let Some(start) = track.effective_start_time() {
        lines.push(format!("Start: {}", format_utc_time(&start)));
    }
    lines.push(format!("Points: {}", track.points.len()));
    lines.push(format!("Duration: {:.1}s", track.duration_seconds()));
    if let Some(speed) = track.max_speed() {
        lines.push(format!(
            "Max speed: {:.2} m/s ({:.1} km/h)",
            speed,
            mps_to_kmh(speed)
        ));
    }
    if let Some((low, high)) = track.elevation_range() {
        lines.push(format!("Elevation: {:.1} .. {:.1} m", low, high));
    }
    let decode = &track.decode_stats;
    lines.push(format!(
        "Records: {} ({} containers, {} opaque, {} malformed, {} trailing bytes)",
        decode.records, decode.containers, decode.opaque, decode.malformed, decode.trailing_bytes
    ));
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn create_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {:?}", dir))
}

fn create_file(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {:?}", path))?;
    Ok(BufWriter::new(file))
}

fn track_name(track: &Track, export_options: &ExportOptions) -> String {
    export_options
        .track_name
        .clone()
        .unwrap_or_else(|| track.device_name.clone())
}

/// Export the track to GPX
pub fn export_to_gpx(track: &Track, input_path: &Path, export_options: &ExportOptions) -> Result<PathBuf> {
    let paths = compute_export_paths(input_path, export_options);
    create_output_dir(&paths.output_dir)?;
    let mut writer = create_file(&paths.gpx)?;
    write_gpx(
        &mut writer,
        &track.points,
        track.start_time,
        &track_name(track, export_options),
    )?;
    writer.flush()?;
    Ok(paths.gpx)
}

/// Export the track to KML
pub fn export_to_kml(track: &Track, input_path: &Path, export_options: &ExportOptions) -> Result<PathBuf> {
    let paths = compute_export_paths(input_path, export_options);
    create_output_dir(&paths.output_dir)?;
    let mut writer = create_file(&paths.kml)?;
    write_kml(&mut writer, &track.points, &track_name(track, export_options))?;
    writer.flush()?;
    Ok(paths.kml)
}

/// Export the track as a DashWare CSV file
///
/// The first line is DashWare's format marker, followed by its fixed column
/// set. Only time, position, elevation and temperature are filled in.
#[cfg(feature = "csv")]
pub fn export_to_csv(track: &Track, input_path: &Path, export_options: &ExportOptions) -> Result<PathBuf> {
    let paths = compute_export_paths(input_path, export_options);
    create_output_dir(&paths.output_dir)?;

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(&paths.csv)
        .with_context(|| format!("Failed to create CSV file: {:?}", paths.csv))?;
    writer.write_record(["DashWare GPX CSV File"])?;
    writer.write_record([
        "Time",
        "Latitude",
        "Longitude",
        "Elevation",
        "AirTemp",
        "HeartRate",
        "Cadence",
        "Power",
        "Roll",
        "Pitch",
    ])?;
    for point in &track.points {
        let temperature = point
            .temperature
            .map(|t| format!("{:.1}", t))
            .unwrap_or_default();
        writer.write_record([
            format_csv_time(&point.timestamp),
            format!("{:.7}", point.latitude),
            format!("{:.7}", point.longitude),
            format!("{:.3}", point.elevation),
            temperature,
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ])?;
    }
    writer.flush()?;
    Ok(paths.csv)
}

/// Export the whole track, points and stats included, as pretty JSON
#[cfg(feature = "json")]
pub fn export_to_json(track: &Track, input_path: &Path, export_options: &ExportOptions) -> Result<PathBuf> {
    let paths = compute_export_paths(input_path, export_options);
    create_output_dir(&paths.output_dir)?;
    let mut writer = create_file(&paths.json)?;
    serde_json::to_writer_pretty(&mut writer, track)
        .with_context(|| format!("Failed to write JSON: {:?}", paths.json))?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(paths.json)
}

pub fn export_summary(track: &Track, input_path: &Path, export_options: &ExportOptions) -> Result<PathBuf> {
    let paths = compute_export_paths(input_path, export_options);
    create_output_dir(&paths.output_dir)?;
    fs::write(&paths.summary, format_summary(track))
        .with_context(|| format!("Failed to write summary: {:?}", paths.summary))?;
    Ok(paths.summary)
}

/// Write the decode log of a raw GPMF buffer, one line per KLV record
///
/// Written independently of the track exports: the log is most useful
/// exactly when no points came out.
pub fn export_klv_log(data: &[u8], input_path: &Path, export_options: &ExportOptions) -> Result<PathBuf> {
    let paths = compute_export_paths(input_path, export_options);
    create_output_dir(&paths.output_dir)?;
    let mut writer = create_file(&paths.klv_log)?;
    for line in format_klv_log(data) {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(paths.klv_log)
}

/// Write every selected track format, or report that there is nothing to write
///
/// Tracks without points (and single-point tracks unless forced) produce
/// [`ExportOutcome::NoData`] and leave the filesystem untouched.
pub fn export_track(track: &Track, input_path: &Path, export_options: &ExportOptions) -> Result<ExportOutcome> {
    let (skip, reason) = should_skip_export(track, export_options.force_export);
    if skip {
        info!("Skipping export of {:?}: {}", input_path, reason);
        return Ok(ExportOutcome::NoData { reason });
    }

    let mut report = ExportReport::default();
    if export_options.gpx {
        report.gpx_path = Some(export_to_gpx(track, input_path, export_options)?);
    }
    if export_options.kml {
        report.kml_path = Some(export_to_kml(track, input_path, export_options)?);
    }
    #[cfg(feature = "csv")]
    if export_options.csv {
        report.csv_path = Some(export_to_csv(track, input_path, export_options)?);
    }
    #[cfg(feature = "json")]
    if export_options.json {
        report.json_path = Some(export_to_json(track, input_path, export_options)?);
    }
    if export_options.summary {
        report.summary_path = Some(export_summary(track, input_path, export_options)?);
    }

    for path in report.written() {
        info!("Exported {} points to {:?}", track.points.len(), path);
    }
    Ok(ExportOutcome::Written(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(secs: i64, lat: f64) -> GpsPoint {
        GpsPoint {
            latitude: lat,
            longitude: -3.76,
            elevation: 650.5,
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 250_000_000).unwrap(),
            speed: 1.25,
            speed3d: Some(1.3),
            temperature: Some(31.5),
            precision: Some(150),
            fix: GpsFix::Lock3D,
        }
    }

    #[test]
    fn test_gpx_structure() {
        let gpx = generate_gpx(&[point(0, 40.3), point(1, 40.4)], None, "HERO <8>");
        assert!(gpx.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(gpx.contains(r#"xmlns="http://www.topografix.com/GPX/1/1""#));
        assert!(gpx.contains("TrackPointExtension/v2"));
        assert!(gpx.contains("<name>HERO &lt;8&gt;</name>"));
        assert!(gpx.contains("<time>2023-11-14T22:13:20.250000Z</time>"));
        assert_eq!(gpx.matches("<trkpt ").count(), 2);
        assert!(gpx.contains(r#"<trkpt lat="40.3000000" lon="-3.7600000">"#));
        assert!(gpx.contains("<fix>3d</fix>"));
        assert!(gpx.contains("<pdop>1.50</pdop>"));
        assert!(gpx.contains("<gpxtpx:atemp>31.5</gpxtpx:atemp>"));
        assert!(gpx.contains("<gpxtpx:speed>1.250</gpxtpx:speed>"));
        assert!(gpx.trim_end().ends_with("</gpx>"));
    }

    #[test]
    fn test_gpx_empty_segment() {
        let gpx = generate_gpx(&[], None, "Unknown");
        assert!(gpx.contains("<trkseg>"));
        assert!(gpx.contains("</trkseg>"));
        assert!(!gpx.contains("<trkpt"));
        assert!(!gpx.contains("<time>"));
    }

    #[test]
    fn test_gpx_explicit_start_time() {
        let start = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        let gpx = generate_gpx(&[point(0, 1.0)], Some(start), "t");
        let metadata = &gpx[gpx.find("<metadata>").unwrap()..gpx.find("</metadata>").unwrap()];
        assert!(metadata.contains("<time>2020-09-13T12:26:40.000000Z</time>"));
    }

    #[test]
    fn test_kml_coordinates_order() {
        let kml = generate_kml(&[point(0, 40.3)], "track");
        assert!(kml.contains(r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#));
        assert!(kml.contains("-3.7600000,40.3000000,650.500"));
    }

    #[test]
    fn test_compute_export_paths() {
        let options = ExportOptions {
            output_dir: Some("/tmp/out".to_string()),
            ..Default::default()
        };
        let paths = compute_export_paths(Path::new("/videos/GH010042.MP4"), &options);
        assert_eq!(paths.gpx, PathBuf::from("/tmp/out/GH010042.gpx"));
        assert_eq!(paths.kml, PathBuf::from("/tmp/out/GH010042.kml"));
        assert_eq!(paths.klv_log, PathBuf::from("/tmp/out/GH010042.klv.txt"));

        let paths = compute_export_paths(Path::new("GH010042.bin"), &ExportOptions::default());
        assert_eq!(paths.output_dir, PathBuf::from("."));
        assert_eq!(paths.summary, PathBuf::from("./GH010042.summary.txt"));
    }

    #[test]
    fn test_summary_text() {
        let mut track = Track::new("GH010001.bin");
        track.points = vec![point(0, 1.0), point(10, 1.1)];
        track.stats.ok = 2;
        let text = format_summary(&track);
        assert!(text.contains("-- stats"));
        assert!(text.contains("Sources: GH010001.bin"));
        assert!(text.contains("Points: 2"));
        assert!(text.contains("Duration: 10.0s"));
        assert!(text.contains("Max speed: 1.25 m/s (4.5 km/h)"));
    }
}
