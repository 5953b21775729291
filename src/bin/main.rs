//! CLI binary for GPMF Track
//!
//! Decodes raw GoPro GPMF telemetry files and writes their GPS track to GPX,
//! KML and the other supported formats.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use env_logger::Env;
use glob::glob;
use gpmf_track::chapters::{group_recordings, sort_chapters};
use gpmf_track::{
    export_klv_log, export_track, parse_gpmf_files, BuildOptions, ExportOptions, ExportOutcome,
    FixPolicy, Track, DEFAULT_DOP_LIMIT,
};
use log::{debug, LevelFilter};
use std::path::{Path, PathBuf};

/// Container formats the tool cannot demux itself
const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mov", "lrv"];

fn init_logging(debug: bool) {
    let default_level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp(None);
    let _ = builder.try_init();
}

fn long_version() -> String {
    format!(
        "{} (git {}, built {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        option_env!("VERGEN_BUILD_DATE").unwrap_or("unknown")
    )
}

fn cli() -> Command {
    Command::new("gpmf2gpx")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version())
        .about("Extract GPS tracks from GoPro GPMF telemetry. Output to GPX, KML and other formats.")
        .after_help(
            "Input files hold the raw GPMF stream, e.g. extracted with:\n  \
             ffmpeg -y -i GH010042.MP4 -codec copy -map 0:3 -f rawvideo GH010042.bin",
        )
        .arg(
            Arg::new("files")
                .help("GPMF files to decode (supports globbing; GoPro chapter names are sorted into recording order)")
                .required(true)
                .num_args(1..)
                .index(1),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug output and detailed decoding information (RUST_LOG overrides)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("gpx")
                .long("gpx")
                .help("Export the track to GPX 1.1")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("kml")
                .long("kml")
                .help("Export the track to KML")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .help("Export the track to DashWare CSV")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Export the track, points and stats to JSON (requires the json feature)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("klv-log")
                .long("klv-log")
                .help("Write every KLV record of each input to <name>.klv.txt")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("summary")
                .long("summary")
                .help("Write the stats table to <name>.summary.txt")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .help("Directory for output files (default: same as input file)")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("force-export")
                .long("force-export")
                .help("Export single-point tracks too")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("combine")
                .long("combine")
                .help("Concatenate the chapters of each recording into one track")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .help("Track name (default: device name)")
                .value_name("NAME"),
        )
        .arg(
            Arg::new("fix-policy")
                .long("fix-policy")
                .help("Which GPSF values count as a usable fix")
                .value_parser(["no-lock", "2d", "3d"])
                .default_value("no-lock"),
        )
        .arg(
            Arg::new("skip-bad-fix")
                .long("skip-bad-fix")
                .help("Drop samples rejected by the fix policy instead of only counting them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dop-limit")
                .long("dop-limit")
                .help("Highest acceptable GPSP value (dilution of precision x100)")
                .value_parser(clap::value_parser!(u16))
                .default_value(DEFAULT_DOP_LIMIT.to_string()),
        )
        .arg(
            Arg::new("skip-bad-dop")
                .long("skip-bad-dop")
                .help("Drop samples above --dop-limit instead of only counting them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("max-speed")
                .long("max-speed")
                .help("Drop samples faster than this many m/s (e.g. 35)")
                .value_name("M/S")
                .value_parser(clap::value_parser!(f64)),
        )
}

/// Expand glob patterns and drop inputs that cannot be decoded
fn collect_paths(file_patterns: &[&String]) -> Vec<PathBuf> {
    let mut valid_paths = Vec::new();
    for pattern in file_patterns {
        debug!("Processing pattern: {pattern}");

        let paths: Vec<_> = if pattern.contains('*') || pattern.contains('?') {
            match glob(pattern) {
                Ok(glob_iter) => match glob_iter.collect::<Result<Vec<_>, _>>() {
                    Ok(paths) => {
                        debug!("Glob pattern '{pattern}' matched {} files", paths.len());
                        paths
                    }
                    Err(e) => {
                        eprintln!("Error expanding glob pattern '{pattern}': {e}");
                        continue;
                    }
                },
                Err(e) => {
                    eprintln!("Invalid glob pattern '{pattern}': {e}");
                    continue;
                }
            }
        } else {
            vec![Path::new(pattern).to_path_buf()]
        };

        for path in paths {
            if !path.is_file() {
                eprintln!("Warning: File does not exist: {path:?}");
                continue;
            }

            let is_video = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_video {
                eprintln!(
                    "Warning: Skipping video container {path:?}: extract the GPMF stream first (see --help)"
                );
                continue;
            }

            valid_paths.push(path);
        }
    }
    valid_paths
}

/// Write the record-by-record decode log of one input
fn write_klv_log(path: &Path, export_options: &ExportOptions) -> Result<()> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read GPMF file: {:?}", path))?;
    let log_path = export_klv_log(&data, path, export_options)?;
    println!("Exported KLV log to: {}", log_path.display());
    Ok(())
}

fn report_export(track: &Track, output_path: &Path, export_options: &ExportOptions) -> Result<()> {
    if !export_options.any_track_format() {
        return Ok(());
    }
    match export_track(track, output_path, export_options)? {
        ExportOutcome::Written(report) => {
            for path in report.written() {
                println!("Exported {} points to: {}", track.points.len(), path.display());
            }
        }
        ExportOutcome::NoData { reason } => {
            println!("Skipping export for {}: {}", output_path.display(), reason);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    let debug = matches.get_flag("debug");
    init_logging(debug);

    let fix_policy = matches
        .get_one::<String>("fix-policy")
        .map(|s| s.parse::<FixPolicy>())
        .transpose()
        .map_err(anyhow::Error::msg)?
        .unwrap_or_default();
    let build_options = BuildOptions {
        fix_policy,
        skip_bad_fix: matches.get_flag("skip-bad-fix"),
        dop_limit: matches
            .get_one::<u16>("dop-limit")
            .copied()
            .unwrap_or(DEFAULT_DOP_LIMIT),
        skip_bad_dop: matches.get_flag("skip-bad-dop"),
        max_speed: matches.get_one::<f64>("max-speed").copied(),
    };

    let mut export_options = ExportOptions {
        gpx: matches.get_flag("gpx"),
        kml: matches.get_flag("kml"),
        csv: matches.get_flag("csv"),
        json: matches.get_flag("json"),
        klv_log: matches.get_flag("klv-log"),
        summary: matches.get_flag("summary"),
        output_dir: matches.get_one::<String>("output-dir").cloned(),
        force_export: matches.get_flag("force-export"),
        track_name: matches.get_one::<String>("name").cloned(),
    };
    if !export_options.any_track_format() && !export_options.klv_log {
        export_options.gpx = true;
        export_options.kml = true;
    }
    if export_options.csv && !cfg!(feature = "csv") {
        eprintln!("Warning: --csv requires the csv feature; ignoring");
    }
    if export_options.json && !cfg!(feature = "json") {
        eprintln!("Warning: --json requires the json feature; ignoring");
    }
    debug!("Build options: {build_options:?}");
    debug!("Export options: {export_options:?}");

    let file_patterns: Vec<&String> = matches
        .get_many::<String>("files")
        .map(|values| values.collect())
        .unwrap_or_default();
    let mut valid_paths = collect_paths(&file_patterns);
    sort_chapters(&mut valid_paths);
    debug!("Found {} valid files to process", valid_paths.len());

    if valid_paths.is_empty() {
        eprintln!("Error: No valid files found to process.");
        eprintln!("Input patterns were: {file_patterns:?}");
        std::process::exit(1);
    }

    let total_files = valid_paths.len();
    let groups: Vec<Vec<PathBuf>> = if matches.get_flag("combine") {
        group_recordings(valid_paths)
            .into_iter()
            .map(|recording| recording.files)
            .collect()
    } else {
        valid_paths.into_iter().map(|path| vec![path]).collect()
    };

    let mut processed_files = 0;
    for (index, files) in groups.iter().enumerate() {
        if index > 0 {
            println!();
        }

        for path in files {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown");
            println!("Processing: {filename}");
            if export_options.klv_log {
                if let Err(e) = write_klv_log(path, &export_options) {
                    eprintln!("Error writing KLV log for {filename}: {e:#}");
                }
            }
        }

        let inputs: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
        let track = match parse_gpmf_files(&inputs, &build_options) {
            Ok(track) => track,
            Err(e) => {
                eprintln!("Error processing {}: {e:#}", files[0].display());
                eprintln!("Continuing with next file...");
                continue;
            }
        };
        processed_files += files.len();
        println!("{}", track.stats);
        if let Err(e) = report_export(&track, &files[0], &export_options) {
            eprintln!("Error exporting {}: {e:#}", files[0].display());
        }
    }

    if processed_files == 0 {
        eprintln!(
            "Error: No files were successfully processed out of {} files found.",
            total_files
        );
        eprintln!("Use --debug flag for more detailed error information.");
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_klv_log_read_error_names_the_file() {
        let err = write_klv_log(Path::new("/nonexistent/GH010001.bin"), &ExportOptions::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("GH010001.bin"));
    }

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }
}
