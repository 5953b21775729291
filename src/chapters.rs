//! GoPro chapter file ordering
//!
//! Long recordings are split into chapter files. The file name encodes the
//! recording number and the chapter:
//!
//! - `GOPRnnnn`: first chapter of recording `nnnn` (older cameras)
//! - `GPccnnnn`: chapter `cc` of recording `nnnn` (older cameras)
//! - `GHccnnnn` / `GXccnnnn`: chapter `cc` of recording `nnnn` (AVC / HEVC)
//!
//! Chapters must be decoded in recording order before their points are
//! concatenated; directory listings and shell globs sort `GH020001` before
//! `GH010002`, which is wrong.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Parsed chapter file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChapterName {
    pub recording: u32,
    /// 0 for `GOPR` files, which precede `GP01`
    pub chapter: u32,
}

fn chapter_regex() -> &'static Regex {
    static CHAPTER: OnceLock<Regex> = OnceLock::new();
    CHAPTER.get_or_init(|| {
        Regex::new(r"(?i)^(?:GOPR(?P<first>\d{4})|G[HXP](?P<chapter>\d{2})(?P<recording>\d{4}))$")
            .expect("Failed to compile regex")
    })
}

/// Recognise a GoPro chapter name from the file stem
pub fn parse_chapter_name(path: &Path) -> Option<ChapterName> {
    let stem = path.file_stem()?.to_str()?;
    let caps = chapter_regex().captures(stem)?;
    if let Some(first) = caps.name("first") {
        return Some(ChapterName {
            recording: first.as_str().parse().ok()?,
            chapter: 0,
        });
    }
    Some(ChapterName {
        recording: caps.name("recording")?.as_str().parse().ok()?,
        chapter: caps.name("chapter")?.as_str().parse().ok()?,
    })
}

/// Sort inputs into recording order
///
/// Chapter files are ordered by (recording, chapter); other files keep their
/// relative order and go after them.
pub fn sort_chapters(paths: &mut [PathBuf]) {
    paths.sort_by_key(|path| match parse_chapter_name(path) {
        Some(name) => (0, name),
        None => (
            1,
            ChapterName {
                recording: 0,
                chapter: 0,
            },
        ),
    });
}

/// Files that make up one recording, in chapter order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    /// Recording number, `None` for files that are not GoPro chapters
    pub number: Option<u32>,
    pub files: Vec<PathBuf>,
}

/// Sort inputs and group the chapters of each recording together
///
/// Non-chapter files each form their own group.
pub fn group_recordings(mut paths: Vec<PathBuf>) -> Vec<Recording> {
    sort_chapters(&mut paths);
    let mut groups: Vec<Recording> = Vec::new();
    for path in paths {
        let number = parse_chapter_name(&path).map(|name| name.recording);
        match groups.last_mut() {
            Some(group) if number.is_some() && group.number == number => group.files.push(path),
            _ => groups.push(Recording {
                number,
                files: vec![path],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_parse_chapter_names() {
        assert_eq!(
            parse_chapter_name(Path::new("/dcim/GH020042.MP4")),
            Some(ChapterName {
                recording: 42,
                chapter: 2
            })
        );
        assert_eq!(
            parse_chapter_name(Path::new("gx011234.mp4")),
            Some(ChapterName {
                recording: 1234,
                chapter: 1
            })
        );
        assert_eq!(
            parse_chapter_name(Path::new("GOPR0007.MP4")),
            Some(ChapterName {
                recording: 7,
                chapter: 0
            })
        );
        assert_eq!(parse_chapter_name(Path::new("GH01004.MP4")), None);
        assert_eq!(parse_chapter_name(Path::new("holiday.bin")), None);
    }

    #[test]
    fn test_sort_chapters() {
        let mut files = paths(&[
            "GH020001.MP4",
            "notes.bin",
            "GH010002.MP4",
            "GH010001.MP4",
            "GP010003.MP4",
            "GOPR0003.MP4",
        ]);
        sort_chapters(&mut files);
        assert_eq!(
            files,
            paths(&[
                "GH010001.MP4",
                "GH020001.MP4",
                "GH010002.MP4",
                "GOPR0003.MP4",
                "GP010003.MP4",
                "notes.bin",
            ])
        );
    }

    #[test]
    fn test_group_recordings() {
        let groups = group_recordings(paths(&[
            "GX020010.bin",
            "a.bin",
            "GX010010.bin",
            "GX010011.bin",
            "b.bin",
        ]));
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[0].number, Some(10));
        assert_eq!(groups[0].files, paths(&["GX010010.bin", "GX020010.bin"]));
        assert_eq!(groups[1].files, paths(&["GX010011.bin"]));
        assert_eq!(groups[2], Recording { number: None, files: paths(&["a.bin"]) });
        assert_eq!(groups[3].files, paths(&["b.bin"]));
    }
}
