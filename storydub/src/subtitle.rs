//! SubRip (`.srt`) output for dubbed scripts, and timestamp shifting for
//! existing subtitle files.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::info;

use crate::error::Result;
use crate::script::Script;
use crate::timeline;
use crate::timestamp::{ShiftDirection, Timestamp};

/// Matches the timing line of a cue, e.g. `00:00:01,000 --> 00:00:02,500`.
static TIMING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2}:\d{2}:\d{2},\d{3}) --> (\d{2}:\d{2}:\d{2},\d{3})")
        .expect("valid timing regex")
});

/// One subtitle entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    /// 1-based position in the file.
    pub index: usize,
    pub start: Timestamp,
    pub end: Timestamp,
    pub text: String,
}

/// One cue per line of a synthesized, speed-adjusted script. Cue boundaries
/// come from [`timeline::layout`], the same layout the audio is assembled from.
pub fn generate(script: &Script) -> Result<Vec<SubtitleCue>> {
    let slots = timeline::layout(script)?;
    Ok(script
        .rows
        .iter()
        .zip(slots)
        .enumerate()
        .map(|(i, (row, slot))| SubtitleCue {
            index: i + 1,
            start: Timestamp::from_seconds(slot.start),
            end: Timestamp::from_seconds(slot.end),
            text: row.content.clone(),
        })
        .collect())
}

/// Format cues as SRT.
pub fn to_srt(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for cue in cues {
        out.push_str(&format!("{}\n", cue.index));
        out.push_str(&format!("{} --> {}\n", cue.start, cue.end));
        out.push_str(&cue.text);
        out.push_str("\n\n");
    }
    out
}

/// Write cues to `path` as SRT.
pub fn write_srt(cues: &[SubtitleCue], path: &Path) -> Result<()> {
    std::fs::write(path, to_srt(cues))?;
    info!(path = %path.display(), cues = cues.len(), "subtitles written");
    Ok(())
}

/// Shift every `start --> end` timing line in SRT text by `delta`. All other
/// text is left exactly as it was. Backward shifts clamp at zero.
pub fn shift_srt(content: &str, delta: Duration, direction: ShiftDirection) -> Result<String> {
    let mut out = String::with_capacity(content.len());
    let mut last = 0;

    for caps in TIMING_LINE.captures_iter(content) {
        let (Some(whole), Some(start), Some(end)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let start = Timestamp::parse(start.as_str())?.shift(delta, direction);
        let end = Timestamp::parse(end.as_str())?.shift(delta, direction);

        out.push_str(&content[last..whole.start()]);
        out.push_str(&format!("{start} --> {end}"));
        last = whole.end();
    }
    out.push_str(&content[last..]);

    Ok(out)
}

/// Shift a subtitle file. Writes to `output` (forced to a `.srt` extension)
/// or, without one, back over `input`. Returns the path written.
pub fn shift_file(
    input: &Path,
    output: Option<&Path>,
    delta: Duration,
    direction: ShiftDirection,
) -> Result<PathBuf> {
    let content = std::fs::read_to_string(input)?;
    let shifted = shift_srt(&content, delta, direction)?;

    let destination = match output {
        Some(path) => path.with_extension("srt"),
        None => input.to_path_buf(),
    };
    std::fs::write(&destination, shifted)?;

    info!(
        input = %input.display(),
        output = %destination.display(),
        delta_ms = delta.as_millis() as u64,
        ?direction,
        "shifted subtitles"
    );
    Ok(destination)
}

/// The subtitle path that goes with an audio output path: same location and
/// stem, `.srt` extension.
pub fn srt_path_for(audio_path: &Path) -> PathBuf {
    audio_path.with_extension("srt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::script::{Gender, ScriptRow, Synthesized};

    fn synthesized(content: &str, duration: f64, wait: f64) -> ScriptRow {
        let mut row = ScriptRow::new(content, Gender::Female, wait);
        row.synthesized = Some(Synthesized {
            audio_path: PathBuf::from(format!("{content}.mp3")),
            duration,
        });
        row
    }

    #[test]
    fn test_generate_two_rows() {
        let script = Script::new(vec![
            synthesized("first", 1.5, 0.5),
            synthesized("second", 2.0, 0.0),
        ]);
        let cues = generate(&script).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].start.to_string(), "00:00:00,000");
        assert_eq!(cues[0].end.to_string(), "00:00:01,500");
        assert_eq!(cues[1].index, 2);
        assert_eq!(cues[1].start.to_string(), "00:00:02,000");
        assert_eq!(cues[1].end.to_string(), "00:00:04,000");
    }

    #[test]
    fn test_to_srt_format() {
        let script = Script::new(vec![
            synthesized("first", 1.5, 0.5),
            synthesized("second", 2.0, 0.0),
        ]);
        let srt = to_srt(&generate(&script).unwrap());
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,500\nfirst\n\n\
             2\n00:00:02,000 --> 00:00:04,000\nsecond\n\n"
        );
    }

    #[test]
    fn test_generate_starts_non_decreasing() {
        let script = Script::new(vec![
            synthesized("a", 0.0, 0.0),
            synthesized("b", 0.7, 0.3),
            synthesized("c", 1.1, 0.0),
        ]);
        let cues = generate(&script).unwrap();
        for pair in cues.windows(2) {
            assert!(pair[0].start <= pair[1].start);
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_generate_keeps_text_as_written() {
        let script = Script::new(vec![synthesized(" spaced line ", 1.0, 0.0)]);
        let cues = generate(&script).unwrap();
        assert_eq!(cues[0].text, " spaced line ");
    }

    #[test]
    fn test_generate_unsynthesized_fails() {
        let script = Script::new(vec![ScriptRow::new("a", Gender::Male, 0.0)]);
        assert!(matches!(generate(&script), Err(Error::InvalidScript { .. })));
    }

    #[test]
    fn test_shift_forward_one_hour() {
        let srt = "1\n00:00:10,000 --> 00:00:12,000\nHello\n\n";
        let shifted = shift_srt(srt, Duration::from_secs(3600), ShiftDirection::Forward).unwrap();
        assert_eq!(shifted, "1\n01:00:10,000 --> 01:00:12,000\nHello\n\n");
    }

    #[test]
    fn test_shift_backward_clamps() {
        let srt = "1\n00:00:01,000 --> 00:00:03,000\nHi\n\n";
        let shifted = shift_srt(srt, Duration::from_secs(2), ShiftDirection::Backward).unwrap();
        assert_eq!(shifted, "1\n00:00:00,000 --> 00:00:01,000\nHi\n\n");
    }

    #[test]
    fn test_shift_leaves_other_text_alone() {
        let srt = "1\r\n00:00:01,000 --> 00:00:02,000\r\nAt 00:00:01,000 sharp\r\n\r\n";
        let shifted = shift_srt(srt, Duration::from_secs(1), ShiftDirection::Forward).unwrap();
        assert_eq!(
            shifted,
            "1\r\n00:00:02,000 --> 00:00:03,000\r\nAt 00:00:01,000 sharp\r\n\r\n"
        );
    }

    #[test]
    fn test_shift_rejects_out_of_range_fields() {
        let srt = "1\n00:75:00,000 --> 00:76:00,000\nbad\n";
        let err = shift_srt(srt, Duration::from_secs(1), ShiftDirection::Forward).unwrap_err();
        assert!(matches!(err, Error::InvalidTimestamp(_)));
    }

    #[test]
    fn test_shift_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.srt");
        std::fs::write(&path, "1\n00:00:10,000 --> 00:00:12,000\nHello\n\n").unwrap();

        let written = shift_file(&path, None, Duration::from_secs(60), ShiftDirection::Forward).unwrap();
        assert_eq!(written, path);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("00:01:10,000 --> 00:01:12,000"));
    }

    #[test]
    fn test_shift_file_forces_srt_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.srt");
        std::fs::write(&input, "1\n00:00:10,000 --> 00:00:12,000\nHello\n\n").unwrap();

        let requested = dir.path().join("shifted.txt");
        let written = shift_file(
            &input,
            Some(&requested),
            Duration::from_secs(5),
            ShiftDirection::Backward,
        )
        .unwrap();
        assert_eq!(written, dir.path().join("shifted.srt"));
        let content = std::fs::read_to_string(&written).unwrap();
        assert!(content.contains("00:00:05,000 --> 00:00:07,000"));
        // Input untouched.
        let original = std::fs::read_to_string(&input).unwrap();
        assert!(original.contains("00:00:10,000 --> 00:00:12,000"));
    }

    #[test]
    fn test_srt_path_for() {
        assert_eq!(srt_path_for(Path::new("out/story.mp3")), PathBuf::from("out/story.srt"));
    }
}
