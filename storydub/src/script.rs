//! The story script: an ordered list of narrated lines read from CSV.
//!
//! Input columns are `Content`, `Gender` (`M`/`F`) and `EndWaitTime` (seconds
//! of silence after the line). Once a line has been synthesized it also carries
//! `audio_path` and `duration`, which is what the resume cache stores. Any
//! other columns are kept as-is and written back out.

use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const COL_CONTENT: &str = "Content";
const COL_GENDER: &str = "Gender";
const COL_END_WAIT: &str = "EndWaitTime";
const COL_AUDIO_PATH: &str = "audio_path";
const COL_DURATION: &str = "duration";

/// Speaker gender of a line. Selects the voice via [`crate::VoiceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Parse the single-letter code used in scripts and config files.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of synthesizing one line.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesized {
    pub audio_path: PathBuf,
    /// Length of the audio in seconds.
    pub duration: f64,
}

/// One narrated line.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptRow {
    pub content: String,
    pub gender: Gender,
    /// Seconds of silence after the line.
    pub end_wait_time: f64,
    /// Set once the line has been synthesized.
    pub synthesized: Option<Synthesized>,
    /// Values of the script's extra columns, in [`Script::extra_columns`] order.
    pub extra: Vec<String>,
}

impl ScriptRow {
    pub fn new(content: impl Into<String>, gender: Gender, end_wait_time: f64) -> Self {
        Self {
            content: content.into(),
            gender,
            end_wait_time,
            synthesized: None,
            extra: Vec::new(),
        }
    }

    pub fn audio_path(&self) -> Option<&Path> {
        self.synthesized.as_ref().map(|s| s.audio_path.as_path())
    }

    pub fn duration(&self) -> Option<f64> {
        self.synthesized.as_ref().map(|s| s.duration)
    }
}

/// An ordered script. Row order is playback order and is never changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    pub rows: Vec<ScriptRow>,
    /// Names of input columns this crate does not interpret.
    pub extra_columns: Vec<String>,
}

impl Script {
    pub fn new(rows: Vec<ScriptRow>) -> Self {
        Self {
            rows,
            extra_columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether every row has audio and a duration.
    pub fn is_fully_synthesized(&self) -> bool {
        self.rows.iter().all(|r| r.synthesized.is_some())
    }

    /// Read a script from a CSV file.
    pub fn read_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ScriptNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                Error::Io(e)
            }
        })?;
        Self::read_from(file)
    }

    /// Read a script from CSV. Validates every row up front.
    pub fn read_from(reader: impl Read) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = rdr.headers()?.clone();

        let find = |name: &str| headers.iter().position(|h| h.trim_start_matches('\u{feff}') == name);
        let missing = |name: &str| Error::InvalidScript {
            row: 0,
            message: format!("missing required column \"{name}\""),
        };

        let content_idx = find(COL_CONTENT).ok_or_else(|| missing(COL_CONTENT))?;
        let gender_idx = find(COL_GENDER).ok_or_else(|| missing(COL_GENDER))?;
        let wait_idx = find(COL_END_WAIT).ok_or_else(|| missing(COL_END_WAIT))?;
        let audio_idx = find(COL_AUDIO_PATH);
        let duration_idx = find(COL_DURATION);

        let known = [Some(content_idx), Some(gender_idx), Some(wait_idx), audio_idx, duration_idx];
        let extra_idx: Vec<usize> = (0..headers.len())
            .filter(|i| !known.contains(&Some(*i)))
            .collect();
        let extra_columns = extra_idx.iter().map(|&i| headers[i].to_string()).collect();

        let mut rows = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            let row = i + 1;
            let field = |idx: usize| record.get(idx).unwrap_or("");
            let optional = |idx: Option<usize>| idx.map(field).filter(|v| !v.trim().is_empty());

            let content = field(content_idx).to_string();
            if content.trim().is_empty() {
                return Err(Error::InvalidScript {
                    row,
                    message: "Content is empty".into(),
                });
            }

            let gender_code = field(gender_idx).trim();
            let gender = Gender::from_code(gender_code).ok_or_else(|| {
                Error::Config(format!(
                    "row {row}: unknown gender \"{gender_code}\" — use M or F"
                ))
            })?;

            let end_wait_time = parse_seconds(field(wait_idx), COL_END_WAIT, row)?;

            let synthesized = match (optional(audio_idx), optional(duration_idx)) {
                (Some(path), Some(duration)) => Some(Synthesized {
                    audio_path: PathBuf::from(path),
                    duration: parse_seconds(duration, COL_DURATION, row)?,
                }),
                (None, None) => None,
                _ => {
                    return Err(Error::InvalidScript {
                        row,
                        message: "audio_path and duration must both be set or both be empty".into(),
                    })
                }
            };

            let extra = extra_idx.iter().map(|&idx| field(idx).to_string()).collect();

            rows.push(ScriptRow {
                content,
                gender,
                end_wait_time,
                synthesized,
                extra,
            });
        }

        Ok(Self {
            rows,
            extra_columns,
        })
    }

    /// Write the script as CSV, including the synthesis columns.
    pub fn write_path(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_to(file)
    }

    pub fn write_to(&self, writer: impl Write) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec![COL_CONTENT, COL_GENDER, COL_END_WAIT];
        header.extend(self.extra_columns.iter().map(String::as_str));
        header.extend([COL_AUDIO_PATH, COL_DURATION]);
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![
                row.content.clone(),
                row.gender.code().to_string(),
                row.end_wait_time.to_string(),
            ];
            for i in 0..self.extra_columns.len() {
                record.push(row.extra.get(i).cloned().unwrap_or_default());
            }
            match &row.synthesized {
                Some(s) => {
                    record.push(s.audio_path.to_string_lossy().into_owned());
                    record.push(s.duration.to_string());
                }
                None => record.extend([String::new(), String::new()]),
            }
            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

fn parse_seconds(value: &str, column: &str, row: usize) -> Result<f64> {
    let seconds: f64 = value.trim().parse().map_err(|_| Error::InvalidScript {
        row,
        message: format!("{column} is not a number: \"{value}\""),
    })?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(Error::InvalidScript {
            row,
            message: format!("{column} must be a non-negative number of seconds, got {value}"),
        });
    }
    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORY: &str = "Content,Gender,EndWaitTime\n\
                         こんにちは,F,0.5\n\
                         \"Hello, world\",M,0\n";

    #[test]
    fn test_read_basic() {
        let script = Script::read_from(STORY.as_bytes()).unwrap();
        assert_eq!(script.len(), 2);
        assert_eq!(script.rows[0].content, "こんにちは");
        assert_eq!(script.rows[0].gender, Gender::Female);
        assert_eq!(script.rows[0].end_wait_time, 0.5);
        assert_eq!(script.rows[1].content, "Hello, world");
        assert_eq!(script.rows[1].gender, Gender::Male);
        assert!(!script.is_fully_synthesized());
        assert!(script.extra_columns.is_empty());
    }

    #[test]
    fn test_read_with_synthesis_columns() {
        let csv = "Content,Gender,EndWaitTime,audio_path,duration\n\
                   a,M,1.0,story/0-a.mp3,1.5\n";
        let script = Script::read_from(csv.as_bytes()).unwrap();
        assert!(script.is_fully_synthesized());
        assert_eq!(script.rows[0].audio_path(), Some(Path::new("story/0-a.mp3")));
        assert_eq!(script.rows[0].duration(), Some(1.5));
    }

    #[test]
    fn test_read_unknown_gender_is_config_error() {
        let csv = "Content,Gender,EndWaitTime\nhi,X,0\n";
        let err = Script::read_from(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_read_missing_column() {
        let csv = "Content,Gender\nhi,M\n";
        let err = Script::read_from(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("EndWaitTime"));
    }

    #[test]
    fn test_read_rejects_negative_wait() {
        let csv = "Content,Gender,EndWaitTime\nhi,M,-1\n";
        let err = Script::read_from(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidScript { row: 1, .. }));
    }

    #[test]
    fn test_read_rejects_non_numeric_wait() {
        let csv = "Content,Gender,EndWaitTime\nhi,M,0.5\nbye,F,soon\n";
        let err = Script::read_from(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidScript { row: 2, .. }));
    }

    #[test]
    fn test_read_rejects_empty_content() {
        let csv = "Content,Gender,EndWaitTime\n,M,0\n";
        assert!(Script::read_from(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_read_rejects_half_synthesized_row() {
        let csv = "Content,Gender,EndWaitTime,audio_path,duration\nhi,M,0,a.mp3,\n";
        let err = Script::read_from(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidScript { .. }));
    }

    #[test]
    fn test_read_strips_bom() {
        let csv = "\u{feff}Content,Gender,EndWaitTime\nhi,M,0\n";
        let script = Script::read_from(csv.as_bytes()).unwrap();
        assert_eq!(script.len(), 1);
    }

    #[test]
    fn test_write_then_read_preserves_rows_and_extra_columns() {
        let csv = "Scene,Content,Gender,EndWaitTime\nintro,hi,M,0.25\n";
        let mut script = Script::read_from(csv.as_bytes()).unwrap();
        assert_eq!(script.extra_columns, vec!["Scene".to_string()]);
        script.rows[0].synthesized = Some(Synthesized {
            audio_path: PathBuf::from("work/0-hi.mp3"),
            duration: 1.25,
        });

        let mut out = Vec::new();
        script.write_to(&mut out).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with("Content,Gender,EndWaitTime,Scene,audio_path,duration\n"));

        let reread = Script::read_from(out.as_slice()).unwrap();
        assert_eq!(reread, script);
    }

    #[test]
    fn test_write_unsynthesized_rows_leave_columns_empty() {
        let script = Script::new(vec![ScriptRow::new("hi", Gender::Female, 1.0)]);
        let mut out = Vec::new();
        script.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("hi,F,1,,\n"));
    }

    #[test]
    fn test_read_path_not_found() {
        let err = Script::read_path(Path::new("/nonexistent/story.csv")).unwrap_err();
        assert!(matches!(err, Error::ScriptNotFound { .. }));
    }
}
