use std::fmt;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::script::Script;
use crate::timeline;

/// Sample rate every segment is decoded to before assembly. Matches the native
/// rate of the Cloud TTS neural voices.
pub const SAMPLE_RATE: u32 = 24_000;

/// Container formats the combined track can be exported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
    Ogg,
}

impl AudioFormat {
    /// Parse a format name or file extension, case-insensitively.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "wav" => Ok(AudioFormat::Wav),
            "flac" => Ok(AudioFormat::Flac),
            "ogg" => Ok(AudioFormat::Ogg),
            _ => Err(Error::UnsupportedFormat {
                format: name.to_string(),
            }),
        }
    }

    /// The format selected by a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(&ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
        }
    }

    /// ffmpeg encoder arguments for this format.
    fn ffmpeg_codec_args(&self) -> &'static [&'static str] {
        match self {
            AudioFormat::Mp3 => &["-c:a", "libmp3lame", "-q:a", "2"],
            AudioFormat::Wav => &["-c:a", "pcm_s16le"],
            AudioFormat::Flac => &["-c:a", "flac"],
            AudioFormat::Ogg => &["-c:a", "libvorbis", "-q:a", "5"],
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Mono signed 16-bit PCM at [`SAMPLE_RATE`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pcm {
    pub samples: Vec<i16>,
}

impl Pcm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// `seconds` of digital silence, rounded to the nearest sample.
    pub fn silence(seconds: f64) -> Self {
        Self {
            samples: vec![0; seconds_to_samples(seconds)],
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / SAMPLE_RATE as f64
    }

    pub fn append(&mut self, other: &Pcm) {
        self.samples.extend_from_slice(&other.samples);
    }

    /// Extend with silence until the track is `seconds` long. Never shortens.
    pub fn pad_to(&mut self, seconds: f64) {
        let target = seconds_to_samples(seconds);
        if target > self.samples.len() {
            self.samples.resize(target, 0);
        }
    }

    /// Interpret raw little-endian s16 bytes. A trailing odd byte is dropped.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
            .collect();
        Self { samples }
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

fn seconds_to_samples(seconds: f64) -> usize {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * SAMPLE_RATE as f64).round() as usize
}

/// Decodes segment files and encodes the combined track.
pub trait AudioCodec {
    /// Decode a file to mono PCM at [`SAMPLE_RATE`].
    fn decode(&self, path: &Path) -> Result<Pcm>;

    /// Encode PCM into `path` using `format`.
    fn encode(&self, pcm: &Pcm, path: &Path, format: AudioFormat) -> Result<()>;

    /// Length of an audio file in seconds.
    fn duration(&self, path: &Path) -> Result<f64> {
        Ok(self.decode(path)?.duration_secs())
    }
}

/// [`AudioCodec`] backed by the `ffmpeg` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ffmpeg;

impl AudioCodec for Ffmpeg {
    /// Uses ffmpeg to decode any audio format, downmix to mono and resample,
    /// emitting raw s16le on stdout.
    fn decode(&self, path: &Path) -> Result<Pcm> {
        if !path.exists() {
            return Err(Error::AudioDecode(format!(
                "audio file not found: {}",
                path.display()
            )));
        }

        let output = Command::new("ffmpeg")
            .args(["-nostdin", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .args([
                "-f",
                "s16le",
                "-ac",
                "1",
                "-acodec",
                "pcm_s16le",
                "-ar",
                &SAMPLE_RATE.to_string(),
                "-",
            ])
            .output()
            .map_err(|e| Error::AudioDecode(ffmpeg_spawn_message(&e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::AudioDecode(format!(
                "ffmpeg failed on {}: {}",
                path.display(),
                stderr.trim()
            )));
        }

        if output.stdout.is_empty() {
            return Err(Error::AudioDecode(format!(
                "ffmpeg produced no audio for {}",
                path.display()
            )));
        }

        let pcm = Pcm::from_le_bytes(&output.stdout);
        debug!(
            path = %path.display(),
            samples = pcm.len(),
            duration_secs = format!("{:.3}", pcm.duration_secs()),
            "decoded audio"
        );
        Ok(pcm)
    }

    /// Pipes raw s16le into ffmpeg's stdin and lets it encode to `format`.
    fn encode(&self, pcm: &Pcm, path: &Path, format: AudioFormat) -> Result<()> {
        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "s16le", "-ar", &SAMPLE_RATE.to_string(), "-ac", "1"])
            .args(["-i", "pipe:0"])
            .args(format.ffmpeg_codec_args())
            .args(["-f", format.extension()])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::AudioEncode(ffmpeg_spawn_message(&e)))?;

        // stdin is closed when dropped at the end of this block.
        let write_result = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&pcm.to_le_bytes()),
            None => Ok(()),
        };

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::AudioEncode(format!(
                "ffmpeg failed to write {}: {}",
                path.display(),
                stderr.trim()
            )));
        }
        write_result?;

        info!(
            path = %path.display(),
            %format,
            duration_secs = format!("{:.3}", pcm.duration_secs()),
            "audio exported"
        );
        Ok(())
    }
}

fn ffmpeg_spawn_message(e: &std::io::Error) -> String {
    if e.kind() == std::io::ErrorKind::NotFound {
        "ffmpeg not found — install with: apt install ffmpeg".into()
    } else {
        format!("failed to run ffmpeg: {e}")
    }
}

/// Concatenate every line's audio in script order, each followed by its
/// trailing silence. Pass the speed-adjusted script: gaps are taken from
/// `end_wait_time` as-is.
///
/// Lines are placed on the same [`timeline::layout`] the subtitles use, so a
/// segment shorter than its recorded duration is padded and later lines stay in
/// sync. A segment longer than its duration plus gap delays every later line.
pub fn assemble(script: &Script, codec: &impl AudioCodec) -> Result<Pcm> {
    let slots = timeline::layout(script)?;
    let mut combined = Pcm::new();

    for (i, (row, slot)) in script.rows.iter().zip(&slots).enumerate() {
        let Some(path) = row.audio_path() else {
            return Err(Error::InvalidScript {
                row: i + 1,
                message: "line has no audio".into(),
            });
        };
        combined.pad_to(slot.start);
        let segment = codec.decode(path)?;
        combined.append(&segment);
        combined.pad_to(slot.next);
    }

    debug!(
        lines = script.len(),
        duration_secs = format!("{:.3}", combined.duration_secs()),
        "assembled track"
    );
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::*;
    use crate::script::{Gender, ScriptRow, Synthesized};

    /// Codec that serves fixed PCM per path.
    struct FakeCodec {
        segments: HashMap<PathBuf, Pcm>,
    }

    impl AudioCodec for FakeCodec {
        fn decode(&self, path: &Path) -> Result<Pcm> {
            self.segments
                .get(path)
                .cloned()
                .ok_or_else(|| Error::AudioDecode(format!("no segment {}", path.display())))
        }

        fn encode(&self, _pcm: &Pcm, _path: &Path, _format: AudioFormat) -> Result<()> {
            Ok(())
        }
    }

    fn tone(seconds: f64, value: i16) -> Pcm {
        Pcm::from_samples(vec![value; seconds_to_samples(seconds)])
    }

    fn row(name: &str, duration: f64, wait: f64) -> ScriptRow {
        let mut row = ScriptRow::new(name, Gender::Male, wait);
        row.synthesized = Some(Synthesized {
            audio_path: PathBuf::from(name),
            duration,
        });
        row
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(AudioFormat::parse("mp3").unwrap(), AudioFormat::Mp3);
        assert_eq!(AudioFormat::parse("WAV").unwrap(), AudioFormat::Wav);
        assert_eq!(AudioFormat::parse("flac").unwrap(), AudioFormat::Flac);
        assert_eq!(AudioFormat::parse("ogg").unwrap(), AudioFormat::Ogg);
        assert!(matches!(
            AudioFormat::parse("aac"),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            AudioFormat::from_path(Path::new("out/my.story.flac")).unwrap(),
            AudioFormat::Flac
        );
        assert!(AudioFormat::from_path(Path::new("out/story")).is_err());
    }

    #[test]
    fn test_silence_length() {
        let pcm = Pcm::silence(0.5);
        assert_eq!(pcm.len(), 12_000);
        assert!(pcm.samples.iter().all(|&s| s == 0));
        assert!(Pcm::silence(0.0).is_empty());
        assert!(Pcm::silence(-1.0).is_empty());
    }

    #[test]
    fn test_pad_to_never_shortens() {
        let mut pcm = tone(1.0, 7);
        pcm.pad_to(0.5);
        assert_eq!(pcm.len(), 24_000);
        pcm.pad_to(1.5);
        assert_eq!(pcm.len(), 36_000);
        assert_eq!(pcm.samples[30_000], 0);
    }

    #[test]
    fn test_le_bytes_round_trip() {
        let pcm = Pcm::from_samples(vec![0, 1, -1, i16::MAX, i16::MIN]);
        assert_eq!(Pcm::from_le_bytes(&pcm.to_le_bytes()), pcm);
        // Odd trailing byte ignored.
        let mut bytes = pcm.to_le_bytes();
        bytes.push(9);
        assert_eq!(Pcm::from_le_bytes(&bytes), pcm);
    }

    #[test]
    fn test_assemble_places_gaps() {
        let codec = FakeCodec {
            segments: HashMap::from([
                (PathBuf::from("a"), tone(1.5, 100)),
                (PathBuf::from("b"), tone(2.0, 200)),
            ]),
        };
        let script = Script::new(vec![row("a", 1.5, 0.5), row("b", 2.0, 0.0)]);

        let pcm = assemble(&script, &codec).unwrap();
        assert_eq!(pcm.len(), 96_000);
        assert_eq!(pcm.samples[0], 100);
        assert_eq!(pcm.samples[35_999], 100);
        assert_eq!(pcm.samples[36_000], 0);
        assert_eq!(pcm.samples[47_999], 0);
        assert_eq!(pcm.samples[48_000], 200);
        assert_eq!(pcm.samples[95_999], 200);
    }

    #[test]
    fn test_assemble_trailing_gap_kept() {
        let codec = FakeCodec {
            segments: HashMap::from([(PathBuf::from("a"), tone(1.0, 1))]),
        };
        let script = Script::new(vec![row("a", 1.0, 1.0)]);
        let pcm = assemble(&script, &codec).unwrap();
        assert!((pcm.duration_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_assemble_short_segment_keeps_slot() {
        let codec = FakeCodec {
            segments: HashMap::from([
                (PathBuf::from("a"), tone(1.0, 100)),
                (PathBuf::from("b"), tone(1.0, 200)),
            ]),
        };
        let script = Script::new(vec![row("a", 1.5, 0.5), row("b", 1.0, 0.0)]);

        let pcm = assemble(&script, &codec).unwrap();
        assert_eq!(pcm.samples[47_999], 0);
        assert_eq!(pcm.samples[48_000], 200);
    }

    #[test]
    fn test_assemble_long_segment_delays_later_lines() {
        let codec = FakeCodec {
            segments: HashMap::from([
                (PathBuf::from("a"), tone(3.0, 100)),
                (PathBuf::from("b"), tone(1.0, 200)),
            ]),
        };
        let script = Script::new(vec![row("a", 1.5, 0.5), row("b", 1.0, 0.0)]);

        let pcm = assemble(&script, &codec).unwrap();
        assert_eq!(pcm.samples[71_999], 100);
        assert_eq!(pcm.samples[72_000], 200);
        assert_eq!(pcm.len(), 96_000);
    }

    #[test]
    fn test_assemble_missing_segment_fails() {
        let codec = FakeCodec {
            segments: HashMap::new(),
        };
        let script = Script::new(vec![row("a", 1.0, 0.0)]);
        assert!(matches!(
            assemble(&script, &codec),
            Err(Error::AudioDecode(_))
        ));
    }

    #[test]
    fn test_ffmpeg_decode_nonexistent() {
        let result = Ffmpeg.decode(Path::new("/nonexistent/audio.mp3"));
        assert!(matches!(result, Err(Error::AudioDecode(_))));
    }

    #[test]
    #[ignore = "requires ffmpeg"]
    fn test_ffmpeg_encode_then_decode() {
        let dir = tempfile::tempdir().unwrap();
        for format in [AudioFormat::Wav, AudioFormat::Flac, AudioFormat::Mp3, AudioFormat::Ogg] {
            let path = dir.path().join(format!("tone.{format}"));
            Ffmpeg.encode(&tone(1.0, 1000), &path, format).unwrap();
            let duration = Ffmpeg.duration(&path).unwrap();
            assert!((duration - 1.0).abs() < 0.1, "{format}: {duration}");
        }
    }

    #[test]
    #[ignore = "requires ffmpeg"]
    fn test_ffmpeg_rejects_non_audio_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_audio.txt");
        std::fs::write(&path, "this is not audio").unwrap();
        assert!(Ffmpeg.decode(&path).is_err());
    }
}
