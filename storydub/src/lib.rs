//! Story script in, narrated audio and matching subtitles out.
//!
//! **storydub** reads a CSV script of lines (text, speaker gender, pause after
//! the line), synthesizes each line with Google Cloud Text-to-Speech, joins the
//! clips with their pauses into one audio file (via ffmpeg) and writes an SRT
//! file whose cues line up exactly with the audio. Synthesized clips are cached
//! in a per-story working directory so re-runs skip the TTS calls.
//!
//! It also ships the two small tools the pipeline is built from: an SRT
//! timestamp shifter and a one-shot TTS client.
//!
//! # Quick start
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> storydub::Result<()> {
//! use storydub::PipelineOptions;
//!
//! let options = PipelineOptions::new().speed(1.25)?;
//! let output = storydub::dub_story("story.csv", "story.mp3", &options).await?;
//! println!("wrote {} and {}", output.audio_path.display(), output.subtitle_path.display());
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod script;
pub mod subtitle;
pub mod timeline;
pub mod timestamp;
pub mod tts;

pub use audio::{AudioCodec, AudioFormat, Ffmpeg};
pub use cache::ScriptCache;
pub use config::{DubConfig, PipelineOptions, VoiceMap};
pub use error::{Error, Result};
pub use pipeline::{DubOutput, Pipeline};
pub use script::{Gender, Script, ScriptRow};
pub use subtitle::SubtitleCue;
pub use timestamp::{ShiftDirection, Timestamp};
pub use tts::{AudioEncoding, Credentials, GoogleTts, SynthesisRequest, Synthesizer};

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Dub a story with Google Cloud TTS (credentials from the environment) and
/// ffmpeg.
pub async fn dub_story(
    story_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    options: &PipelineOptions,
) -> Result<DubOutput> {
    let tts = GoogleTts::from_env()?;
    dub_story_with(&tts, story_path, output_path, options).await
}

/// Dub a story with the given synthesizer and ffmpeg.
pub async fn dub_story_with(
    synthesizer: &impl Synthesizer,
    story_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    options: &PipelineOptions,
) -> Result<DubOutput> {
    Pipeline::new(synthesizer, &Ffmpeg, options)
        .run(story_path.as_ref(), output_path.as_ref())
        .await
}

/// Shift every timestamp in an SRT file. See [`subtitle::shift_file`].
pub fn shift_subtitles(
    input: impl AsRef<Path>,
    output: Option<&Path>,
    delta: Duration,
    direction: ShiftDirection,
) -> Result<PathBuf> {
    subtitle::shift_file(input.as_ref(), output, delta, direction)
}
