use std::path::{Path, PathBuf};

use futures_util::{stream, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::audio::{self, AudioCodec, AudioFormat};
use crate::cache::ScriptCache;
use crate::config::PipelineOptions;
use crate::error::{Error, Result};
use crate::script::{Script, ScriptRow, Synthesized};
use crate::subtitle;
use crate::tts::{AudioEncoding, SynthesisRequest, Synthesizer};

/// Characters of a line's text used in its audio file name.
const SNIPPET_CHARS: usize = 10;

/// What a pipeline run produced.
#[derive(Debug, Clone)]
pub struct DubOutput {
    pub audio_path: PathBuf,
    pub subtitle_path: PathBuf,
    pub work_dir: PathBuf,
    pub lines: usize,
    /// Lines sent to the synthesizer during this run; 0 on resume.
    pub synthesized: usize,
    pub resumed: bool,
    /// Length of the combined track in seconds.
    pub duration: f64,
}

/// Turns a story script into one narrated audio file plus matching subtitles.
pub struct Pipeline<'a, S, C> {
    synthesizer: &'a S,
    codec: &'a C,
    options: &'a PipelineOptions,
}

impl<'a, S: Synthesizer, C: AudioCodec> Pipeline<'a, S, C> {
    pub fn new(synthesizer: &'a S, codec: &'a C, options: &'a PipelineOptions) -> Self {
        Self {
            synthesizer,
            codec,
            options,
        }
    }

    /// Run the whole pipeline for `story_path`, writing the combined audio to
    /// `output_path` (its extension picks the format) and subtitles next to it.
    ///
    /// A previous run's working directory is reused unless `overwrite` is set.
    /// On failure, audio files and a cache already written stay on disk.
    pub async fn run(&self, story_path: &Path, output_path: &Path) -> Result<DubOutput> {
        let format = AudioFormat::from_path(output_path)?;

        let cache = ScriptCache::for_script(&self.options.resolve_work_root(), story_path)?;
        cache.prepare()?;

        let (script, synthesized, resumed) = match self.resume(&cache, story_path)? {
            Some(script) => (script, 0, true),
            None => {
                let script = Script::read_path(story_path)?;
                let script = self.synthesize_script(script, cache.work_dir()).await?;
                cache.save(&script, Some(story_path))?;
                let count = script.len();
                (script, count, false)
            }
        };

        let adjusted = adjust_timing(&script, self.options.speed);

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let combined = audio::assemble(&adjusted, self.codec)?;
        self.codec.encode(&combined, output_path, format)?;

        let subtitle_path = subtitle::srt_path_for(output_path);
        let cues = subtitle::generate(&adjusted)?;
        subtitle::write_srt(&cues, &subtitle_path)?;

        info!(
            audio = %output_path.display(),
            subtitles = %subtitle_path.display(),
            lines = adjusted.len(),
            resumed,
            "dub complete"
        );

        Ok(DubOutput {
            audio_path: output_path.to_path_buf(),
            subtitle_path,
            work_dir: cache.work_dir().to_path_buf(),
            lines: adjusted.len(),
            synthesized,
            resumed,
            duration: combined.duration_secs(),
        })
    }

    /// The cached script, if this run should resume from one.
    fn resume(&self, cache: &ScriptCache, story_path: &Path) -> Result<Option<Script>> {
        if self.options.overwrite {
            debug!("overwrite requested, ignoring any cached script");
            return Ok(None);
        }
        if !cache.has_prior_run()? {
            return Ok(None);
        }
        match cache.load()? {
            Some(script) => {
                cache.source_matches(story_path);
                Ok(Some(script))
            }
            None => {
                warn!(
                    work_dir = %cache.work_dir().display(),
                    "working directory is not empty but has no cached script — synthesizing"
                );
                Ok(None)
            }
        }
    }

    /// Synthesize every line, at most `concurrency` at a time. Rows come back
    /// in script order.
    pub async fn synthesize_script(&self, script: Script, work_dir: &Path) -> Result<Script> {
        if script.is_empty() {
            return Err(Error::InvalidScript {
                row: 0,
                message: "script has no lines".into(),
            });
        }

        info!(lines = script.len(), work_dir = %work_dir.display(), "synthesizing script");
        let pb = progress_bar(script.len() as u64);

        let Script {
            rows,
            extra_columns,
        } = script;

        let rows: Vec<ScriptRow> = stream::iter(rows.into_iter().enumerate())
            .map(|(index, row)| self.process_row(index, row, work_dir))
            .buffered(self.options.concurrency.max(1))
            .inspect_ok(|_| pb.inc(1))
            .try_collect()
            .await?;

        pb.finish_with_message("Synthesis complete");
        Ok(Script {
            rows,
            extra_columns,
        })
    }

    /// Synthesize one line into `work_dir` and record its audio path and
    /// duration. Any earlier synthesis result on the row is replaced.
    pub async fn process_row(
        &self,
        index: usize,
        mut row: ScriptRow,
        work_dir: &Path,
    ) -> Result<ScriptRow> {
        let voice = self.options.voices.voice_for(row.gender)?;
        let request = SynthesisRequest {
            text: row.content.clone(),
            language: self.options.language.clone(),
            voice: voice.to_string(),
            speaking_rate: self.options.speed,
            encoding: AudioEncoding::Mp3,
        };

        let audio = self.synthesizer.synthesize(&request).await?;

        let audio_path = work_dir.join(segment_file_name(index, &row.content));
        tokio::fs::write(&audio_path, &audio).await?;
        let duration = self.codec.duration(&audio_path)?;

        debug!(
            index,
            path = %audio_path.display(),
            duration_secs = format!("{duration:.3}"),
            "line synthesized"
        );

        row.synthesized = Some(Synthesized {
            audio_path,
            duration,
        });
        Ok(row)
    }
}

/// A copy of `script` with every `end_wait_time` divided by `speed`. The input
/// keeps the authored values, so the cache never sees adjusted gaps and the
/// adjustment is applied once per run.
pub fn adjust_timing(script: &Script, speed: f64) -> Script {
    let mut adjusted = script.clone();
    for row in &mut adjusted.rows {
        row.end_wait_time /= speed;
    }
    adjusted
}

/// `<index>-<first characters of the text>.mp3`, with characters that are
/// unsafe in file names replaced by `_`.
pub fn segment_file_name(index: usize, content: &str) -> String {
    let snippet: String = content
        .chars()
        .take(SNIPPET_CHARS)
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{index}-{snippet}.{}", AudioEncoding::Mp3.extension())
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} lines ({eta})")
            .expect("valid template")
            .progress_chars("#>-"),
    );
    pb.set_message("Synthesizing lines");
    pb
}
