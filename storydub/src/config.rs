use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::script::Gender;

/// Language code sent with every synthesis request unless configured otherwise.
pub const DEFAULT_LANGUAGE: &str = "ja-JP";

/// Default voice for male (`M`) lines.
pub const DEFAULT_MALE_VOICE: &str = "ja-JP-Neural2-C";

/// Default voice for female (`F`) lines.
pub const DEFAULT_FEMALE_VOICE: &str = "ja-JP-Neural2-B";

/// Mapping from a script line's gender to the TTS voice that reads it.
///
/// In a config file this is a table keyed by the same single-letter codes the
/// script's `Gender` column uses:
///
/// ```toml
/// [voices]
/// M = "ja-JP-Neural2-C"
/// F = "ja-JP-Neural2-B"
/// ```
///
/// A `[voices]` table replaces the defaults as a whole; a gender left out of
/// it has no voice and lines with that gender fail to synthesize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct VoiceMap {
    voices: BTreeMap<Gender, String>,
}

impl VoiceMap {
    /// An empty map. Use [`VoiceMap::default`] for the built-in voices.
    pub fn new() -> Self {
        Self {
            voices: BTreeMap::new(),
        }
    }

    pub fn with_voice(mut self, gender: Gender, voice: impl Into<String>) -> Self {
        self.voices.insert(gender, voice.into());
        self
    }

    /// The voice configured for `gender`.
    pub fn voice_for(&self, gender: Gender) -> Result<&str> {
        self.voices
            .get(&gender)
            .map(String::as_str)
            .ok_or_else(|| Error::Config(format!("no voice configured for gender \"{gender}\"")))
    }
}

impl Default for VoiceMap {
    fn default() -> Self {
        Self::new()
            .with_voice(Gender::Male, DEFAULT_MALE_VOICE)
            .with_voice(Gender::Female, DEFAULT_FEMALE_VOICE)
    }
}

impl TryFrom<BTreeMap<String, String>> for VoiceMap {
    type Error = Error;

    fn try_from(table: BTreeMap<String, String>) -> Result<Self> {
        let mut voices = BTreeMap::new();
        for (code, voice) in table {
            let gender = Gender::from_code(&code).ok_or_else(|| {
                Error::Config(format!("unknown gender \"{code}\" in voice table — use M or F"))
            })?;
            voices.insert(gender, voice);
        }
        Ok(Self { voices })
    }
}

impl From<VoiceMap> for BTreeMap<String, String> {
    fn from(map: VoiceMap) -> Self {
        map.voices
            .into_iter()
            .map(|(gender, voice)| (gender.code().to_string(), voice))
            .collect()
    }
}

/// Settings read from `config.toml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DubConfig {
    /// Language code for synthesis requests, e.g. "ja-JP".
    pub language: String,
    pub voices: VoiceMap,
    /// How many rows to synthesize at once.
    pub concurrency: usize,
}

impl Default for DubConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            voices: VoiceMap::default(),
            concurrency: 1,
        }
    }
}

impl DubConfig {
    /// Parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config {}: {e}", path.display()))
        })?;
        let config: DubConfig = toml::from_str(&text)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `path` if given, otherwise the per-user config file if one exists,
    /// otherwise the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `~/.config/storydub/config.toml` (or the platform equivalent).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("storydub").join("config.toml"))
    }
}

/// Builder for pipeline options.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Speaking-rate multiplier for synthesis; also divides every line's
    /// trailing silence.
    pub speed: f64,
    /// Ignore any previous run's results and synthesize every line again.
    pub overwrite: bool,
    /// Directory the per-story working directory is created in.
    pub work_root: Option<PathBuf>,
    pub concurrency: usize,
    pub language: String,
    pub voices: VoiceMap,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            overwrite: false,
            work_root: None,
            concurrency: 1,
            language: DEFAULT_LANGUAGE.to_string(),
            voices: VoiceMap::default(),
        }
    }
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded config file.
    pub fn from_config(config: &DubConfig) -> Result<Self> {
        Self::new()
            .language(&config.language)?
            .voices(config.voices.clone())
            .concurrency(config.concurrency)
    }

    /// Set the speed multiplier. Must be finite and positive.
    pub fn speed(mut self, speed: f64) -> Result<Self> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(Error::InvalidOption(format!(
                "speed must be a positive number, got {speed}"
            )));
        }
        self.speed = speed;
        Ok(self)
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn work_root(mut self, dir: PathBuf) -> Self {
        self.work_root = Some(dir);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidOption("concurrency must be at least 1".into()));
        }
        self.concurrency = n;
        Ok(self)
    }

    pub fn language(mut self, lang: &str) -> Result<Self> {
        if lang.trim().is_empty() {
            return Err(Error::InvalidOption("language code must not be empty".into()));
        }
        self.language = lang.to_string();
        Ok(self)
    }

    pub fn voices(mut self, voices: VoiceMap) -> Self {
        self.voices = voices;
        self
    }

    /// Resolve the work root, defaulting to the current directory.
    pub fn resolve_work_root(&self) -> PathBuf {
        self.work_root.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
