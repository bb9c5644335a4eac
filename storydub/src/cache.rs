//! Per-story working directory holding synthesized audio and the resume cache.
//!
//! Layout of `<work_root>/<story name>/`:
//! - `<index>-<snippet>.mp3`, one per line
//! - `updated_story.csv`, the script with `audio_path` and `duration` filled in
//! - `source.sha256`, hash of the script the cache was built from
//!
//! A cached script is trusted as-is on resume: referenced audio files and
//! durations are not re-checked. The hash only produces a warning when the
//! input script has changed since the cache was written.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::script::Script;

/// File name of the resume cache inside the working directory.
pub const CACHE_FILE: &str = "updated_story.csv";

/// File name of the source-script hash inside the working directory.
pub const SOURCE_HASH_FILE: &str = "source.sha256";

/// The working directory of one story.
#[derive(Debug, Clone)]
pub struct ScriptCache {
    work_dir: PathBuf,
}

impl ScriptCache {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// The cache for `script_path`, in a directory under `work_root` named
    /// after the script file up to its first `.` (`story.v2.csv` → `story`).
    pub fn for_script(work_root: &Path, script_path: &Path) -> Result<Self> {
        Ok(Self::new(work_root.join(work_dir_name(script_path)?)))
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn cache_path(&self) -> PathBuf {
        self.work_dir.join(CACHE_FILE)
    }

    fn hash_path(&self) -> PathBuf {
        self.work_dir.join(SOURCE_HASH_FILE)
    }

    /// Create the working directory if needed.
    pub fn prepare(&self) -> Result<()> {
        std::fs::create_dir_all(&self.work_dir)?;
        Ok(())
    }

    /// Whether a previous run left anything in the working directory.
    pub fn has_prior_run(&self) -> Result<bool> {
        match std::fs::read_dir(&self.work_dir) {
            Ok(mut entries) => Ok(entries.next().is_some()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// The cached script, or `None` if there is no cache file.
    pub fn load(&self) -> Result<Option<Script>> {
        let path = self.cache_path();
        if !path.is_file() {
            debug!(path = %path.display(), "no cached script");
            return Ok(None);
        }

        let script = Script::read_path(&path)?;
        if let Some(i) = script.rows.iter().position(|r| r.synthesized.is_none()) {
            return Err(Error::InvalidScript {
                row: i + 1,
                message: format!("cached script {} has a line without audio", path.display()),
            });
        }

        info!(path = %path.display(), lines = script.len(), "loaded cached script");
        Ok(Some(script))
    }

    /// Write the full script, and the hash of `source` if given.
    pub fn save(&self, script: &Script, source: Option<&Path>) -> Result<()> {
        self.prepare()?;
        let path = self.cache_path();
        script.write_path(&path)?;

        if let Some(source) = source {
            std::fs::write(self.hash_path(), format!("{}\n", hash_file(source)?))?;
        }

        info!(path = %path.display(), lines = script.len(), "saved script cache");
        Ok(())
    }

    /// Compare `source` against the hash stored with the cache. Returns
    /// `Some(false)` on mismatch, `None` when either side is unavailable.
    pub fn source_matches(&self, source: &Path) -> Option<bool> {
        let stored = std::fs::read_to_string(self.hash_path()).ok()?;
        let current = hash_file(source).ok()?;
        let matches = stored.trim() == current;
        if !matches {
            warn!(
                source = %source.display(),
                cache = %self.cache_path().display(),
                "script changed since the cache was written — using cached audio anyway (pass --overwrite to re-synthesize)"
            );
        }
        Some(matches)
    }
}

/// File name up to the first `.`, falling back to the usual stem for names
/// that start with one.
pub fn work_dir_name(script_path: &Path) -> Result<String> {
    let file_name = script_path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = match file_name.split('.').next() {
        Some(head) if !head.is_empty() => head.to_string(),
        _ => script_path
            .file_stem()
            .map(|s| s.to_string_lossy().trim_start_matches('.').to_string())
            .unwrap_or_default(),
    };

    if name.is_empty() {
        return Err(Error::InvalidOption(format!(
            "cannot derive a working directory name from {}",
            script_path.display()
        )));
    }
    Ok(name)
}

fn hash_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
