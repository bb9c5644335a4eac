use std::path::PathBuf;

/// All errors that can occur in storydub.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported audio format: \"{format}\" — expected one of mp3, wav, flac, ogg")]
    UnsupportedFormat { format: String },

    #[error("invalid timestamp: \"{0}\" — expected HH:MM:SS,mmm")]
    InvalidTimestamp(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("invalid script at row {row}: {message}")]
    InvalidScript { row: usize, message: String },

    #[error("script not found: {path}")]
    ScriptNotFound { path: PathBuf },

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("audio decoding error: {0}")]
    AudioDecode(String),

    #[error("audio encoding error: {0}")]
    AudioEncode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid base64 audio payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;
