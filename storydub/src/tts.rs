//! Cloud Text-to-Speech client.

use std::future::Future;
use std::path::Path;

use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

const SYNTHESIZE_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Environment variable holding an API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Environment variable holding an OAuth access token.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_ACCESS_TOKEN";

/// Audio encodings the synthesis API can return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    #[default]
    Mp3,
    /// Uncompressed 16-bit PCM in a WAV container.
    Linear16,
    OggOpus,
}

impl AudioEncoding {
    /// Parse an API name (`MP3`, `LINEAR16`, `OGG_OPUS`), case-insensitively.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "MP3" => Ok(AudioEncoding::Mp3),
            "LINEAR16" => Ok(AudioEncoding::Linear16),
            "OGG_OPUS" => Ok(AudioEncoding::OggOpus),
            _ => Err(Error::UnsupportedFormat {
                format: name.to_string(),
            }),
        }
    }

    /// File extension for audio in this encoding.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "mp3",
            AudioEncoding::Linear16 => "wav",
            AudioEncoding::OggOpus => "ogg",
        }
    }
}

/// One text to speak and how to speak it.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    /// Language code, e.g. "ja-JP".
    pub language: String,
    /// Voice name, e.g. "ja-JP-Neural2-B".
    pub voice: String,
    /// Speaking-rate multiplier, 1.0 is normal speed.
    pub speaking_rate: f64,
    pub encoding: AudioEncoding,
}

/// Turns text into encoded audio bytes.
pub trait Synthesizer {
    fn synthesize(&self, request: &SynthesisRequest) -> impl Future<Output = Result<Vec<u8>>>;
}

/// How requests authenticate against the API.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Sent as the `key` query parameter.
    ApiKey(String),
    /// Sent as a bearer token.
    AccessToken(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ApiKey(_) => f.write_str("ApiKey(..)"),
            Credentials::AccessToken(_) => f.write_str("AccessToken(..)"),
        }
    }
}

impl Credentials {
    /// Pick credentials from explicit values first, then the environment.
    /// An API key wins over an access token.
    pub fn resolve(api_key: Option<String>, access_token: Option<String>) -> Result<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        if let Some(key) = non_empty(api_key).or_else(|| non_empty(std::env::var(API_KEY_ENV).ok())) {
            return Ok(Credentials::ApiKey(key));
        }
        if let Some(token) =
            non_empty(access_token).or_else(|| non_empty(std::env::var(ACCESS_TOKEN_ENV).ok()))
        {
            return Ok(Credentials::AccessToken(token));
        }
        Err(Error::Config(format!(
            "no TTS credentials — set {API_KEY_ENV} or {ACCESS_TOKEN_ENV}"
        )))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeBody<'a> {
    input: TextInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
    ssml_gender: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: AudioEncoding,
    speaking_rate: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl<'a> SynthesizeBody<'a> {
    fn new(request: &'a SynthesisRequest) -> Self {
        Self {
            input: TextInput {
                text: &request.text,
            },
            voice: VoiceSelection {
                language_code: &request.language,
                name: &request.voice,
                ssml_gender: "SSML_VOICE_GENDER_UNSPECIFIED",
            },
            audio_config: AudioConfig {
                audio_encoding: request.encoding,
                speaking_rate: request.speaking_rate,
            },
        }
    }
}

/// Client for the Google Cloud Text-to-Speech REST API.
#[derive(Debug, Clone)]
pub struct GoogleTts {
    client: reqwest::Client,
    credentials: Credentials,
    endpoint: String,
}

impl GoogleTts {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            endpoint: SYNTHESIZE_URL.to_string(),
        }
    }

    /// Credentials from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Credentials::resolve(None, None)?))
    }

    /// Send requests somewhere other than the public endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Synthesize and write the audio to `path`.
    pub async fn synthesize_to_file(&self, request: &SynthesisRequest, path: &Path) -> Result<()> {
        let audio = self.synthesize(request).await?;
        tokio::fs::write(path, &audio).await?;
        info!(path = %path.display(), bytes = audio.len(), "audio content written");
        Ok(())
    }
}

impl Synthesizer for GoogleTts {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
        debug!(voice = %request.voice, chars = request.text.chars().count(), "synthesizing");

        let builder = self.client.post(&self.endpoint);
        let builder = match &self.credentials {
            Credentials::ApiKey(key) => builder.query(&[("key", key)]),
            Credentials::AccessToken(token) => builder.bearer_auth(token),
        };

        let response = builder.json(&SynthesizeBody::new(request)).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(Error::Synthesis(api_error_message(status, &body)));
        }

        let parsed: SynthesizeResponse = serde_json::from_slice(&body)?;
        let audio = base64::engine::general_purpose::STANDARD.decode(parsed.audio_content)?;
        if audio.is_empty() {
            return Err(Error::Synthesis("API returned empty audio".into()));
        }
        Ok(audio)
    }
}

/// The API's own error message if the body has one, otherwise the status and
/// the start of the body.
fn api_error_message(status: reqwest::StatusCode, body: &[u8]) -> String {
    match serde_json::from_slice::<ApiErrorResponse>(body) {
        Ok(ApiErrorResponse { error }) => match error.status {
            Some(code) => format!("{status} {code}: {}", error.message),
            None => format!("{status}: {}", error.message),
        },
        Err(_) => {
            let text: String = String::from_utf8_lossy(body).chars().take(500).collect();
            format!("{status}: {}", text.trim())
        }
    }
}
