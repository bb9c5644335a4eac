use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use storydub::{AudioEncoding, Credentials, GoogleTts, SynthesisRequest};

#[derive(Parser)]
#[command(name = "gctts", about = "Synthesize speech from text with Google Cloud TTS")]
struct Cli {
    /// The text to synthesize.
    text: String,

    /// Language code.
    #[arg(short, long, default_value = "ja-JP")]
    lang: String,

    /// Voice name.
    #[arg(short, long, default_value = "ja-JP-Neural2-B")]
    voice: String,

    /// Path to save the output audio file.
    #[arg(short, long, default_value = "output.mp3")]
    output: PathBuf,

    /// Speaking rate multiplier.
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Audio encoding returned by the API.
    #[arg(short, long, default_value = "mp3")]
    encoding: Encoding,

    /// Google Cloud API key.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OAuth access token, used when no API key is given.
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
}

#[derive(Clone, ValueEnum)]
enum Encoding {
    Mp3,
    Linear16,
    OggOpus,
}

impl From<Encoding> for AudioEncoding {
    fn from(e: Encoding) -> Self {
        match e {
            Encoding::Mp3 => AudioEncoding::Mp3,
            Encoding::Linear16 => AudioEncoding::Linear16,
            Encoding::OggOpus => AudioEncoding::OggOpus,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("storydub=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    if !cli.speed.is_finite() || cli.speed <= 0.0 {
        eprintln!("Error: speed must be a positive number, got {}", cli.speed);
        std::process::exit(1);
    }

    let tts = match Credentials::resolve(cli.api_key, cli.access_token) {
        Ok(creds) => GoogleTts::new(creds),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let request = SynthesisRequest {
        text: cli.text,
        language: cli.lang,
        voice: cli.voice,
        speaking_rate: cli.speed,
        encoding: cli.encoding.into(),
    };

    if let Err(e) = tts.synthesize_to_file(&request, &cli.output).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    println!("Audio content written to file \"{}\"", cli.output.display());
}
