use std::path::PathBuf;

use clap::Parser;
use storydub::{AudioFormat, Credentials, DubConfig, GoogleTts, PipelineOptions};

#[derive(Parser)]
#[command(
    name = "story2dub",
    about = "Generate narrated audio and subtitles from a story CSV file"
)]
struct Cli {
    /// Path to the input story CSV file (columns: Content, Gender, EndWaitTime).
    #[arg(long = "story_path", alias = "story-path")]
    story_path: PathBuf,

    /// Path to save the output audio file. The extension picks the format:
    /// mp3, wav, flac or ogg. Subtitles are written next to it as .srt.
    #[arg(long = "output_path", alias = "output-path")]
    output_path: PathBuf,

    /// Re-synthesize every line even if a previous run's audio exists.
    #[arg(long)]
    overwrite: bool,

    /// Speaking rate of new audio; also divides every pause between lines.
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Config file with language, voices and concurrency
    /// (default: ~/.config/storydub/config.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the per-story working directory is created in.
    #[arg(long, default_value = ".")]
    work_root: PathBuf,

    /// Lines synthesized at once (overrides the config file).
    #[arg(long)]
    concurrency: Option<usize>,

    /// Google Cloud API key.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OAuth access token, used when no API key is given.
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
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

    let config = match DubConfig::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut opts = match PipelineOptions::from_config(&config).and_then(|o| o.speed(cli.speed)) {
        Ok(o) => o.overwrite(cli.overwrite).work_root(cli.work_root),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Some(n) = cli.concurrency {
        opts = match opts.concurrency(n) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        };
    }

    // Reject unsupported output formats before asking for credentials.
    if let Err(e) = AudioFormat::from_path(&cli.output_path) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let tts = match Credentials::resolve(cli.api_key, cli.access_token) {
        Ok(creds) => GoogleTts::new(creds),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let output = match storydub::dub_story_with(&tts, &cli.story_path, &cli.output_path, &opts).await {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    eprintln!(
        "Dub complete: {} lines, {:.1}s of audio ({})",
        output.lines,
        output.duration,
        if output.resumed {
            format!("reused audio from {}", output.work_dir.display())
        } else {
            format!("{} lines synthesized", output.synthesized)
        },
    );
    eprintln!("Audio written to {}", output.audio_path.display());
    eprintln!("Subtitles written to {}", output.subtitle_path.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underscore_flags() {
        let cli = Cli::try_parse_from([
            "story2dub",
            "--story_path",
            "s.csv",
            "--output_path",
            "o.mp3",
        ])
        .unwrap();
        assert_eq!(cli.story_path, PathBuf::from("s.csv"));
        assert_eq!(cli.output_path, PathBuf::from("o.mp3"));
        assert_eq!(cli.speed, 1.0);
        assert!(!cli.overwrite);
    }

    #[test]
    fn test_kebab_flags_still_accepted() {
        let cli = Cli::try_parse_from([
            "story2dub",
            "--story-path",
            "s.csv",
            "--output-path",
            "o.flac",
            "--overwrite",
            "--speed",
            "1.5",
        ])
        .unwrap();
        assert_eq!(cli.output_path, PathBuf::from("o.flac"));
        assert!(cli.overwrite);
        assert_eq!(cli.speed, 1.5);
    }

    #[test]
    fn test_story_path_required() {
        assert!(Cli::try_parse_from(["story2dub", "--output_path", "o.mp3"]).is_err());
    }
}
