use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use storydub::ShiftDirection;

#[derive(Parser)]
#[command(
    name = "srt-tool",
    about = "A command-line tool for manipulating SRT subtitle files"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Shift subtitle timestamps.
    Shift {
        /// Path to the input SRT file.
        file: PathBuf,

        /// Number of hours to shift.
        #[arg(long, default_value = "0")]
        hours: u64,

        /// Number of minutes to shift.
        #[arg(long, default_value = "0")]
        minutes: u64,

        /// Number of seconds to shift.
        #[arg(long, default_value = "0")]
        seconds: u64,

        /// Shift backwards instead of forwards (stops at 00:00:00,000).
        #[arg(long)]
        minus: bool,

        /// Path to the output SRT file (default: overwrite the input).
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("storydub=warn".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Shift {
            file,
            hours,
            minutes,
            seconds,
            minus,
            output,
        } => {
            let total = hours
                .checked_mul(3600)
                .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
                .and_then(|hm| hm.checked_add(seconds));
            let Some(total) = total else {
                eprintln!("Error: shift amount is too large");
                std::process::exit(1);
            };

            let direction = if minus {
                ShiftDirection::Backward
            } else {
                ShiftDirection::Forward
            };

            match storydub::shift_subtitles(
                &file,
                output.as_deref(),
                Duration::from_secs(total),
                direction,
            ) {
                Ok(path) => println!("Shifted subtitles saved to: {}", path.display()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
