//! Delay every cue of an SRT file by 1.5 seconds, writing <name>.shifted.srt.
//!
//! Usage: cargo run --example shift -- path/to/movie.srt

use std::path::Path;
use std::time::Duration;

use storydub::ShiftDirection;

fn main() -> storydub::Result<()> {
    let input = std::env::args()
        .nth(1)
        .expect("usage: shift <file.srt>");

    let output = Path::new(&input).with_extension("shifted.srt");
    let written = storydub::shift_subtitles(
        &input,
        Some(&output),
        Duration::from_millis(1500),
        ShiftDirection::Forward,
    )?;

    println!("{}", written.display());
    Ok(())
}
