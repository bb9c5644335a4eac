//! Dub an English story with custom voices, faster pacing and parallel synthesis.
//!
//! Usage: GOOGLE_API_KEY=... cargo run --example voices -- path/to/story.csv

use storydub::{Gender, PipelineOptions, VoiceMap};

#[tokio::main]
async fn main() -> storydub::Result<()> {
    let story = std::env::args()
        .nth(1)
        .expect("usage: voices <story.csv>");

    let opts = PipelineOptions::new()
        .language("en-US")?
        .voices(
            VoiceMap::new()
                .with_voice(Gender::Male, "en-US-Neural2-D")
                .with_voice(Gender::Female, "en-US-Neural2-F"),
        )
        .speed(1.2)?
        .concurrency(4)?;

    let output = storydub::dub_story(&story, "story.flac", &opts).await?;

    println!(
        "{} lines, {:.1}s, resumed: {}",
        output.lines, output.duration, output.resumed
    );

    Ok(())
}
