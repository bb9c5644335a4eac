//! Dub a story CSV into story.mp3 + story.srt.
//!
//! Usage: GOOGLE_API_KEY=... cargo run --example basic -- path/to/story.csv

#[tokio::main]
async fn main() -> storydub::Result<()> {
    let story = std::env::args()
        .nth(1)
        .expect("usage: basic <story.csv>");

    let output = storydub::dub_story(&story, "story.mp3", &storydub::PipelineOptions::new()).await?;

    println!("{}", std::fs::read_to_string(&output.subtitle_path)?);

    Ok(())
}
