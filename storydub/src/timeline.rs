use crate::error::{Error, Result};
use crate::script::Script;

/// Where one line sits on the combined track, in seconds from the start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    /// Speech starts.
    pub start: f64,
    /// Speech ends and the trailing silence begins.
    pub end: f64,
    /// Trailing silence ends; the next line starts here.
    pub next: f64,
}

/// Lay out every line of a synthesized script back to back: speech, then its
/// `end_wait_time` of silence. The audio assembler and the subtitle generator
/// both place lines from this one running sum, so the two never drift apart.
///
/// Pass the speed-adjusted script; this does no scaling of its own.
pub fn layout(script: &Script) -> Result<Vec<Slot>> {
    let mut t = 0.0f64;
    let mut slots = Vec::with_capacity(script.len());

    for (i, row) in script.rows.iter().enumerate() {
        let duration = row.duration().ok_or_else(|| Error::InvalidScript {
            row: i + 1,
            message: "line has not been synthesized".into(),
        })?;
        let start = t;
        let end = start + duration;
        t = end + row.end_wait_time;
        slots.push(Slot {
            start,
            end,
            next: t,
        });
    }

    Ok(slots)
}
