//! Serialization of token timelines into MML text.

use crate::timeline::TimelineSet;

/// Renders every timeline as one block of MML lines, in first-seen track
/// order. Gaps between emission instants become `:<duration> ;<time>`
/// duration lines, each instant becomes a `<track> <tokens>` line, and a
/// trailing `;<total>` marker closes the block. Tracks with a non-alphabetic
/// identifier are internal and never rendered.
pub fn render(timelines: &TimelineSet) -> String {
    let mut out = String::new();
    for (track_id, timeline) in timelines.iter() {
        if !track_id.is_alphabetic() {
            continue;
        }
        let mut last_time = 0;
        for (time, tokens) in timeline.iter() {
            if time != last_time {
                out += &format!(":{} ;{last_time}\n", time - last_time);
            }
            out += &format!("{track_id} {tokens}\n");
            last_time = time;
        }
        out += &format!(";{last_time}\n\n");
    }
    out
}
