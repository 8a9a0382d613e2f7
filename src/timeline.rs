//! Sparse, insertion-ordered token timelines.

/// An ordered map from absolute quantized time to the MML tokens emitted at
/// that instant. Keys only ever grow; writing to the newest key appends to
/// its token string, and reading a missing key yields an empty string.
#[derive(Debug, Default, PartialEq)]
pub struct Timeline {
    entries: Vec<(u64, String)>,
}

impl Timeline {
    pub fn append(&mut self, time: u64, token: &str) {
        match self.entries.last_mut() {
            Some((last, tokens)) if *last == time => tokens.push_str(token),
            _ => {
                debug_assert!(self.entries.last().is_none_or(|(last, _)| *last < time));
                self.entries.push((time, token.to_owned()));
            }
        }
    }

    pub fn get(&self, time: u64) -> &str {
        self.entries
            .iter()
            .find_map(|(t, tokens)| (*t == time).then_some(tokens.as_str()))
            .unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.entries.iter().map(|(t, tokens)| (*t, tokens.as_str()))
    }
}

/// Timelines keyed by MML track identifier, in first-seen order.
#[derive(Debug, Default)]
pub struct TimelineSet {
    tracks: Vec<(char, Timeline)>,
}

impl TimelineSet {
    /// Returns the timeline for the given track, creating an empty one on
    /// first access.
    pub fn entry(&mut self, track_id: char) -> &mut Timeline {
        if let Some(i) = self.tracks.iter().position(|(id, _)| *id == track_id) {
            return &mut self.tracks[i].1;
        }
        self.tracks.push((track_id, Timeline::default()));
        &mut self.tracks.last_mut().unwrap().1
    }

    pub fn insert(&mut self, track_id: char, timeline: Timeline) {
        *self.entry(track_id) = timeline;
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &Timeline)> {
        self.tracks.iter().map(|(id, timeline)| (*id, timeline))
    }
}
