//! MIDI channel to MML track mapping.

use midly::{TrackEvent, TrackEventKind};

/// The default map: MIDI channel 0 becomes MML track A, channel 1 becomes B,
/// and so on.
pub const DEFAULT_CHANNEL_MAP: &str = "ABCDEFGHIJ";

/// An ordered alphabet of single-letter MML track identifiers, indexed by
/// MIDI channel.
pub struct ChannelMap(Vec<char>);

impl ChannelMap {
    pub fn new(map: &str) -> Self {
        Self(map.chars().collect())
    }

    /// Returns the MML track identifier for the given MIDI channel, or an
    /// error if the map has no letter for it.
    pub fn track_id(&self, channel: midly::num::u4) -> Result<char, String> {
        let channel = usize::from(channel.as_int());
        self.0.get(channel).copied().ok_or_else(|| {
            format!(
                "MIDI channel {channel} has no MML track (map {:?} only covers {} channels)",
                self.0.iter().collect::<String>(),
                self.0.len(),
            )
        })
    }

    /// Maps a whole track to its destination MML track, keyed by the channel
    /// of the first channel-carrying message. Tracks without one (e.g. pure
    /// meta tracks) default to the map's first letter.
    pub fn track_id_for(&self, track: &[TrackEvent]) -> Result<char, String> {
        for ev in track {
            if let TrackEventKind::Midi { channel, .. } = ev.kind {
                return self.track_id(channel);
            }
        }
        self.track_id(0.into())
    }
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_MAP)
    }
}
