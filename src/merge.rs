//! Grouping and merging of MIDI tracks by destination MML track.

use std::borrow::Cow;

use midly::{num::u28, MetaMessage, Smf, TrackEvent, TrackEventKind};

use crate::channel::ChannelMap;

/// Groups the sequence's tracks by their destination MML track and collapses
/// each group into a single chronological event stream. Group order is the
/// order in which destinations are first seen; single-track groups pass
/// through unmerged.
pub fn merge_by_track_id<'a>(
    smf: &'a Smf,
    map: &ChannelMap,
) -> Result<Vec<(char, Cow<'a, [TrackEvent<'a>]>)>, String> {
    let mut groups: Vec<(char, Vec<&'a [TrackEvent<'a>]>)> = Vec::new();
    for track in smf.tracks.iter().map(Vec::as_slice) {
        let track_id = map.track_id_for(track)?;
        match groups.iter_mut().find(|(id, _)| *id == track_id) {
            Some((_, tracks)) => tracks.push(track),
            None => groups.push((track_id, vec![track])),
        }
    }
    Ok(groups
        .into_iter()
        .map(|(track_id, tracks)| match tracks.as_slice() {
            [only] => (track_id, Cow::Borrowed(*only)),
            _ => (track_id, Cow::Owned(merge(&tracks))),
        })
        .collect())
}

struct TrackMerge<'a> {
    track: &'a [TrackEvent<'a>],
    i: usize,
    pulse_of_i: u64,
}

/// Interleaves the given tracks by absolute pulse, re-deriving deltas.
/// Events at the same pulse keep their original order, with the
/// first-listed track winning. Intermediate end-of-track events are
/// dropped; a single one at the latest pulse closes the merged track.
fn merge<'a>(tracks: &[&'a [TrackEvent<'a>]]) -> Vec<TrackEvent<'a>> {
    let mut merged = Vec::with_capacity(tracks.iter().fold(0, |acc, track| acc + track.len()));

    let mut merge_tracks = tracks
        .iter()
        .copied()
        .filter_map(|track| {
            track.first().map(|ev| TrackMerge {
                track,
                i: 0,
                pulse_of_i: ev.delta.as_int().into(),
            })
        })
        .collect::<Vec<_>>();

    let mut pulse: u64 = 0;
    let mut pulse_emitted: u64 = 0;
    while let Some((merge_i, merge)) = merge_tracks
        .iter_mut()
        .enumerate()
        .min_by(|a, b| a.1.pulse_of_i.cmp(&b.1.pulse_of_i))
    {
        let kind = merge.track[merge.i].kind;
        pulse = merge.pulse_of_i;
        if !matches!(kind, TrackEventKind::Meta(MetaMessage::EndOfTrack)) {
            merged.push(TrackEvent {
                delta: u28::new((pulse - pulse_emitted) as u32),
                kind,
            });
            pulse_emitted = pulse;
        }
        merge.i += 1;
        if merge.i >= merge.track.len() {
            merge_tracks.remove(merge_i);
            continue;
        }
        merge.pulse_of_i += merge.track[merge.i].delta.as_int() as u64;
    }
    merged.push(TrackEvent {
        delta: u28::new((pulse - pulse_emitted) as u32),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    merged
}
