//! The MIDI-to-MML conversion pass.

use midly::{Format, MetaMessage, MidiMessage, Smf, TrackEvent, TrackEventKind};
use rayon::prelude::*;

use crate::{
    channel::ChannelMap,
    encode::{DefaultEncoders, EventEncoders, REST, TIE},
    merge, render,
    time::Divisor,
    timeline::{Timeline, TimelineSet},
};

pub struct Options<'a> {
    pub channel_map: ChannelMap,
    pub encoders: &'a dyn EventEncoders,
}

impl Default for Options<'_> {
    fn default() -> Self {
        Self {
            channel_map: ChannelMap::default(),
            encoders: &DefaultEncoders,
        }
    }
}

/// Converts a parsed type 1 sequence into MML text.
///
/// Only note on/off, program change, channel volume, panning and tempo are
/// converted, with exactly one sounding note per MML track; see
/// [`EventEncoders`] for customizing the token output. Pulses are quantized
/// to 24 units per quarter note, so sources with coarse-grained PPQN convert
/// best.
pub fn convert(smf: &Smf, opts: &Options) -> Result<String, String> {
    if smf.header.format != Format::Parallel {
        return Ok("; Not a MIDI type 1 file!\n".into());
    }
    let divisor = Divisor::new(&smf.header.timing)?;

    let mut timelines = TimelineSet::default();
    for (track_id, timeline) in merge::merge_by_track_id(smf, &opts.channel_map)?
        .par_iter()
        .map(|(track_id, track)| (*track_id, build_timeline(track, divisor, opts.encoders)))
        .collect::<Vec<_>>()
    {
        timelines.insert(track_id, timeline);
    }
    Ok(render::render(&timelines))
}

/// Walks one merged track and lays its events out on a quantized timeline.
///
/// The sounding note is written out lazily: only once the time advances does
/// the current token reach the timeline, after which a held note turns into
/// tie markers until its note-off (or a replacing note-on) arrives. A
/// note-off only releases when its encoded token matches the token emitted at
/// the previous advance; an unmatched one leaves the state untouched.
fn build_timeline(track: &[TrackEvent], divisor: Divisor, encoders: &dyn EventEncoders) -> Timeline {
    let mut timeline = Timeline::default();
    let mut time: u64 = 0;
    let mut note = String::from(REST);
    let mut prev_note = String::new();
    for ev in track {
        let step = divisor.quantize(ev.delta);
        if step > 0 {
            timeline.append(time, &note);
            prev_note.clone_from(&note);
            if note != REST {
                note = TIE.into();
            }
        }
        time += step;
        match &ev.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                if let Some(token) = encoders.tempo(*tempo) {
                    timeline.append(time, &token);
                }
            }
            TrackEventKind::Midi { message, .. } => match message {
                MidiMessage::ProgramChange { .. } => {
                    if let Some(token) = encoders.program_change(message) {
                        timeline.append(time, &token);
                    }
                }
                MidiMessage::Controller { .. } => {
                    if let Some(token) = encoders.control_change(message) {
                        timeline.append(time, &token);
                    }
                }
                // Velocity-0 note-ons are kept as note-ons, as the sound
                // driver has no use for running-status shorthand.
                MidiMessage::NoteOn { .. } => {
                    if let Some(token) = encoders.note(message) {
                        note = token;
                    }
                }
                MidiMessage::NoteOff { .. } => {
                    if encoders.note(message).as_deref() == Some(prev_note.as_str()) {
                        note = REST.into();
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    // Close the timeline so that its last key is the track's total duration.
    if track.is_empty() {
        timeline.append(0, "");
    } else {
        timeline.append(time, &note);
    }
    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use midly::{Header, Timing};

    fn midi(delta: u32, message: MidiMessage) -> TrackEvent<'static> {
        TrackEvent {
            delta: delta.into(),
            kind: TrackEventKind::Midi {
                channel: 0.into(),
                message,
            },
        }
    }

    fn note_on(delta: u32, key: u8) -> TrackEvent<'static> {
        midi(
            delta,
            MidiMessage::NoteOn {
                key: key.into(),
                vel: 100.into(),
            },
        )
    }

    fn note_off(delta: u32, key: u8) -> TrackEvent<'static> {
        midi(
            delta,
            MidiMessage::NoteOff {
                key: key.into(),
                vel: 0.into(),
            },
        )
    }

    fn meta(delta: u32, message: MetaMessage<'static>) -> TrackEvent<'static> {
        TrackEvent {
            delta: delta.into(),
            kind: TrackEventKind::Meta(message),
        }
    }

    fn smf(tracks: Vec<Vec<TrackEvent<'static>>>) -> Smf<'static> {
        Smf {
            header: Header::new(Format::Parallel, Timing::Metrical(96.into())),
            tracks,
        }
    }

    fn build(track: &[TrackEvent]) -> Vec<(u64, String)> {
        let divisor = Divisor::new(&Timing::Metrical(96.into())).unwrap();
        build_timeline(track, divisor, &DefaultEncoders)
            .iter()
            .map(|(time, token)| (time, token.to_owned()))
            .collect()
    }

    #[test]
    fn single_note_and_release() {
        let timeline = build(&[
            note_on(0, 60),
            note_off(48, 60),
            meta(0, MetaMessage::EndOfTrack),
        ]);
        assert_eq!(timeline, [(0, "o4c".into()), (12, "r".into())]);
    }

    #[test]
    fn held_note_emits_name_once_then_ties() {
        let timeline = build(&[
            note_on(0, 60),
            meta(16, MetaMessage::Marker(b"a")),
            meta(16, MetaMessage::Marker(b"b")),
            note_off(16, 60),
            meta(0, MetaMessage::EndOfTrack),
        ]);
        let tokens = timeline.iter().map(|(_, s)| s.as_str()).collect::<Vec<_>>();
        assert_eq!(tokens[..3], ["o4c", "^", "^"]);
    }

    #[test]
    fn note_off_for_a_different_note_is_ignored() {
        // The second note-on replaces the first before its note-off arrives;
        // the stale note-off must not cut the replacing note short.
        let timeline = build(&[
            note_on(0, 60),
            note_on(24, 64),
            note_off(24, 60),
            note_off(0, 64),
            meta(24, MetaMessage::EndOfTrack),
        ]);
        assert_eq!(
            timeline,
            [
                (0, "o4c".into()),
                (6, "o4e".into()),
                (12, "r".into()),
                (18, "r".into()),
            ]
        );
    }

    #[test]
    fn control_and_program_tokens_append_at_their_instant() {
        let timeline = build(&[
            midi(0, MidiMessage::ProgramChange { program: 5.into() }),
            midi(
                0,
                MidiMessage::Controller {
                    controller: 7.into(),
                    value: 127.into(),
                },
            ),
            meta(0, MetaMessage::Tempo(500_000.into())),
            note_on(0, 60),
            note_off(48, 60),
            meta(0, MetaMessage::EndOfTrack),
        ]);
        assert_eq!(timeline, [(0, "@5V0t120o4c".into()), (12, "r".into())]);
    }

    // An intermediate emission point during a held note turns the remembered
    // token into a tie, after which the note-off no longer matches and the
    // note sounds forever.
    #[test]
    fn emission_during_a_held_note_defeats_its_note_off() {
        let timeline = build(&[
            note_on(0, 60),
            meta(48, MetaMessage::Tempo(500_000.into())),
            note_off(48, 60),
            meta(0, MetaMessage::EndOfTrack),
        ]);
        assert_eq!(
            timeline,
            [
                (0, "o4c".into()),
                (12, "t120^".into()),
                (24, "^".into()),
            ]
        );
    }

    #[test]
    fn empty_track_closes_at_time_zero() {
        assert_eq!(build(&[]), [(0, "".into())]);
    }

    #[test]
    fn end_of_track_delta_extends_the_duration() {
        let timeline = build(&[
            note_on(0, 60),
            note_off(48, 60),
            meta(48, MetaMessage::EndOfTrack),
        ]);
        assert_eq!(
            timeline,
            [(0, "o4c".into()), (12, "r".into()), (24, "r".into())]
        );
    }

    #[test]
    fn non_type_1_input_degrades_to_a_comment() {
        let mut smf = smf(vec![]);
        smf.header.format = Format::SingleTrack;
        assert_eq!(
            convert(&smf, &Options::default()).unwrap(),
            "; Not a MIDI type 1 file!\n"
        );
    }

    #[test]
    fn end_to_end_single_note() {
        let smf = smf(vec![vec![
            note_on(0, 60),
            note_off(48, 60),
            meta(0, MetaMessage::EndOfTrack),
        ]]);
        assert_eq!(
            convert(&smf, &Options::default()).unwrap(),
            "A o4c\n:12 ;0\nA r\n;12\n\n"
        );
    }

    #[test]
    fn channel_map_override_and_exhaustion() {
        let smf = smf(vec![vec![
            note_on(0, 60),
            note_off(48, 60),
            meta(0, MetaMessage::EndOfTrack),
        ]]);
        let opts = Options {
            channel_map: ChannelMap::new("X"),
            ..Options::default()
        };
        assert!(convert(&smf, &opts).unwrap().starts_with("X o4c\n"));
        let opts = Options {
            channel_map: ChannelMap::new(""),
            ..Options::default()
        };
        assert!(convert(&smf, &opts).is_err());
    }

    #[test]
    fn replaced_note_encoder_reaches_the_output() {
        struct Drums;
        impl EventEncoders for Drums {
            fn note(&self, _: &MidiMessage) -> Option<String> {
                Some("o2c".into())
            }
        }
        let smf = smf(vec![vec![
            note_on(0, 60),
            note_off(48, 81),
            meta(0, MetaMessage::EndOfTrack),
        ]]);
        let opts = Options {
            encoders: &Drums,
            ..Options::default()
        };
        // Every note encodes to the same token, so even a mismatched
        // note-off releases it.
        assert_eq!(
            convert(&smf, &opts).unwrap(),
            "A o2c\n:12 ;0\nA r\n;12\n\n"
        );
    }

    // Unused quantization remainders are dropped per delta, so two short
    // deltas can add up to less time than their pulse sum.
    #[test]
    fn quantization_drift_is_not_corrected() {
        let divisor = Divisor::new(&Timing::Metrical(100.into())).unwrap();
        let track = [
            note_on(0, 60),
            note_off(7, 60),
            note_on(0, 62),
            note_off(7, 62),
            meta(0, MetaMessage::EndOfTrack),
        ];
        let timeline = build_timeline(&track, divisor, &DefaultEncoders);
        let times = timeline.iter().map(|(t, _)| t).collect::<Vec<_>>();
        assert_eq!(times, [0, 1, 2]);
    }

    #[test]
    fn merged_tracks_share_one_timeline() {
        let smf = smf(vec![
            vec![note_on(0, 60), note_off(48, 60), meta(0, MetaMessage::EndOfTrack)],
            vec![note_on(48, 64), note_off(48, 64), meta(0, MetaMessage::EndOfTrack)],
        ]);
        assert_eq!(
            convert(&smf, &Options::default()).unwrap(),
            "A o4c\n:12 ;0\nA o4e\n:12 ;12\nA r\n;24\n\n"
        );
    }
}
