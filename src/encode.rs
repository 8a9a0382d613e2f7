//! MIDI event to MML token conversion.

use midly::{
    num::{u24, u7},
    MidiMessage,
};

/// Token emitted while no note is sounding.
pub const REST: &str = "r";

/// Token that continues the previously emitted note.
pub const TIE: &str = "^";

const NOTE_NAMES: [&str; 12] = [
    "c", "c+", "d", "d+", "e", "f", "f+", "g", "g+", "a", "a+", "b",
];

/// Converts a MIDI note number to an MML octave+note string, sharps only.
/// Note 60 (middle C) becomes `o4c`.
pub fn note_name(key: u7) -> String {
    let key = key.as_int();
    format!("o{}{}", (i32::from(key) / 12) - 1, NOTE_NAMES[usize::from(key % 12)])
}

/// Converts a MIDI channel volume (cc 7) value to an FM total level.
///
/// Total level is an attenuation: 0 is loudest, 127 is silence. A value of 0
/// has no defined logarithm and maps straight to full attenuation.
pub fn total_level(value: u7) -> u8 {
    let value = value.as_int();
    if value == 0 {
        return 127;
    }
    let level = (-40.0 * (f64::from(value) / 127.0).log10()) / 0.75 + 0.5;
    if level > 127.0 {
        127
    } else {
        level as u8
    }
}

/// Converts a MIDI pan (cc 10) value to FM channel enable flags:
/// 2 = right only, 3 = both, 1 = left only.
pub fn pan_flags(value: u7) -> u8 {
    match value.as_int() {
        0..=63 => 2,
        64 => 3,
        _ => 1,
    }
}

/// Converts a tempo meta value (microseconds per quarter note) to whole
/// beats per minute.
pub fn bpm(tempo: u24) -> Option<u32> {
    let tempo = tempo.as_int();
    (tempo > 0).then(|| 60_000_000 / tempo)
}

/// Per-event token encoders, all replaceable.
///
/// Every method returns `None` to emit nothing for the event. Implementors
/// carry any shared conversion state in `&self`; `Sync` because tracks are
/// encoded in parallel.
pub trait EventEncoders: Sync {
    /// Called for note-on *and* note-off events; a note is considered
    /// released when the note-off token compares equal to the token that
    /// started it.
    fn note(&self, message: &MidiMessage) -> Option<String> {
        match message {
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                Some(note_name(*key))
            }
            _ => None,
        }
    }

    fn control_change(&self, message: &MidiMessage) -> Option<String> {
        let MidiMessage::Controller { controller, value } = message else {
            return None;
        };
        match controller.as_int() {
            7 => Some(format!("V{}", total_level(*value))),
            10 => Some(format!("p{}", pan_flags(*value))),
            _ => None,
        }
    }

    fn program_change(&self, message: &MidiMessage) -> Option<String> {
        let MidiMessage::ProgramChange { program } = message else {
            return None;
        };
        Some(format!("@{}", program.as_int()))
    }

    fn tempo(&self, tempo: u24) -> Option<String> {
        bpm(tempo).map(|bpm| format!("t{bpm}"))
    }
}

/// The conversions described above, with no shared state.
pub struct DefaultEncoders;

impl EventEncoders for DefaultEncoders {}
