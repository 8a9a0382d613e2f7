//! Pulse quantization to the fixed MML resolution.

use midly::{num::u28, Timing};

/// MML duration units per quarter note, regardless of the source PPQN.
pub const UNITS_PER_BEAT: u32 = 24;

/// How many source pulses make up one MML unit.
#[derive(Clone, Copy)]
pub struct Divisor(f64);

impl Divisor {
    pub fn new(timing: &Timing) -> Result<Self, String> {
        match timing {
            Timing::Metrical(ticks_per_beat) => Ok(Self(
                f64::from(ticks_per_beat.as_int()) / f64::from(UNITS_PER_BEAT),
            )),
            Timing::Timecode(fps, _) => Err(format!(
                "SMPTE timing ({} fps) is not supported, re-export with metrical timing",
                fps.as_f32()
            )),
        }
    }

    /// Truncates a single delta to whole MML units. Each delta is quantized
    /// on its own; the sub-unit remainder is dropped, never carried into the
    /// next delta.
    pub fn quantize(&self, delta: u28) -> u64 {
        (f64::from(delta.as_int()) / self.0) as u64
    }
}
