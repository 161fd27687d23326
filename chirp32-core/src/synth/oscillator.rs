//! Waveform generation from a fixed-point phase accumulator.
//!
//! The accumulator holds one waveform period in Q24: it advances by
//! `frequency * 2^24 / SAMPLE_RATE` per tick and is masked back to 24 bits,
//! which is an exact renormalization: there is no drift to accumulate, no
//! matter how long the voice runs.
//!
//! Each set [`Waveform`] bit contributes one generator; the contributions
//! are summed and divided by the number of set bits so the mix can never
//! leave the 16-bit sample domain.

use lazy_static::lazy_static;

use super::channel::AudioChannel;
use super::{Waveform, SAMPLE_RATE, WAVE_BUFFER_LEN};

const PHASE_BITS: u32 = 24;
pub(super) const PHASE_MASK: u32 = (1 << PHASE_BITS) - 1;
const PHASE_HALF: u32 = 1 << (PHASE_BITS - 1);

const SINE_TABLE_LEN: usize = 256;

lazy_static! {
    static ref SINE_TABLE: [i16; SINE_TABLE_LEN] = {
        let mut table = [0i16; SINE_TABLE_LEN];
        for (i, entry) in table.iter_mut().enumerate() {
            let angle = (i as f32 / SINE_TABLE_LEN as f32) * core::f32::consts::TAU;
            *entry = (angle.sin() * f32::from(i16::MAX)) as i16;
        }
        table
    };
}

/// Accumulator advance per tick for a given frequency.
pub(super) fn phase_increment(frequency: u16) -> u32 {
    ((u64::from(frequency) << PHASE_BITS) / u64::from(SAMPLE_RATE)) as u32
}

/// One cycle of the sine table, for a channel's initial wavetable.
pub(super) fn default_wavetable() -> [i16; WAVE_BUFFER_LEN] {
    let mut table = [0i16; WAVE_BUFFER_LEN];
    let stride = SINE_TABLE_LEN / WAVE_BUFFER_LEN;
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = SINE_TABLE[i * stride];
    }
    table
}

/// Produce the raw (pre-envelope, pre-volume) sample for this tick and
/// advance the accumulator.
pub(super) fn oscillator_tick(ch: &mut AudioChannel) -> i16 {
    let offset = ch.waveform_offset;
    ch.waveform_offset = (offset + phase_increment(ch.frequency)) & PHASE_MASK;

    let mut sum: i32 = 0;
    let mut voices: i32 = 0;

    if ch.waveforms.contains(Waveform::SQUARE) {
        sum += square(offset, ch.pulse_width);
        voices += 1;
    }
    if ch.waveforms.contains(Waveform::SAW) {
        sum += sawtooth(offset);
        voices += 1;
    }
    if ch.waveforms.contains(Waveform::TRIANGLE) {
        sum += triangle(offset);
        voices += 1;
    }
    if ch.waveforms.contains(Waveform::SINE) {
        sum += sine(offset);
        voices += 1;
    }
    if ch.waveforms.contains(Waveform::WAVE) {
        sum += wavetable(&ch.wavetable, offset);
        voices += 1;
    }
    if ch.waveforms.contains(Waveform::NOISE) {
        sum += noise(&mut ch.noise);
        voices += 1;
    }

    if voices == 0 {
        return 0;
    }
    (sum / voices) as i16
}

/// High while the phase fraction is below the duty fraction.
fn square(offset: u32, pulse_width: u16) -> i32 {
    if (offset >> 8) < u32::from(pulse_width) {
        i32::from(i16::MAX)
    } else {
        -i32::from(i16::MAX)
    }
}

fn sawtooth(offset: u32) -> i32 {
    (offset >> 8) as i32 - 0x8000
}

fn triangle(offset: u32) -> i32 {
    if offset < PHASE_HALF {
        (offset >> 7) as i32 - 0x8000
    } else {
        0x7FFF - ((offset - PHASE_HALF) >> 7) as i32
    }
}

fn sine(offset: u32) -> i32 {
    i32::from(SINE_TABLE[(offset >> 16) as usize & (SINE_TABLE_LEN - 1)])
}

fn wavetable(table: &[i16; WAVE_BUFFER_LEN], offset: u32) -> i32 {
    i32::from(table[(offset >> 18) as usize & (WAVE_BUFFER_LEN - 1)])
}

/// 16-bit xorshift. The channel field is both seed and running state; zero
/// is the xorshift fixed point and gets replaced.
fn noise(state: &mut i16) -> i32 {
    let mut x = *state as u16;
    if x == 0 {
        x = 0xACE1;
    }
    x ^= x << 7;
    x ^= x >> 9;
    x ^= x << 8;
    *state = x as i16;
    i32::from(*state)
}
