//! The fixed-function single-voice synthesizer.
//!
//! This module implements the "engine produces, host drains" model:
//!
//! - [`AudioChannel`] is the voice's whole state: synthesis parameters the
//!   application mutates freely, and envelope/oscillator/filter internals the
//!   engine owns.
//! - One **tick** advances the envelope, oscillator, and filter in lockstep
//!   and yields one output sample. Ticks only happen inside a refill.
//! - [`refill`] is the bridge the host's timer drives: it produces one block,
//!   hands it to the host's [`SampleSink`], snapshots it into the channel's
//!   wave buffer, and runs the driver-installed refresh hook.
//!
//! Timing: a refill must finish inside its own period
//! (`BLOCK_SAMPLES / SAMPLE_RATE` seconds). Nothing here blocks, allocates,
//! or retries; a sink that cannot keep up gets the channel silenced instead
//! of a stalled caller.

mod bridge;
mod channel;
mod envelope;
mod filter;
mod oscillator;
mod wavetable;

mod tests;

pub use bridge::{refill, RefillOutcome, SampleSink};
pub use channel::{AudioChannel, WaveRefresh};
pub use wavetable::{load_wavetable, WavetableError};

use bitflags::bitflags;

/// The only sample rate the device runs at, in Hz.
pub const SAMPLE_RATE: u32 = 22_050;

/// Samples produced per refill cycle.
pub const BLOCK_SAMPLES: usize = 64;

/// Entries in the per-channel snapshot buffer and the user wavetable.
pub const WAVE_BUFFER_LEN: usize = 64;

/// Envelope phase of a voice.
///
/// The discriminants are the values the original register block used; 2 and
/// 4 in particular (sustain/off) appear in stored device state, so keep them
/// stable.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdsrPhase {
    Attack = 0,
    Decay = 1,
    Sustain = 2,
    Release = 3,
    Off = 4,
}

bitflags! {
    /// Waveform generator selector.
    ///
    /// Any set bit mixes that generator into the voice; the sum is
    /// normalized by the number of set bits. Bit values are part of the
    /// device contract.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Waveform: u8 {
        /// The channel's 64-entry user wavetable.
        const WAVE     = 0b0000_0001;
        const SINE     = 0b0000_1000;
        const TRIANGLE = 0b0001_0000;
        const SAW      = 0b0010_0000;
        /// Pulse wave; duty set by `pulse_width`.
        const SQUARE   = 0b0100_0000;
        /// LFSR noise; state lives in the channel's `noise` field.
        const NOISE    = 0b1000_0000;
    }
}
