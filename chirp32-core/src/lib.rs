//! chirp32-core: the device-side core of the chirp32 handheld firmware API.
//!
//! This crate implements a **handle-based device model**:
//! - The host driver owns a [`Device`]: the capability table a hosted
//!   application pokes. It carries input state (buttons/joystick/tilt/LED),
//!   the audio channel block, and the injected host services (clock,
//!   entropy, file store, display control, serial debug).
//! - Audio is produced by a fixed-function single-voice synthesizer
//!   (wavetable oscillator + ADSR envelope + optional one-pole low-pass)
//!   living in [`synth`].
//! - The host pulls sample blocks through the refill bridge
//!   ([`synth::refill`]); downstream consumers express backpressure through
//!   the [`synth::SampleSink`] capability, and a refill that hits
//!   backpressure silences the voice rather than stalling the caller.
//!
//! There is no fixed-address register file and no raw function-pointer
//! callback here: the table travels by reference and the refill protocol is
//! a trait, so the engine stays portable and testable.

pub mod api;
pub mod storage;
pub mod synth;

pub use api::{
    AudioOpenError, AudioProfile, Device, HostServices, SampleFormat, CHANNEL_COUNT,
};
pub use synth::{
    refill, AdsrPhase, AudioChannel, RefillOutcome, SampleSink, WaveRefresh, Waveform,
    BLOCK_SAMPLES, SAMPLE_RATE, WAVE_BUFFER_LEN,
};
