//! chirp32-sdk (handwritten)
//!
//! This crate is used by **applications** driving a chirp32 device. It adds
//! nothing the core cannot do; it packages the common moves (pick a
//! waveform, shape an envelope, start and stop a note) behind a small
//! fluent surface so application code reads like intent instead of register
//! pokes.
//!
//! The SDK never owns the device. A [`Voice`] borrows one channel for the
//! duration of a configuration burst and releases the borrow when dropped.

pub use chirp32_core::{AdsrPhase, AudioChannel, Device, Waveform};

/// Frequency of MIDI note 69 (A4).
const A4_HZ: f32 = 440.0;
const A4_MIDI: f32 = 69.0;

/// Equal-tempered frequency for a MIDI note number, rounded to the nearest
/// hertz the channel's `frequency` field can hold.
pub fn note_to_frequency(midi_note: u8) -> u16 {
    let semitones = f32::from(midi_note) - A4_MIDI;
    (A4_HZ * (semitones / 12.0).exp2()).round() as u16
}

/// A borrowed channel with fluent parameter setters.
///
/// ```
/// use chirp32_sdk::{Voice, Waveform};
/// # let mut device = chirp32_sdk::Device::default();
/// Voice::new(&mut device.channels[0])
///     .waveform(Waveform::SQUARE)
///     .note(69)
///     .envelope(5, 40, 0xA000, 150)
///     .trigger();
/// ```
pub struct Voice<'a> {
    channel: &'a mut AudioChannel,
}

impl<'a> Voice<'a> {
    pub fn new(channel: &'a mut AudioChannel) -> Self {
        Self { channel }
    }

    pub fn waveform(self, waveforms: Waveform) -> Self {
        self.channel.waveforms = waveforms;
        self
    }

    pub fn frequency(self, hz: u16) -> Self {
        self.channel.frequency = hz;
        self
    }

    /// Set the frequency from a MIDI note number.
    pub fn note(self, midi_note: u8) -> Self {
        self.channel.frequency = note_to_frequency(midi_note);
        self
    }

    pub fn volume(self, volume: u16) -> Self {
        self.channel.volume = volume;
        self
    }

    pub fn pulse_width(self, width: u16) -> Self {
        self.channel.pulse_width = width;
        self
    }

    /// Shape the ADSR envelope: ramp durations in milliseconds, sustain as a
    /// 0..=0xFFFF level.
    pub fn envelope(self, attack_ms: u16, decay_ms: u16, sustain: u16, release_ms: u16) -> Self {
        self.channel.attack_ms = attack_ms;
        self.channel.decay_ms = decay_ms;
        self.channel.sustain = sustain;
        self.channel.release_ms = release_ms;
        self
    }

    /// Enable the one-pole low-pass at the given cutoff.
    pub fn low_pass(self, cutoff_hz: u16) -> Self {
        self.channel.filter_enable = true;
        self.channel.filter_cutoff_frequency = cutoff_hz;
        self
    }

    pub fn no_filter(self) -> Self {
        self.channel.filter_enable = false;
        self
    }

    /// Start the note.
    pub fn trigger(self) {
        self.channel.trigger_attack();
    }

    /// Start the release ramp.
    pub fn release(self) {
        self.channel.trigger_release();
    }
}
