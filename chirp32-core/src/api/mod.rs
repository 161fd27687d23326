//! The device capability table.
//!
//! This module owns the host-facing shape of the firmware API:
//! - [`Device`] is the explicit handle that replaces the original fixed
//!   memory-mapped table. The host driver constructs one, keeps it for the
//!   process lifetime, and passes it by reference to whoever needs it.
//! - [`HostServices`] bundles the capabilities the engine *uses but does not
//!   own*: monotonic/profiling clocks, an entropy source, the file store,
//!   display-surface negotiation, and the serial debug sink. Each is an
//!   injected trait object with a sensible default, so tests can substitute
//!   doubles without touching the engine.
//! - Audio device negotiation (`open_audio`/`close_audio`) validates the
//!   single supported stream profile and arms/silences channel 0.
//!
//! Concurrency model: one logical thread. Application parameter writes and
//! refill-driven state advancement interleave as plain data writes; there is
//! nothing to lock.

mod input;

pub use input::{Buttons, InputState, Pen, Vec2, Vec3};

use crate::storage::{FileStore, MemStore};
use crate::synth::{self, AudioChannel, RefillOutcome, SampleSink, BLOCK_SAMPLES, SAMPLE_RATE};

/// Number of hardware voices in the channel block.
///
/// The reference device exposes exactly one synthesizer voice (channel 0);
/// the array shape is kept so the table reads like the register block it
/// models.
pub const CHANNEL_COUNT: usize = 1;

// --- Host service capabilities ---

/// Monotonic and profiling time, as the firmware exposes it.
pub trait TimeSource {
    /// Milliseconds since the device came up.
    fn now_ms(&self) -> u32;
    /// Arm the microsecond profiling timer. Until this is called,
    /// [`TimeSource::us_timer`] reads 0.
    fn enable_us_timer(&mut self);
    /// Microseconds since `enable_us_timer`, wrapping at
    /// [`TimeSource::max_us_timer`].
    fn us_timer(&self) -> u32;
    /// Largest value `us_timer` can report before wrapping.
    fn max_us_timer(&self) -> u32;
}

/// Default wall-clock implementation of [`TimeSource`].
pub struct SystemClock {
    boot: std::time::Instant,
    us_epoch: Option<std::time::Instant>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            boot: std::time::Instant::now(),
            us_epoch: None,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn now_ms(&self) -> u32 {
        self.boot.elapsed().as_millis() as u32
    }

    fn enable_us_timer(&mut self) {
        self.us_epoch = Some(std::time::Instant::now());
    }

    fn us_timer(&self) -> u32 {
        match self.us_epoch {
            Some(epoch) => epoch.elapsed().as_micros() as u32,
            None => 0,
        }
    }

    fn max_us_timer(&self) -> u32 {
        u32::MAX
    }
}

/// Non-cryptographic randomness for the application and for reseeding the
/// noise generator. Nothing in the engine needs prediction resistance.
pub trait Entropy {
    fn random(&mut self) -> u32;
}

/// xorshift64* generator; fast, and good enough for audio noise seeds.
pub struct XorShiftEntropy {
    state: u64,
}

impl XorShiftEntropy {
    /// A zero seed is the xorshift fixed point, so it is nudged off it.
    pub fn seeded(seed: u64) -> Self {
        Self { state: seed | 1 }
    }
}

impl Default for XorShiftEntropy {
    fn default() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        Self::seeded(0x9E37_79B9_7F4A_7C15 ^ u64::from(nanos))
    }
}

impl Entropy for XorShiftEntropy {
    fn random(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        (x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 32) as u32
    }
}

/// Display surface modes the device can negotiate.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenMode {
    Lores,
    Hires,
    HiresPalette,
}

/// Errors from display negotiation.
#[derive(Debug)]
pub enum DisplayError {
    UnsupportedMode(ScreenMode),
    PaletteTooLarge(usize),
}

impl core::fmt::Display for DisplayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DisplayError::UnsupportedMode(mode) => {
                write!(f, "display does not support mode {mode:?}")
            }
            DisplayError::PaletteTooLarge(n) => {
                write!(f, "palette of {n} entries exceeds the 256-entry table")
            }
        }
    }
}

impl std::error::Error for DisplayError {}

/// Display surface negotiation. Entirely outside the audio core; carried in
/// the table because the firmware publishes it there.
pub trait DisplayControl {
    fn set_screen_mode(&mut self, mode: ScreenMode) -> Result<(), DisplayError>;
    fn set_screen_palette(&mut self, colours: &[Pen]) -> Result<(), DisplayError>;
}

/// Accepts every mode and palette, renders nothing. The default for tests
/// and headless drivers.
#[derive(Default)]
pub struct NullDisplay {
    last_mode: Option<ScreenMode>,
}

impl NullDisplay {
    pub fn last_mode(&self) -> Option<ScreenMode> {
        self.last_mode
    }
}

impl DisplayControl for NullDisplay {
    fn set_screen_mode(&mut self, mode: ScreenMode) -> Result<(), DisplayError> {
        self.last_mode = Some(mode);
        Ok(())
    }

    fn set_screen_palette(&mut self, colours: &[Pen]) -> Result<(), DisplayError> {
        if colours.len() > 256 {
            return Err(DisplayError::PaletteTooLarge(colours.len()));
        }
        Ok(())
    }
}

/// The serial debug channel of the firmware API.
pub trait DebugSink {
    fn debug(&mut self, message: &str);
}

/// Writes debug lines to stderr, which is where a host process wants them.
#[derive(Default)]
pub struct StderrSink;

impl DebugSink for StderrSink {
    fn debug(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

/// The injected host capabilities.
///
/// Ownership: the driver that builds the [`Device`] owns these for the
/// device's lifetime. The engine borrows them and never stores references.
pub struct HostServices {
    pub clock: Box<dyn TimeSource + Send>,
    pub entropy: Box<dyn Entropy + Send>,
    pub files: Box<dyn FileStore + Send>,
    pub display: Box<dyn DisplayControl + Send>,
    pub debug: Box<dyn DebugSink + Send>,
}

impl Default for HostServices {
    fn default() -> Self {
        Self {
            clock: Box::new(SystemClock::new()),
            entropy: Box::new(XorShiftEntropy::default()),
            files: Box::new(MemStore::new()),
            display: Box::new(NullDisplay::default()),
            debug: Box::new(StderrSink),
        }
    }
}

// --- Audio device negotiation ---

/// Sample encodings a driver may request. Only `S16` is supported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    S16,
    F32,
}

/// A requested audio stream configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioProfile {
    pub sample_rate: u32,
    pub channels: u8,
    pub block_samples: usize,
    pub format: SampleFormat,
}

impl Default for AudioProfile {
    /// The single profile the device supports: 22 050 Hz mono s16 in
    /// 64-sample blocks.
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: 1,
            block_samples: BLOCK_SAMPLES,
            format: SampleFormat::S16,
        }
    }
}

/// Errors from `open_audio`. Each is fatal to that open attempt; nothing is
/// retried.
#[derive(Debug)]
pub enum AudioOpenError {
    UnsupportedRate(u32),
    UnsupportedChannelCount(u8),
    UnsupportedBlockSize(usize),
    UnsupportedFormat(SampleFormat),
}

impl core::fmt::Display for AudioOpenError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AudioOpenError::UnsupportedRate(rate) => {
                write!(f, "unsupported sample rate {rate} Hz (device runs at {SAMPLE_RATE} Hz)")
            }
            AudioOpenError::UnsupportedChannelCount(n) => {
                write!(f, "unsupported channel count {n} (device is mono)")
            }
            AudioOpenError::UnsupportedBlockSize(n) => {
                write!(f, "unsupported block size {n} (device refills {BLOCK_SAMPLES} samples)")
            }
            AudioOpenError::UnsupportedFormat(fmt) => {
                write!(f, "unsupported sample format {fmt:?} (device produces S16)")
            }
        }
    }
}

impl std::error::Error for AudioOpenError {}

/// Validate a requested profile against the single supported one.
pub fn validate_audio_profile(profile: &AudioProfile) -> Result<(), AudioOpenError> {
    if profile.format != SampleFormat::S16 {
        return Err(AudioOpenError::UnsupportedFormat(profile.format));
    }
    if profile.sample_rate != SAMPLE_RATE {
        return Err(AudioOpenError::UnsupportedRate(profile.sample_rate));
    }
    if profile.channels != 1 {
        return Err(AudioOpenError::UnsupportedChannelCount(profile.channels));
    }
    if profile.block_samples != BLOCK_SAMPLES {
        return Err(AudioOpenError::UnsupportedBlockSize(profile.block_samples));
    }
    Ok(())
}

// --- The device table ---

/// The device capability table.
///
/// One instance per device, created at driver start and kept for the process
/// lifetime. Voices are silenced, never destroyed.
pub struct Device {
    /// Buttons/joystick/tilt/vibration/LED. Unrelated to audio; see
    /// [`InputState`] for the ownership rules.
    pub input: InputState,
    /// The synthesizer voice block.
    pub channels: [AudioChannel; CHANNEL_COUNT],
    /// Injected host capabilities.
    pub services: HostServices,
    audio: Option<AudioProfile>,
}

impl Device {
    pub fn new(services: HostServices) -> Self {
        Self {
            input: InputState::default(),
            channels: std::array::from_fn(|_| AudioChannel::new()),
            services,
            audio: None,
        }
    }

    /// Negotiate the audio stream.
    ///
    /// On success the profile is stored and channel 0 starts silent; the
    /// application arms it with [`Device::note_on`] or by mutating the
    /// channel directly. Failure leaves the device unopened.
    pub fn open_audio(&mut self, profile: AudioProfile) -> Result<(), AudioOpenError> {
        validate_audio_profile(&profile)?;
        self.audio = Some(profile);
        for channel in &mut self.channels {
            channel.force_off();
        }
        self.services.debug.debug(&format!(
            "audio: opened {} Hz, {}-sample blocks",
            profile.sample_rate, profile.block_samples
        ));
        Ok(())
    }

    /// Tear the stream down. Mirrors the hardware behaviour: the voice is
    /// forced off, its parameter state stays put.
    pub fn close_audio(&mut self) {
        if self.audio.take().is_some() {
            for channel in &mut self.channels {
                channel.force_off();
            }
            self.services.debug.debug("audio: closed");
        }
    }

    /// The negotiated profile, if the stream is open.
    pub fn audio_profile(&self) -> Option<&AudioProfile> {
        self.audio.as_ref()
    }

    /// Arm a voice: seed its noise generator if needed, then start the
    /// attack ramp.
    pub fn note_on(&mut self, channel: usize) {
        let ch = &mut self.channels[channel];
        if ch.noise == 0 {
            // Never hand the LFSR its zero fixed point.
            ch.noise = (self.services.entropy.random() | 1) as i16;
        }
        ch.trigger_attack();
    }

    /// Begin the release ramp of a voice.
    pub fn note_off(&mut self, channel: usize) {
        self.channels[channel].trigger_release();
    }

    /// One cycle of the firmware mixing loop: refill every voice into the
    /// host's sink. With a closed stream this produces nothing.
    pub fn pump_audio(&mut self, sink: &mut dyn SampleSink) -> RefillOutcome {
        if self.audio.is_none() {
            return RefillOutcome {
                produced: 0,
                backpressured: false,
            };
        }
        synth::refill(&mut self.channels[0], sink)
    }

    /// Write a line to the host's serial debug channel.
    pub fn debug(&mut self, message: &str) {
        self.services.debug.debug(message);
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new(HostServices::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::AdsrPhase;

    #[test]
    fn open_rejects_everything_but_the_reference_profile() {
        let mut device = Device::default();

        let wrong_rate = AudioProfile {
            sample_rate: 44_100,
            ..AudioProfile::default()
        };
        assert!(matches!(
            device.open_audio(wrong_rate),
            Err(AudioOpenError::UnsupportedRate(44_100))
        ));

        let wrong_format = AudioProfile {
            format: SampleFormat::F32,
            ..AudioProfile::default()
        };
        assert!(matches!(
            device.open_audio(wrong_format),
            Err(AudioOpenError::UnsupportedFormat(SampleFormat::F32))
        ));

        let stereo = AudioProfile {
            channels: 2,
            ..AudioProfile::default()
        };
        assert!(matches!(
            device.open_audio(stereo),
            Err(AudioOpenError::UnsupportedChannelCount(2))
        ));

        assert!(device.audio_profile().is_none(), "failed open must not stick");
        assert!(device.open_audio(AudioProfile::default()).is_ok());
        assert!(device.audio_profile().is_some());
    }

    #[test]
    fn close_forces_the_voice_off() {
        let mut device = Device::default();
        device.open_audio(AudioProfile::default()).unwrap();
        device.note_on(0);
        assert_ne!(device.channels[0].adsr_phase(), AdsrPhase::Off);

        device.close_audio();
        assert_eq!(device.channels[0].adsr_phase(), AdsrPhase::Off);
        assert!(device.audio_profile().is_none());
    }

    #[test]
    fn note_on_seeds_the_noise_generator() {
        let mut device = Device::default();
        device.channels[0].noise = 0;
        device.note_on(0);
        assert_ne!(device.channels[0].noise, 0);
    }

    #[test]
    fn us_timer_reads_zero_until_enabled() {
        let clock = SystemClock::new();
        assert_eq!(clock.us_timer(), 0);
    }

    #[test]
    fn entropy_streams_are_seed_deterministic() {
        let mut a = XorShiftEntropy::seeded(12345);
        let mut b = XorShiftEntropy::seeded(12345);
        for _ in 0..8 {
            assert_eq!(a.random(), b.random());
        }
    }
}
