//! The voice state block and the per-tick mixer.

use super::{envelope, filter, oscillator, AdsrPhase, Waveform, WAVE_BUFFER_LEN};

/// Per-block hook a driver can install; receives the fresh snapshot after
/// every refill cycle.
pub type WaveRefresh = Box<dyn FnMut(&[i16]) + Send>;

/// One synthesizer voice.
///
/// Public fields are the synthesis parameters the owning application may
/// write at any time; they are read once per tick. Everything `pub(crate)`
/// is engine-owned progress state: stable while the voice is off, never
/// meaningfully writable from outside. The only envelope control the
/// application has is [`trigger_attack`](Self::trigger_attack),
/// [`trigger_release`](Self::trigger_release), and
/// [`force_off`](Self::force_off).
pub struct AudioChannel {
    /// Generator selector. An active voice with no bits set is silent.
    pub waveforms: Waveform,
    /// Oscillator frequency in Hz.
    pub frequency: u16,
    /// Output gain, 0..=0xFFFF.
    pub volume: u16,

    /// Attack ramp duration. Zero means instantaneous.
    pub attack_ms: u16,
    /// Decay ramp duration. Zero means instantaneous.
    pub decay_ms: u16,
    /// Sustain level, 0..=0xFFFF.
    pub sustain: u16,
    /// Release ramp duration. Zero means instantaneous.
    pub release_ms: u16,
    /// Pulse duty as a fraction of 0xFFFF; read by the SQUARE generator.
    pub pulse_width: u16,
    /// Noise LFSR state. Zero is replaced with a fixed seed on use.
    pub noise: i16,

    // Engine-owned progress state.
    pub(crate) waveform_offset: u32,
    pub(crate) adsr_phase: AdsrPhase,
    pub(crate) adsr_frame: u32,
    pub(crate) adsr_end_frame: u32,
    pub(crate) adsr: u32,
    pub(crate) adsr_step: i32,

    /// One-pole low-pass on/off.
    pub filter_enable: bool,
    /// Cutoff in Hz; the coefficient is re-derived only when this changes.
    pub filter_cutoff_frequency: u16,
    pub(crate) filter_last_sample: i32,
    pub(crate) filter_coeff: i32,
    pub(crate) filter_coeff_for: Option<u16>,

    pub(crate) wave_buf_pos: u8,
    pub(crate) wave_buffer: [i16; WAVE_BUFFER_LEN],
    pub(crate) wavetable: [i16; WAVE_BUFFER_LEN],
    pub(crate) wave_refresh: Option<WaveRefresh>,
}

impl AudioChannel {
    pub fn new() -> Self {
        Self {
            waveforms: Waveform::empty(),
            frequency: 440,
            volume: 0xFFFF,
            attack_ms: 2,
            decay_ms: 6,
            sustain: 0xFFFF,
            release_ms: 8,
            pulse_width: 0x7FFF,
            noise: 0,
            waveform_offset: 0,
            adsr_phase: AdsrPhase::Off,
            adsr_frame: 0,
            adsr_end_frame: 0,
            adsr: 0,
            adsr_step: 0,
            filter_enable: false,
            filter_cutoff_frequency: 0,
            filter_last_sample: 0,
            filter_coeff: 0,
            filter_coeff_for: None,
            wave_buf_pos: 0,
            wave_buffer: [0; WAVE_BUFFER_LEN],
            wavetable: oscillator::default_wavetable(),
            wave_refresh: None,
        }
    }

    /// Start (or restart) the attack ramp. The envelope always ramps up from
    /// zero, so retriggering a sounding voice is a clean restart.
    pub fn trigger_attack(&mut self) {
        envelope::enter_phase(self, AdsrPhase::Attack);
    }

    /// Begin the release ramp from the current level. A voice that is
    /// already off stays off.
    pub fn trigger_release(&mut self) {
        if self.adsr_phase != AdsrPhase::Off {
            envelope::enter_phase(self, AdsrPhase::Release);
        }
    }

    /// Silence the voice now. Gain is zero from the next tick on; every
    /// other field keeps its value so re-arming restarts cleanly.
    pub fn force_off(&mut self) {
        envelope::enter_phase(self, AdsrPhase::Off);
    }

    /// Current envelope phase.
    pub fn adsr_phase(&self) -> AdsrPhase {
        self.adsr_phase
    }

    /// Current envelope gain, 0..=0xFFFF.
    pub fn envelope_gain(&self) -> u16 {
        (self.adsr >> 8) as u16
    }

    /// The snapshot of the most recent refill cycle's output. Always written
    /// from index 0; [`wave_buf_pos`](Self::wave_buf_pos) entries are from
    /// the last cycle, the rest are older. Stable between refills.
    pub fn wave_buffer(&self) -> &[i16; WAVE_BUFFER_LEN] {
        &self.wave_buffer
    }

    /// How many snapshot entries the last refill cycle wrote.
    pub fn wave_buf_pos(&self) -> usize {
        self.wave_buf_pos as usize
    }

    /// Replace the WAVE generator's table.
    pub fn set_wavetable(&mut self, table: [i16; WAVE_BUFFER_LEN]) {
        self.wavetable = table;
    }

    pub fn wavetable(&self) -> &[i16; WAVE_BUFFER_LEN] {
        &self.wavetable
    }

    /// Install the per-block refresh hook. The installer owns the hook's
    /// lifetime; passing `None` uninstalls.
    pub fn install_wave_refresh(&mut self, hook: Option<WaveRefresh>) {
        self.wave_refresh = hook;
    }

    /// Advance the voice by one sample period and return the output sample.
    ///
    /// Off is a hard short-circuit: no oscillator, filter, or envelope state
    /// moves, which keeps a silenced voice's state stable for re-arming.
    pub(super) fn tick(&mut self) -> i16 {
        if self.adsr_phase == AdsrPhase::Off {
            return 0;
        }

        let gain = envelope::envelope_tick(self) as i64;
        let raw = oscillator::oscillator_tick(self) as i64;

        let mut sample = raw * gain / 0xFFFF * self.volume as i64 / 0xFFFF;
        if self.filter_enable {
            sample = filter::apply(self, sample as i32) as i64;
        }
        sample.clamp(i16::MIN as i64, i16::MAX as i64) as i16
    }

    /// Record a refill cycle's output into the snapshot buffer.
    pub(super) fn snapshot_block(&mut self, block: &[i16]) {
        let n = block.len().min(WAVE_BUFFER_LEN);
        self.wave_buffer[..n].copy_from_slice(&block[..n]);
        self.wave_buf_pos = n as u8;
    }

    /// Run the installed refresh hook over the current snapshot.
    pub(super) fn run_wave_refresh(&mut self) {
        if let Some(mut hook) = self.wave_refresh.take() {
            hook(&self.wave_buffer[..self.wave_buf_pos as usize]);
            // Reinstall unless the hook installed a replacement.
            if self.wave_refresh.is_none() {
                self.wave_refresh = Some(hook);
            }
        }
    }
}

impl Default for AudioChannel {
    fn default() -> Self {
        Self::new()
    }
}
