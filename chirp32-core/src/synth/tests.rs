#[cfg(test)]
mod tests {
    use crate::synth::{refill, AdsrPhase, AudioChannel, SampleSink, Waveform, BLOCK_SAMPLES};

    /// Sink that accepts a fixed number of samples per cycle and keeps what
    /// it got. Capacity below a block models downstream backpressure.
    struct LimitedSink {
        accepted: Vec<i16>,
        cap: usize,
    }

    impl LimitedSink {
        fn with_capacity(cap: usize) -> Self {
            Self {
                accepted: Vec::new(),
                cap,
            }
        }
    }

    impl SampleSink for LimitedSink {
        fn capacity(&self) -> usize {
            self.cap - self.accepted.len()
        }

        fn commit(&mut self, samples: &[i16]) {
            self.accepted.extend_from_slice(samples);
        }
    }

    /// A voice with instantaneous envelope and full gain: output equals the
    /// raw oscillator, which most scenario tests want.
    fn flat_voice(waveforms: Waveform, frequency: u16) -> AudioChannel {
        let mut ch = AudioChannel::new();
        ch.waveforms = waveforms;
        ch.frequency = frequency;
        ch.volume = 0xFFFF;
        ch.attack_ms = 0;
        ch.decay_ms = 0;
        ch.sustain = 0xFFFF;
        ch.release_ms = 0;
        ch.pulse_width = 0x8000;
        ch.trigger_attack();
        ch
    }

    #[test]
    fn envelope_is_monotone_through_every_phase() {
        let mut ch = AudioChannel::new();
        ch.waveforms = Waveform::SQUARE;
        ch.frequency = 0; // constant raw output; only the envelope moves
        ch.pulse_width = 0x8000;
        ch.attack_ms = 20;
        ch.decay_ms = 15;
        ch.sustain = 0x8000;
        ch.release_ms = 25;
        ch.trigger_attack();

        // Attack: non-decreasing.
        let mut prev = ch.envelope_gain();
        while ch.adsr_phase() == AdsrPhase::Attack {
            ch.tick();
            let gain = ch.envelope_gain();
            assert!(gain >= prev, "attack gain fell from {prev} to {gain}");
            prev = gain;
        }

        // Decay: non-increasing, ending at the sustain level. The ramp is
        // defined from full scale, so the baseline resets at the boundary.
        assert_eq!(ch.adsr_phase(), AdsrPhase::Decay);
        prev = ch.envelope_gain();
        while ch.adsr_phase() == AdsrPhase::Decay {
            ch.tick();
            let gain = ch.envelope_gain();
            assert!(gain <= prev, "decay gain rose from {prev} to {gain}");
            prev = gain;
        }
        assert_eq!(ch.adsr_phase(), AdsrPhase::Sustain);
        assert_eq!(ch.envelope_gain(), 0x8000);

        // Sustain: constant until released.
        for _ in 0..200 {
            ch.tick();
            assert_eq!(ch.envelope_gain(), 0x8000);
        }

        // Release: non-increasing down to silence.
        ch.trigger_release();
        prev = ch.envelope_gain();
        while ch.adsr_phase() == AdsrPhase::Release {
            ch.tick();
            let gain = ch.envelope_gain();
            assert!(gain <= prev, "release gain rose from {prev} to {gain}");
            prev = gain;
        }
        assert_eq!(ch.adsr_phase(), AdsrPhase::Off);
        assert_eq!(ch.envelope_gain(), 0);
    }

    #[test]
    fn forcing_off_silences_within_one_tick_and_stays_silent() {
        let mut ch = flat_voice(Waveform::SQUARE, 440);
        assert_ne!(ch.tick(), 0, "armed voice should be audible");

        ch.force_off();
        for _ in 0..64 {
            assert_eq!(ch.tick(), 0);
            assert_eq!(ch.envelope_gain(), 0);
        }

        // State survived silencing: re-arming restarts cleanly.
        ch.trigger_attack();
        assert_ne!(ch.tick(), 0, "re-armed voice should be audible again");
    }

    #[test]
    fn wave_buffer_reads_are_idempotent_between_refills() {
        let mut ch = flat_voice(Waveform::SINE, 440);
        let mut sink = LimitedSink::with_capacity(BLOCK_SAMPLES);
        refill(&mut ch, &mut sink);

        let first = *ch.wave_buffer();
        let second = *ch.wave_buffer();
        assert_eq!(first, second);
        assert_eq!(ch.wave_buf_pos(), BLOCK_SAMPLES);
    }

    #[test]
    fn square_at_440_hz_is_full_scale_and_toggles_on_schedule() {
        // volume = sustain = 0xFFFF, zero-length envelope, square only,
        // 440 Hz at 22 050 Hz: ±full scale, toggling every ⌊22050/880⌋
        // samples (one extra sample where the fixed-point phase carries).
        let mut ch = flat_voice(Waveform::SQUARE, 440);

        let samples: Vec<i16> = (0..1024).map(|_| ch.tick()).collect();
        assert!(samples.iter().all(|&s| s == i16::MAX || s == -i16::MAX));
        assert_eq!(samples[0], i16::MAX);

        let mut toggles = Vec::new();
        for i in 1..samples.len() {
            if samples[i] != samples[i - 1] {
                toggles.push(i);
            }
        }
        assert!(!toggles.is_empty());
        for pair in toggles.windows(2) {
            let interval = pair[1] - pair[0];
            assert!(
                interval == 25 || interval == 26,
                "half-period of {interval} samples, expected 25 or 26"
            );
        }
    }

    #[test]
    fn output_is_periodic_at_an_exactly_representable_frequency() {
        // 11 025 Hz advances the Q24 accumulator by exactly half a period
        // per tick, so the output repeats with period 2 = 22050 / 11025.
        let mut ch = flat_voice(Waveform::SQUARE, 11_025);
        let samples: Vec<i16> = (0..256).map(|_| ch.tick()).collect();
        for i in 0..samples.len() - 2 {
            assert_eq!(samples[i], samples[i + 2]);
        }
        assert_ne!(samples[0], samples[1], "half-period must actually alternate");
    }

    #[test]
    fn sine_repeats_within_fixed_point_tolerance() {
        // 441 Hz has period 50; the truncated phase increment drifts 16/2^24
        // of a period per cycle, which can move a sample across at most one
        // sine-table step.
        let mut ch = flat_voice(Waveform::SINE, 441);
        let samples: Vec<i16> = (0..512).map(|_| ch.tick()).collect();

        let period = 50;
        for i in 0..samples.len() - period {
            let diff = (i32::from(samples[i]) - i32::from(samples[i + period])).abs();
            assert!(diff <= 900, "sample {i} drifted {diff} across one period");
        }
        assert!(samples.iter().any(|&s| s > 30_000), "sine should reach near full scale");
    }

    #[test]
    fn filter_step_response_decays_toward_target_without_overshoot() {
        // A 0 Hz square is a step input; the filtered output must approach
        // full scale from below and settle there.
        let mut ch = flat_voice(Waveform::SQUARE, 0);
        ch.filter_enable = true;
        ch.filter_cutoff_frequency = 300;

        let mut prev = 0i16;
        let mut settled_at = None;
        for n in 0..2_000 {
            let s = ch.tick();
            assert!(s >= prev, "step response fell from {prev} to {s}");
            assert!(s <= i16::MAX, "step response overshot full scale");
            prev = s;
            if s == i16::MAX && settled_at.is_none() {
                settled_at = Some(n);
            }
        }
        let settled = settled_at.expect("one-pole response never converged");
        assert!(settled < 1_500, "convergence took {settled} ticks");
        assert_eq!(ch.filter_last_sample, i32::from(i16::MAX));
    }

    #[test]
    fn backpressure_silences_the_voice_and_stops_the_snapshot() {
        let mut ch = flat_voice(Waveform::SQUARE, 440);
        let mut sink = LimitedSink::with_capacity(10);

        let outcome = refill(&mut ch, &mut sink);
        assert_eq!(outcome.produced, 10);
        assert!(outcome.backpressured);
        assert_eq!(sink.accepted.len(), 10);

        // The voice is disabled, not wedged.
        assert_eq!(ch.adsr_phase(), AdsrPhase::Off);

        // Snapshot holds exactly what was produced; nothing beyond it was
        // appended this cycle (a fresh channel's buffer starts zeroed).
        assert_eq!(ch.wave_buf_pos(), 10);
        assert_eq!(&ch.wave_buffer()[..10], &sink.accepted[..]);
        assert!(ch.wave_buffer()[10..].iter().all(|&s| s == 0));
    }

    #[test]
    fn refresh_hook_sees_each_cycles_snapshot() {
        use std::sync::{Arc, Mutex};

        let seen: Arc<Mutex<Vec<i16>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_in_hook = Arc::clone(&seen);

        let mut ch = flat_voice(Waveform::SAW, 440);
        ch.install_wave_refresh(Some(Box::new(move |snapshot: &[i16]| {
            let mut seen = seen_in_hook.lock().unwrap();
            seen.clear();
            seen.extend_from_slice(snapshot);
        })));

        let mut sink = LimitedSink::with_capacity(BLOCK_SAMPLES);
        refill(&mut ch, &mut sink);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), BLOCK_SAMPLES);
        assert_eq!(&seen[..], &ch.wave_buffer()[..]);
    }

    #[test]
    fn multiple_waveforms_are_sum_normalized() {
        let mut ch = flat_voice(Waveform::SQUARE | Waveform::SAW, 440);
        // At phase 0 the square is +full and the saw is -full; the
        // normalized mix starts at (almost exactly) zero.
        let first = ch.tick();
        assert_eq!(first, 0);

        for _ in 0..2_048 {
            let s = i32::from(ch.tick());
            assert!((-32_767..=32_767).contains(&s), "mix left the sample domain: {s}");
        }
    }

    #[test]
    fn active_voice_with_no_waveform_bits_is_silent() {
        let mut ch = flat_voice(Waveform::empty(), 440);
        assert_eq!(ch.adsr_phase(), AdsrPhase::Sustain);
        for _ in 0..BLOCK_SAMPLES {
            assert_eq!(ch.tick(), 0);
        }
    }

    #[test]
    fn loaded_wavetable_drives_the_wave_generator() {
        use crate::storage::MemStore;
        use crate::synth::load_wavetable;

        // A constant-positive table makes the WAVE generator a DC source,
        // which is easy to tell apart from the default sine cycle.
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut bytes, spec).unwrap();
            for _ in 0..64 {
                writer.write_sample(12_000i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let mut store = MemStore::new();
        store.insert("dc.wav", bytes.into_inner());

        let mut ch = flat_voice(Waveform::WAVE, 440);
        ch.set_wavetable(load_wavetable(&mut store, "dc.wav").unwrap());

        for _ in 0..128 {
            assert_eq!(ch.tick(), 12_000);
        }
    }
}
