//! The ADSR envelope state machine.
//!
//! Level is tracked in Q8 (full scale = 0xFFFF00) and every ramp is linear
//! in that space. Phase entry snaps the level to the phase's defined start
//! point (attack from 0, decay from full scale, sustain at the sustain
//! level), so the monotonicity of each ramp holds for every parameter
//! combination; release alone ramps from wherever the level was when the
//! note came off. A zero-length ramp snaps to its target and cascades into
//! the next phase in the same call.

use super::channel::AudioChannel;
use super::{AdsrPhase, SAMPLE_RATE};

/// Full-scale envelope level in Q8.
pub(super) const LEVEL_FULL: u32 = 0xFFFF << 8;

fn ms_to_frames(ms: u16) -> u32 {
    u32::from(ms) * SAMPLE_RATE / 1000
}

/// Move the envelope into `phase`, cascading through any zero-length ramps.
pub(super) fn enter_phase(ch: &mut AudioChannel, phase: AdsrPhase) {
    let mut phase = phase;
    loop {
        ch.adsr_phase = phase;
        ch.adsr_frame = 0;
        match phase {
            AdsrPhase::Attack => {
                ch.adsr = 0;
                ch.adsr_end_frame = ms_to_frames(ch.attack_ms);
                if ch.adsr_end_frame == 0 {
                    phase = AdsrPhase::Decay;
                    continue;
                }
                ch.adsr_step = (LEVEL_FULL / ch.adsr_end_frame) as i32;
            }
            AdsrPhase::Decay => {
                ch.adsr = LEVEL_FULL;
                ch.adsr_end_frame = ms_to_frames(ch.decay_ms);
                if ch.adsr_end_frame == 0 {
                    phase = AdsrPhase::Sustain;
                    continue;
                }
                let target = u32::from(ch.sustain) << 8;
                ch.adsr_step =
                    ((i64::from(target) - i64::from(ch.adsr)) / i64::from(ch.adsr_end_frame)) as i32;
            }
            AdsrPhase::Sustain => {
                ch.adsr = u32::from(ch.sustain) << 8;
                ch.adsr_end_frame = 0;
                ch.adsr_step = 0;
            }
            AdsrPhase::Release => {
                ch.adsr_end_frame = ms_to_frames(ch.release_ms);
                if ch.adsr_end_frame == 0 {
                    phase = AdsrPhase::Off;
                    continue;
                }
                ch.adsr_step = -((ch.adsr / ch.adsr_end_frame) as i32);
            }
            AdsrPhase::Off => {
                ch.adsr = 0;
                ch.adsr_end_frame = 0;
                ch.adsr_step = 0;
            }
        }
        break;
    }
}

/// Advance the envelope one tick and return the gain (0..=0xFFFF) that
/// applies to this tick's sample.
pub(super) fn envelope_tick(ch: &mut AudioChannel) -> u16 {
    let gain = (ch.adsr >> 8) as u16;
    match ch.adsr_phase {
        AdsrPhase::Off | AdsrPhase::Sustain => gain,
        AdsrPhase::Attack | AdsrPhase::Decay | AdsrPhase::Release => {
            ch.adsr_frame += 1;
            if ch.adsr_frame >= ch.adsr_end_frame {
                let next = match ch.adsr_phase {
                    AdsrPhase::Attack => AdsrPhase::Decay,
                    AdsrPhase::Decay => AdsrPhase::Sustain,
                    _ => AdsrPhase::Off,
                };
                enter_phase(ch, next);
            } else {
                ch.adsr = step_level(ch.adsr, ch.adsr_step);
            }
            gain
        }
    }
}

fn step_level(level: u32, step: i32) -> u32 {
    (i64::from(level) + i64::from(step)).clamp(0, i64::from(LEVEL_FULL)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed_channel(attack_ms: u16, decay_ms: u16, sustain: u16, release_ms: u16) -> AudioChannel {
        let mut ch = AudioChannel::new();
        ch.attack_ms = attack_ms;
        ch.decay_ms = decay_ms;
        ch.sustain = sustain;
        ch.release_ms = release_ms;
        ch
    }

    #[test]
    fn zero_length_phases_cascade_to_sustain_in_one_call() {
        let mut ch = armed_channel(0, 0, 0x8000, 0);
        enter_phase(&mut ch, AdsrPhase::Attack);
        assert_eq!(ch.adsr_phase, AdsrPhase::Sustain);
        assert_eq!(ch.envelope_gain(), 0x8000);
    }

    #[test]
    fn zero_length_release_drops_straight_to_off() {
        let mut ch = armed_channel(0, 0, 0xFFFF, 0);
        enter_phase(&mut ch, AdsrPhase::Attack);
        enter_phase(&mut ch, AdsrPhase::Release);
        assert_eq!(ch.adsr_phase, AdsrPhase::Off);
        assert_eq!(ch.envelope_gain(), 0);
    }

    #[test]
    fn attack_frame_budget_matches_duration() {
        let mut ch = armed_channel(10, 0, 0xFFFF, 0);
        enter_phase(&mut ch, AdsrPhase::Attack);
        // 10 ms at 22 050 Hz
        assert_eq!(ch.adsr_end_frame, 220);
        for _ in 0..220 {
            assert_eq!(ch.adsr_phase, AdsrPhase::Attack);
            envelope_tick(&mut ch);
        }
        assert_eq!(ch.adsr_phase, AdsrPhase::Sustain);
    }
}
