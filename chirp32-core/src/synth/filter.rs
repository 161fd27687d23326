//! One-pole low-pass smoothing.
//!
//! `y = x + (y_prev - x) * k` with `k = exp(-2π·fc/fs)` in Q15. The
//! coefficient derivation is the only floating-point math in the engine and
//! it runs at control rate: the Q15 value is cached and re-derived only when
//! the cutoff field changes, never per tick.
//!
//! The feedback term divides rather than shifts: truncation toward zero
//! shrinks the error magnitude every tick, so the output converges from
//! either side without overshoot. An arithmetic shift would floor negative
//! errors and a rising step could stall short of its target.

use super::channel::AudioChannel;
use super::SAMPLE_RATE;

const COEFF_ONE: i64 = 1 << 15;

/// Filter this tick's sample through the channel's one-pole state.
pub(super) fn apply(ch: &mut AudioChannel, sample: i32) -> i32 {
    if ch.filter_coeff_for != Some(ch.filter_cutoff_frequency) {
        recompute_coeff(ch);
    }

    let x = i64::from(sample);
    let feedback = (i64::from(ch.filter_last_sample) - x) * i64::from(ch.filter_coeff) / COEFF_ONE;
    let y = (x + feedback) as i32;
    ch.filter_last_sample = y;
    y
}

fn recompute_coeff(ch: &mut AudioChannel) {
    let fc = f32::from(ch.filter_cutoff_frequency);
    let k = (-core::f32::consts::TAU * fc / SAMPLE_RATE as f32).exp();
    // Cap below 1.0 in Q15: a cutoff of 0 would otherwise freeze the output
    // instead of converging.
    ch.filter_coeff = ((k * COEFF_ONE as f32) as i64).min(COEFF_ONE - 1) as i32;
    ch.filter_coeff_for = Some(ch.filter_cutoff_frequency);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficient_is_cached_until_the_cutoff_changes() {
        let mut ch = AudioChannel::new();
        ch.filter_cutoff_frequency = 1000;
        apply(&mut ch, 0);
        let first = ch.filter_coeff;

        // Same cutoff: cached value is reused.
        apply(&mut ch, 100);
        assert_eq!(ch.filter_coeff, first);

        // Lower cutoff smooths harder, so the coefficient grows.
        ch.filter_cutoff_frequency = 100;
        apply(&mut ch, 100);
        assert!(ch.filter_coeff > first);
    }

    #[test]
    fn zero_cutoff_still_converges() {
        let mut ch = AudioChannel::new();
        ch.filter_cutoff_frequency = 0;

        let mut last = 0;
        for _ in 0..20_000 {
            last = apply(&mut ch, 10_000);
            if last == 10_000 {
                break;
            }
        }
        assert_eq!(last, 10_000, "capped coefficient must still reach the target");
    }

    #[test]
    fn rising_and_falling_steps_both_converge() {
        let mut ch = AudioChannel::new();
        ch.filter_cutoff_frequency = 500;

        for _ in 0..2_000 {
            apply(&mut ch, 8_000);
        }
        assert_eq!(ch.filter_last_sample, 8_000);

        for _ in 0..2_000 {
            apply(&mut ch, -8_000);
        }
        assert_eq!(ch.filter_last_sample, -8_000);
    }
}
