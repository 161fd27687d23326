//! The buffer-refill bridge between the voice and the host's stream.
//!
//! The host's timer (or interrupt) calls [`refill`] once per block period.
//! The bridge asks the sink how much it can still take this cycle, runs the
//! envelope/oscillator/filter in lockstep for that many ticks, commits the
//! result, and snapshots it into the channel's wave buffer.
//!
//! Real-time rule: the bridge never blocks and never retries. A sink that
//! reports less than a full block of capacity is backpressure; the bridge
//! stops producing for the cycle and silences the voice, leaving it for the
//! application to re-arm. Silence is recoverable; a stalled audio interrupt
//! is not.

use super::channel::AudioChannel;
use super::BLOCK_SAMPLES;

/// Downstream consumer of produced samples.
///
/// Implementations must answer [`capacity`](Self::capacity) without blocking
/// and accept any `commit` no longer than the capacity they just reported.
pub trait SampleSink {
    /// How many more samples the sink accepts this cycle.
    fn capacity(&self) -> usize;
    /// Take ownership of produced samples.
    fn commit(&mut self, samples: &[i16]);
}

/// What a refill cycle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefillOutcome {
    /// Samples produced and committed this cycle.
    pub produced: usize,
    /// True if the sink could not take a full block and the voice was
    /// silenced in response.
    pub backpressured: bool,
}

/// Produce one block of samples from `channel` into `sink`.
pub fn refill(channel: &mut AudioChannel, sink: &mut dyn SampleSink) -> RefillOutcome {
    let want = BLOCK_SAMPLES.min(sink.capacity());

    let mut block = [0i16; BLOCK_SAMPLES];
    for slot in block.iter_mut().take(want) {
        *slot = channel.tick();
    }

    sink.commit(&block[..want]);
    channel.snapshot_block(&block[..want]);

    let backpressured = want < BLOCK_SAMPLES;
    if backpressured {
        channel.force_off();
    }
    channel.run_wave_refresh();

    RefillOutcome {
        produced: want,
        backpressured,
    }
}
