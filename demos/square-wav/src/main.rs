//! Minimal chirp32 host driver.
//!
//! Opens the device's audio stream, configures channel 0 as a filtered
//! square-wave voice, holds the note for a while, releases it, and keeps
//! pumping refill cycles until the envelope goes quiet. Every produced block
//! is streamed into `square.wav`.
//!
//! This is the driver side of the refill contract: the loop below stands in
//! for the timer/interrupt a real host wires the bridge to.

use std::fs::File;
use std::io::BufWriter;

use anyhow::{bail, Context, Result};
use chirp32_core::{AdsrPhase, AudioProfile, Device, SampleSink, Waveform, SAMPLE_RATE};
use chirp32_sdk::Voice;

/// Streams committed samples straight into a WAV file.
///
/// A write failure flips the sink into reporting zero capacity, which the
/// bridge treats as backpressure and answers by silencing the voice. The
/// engine never learns about I/O, only about a sink that stopped accepting.
struct WavSink {
    writer: hound::WavWriter<BufWriter<File>>,
    error: Option<hound::Error>,
    written: usize,
}

impl SampleSink for WavSink {
    fn capacity(&self) -> usize {
        if self.error.is_some() {
            0
        } else {
            chirp32_core::BLOCK_SAMPLES
        }
    }

    fn commit(&mut self, samples: &[i16]) {
        for &sample in samples {
            if let Err(e) = self.writer.write_sample(sample) {
                self.error = Some(e);
                return;
            }
            self.written += 1;
        }
    }
}

fn main() -> Result<()> {
    let mut device = Device::default();
    device
        .open_audio(AudioProfile::default())
        .context("negotiating the audio stream")?;

    Voice::new(&mut device.channels[0])
        .waveform(Waveform::SQUARE)
        .note(69)
        .volume(0xE000)
        .envelope(5, 40, 0xA000, 150)
        .low_pass(3_000);
    device.note_on(0);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let writer = hound::WavWriter::create("square.wav", spec).context("creating square.wav")?;
    let mut sink = WavSink {
        writer,
        error: None,
        written: 0,
    };

    // Hold the note for roughly 400 ms of refill cycles.
    let hold_blocks = (SAMPLE_RATE as usize * 2 / 5) / chirp32_core::BLOCK_SAMPLES;
    for _ in 0..hold_blocks {
        device.pump_audio(&mut sink);
    }

    // Release, then drain the tail. The envelope bounds this loop, but cap
    // it anyway so a mis-set release can't spin forever.
    device.note_off(0);
    for _ in 0..1_024 {
        if device.channels[0].adsr_phase() == AdsrPhase::Off {
            break;
        }
        device.pump_audio(&mut sink);
    }

    if let Some(e) = sink.error.take() {
        bail!("writing square.wav failed: {e}");
    }
    let written = sink.written;
    sink.writer.finalize().context("finalizing square.wav")?;

    device.debug(&format!(
        "square-wav: wrote {written} samples ({:.2} s) to square.wav",
        written as f32 / SAMPLE_RATE as f32
    ));
    device.close_audio();
    Ok(())
}
