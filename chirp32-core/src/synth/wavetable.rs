//! Loading a channel wavetable from storage.
//!
//! The WAVE generator plays a 64-entry single-cycle table. This loader pulls
//! a 16-bit PCM WAV out of the device's [`FileStore`], downmixes to mono by
//! averaging frames, and resamples the result to the table length by
//! nearest-neighbour. Anything fancier (band-limiting, interpolation) is the
//! caller's business; the firmware only ever did table lookup.

use std::io::Cursor;

use crate::storage::{FileError, FileStore, OpenMode};

use super::WAVE_BUFFER_LEN;

/// Errors from wavetable loading.
#[derive(Debug)]
pub enum WavetableError {
    /// The underlying file operation failed.
    File(FileError),
    /// The bytes were not a decodable WAV.
    Malformed(hound::Error),
    /// Decodable, but not 16-bit integer PCM.
    UnsupportedEncoding {
        bits_per_sample: u16,
    },
    /// The file decoded to zero frames.
    Empty,
}

impl core::fmt::Display for WavetableError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WavetableError::File(e) => write!(f, "wavetable file access failed: {e}"),
            WavetableError::Malformed(e) => write!(f, "wavetable is not a valid WAV: {e}"),
            WavetableError::UnsupportedEncoding { bits_per_sample } => {
                write!(f, "wavetable must be 16-bit integer PCM, got {bits_per_sample} bits")
            }
            WavetableError::Empty => write!(f, "wavetable WAV contains no samples"),
        }
    }
}

impl std::error::Error for WavetableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WavetableError::File(e) => Some(e),
            WavetableError::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FileError> for WavetableError {
    fn from(e: FileError) -> Self {
        WavetableError::File(e)
    }
}

impl From<hound::Error> for WavetableError {
    fn from(e: hound::Error) -> Self {
        WavetableError::Malformed(e)
    }
}

/// Read `path` from `store` and build a 64-entry single-cycle table.
pub fn load_wavetable(
    store: &mut dyn FileStore,
    path: &str,
) -> Result<[i16; WAVE_BUFFER_LEN], WavetableError> {
    let handle = store.open(path, OpenMode::READ)?;
    let len = store.len(handle)?;
    let mut bytes = vec![0u8; len as usize];
    let got = store.read(handle, 0, &mut bytes)?;
    bytes.truncate(got);
    store.close(handle)?;

    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(WavetableError::UnsupportedEncoding {
            bits_per_sample: spec.bits_per_sample,
        });
    }

    let channels = usize::from(spec.channels);
    if channels == 0 {
        return Err(WavetableError::Empty);
    }
    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<i16>, hound::Error>>()?;

    // Downmix interleaved frames to mono by averaging.
    let mono: Vec<i32> = samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().map(|&s| i32::from(s)).sum::<i32>() / channels as i32)
        .collect();
    if mono.is_empty() {
        return Err(WavetableError::Empty);
    }

    // Nearest-neighbour down to one table cycle.
    let mut table = [0i16; WAVE_BUFFER_LEN];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = mono[i * mono.len() / WAVE_BUFFER_LEN] as i16;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStore;

    /// Encode a WAV in memory the same way the loader will decode it.
    fn wav_bytes(spec: hound::WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut bytes, spec).expect("wav header");
            for &s in samples {
                writer.write_sample(s).expect("wav sample");
            }
            writer.finalize().expect("wav finalize");
        }
        bytes.into_inner()
    }

    fn mono_spec() -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    #[test]
    fn loads_a_mono_cycle_verbatim() {
        let mut samples = [0i16; WAVE_BUFFER_LEN];
        for (i, s) in samples.iter_mut().enumerate() {
            *s = (i as i16) * 100;
        }

        let mut store = MemStore::new();
        store.insert("cycle.wav", wav_bytes(mono_spec(), &samples));

        let table = load_wavetable(&mut store, "cycle.wav").unwrap();
        assert_eq!(table, samples);
    }

    #[test]
    fn stereo_input_is_averaged_to_mono() {
        let spec = hound::WavSpec {
            channels: 2,
            ..mono_spec()
        };
        // 64 frames of (1000, 3000) average to 2000.
        let samples: Vec<i16> = std::iter::repeat_n([1000i16, 3000i16], WAVE_BUFFER_LEN)
            .flatten()
            .collect();

        let mut store = MemStore::new();
        store.insert("stereo.wav", wav_bytes(spec, &samples));

        let table = load_wavetable(&mut store, "stereo.wav").unwrap();
        assert!(table.iter().all(|&s| s == 2000));
    }

    #[test]
    fn missing_file_is_a_file_error() {
        let mut store = MemStore::new();
        assert!(matches!(
            load_wavetable(&mut store, "absent.wav"),
            Err(WavetableError::File(FileError::NotFound(_)))
        ));
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        let mut store = MemStore::new();
        store.insert("junk.wav", b"definitely not riff".to_vec());
        assert!(matches!(
            load_wavetable(&mut store, "junk.wav"),
            Err(WavetableError::Malformed(_))
        ));
    }
}
