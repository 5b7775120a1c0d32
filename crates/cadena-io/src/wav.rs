//! WAV file reading and writing.
//!
//! Samples are handled per channel (`Vec<Vec<f32>>`, one vector per
//! channel) because that is how a chain's external ports address them.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.duration());
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// WAV format parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of audio channels.
    pub channels: u16,
    /// Sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: u32,
    /// Bit depth per sample (16, 24 or 32; 32 is written as float).
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 32,
        }
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Read a WAV file as one sample vector per channel.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<Vec<f32>>, WavSpec)> {
    let reader = WavReader::open(path)?;
    let spec = WavSpec::from(reader.spec());
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match reader.spec().sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let frames = interleaved.len() / channels;
    let mut out = vec![Vec::with_capacity(frames); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (channel, &sample) in out.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }

    tracing::debug!(channels, frames, sample_rate = spec.sample_rate, "read wav");
    Ok((out, spec))
}

/// Write one sample vector per channel to a WAV file.
///
/// `spec.channels` is taken from `channels.len()`. All channels must have
/// the same length.
pub fn write_wav<P: AsRef<Path>>(path: P, channels: &[Vec<f32>], spec: WavSpec) -> Result<()> {
    let frames = channels.first().map_or(0, Vec::len);
    if channels.iter().any(|c| c.len() != frames) {
        return Err(Error::Layout("channels differ in length".to_string()));
    }
    let count = u16::try_from(channels.len())
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| Error::Layout(format!("cannot write {} channels", channels.len())))?;

    let spec = WavSpec {
        channels: count,
        ..spec
    };
    let mut writer = WavWriter::create(path, hound::WavSpec::from(spec))?;

    if spec.bits_per_sample == 32 {
        for i in 0..frames {
            for channel in channels {
                writer.write_sample(channel[i])?;
            }
        }
    } else {
        let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
        for i in 0..frames {
            for channel in channels {
                let int_sample = (channel[i] * max_val).clamp(-max_val, max_val - 1.0) as i32;
                writer.write_sample(int_sample)?;
            }
        }
    }

    writer.finalize()?;
    tracing::debug!(channels = channels.len(), frames, "wrote wav");
    Ok(())
}
