//! WAV file loading and saving
//!
//! Files are decoded into planar `f32` so channels map straight onto
//! [`chopshop_core::AudioBlock`] channels.

use crate::{RenderError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;
use tracing::{debug, info};

/// Decoded audio: one `Vec<f32>` per channel, all the same length
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioClip {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() {
            return Err(RenderError::UnsupportedFormat("clip has no channels".to_string()));
        }
        if sample_rate == 0 {
            return Err(RenderError::UnsupportedFormat("sample rate is zero".to_string()));
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(RenderError::UnsupportedFormat(
                "channels have different lengths".to_string(),
            ));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Silent clip
    pub fn silent(num_channels: usize, num_frames: usize, sample_rate: u32) -> Result<Self> {
        Self::new(vec![vec![0.0; num_frames]; num_channels], sample_rate)
    }

    /// Split interleaved samples into channels; a trailing partial frame is dropped
    pub fn from_interleaved(samples: &[f32], num_channels: usize, sample_rate: u32) -> Result<Self> {
        if num_channels == 0 {
            return Err(RenderError::UnsupportedFormat("clip has no channels".to_string()));
        }
        let frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.channels[channel]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Largest absolute sample across all channels
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }
}

/// Load a WAV file (8/16/24/32-bit int or 32-bit float)
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<AudioClip> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    debug!(
        path = %path.display(),
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        "Reading WAV"
    );

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => {
            if spec.bits_per_sample != 32 {
                return Err(RenderError::UnsupportedFormat(format!(
                    "{}-bit float WAV",
                    spec.bits_per_sample
                )));
            }
            reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<f32>, _>>()?
        }
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if bits == 0 || bits > 32 {
                return Err(RenderError::UnsupportedFormat(format!("{}-bit integer WAV", bits)));
            }
            let max_val = (1u64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<f32>, _>>()?
        }
    };

    let clip = AudioClip::from_interleaved(&samples, spec.channels as usize, spec.sample_rate)?;
    info!(
        path = %path.display(),
        frames = clip.num_frames(),
        channels = clip.num_channels(),
        "WAV loaded"
    );
    Ok(clip)
}

/// Save a clip as 32-bit float WAV
pub fn write_wav<P: AsRef<Path>>(path: P, clip: &AudioClip) -> Result<()> {
    let path = path.as_ref();
    let channels = u16::try_from(clip.num_channels()).map_err(|_| {
        RenderError::UnsupportedFormat(format!("{} channels", clip.num_channels()))
    })?;

    let spec = WavSpec {
        channels,
        sample_rate: clip.sample_rate(),
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for frame in 0..clip.num_frames() {
        for channel in clip.channels() {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;

    info!(path = %path.display(), frames = clip.num_frames(), "WAV written");
    Ok(())
}
