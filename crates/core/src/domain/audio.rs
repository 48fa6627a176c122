//! Audio block and session abstractions
//!
//! This module defines the host-agnostic shapes the engine consumes: the
//! session spec fixed at prepare time, the planar block buffer mutated in
//! place on every callback, and the per-block context (tempo, note-on).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while setting up the engine
///
/// None of these are reachable from the per-block processing path.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Spec values the engine cannot run with (zero rate, zero channels...)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A configuration that is well-formed but beyond what the engine supports
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Host tempo used when none is reported
pub const DEFAULT_BPM: f64 = 120.0;

/// Upper bound on channels a session may request
pub const MAX_CHANNELS: usize = 32;

/// Audio sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleRate {
    Hz44100,
    Hz48000,
    Hz96000,
    Hz192000,
    Custom(u32),
}

impl SampleRate {
    pub fn hz(&self) -> u32 {
        match self {
            SampleRate::Hz44100 => 44100,
            SampleRate::Hz48000 => 48000,
            SampleRate::Hz96000 => 96000,
            SampleRate::Hz192000 => 192000,
            SampleRate::Custom(hz) => *hz,
        }
    }

    pub fn from_hz(hz: u32) -> Self {
        match hz {
            44100 => SampleRate::Hz44100,
            48000 => SampleRate::Hz48000,
            96000 => SampleRate::Hz96000,
            192000 => SampleRate::Hz192000,
            hz => SampleRate::Custom(hz),
        }
    }

    /// Sample rate as a float for coefficient math
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.hz() as f64
    }
}

/// Session parameters fixed between `prepare` calls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub sample_rate: SampleRate,
    /// Largest block the host will ever hand to `process`
    pub max_block_size: usize,
    pub num_channels: usize,
}

impl ProcessSpec {
    pub fn new(sample_rate: u32, max_block_size: usize, num_channels: usize) -> Self {
        Self {
            sample_rate: SampleRate::from_hz(sample_rate),
            max_block_size,
            num_channels,
        }
    }

    /// Reject specs the engine cannot allocate for
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate.hz() == 0 {
            return Err(AudioError::InvalidConfiguration(
                "sample rate must be non-zero".to_string(),
            ));
        }
        if self.max_block_size == 0 {
            return Err(AudioError::InvalidConfiguration(
                "block size must be non-zero".to_string(),
            ));
        }
        if self.num_channels == 0 {
            return Err(AudioError::InvalidConfiguration(
                "at least one channel is required".to_string(),
            ));
        }
        if self.num_channels > MAX_CHANNELS {
            return Err(AudioError::UnsupportedConfiguration(format!(
                "{} channels requested, at most {} supported",
                self.num_channels, MAX_CHANNELS
            )));
        }
        Ok(())
    }
}

impl Default for ProcessSpec {
    fn default() -> Self {
        Self {
            sample_rate: SampleRate::Hz48000,
            max_block_size: 512,
            num_channels: 2,
        }
    }
}

/// What the host tells the engine about the current block besides audio
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlockContext {
    /// Host tempo, `None` when the host reports no position info
    pub bpm: Option<f64>,
    /// At least one note-on arrived during this block
    pub note_on: bool,
}

impl BlockContext {
    pub fn new(bpm: Option<f64>, note_on: bool) -> Self {
        Self { bpm, note_on }
    }

    /// Host tempo, falling back to 120 BPM when absent or nonsensical
    #[inline]
    pub fn tempo(&self) -> f64 {
        match self.bpm {
            Some(bpm) if bpm.is_finite() && bpm > 0.0 => bpm,
            _ => DEFAULT_BPM,
        }
    }
}

/// Planar block of `f32` samples, one contiguous slice per channel
///
/// Storage is allocated once; `set_len` changes how many frames are active
/// without touching the allocation, so hosts can reuse one block for short
/// trailing buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    channels: Vec<Vec<f32>>,
    len: usize,
}

impl AudioBlock {
    /// Create a silent block
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        Self {
            channels: vec![vec![0.0; num_samples]; num_channels],
            len: num_samples,
        }
    }

    /// Build a block from per-channel vectors (shortest channel sets the length)
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Self {
        let len = channels.iter().map(Vec::len).min().unwrap_or(0);
        Self { channels, len }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Active frames in this block
    pub fn num_samples(&self) -> usize {
        self.len
    }

    /// Frames the storage can hold
    pub fn capacity(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Change the active length, clamped to capacity
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(self.capacity());
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0 || self.channels.is_empty()
    }

    /// Active samples of one channel
    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel][..self.len]
    }

    /// Active samples of one channel, mutable
    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let len = self.len;
        &mut self.channels[channel][..len]
    }

    /// Sample at `(channel, index)`; zero outside the active area
    #[inline]
    pub fn get(&self, channel: usize, index: usize) -> f32 {
        if index < self.len {
            self.channels.get(channel).map_or(0.0, |c| c[index])
        } else {
            0.0
        }
    }

    /// Overwrite one sample; ignored outside the active area
    #[inline]
    pub fn set(&mut self, channel: usize, index: usize, value: f32) {
        if index < self.len {
            if let Some(c) = self.channels.get_mut(channel) {
                c[index] = value;
            }
        }
    }

    /// Copy active frames from another block of the same shape
    pub fn copy_from(&mut self, other: &AudioBlock) {
        let len = self.capacity().min(other.num_samples());
        self.len = len;
        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            dst[..len].copy_from_slice(&src[..len]);
        }
    }

    /// Zero the whole storage
    pub fn clear(&mut self) {
        for c in &mut self.channels {
            c.fill(0.0);
        }
    }

    /// Consume the block, returning the channel vectors truncated to the active length
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        let len = self.len;
        self.channels
            .into_iter()
            .map(|mut c| {
                c.truncate(len);
                c
            })
            .collect()
    }
}
