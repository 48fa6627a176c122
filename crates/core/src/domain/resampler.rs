//! Varispeed pitch/speed stage
//!
//! Linear-interpolation resampling within a single block. The fractional
//! read cursor starts at zero on every block and is clamped to the last
//! input sample, so ratios above 1 hold the final sample once the input is
//! exhausted.

use crate::domain::audio::AudioBlock;
use crate::domain::params::EffectParameters;

/// Pitch changes smaller than this (semitones) count as none
const PITCH_EPSILON: f32 = 0.01;

/// Speed changes smaller than this (percent) count as none
const SPEED_EPSILON: f32 = 0.1;

/// Block-scoped linear resampler with preallocated scratch
#[derive(Debug, Clone)]
pub struct PitchSpeedResampler {
    scratch: Vec<f32>,
}

impl PitchSpeedResampler {
    /// Scratch is sized once for the largest block
    pub fn new(max_block_size: usize) -> Self {
        Self {
            scratch: vec![0.0; max_block_size],
        }
    }

    /// Read-cursor increment per output sample
    ///
    /// `2^(semitones/12)`, multiplied by `speed/100` when linked.
    #[inline]
    pub fn ratio(pitch_semitones: f32, speed_percent: f32, link: bool) -> f64 {
        let pitch_ratio = 2f64.powf(pitch_semitones as f64 / 12.0);
        if link {
            pitch_ratio * (speed_percent as f64 / 100.0)
        } else {
            pitch_ratio
        }
    }

    /// No pitch change and normal speed
    #[inline]
    pub fn is_passthrough(pitch_semitones: f32, speed_percent: f32) -> bool {
        pitch_semitones.abs() < PITCH_EPSILON && (speed_percent - 100.0).abs() < SPEED_EPSILON
    }

    /// Resample the first `len` frames of every channel in place
    pub fn process(&mut self, block: &mut AudioBlock, len: usize, params: &EffectParameters) {
        if Self::is_passthrough(params.pitch_semitones, params.speed_percent) {
            return;
        }

        let ratio = Self::ratio(params.pitch_semitones, params.speed_percent, params.link);
        let len = len.min(block.num_samples()).min(self.scratch.len());
        if len == 0 {
            return;
        }

        for ch in 0..block.num_channels() {
            let samples = &mut block.channel_mut(ch)[..len];
            let source = &mut self.scratch[..len];
            source.copy_from_slice(samples);
            Self::resample_into(source, samples, ratio);
        }
    }

    /// Walk a fractional cursor over `source`, writing one output per slot
    fn resample_into(source: &[f32], output: &mut [f32], ratio: f64) {
        let last = source.len() - 1;
        let mut read_pos = 0.0f64;

        for out in output.iter_mut() {
            let idx0 = (read_pos.floor() as usize).min(last);
            let idx1 = (idx0 + 1).min(last);
            let frac = (read_pos - idx0 as f64) as f32;

            *out = source[idx0] * (1.0 - frac) + source[idx1] * frac;

            read_pos = (read_pos + ratio).min(last as f64);
        }
    }
}
