//! Dry/wet blending and level metering
//!
//! The dry copy is taken before any effect touches the block and blended
//! back afterwards at the configured mix fraction.

use crate::domain::audio::AudioBlock;
use serde::{Deserialize, Serialize};

/// Convert linear amplitude to decibels, floored at [`PeakLevel::MIN_LEVEL`]
#[inline]
pub fn amplitude_to_db(amp: f32) -> f32 {
    if amp <= 0.0 {
        PeakLevel::MIN_LEVEL
    } else {
        (20.0 * amp.log10()).max(PeakLevel::MIN_LEVEL)
    }
}

/// Holds the pre-effect block and blends it with the processed one
#[derive(Debug, Clone)]
pub struct DryWetMixer {
    dry: AudioBlock,
}

impl DryWetMixer {
    /// Dry storage is allocated here, never on the audio thread
    pub fn new(num_channels: usize, max_block_size: usize) -> Self {
        Self {
            dry: AudioBlock::new(num_channels, max_block_size),
        }
    }

    /// Remember the unprocessed block
    #[inline]
    pub fn push_dry(&mut self, block: &AudioBlock) {
        self.dry.copy_from(block);
    }

    /// `dry * (1 - mix) + wet * mix`, mix clamped to `[0, 1]`
    pub fn mix_wet(&self, block: &mut AudioBlock, mix: f32) {
        let mix = if mix.is_nan() { 1.0 } else { mix.clamp(0.0, 1.0) };
        if mix >= 1.0 {
            return;
        }

        let dry_gain = 1.0 - mix;
        let len = block.num_samples().min(self.dry.num_samples());
        let channels = block.num_channels().min(self.dry.num_channels());

        for ch in 0..channels {
            let dry = &self.dry.channel(ch)[..len];
            let wet = &mut block.channel_mut(ch)[..len];
            for (w, &d) in wet.iter_mut().zip(dry) {
                *w = d * dry_gain + *w * mix;
            }
        }
    }

    pub fn dry(&self) -> &AudioBlock {
        &self.dry
    }
}

/// Peak level meter in decibels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakLevel {
    pub current_db: f32,
    pub peak_db: f32,
}

impl PeakLevel {
    pub const MIN_LEVEL: f32 = -120.0;

    pub fn new() -> Self {
        Self {
            current_db: Self::MIN_LEVEL,
            peak_db: Self::MIN_LEVEL,
        }
    }

    /// Update with the loudest sample of a block
    pub fn update_block(&mut self, block: &AudioBlock) {
        let peak = (0..block.num_channels())
            .flat_map(|ch| block.channel(ch).iter())
            .fold(0.0f32, |acc, s| acc.max(s.abs()));

        self.current_db = amplitude_to_db(peak);
        self.peak_db = self.peak_db.max(self.current_db);
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for PeakLevel {
    fn default() -> Self {
        Self::new()
    }
}
