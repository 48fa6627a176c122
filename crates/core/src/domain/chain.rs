//! Effect stage ordering
//!
//! Stage order is data: four distinct [`EffectStage`] identifiers walked in
//! sequence each block. The textual form is the persisted one
//! (`"0,1,2,3"`); malformed text is repaired slot by slot, never rejected.

use crate::domain::audio::AudioBlock;
use crate::domain::params::EffectParameters;
use crate::domain::resampler::PitchSpeedResampler;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Processing stage identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectStage {
    Stutter = 0,
    PitchShift = 1,
    Speed = 2,
    Reverse = 3,
}

impl EffectStage {
    pub const ALL: [EffectStage; 4] = [
        EffectStage::Stutter,
        EffectStage::PitchShift,
        EffectStage::Speed,
        EffectStage::Reverse,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectStage::Stutter => "stutter",
            EffectStage::PitchShift => "pitch",
            EffectStage::Speed => "speed",
            EffectStage::Reverse => "reverse",
        }
    }
}

impl fmt::Display for EffectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A permutation of the four stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainConfiguration([EffectStage; 4]);

impl Default for ChainConfiguration {
    fn default() -> Self {
        Self(EffectStage::ALL)
    }
}

impl ChainConfiguration {
    /// Build from an explicit order; falls back to the default when the
    /// stages are not all distinct.
    pub fn new(order: [EffectStage; 4]) -> Self {
        let mut seen = [false; 4];
        for stage in order {
            if std::mem::replace(&mut seen[stage.id() as usize], true) {
                return Self::default();
            }
        }
        Self(order)
    }

    pub fn stages(&self) -> &[EffectStage; 4] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = EffectStage> + '_ {
        self.0.iter().copied()
    }

    /// Parse the textual order, repairing bad slots
    ///
    /// Valid, unused ids are taken as-is. Every remaining slot gets its
    /// default id if that is still free, otherwise the smallest unused one.
    /// `"2,x,0"` becomes `2,1,0,3`.
    pub fn parse_lenient(text: &str) -> Self {
        let mut slots: [Option<EffectStage>; 4] = [None; 4];
        let mut used = [false; 4];

        for (slot, token) in slots.iter_mut().zip(text.split(',')) {
            let stage = token.trim().parse::<u8>().ok().and_then(EffectStage::from_id);
            if let Some(stage) = stage {
                if !used[stage.id() as usize] {
                    used[stage.id() as usize] = true;
                    *slot = Some(stage);
                }
            }
        }

        let mut order = EffectStage::ALL;
        for (index, slot) in slots.iter().enumerate() {
            order[index] = match slot {
                Some(stage) => *stage,
                None => {
                    let fallback = if used[index] {
                        used.iter().position(|taken| !taken).unwrap_or(index)
                    } else {
                        index
                    };
                    used[fallback] = true;
                    EffectStage::ALL[fallback]
                }
            };
        }

        Self(order)
    }

    /// Two bits per slot, first slot in the low bits
    pub fn to_bits(&self) -> u8 {
        self.0
            .iter()
            .enumerate()
            .fold(0u8, |bits, (slot, stage)| bits | (stage.id() << (slot * 2)))
    }

    /// Inverse of `to_bits`; a non-permutation yields the default order
    pub fn from_bits(bits: u8) -> Self {
        let mut order = EffectStage::ALL;
        for (slot, stage) in order.iter_mut().enumerate() {
            *stage = EffectStage::ALL[((bits >> (slot * 2)) & 0b11) as usize];
        }
        Self::new(order)
    }
}

impl fmt::Display for ChainConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{},{},{},{}", a.id(), b.id(), c.id(), d.id())
    }
}

impl FromStr for ChainConfiguration {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_lenient(s))
    }
}

impl Serialize for ChainConfiguration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChainConfiguration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&text))
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// Runs the post-playback stages in the configured order
///
/// Capture and playback already happened before this runs, so the stutter
/// slot has nothing left to do. Speed is consumed by the pitch slot.
#[derive(Debug, Clone)]
pub struct EffectChain {
    resampler: PitchSpeedResampler,
}

impl EffectChain {
    pub fn new(max_block_size: usize) -> Self {
        Self {
            resampler: PitchSpeedResampler::new(max_block_size),
        }
    }

    pub fn process(
        &mut self,
        block: &mut AudioBlock,
        len: usize,
        order: &ChainConfiguration,
        params: &EffectParameters,
    ) {
        for stage in order.iter() {
            match stage {
                EffectStage::Stutter => {}
                EffectStage::PitchShift => self.resampler.process(block, len, params),
                EffectStage::Speed => {}
                EffectStage::Reverse => {
                    if params.reverse {
                        reverse_in_place(block, len);
                    }
                }
            }
        }
    }
}

/// Reverse the first `len` frames of every channel
pub fn reverse_in_place(block: &mut AudioBlock, len: usize) {
    let len = len.min(block.num_samples());
    for ch in 0..block.num_channels() {
        block.channel_mut(ch)[..len].reverse();
    }
}
