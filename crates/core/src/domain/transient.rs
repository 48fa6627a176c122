//! Trigger detection
//!
//! Decides, per sample, whether the stutter loop should restart. Three
//! modes are supported: free-running (never triggers), note-on driven and
//! an envelope-delta transient detector with a 3 dB hysteresis band.

use crate::domain::audio::AudioBlock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Floor applied to envelopes before taking the logarithm
const LEVEL_FLOOR: f32 = 1e-6;

/// Gap between the trigger-on and trigger-off levels
pub const HYSTERESIS_DB: f32 = 3.0;

pub const FAST_ATTACK_SEC: f64 = 0.001;
pub const FAST_RELEASE_SEC: f64 = 0.010;
pub const SLOW_ATTACK_SEC: f64 = 0.050;
pub const SLOW_RELEASE_SEC: f64 = 0.200;

/// What restarts the stutter loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Loop runs freely, no external restarts
    #[default]
    Always,
    /// Restart on any note-on in the block
    Midi,
    /// Restart on detected transients
    Threshold,
}

impl TriggerMode {
    pub const ALL: [TriggerMode; 3] = [TriggerMode::Always, TriggerMode::Midi, TriggerMode::Threshold];

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Mode for a parameter index, clamped into range
    pub fn from_index(index: i64) -> Self {
        let clamped = index.clamp(0, Self::ALL.len() as i64 - 1) as usize;
        Self::ALL[clamped]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TriggerMode::Always => "always",
            TriggerMode::Midi => "midi",
            TriggerMode::Threshold => "threshold",
        }
    }
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(TriggerMode::Always),
            "midi" => Ok(TriggerMode::Midi),
            "threshold" => Ok(TriggerMode::Threshold),
            other => Err(format!(
                "unknown trigger mode '{}', expected always, midi or threshold",
                other
            )),
        }
    }
}

// ============================================================================
// ENVELOPE FOLLOWER
// ============================================================================

/// One-pole peak follower with separate attack and release
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeFollower {
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
}

impl EnvelopeFollower {
    pub fn new(attack_sec: f64, release_sec: f64, sample_rate: f64) -> Self {
        Self {
            attack_coeff: Self::coefficient(attack_sec, sample_rate),
            release_coeff: Self::coefficient(release_sec, sample_rate),
            envelope: 0.0,
        }
    }

    /// `exp(-1 / (time * sample_rate))`; zero time gives an instant follower
    fn coefficient(time_sec: f64, sample_rate: f64) -> f32 {
        let samples = time_sec * sample_rate;
        if samples > 0.0 {
            (-1.0 / samples).exp() as f32
        } else {
            0.0
        }
    }

    /// Feed one sample, returning the updated envelope
    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let level = sample.abs();
        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = coeff * self.envelope + (1.0 - coeff) * level;
        self.envelope
    }

    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    pub fn attack_coeff(&self) -> f32 {
        self.attack_coeff
    }

    pub fn release_coeff(&self) -> f32 {
        self.release_coeff
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

/// Linear level to dB with the detector's floor
#[inline]
fn level_db(level: f32) -> f32 {
    20.0 * level.max(LEVEL_FLOOR).log10()
}

// ============================================================================
// TRANSIENT DETECTOR
// ============================================================================

#[derive(Debug, Clone)]
struct ChannelState {
    fast: EnvelopeFollower,
    slow: EnvelopeFollower,
    triggered: bool,
}

impl ChannelState {
    fn new(sample_rate: f64) -> Self {
        Self {
            fast: EnvelopeFollower::new(FAST_ATTACK_SEC, FAST_RELEASE_SEC, sample_rate),
            slow: EnvelopeFollower::new(SLOW_ATTACK_SEC, SLOW_RELEASE_SEC, sample_rate),
            triggered: false,
        }
    }
}

/// Per-channel fast/slow envelope comparator
///
/// A channel fires when the fast envelope rises more than `threshold_db`
/// above the slow one, then stays latched until the difference falls below
/// `threshold_db - 3`. Any channel firing triggers the whole frame.
#[derive(Debug, Clone)]
pub struct TransientDetector {
    channels: Vec<ChannelState>,
}

impl TransientDetector {
    pub fn new(num_channels: usize, sample_rate: f64) -> Self {
        Self {
            channels: (0..num_channels).map(|_| ChannelState::new(sample_rate)).collect(),
        }
    }

    /// Should the loop restart at `index` of this block?
    ///
    /// Envelopes only advance in threshold mode. Note-on triggers land on
    /// the first sample of the block.
    #[inline]
    pub fn should_trigger(
        &mut self,
        mode: TriggerMode,
        note_on: bool,
        threshold_db: f32,
        block: &AudioBlock,
        index: usize,
    ) -> bool {
        match mode {
            TriggerMode::Always => false,
            TriggerMode::Midi => note_on && index == 0,
            TriggerMode::Threshold => self.process_frame(block, index, threshold_db),
        }
    }

    /// Run every channel's followers over one frame; true on any rising edge
    pub fn process_frame(&mut self, block: &AudioBlock, index: usize, threshold_db: f32) -> bool {
        let release_db = threshold_db - HYSTERESIS_DB;
        let mut fired = false;

        for (ch, state) in self.channels.iter_mut().enumerate() {
            let sample = block.get(ch, index);
            let fast = state.fast.process(sample);
            let slow = state.slow.process(sample);
            let delta = level_db(fast) - level_db(slow);

            if delta > threshold_db && !state.triggered {
                state.triggered = true;
                fired = true;
            } else if delta < release_db {
                state.triggered = false;
            }
        }

        fired
    }

    /// Current fast-minus-slow difference of one channel, in dB
    pub fn delta_db(&self, channel: usize) -> f32 {
        self.channels
            .get(channel)
            .map_or(0.0, |s| level_db(s.fast.envelope()) - level_db(s.slow.envelope()))
    }

    pub fn is_latched(&self, channel: usize) -> bool {
        self.channels.get(channel).is_some_and(|s| s.triggered)
    }

    pub fn reset(&mut self) {
        for state in &mut self.channels {
            state.fast.reset();
            state.slow.reset();
            state.triggered = false;
        }
    }
}
