//! Tempo to segment-length arithmetic
//!
//! A stutter segment is one note of the selected division at the host
//! tempo: `round(sample_rate * 60 / bpm * 4 / divisor)` samples, clamped to
//! what the capture store can hold.

use crate::domain::audio::DEFAULT_BPM;
use crate::domain::capture::BEATS_PER_BAR;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Note division a stutter segment spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StutterRate {
    #[serde(rename = "1/1")]
    Whole,
    #[serde(rename = "1/2")]
    Half,
    #[serde(rename = "1/4")]
    Quarter,
    #[default]
    #[serde(rename = "1/8")]
    Eighth,
    #[serde(rename = "1/16")]
    Sixteenth,
    #[serde(rename = "1/32")]
    ThirtySecond,
    #[serde(rename = "1/64")]
    SixtyFourth,
}

impl StutterRate {
    /// All rates in parameter-index order
    pub const ALL: [StutterRate; 7] = [
        StutterRate::Whole,
        StutterRate::Half,
        StutterRate::Quarter,
        StutterRate::Eighth,
        StutterRate::Sixteenth,
        StutterRate::ThirtySecond,
        StutterRate::SixtyFourth,
    ];

    /// Denominator `d` of the note fraction `1/d`
    #[inline]
    pub fn divisor(self) -> u32 {
        match self {
            StutterRate::Whole => 1,
            StutterRate::Half => 2,
            StutterRate::Quarter => 4,
            StutterRate::Eighth => 8,
            StutterRate::Sixteenth => 16,
            StutterRate::ThirtySecond => 32,
            StutterRate::SixtyFourth => 64,
        }
    }

    /// Parameter index (0 = 1/1 ... 6 = 1/64)
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Rate for a parameter index; out-of-range indices clamp to the nearest slot
    pub fn from_index(index: i64) -> Self {
        let clamped = index.clamp(0, Self::ALL.len() as i64 - 1) as usize;
        Self::ALL[clamped]
    }

    /// Rate for an exact divisor, if it is one of the supported ones
    pub fn from_divisor(divisor: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.divisor() == divisor)
    }
}

impl fmt::Display for StutterRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1/{}", self.divisor())
    }
}

impl FromStr for StutterRate {
    type Err = String;

    /// Accepts `"1/16"` or a bare divisor `"16"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let divisor = s.strip_prefix("1/").unwrap_or(s);
        divisor
            .parse::<u32>()
            .ok()
            .and_then(Self::from_divisor)
            .ok_or_else(|| format!("unknown stutter rate '{}', expected 1/1 .. 1/64", s))
    }
}

/// Segment length in samples for a tempo and note division
///
/// Non-positive or non-finite tempos use the 120 BPM fallback. The result is
/// clamped to `[1, capacity]`.
pub fn segment_length(sample_rate: f64, bpm: f64, rate: StutterRate, capacity: usize) -> usize {
    let bpm = if bpm.is_finite() && bpm > 0.0 { bpm } else { DEFAULT_BPM };
    let samples_per_beat = sample_rate * 60.0 / bpm;
    let raw = (samples_per_beat * BEATS_PER_BAR / rate.divisor() as f64).round();

    let upper = capacity.max(1);
    if raw.is_nan() || raw < 1.0 {
        1
    } else if raw >= upper as f64 {
        upper
    } else {
        raw as usize
    }
}
