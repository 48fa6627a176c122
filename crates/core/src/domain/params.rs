//! Effect parameters and the lock-free store the audio thread reads them from
//!
//! The control side writes individual parameters whenever it likes; the
//! audio side calls [`ParameterStore::snapshot`] once per block, which does
//! exactly one atomic load per parameter. Each slot sits on its own cache
//! line so UI writes never contend with the audio thread's reads.

use crate::domain::chain::ChainConfiguration;
use crossbeam::atomic::AtomicCell;
use crossbeam::utils::CachePadded;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

pub use crate::domain::tempo::StutterRate;
pub use crate::domain::transient::TriggerMode;

/// Parameter ranges
pub mod limits {
    pub const PITCH_MIN: f32 = -24.0;
    pub const PITCH_MAX: f32 = 24.0;

    /// Speed in percent of normal playback
    pub const SPEED_MIN: f32 = 50.0;
    pub const SPEED_MAX: f32 = 200.0;

    pub const THRESHOLD_MIN: f32 = -60.0;
    pub const THRESHOLD_MAX: f32 = 0.0;

    /// Mix as a fraction (0 = dry, 1 = wet)
    pub const MIX_MIN: f32 = 0.0;
    pub const MIX_MAX: f32 = 1.0;
}

/// Clamp into `[min, max]`, mapping NaN to `fallback`
#[inline]
fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

/// One consistent set of effect parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectParameters {
    pub stutter_rate: StutterRate,
    /// Semitones, -24 to +24
    pub pitch_semitones: f32,
    /// Percent, 50 to 200
    pub speed_percent: f32,
    /// Speed follows pitch (varispeed)
    pub link: bool,
    pub reverse: bool,
    pub trigger_mode: TriggerMode,
    /// dB, -60 to 0
    pub threshold_db: f32,
    /// 0.0 (dry) to 1.0 (wet)
    pub mix: f32,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            stutter_rate: StutterRate::Eighth,
            pitch_semitones: 0.0,
            speed_percent: 100.0,
            link: false,
            reverse: false,
            trigger_mode: TriggerMode::Always,
            threshold_db: -20.0,
            mix: 1.0,
        }
    }
}

impl EffectParameters {
    /// Copy with every continuous value pulled into its documented range
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        Self {
            pitch_semitones: clamp_or(
                self.pitch_semitones,
                limits::PITCH_MIN,
                limits::PITCH_MAX,
                defaults.pitch_semitones,
            ),
            speed_percent: clamp_or(
                self.speed_percent,
                limits::SPEED_MIN,
                limits::SPEED_MAX,
                defaults.speed_percent,
            ),
            threshold_db: clamp_or(
                self.threshold_db,
                limits::THRESHOLD_MIN,
                limits::THRESHOLD_MAX,
                defaults.threshold_db,
            ),
            mix: clamp_or(self.mix, limits::MIX_MIN, limits::MIX_MAX, defaults.mix),
            ..*self
        }
    }

    /// True when the values are already within range
    pub fn is_sanitized(&self) -> bool {
        *self == self.sanitized()
    }
}

/// Atomic parameter slots shared between control and audio contexts
///
/// Share it as `Arc<ParameterStore>`. Setters clamp, so the audio side
/// never sees an out-of-range value.
#[derive(Debug)]
pub struct ParameterStore {
    stutter_rate: CachePadded<AtomicU8>,
    pitch_semitones: CachePadded<AtomicCell<f32>>,
    speed_percent: CachePadded<AtomicCell<f32>>,
    link: CachePadded<AtomicBool>,
    reverse: CachePadded<AtomicBool>,
    trigger_mode: CachePadded<AtomicU8>,
    threshold_db: CachePadded<AtomicCell<f32>>,
    mix: CachePadded<AtomicCell<f32>>,
    chain_order: CachePadded<AtomicU8>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::with_parameters(&EffectParameters::default())
    }

    pub fn with_parameters(params: &EffectParameters) -> Self {
        let params = params.sanitized();
        Self {
            stutter_rate: CachePadded::new(AtomicU8::new(params.stutter_rate.index())),
            pitch_semitones: CachePadded::new(AtomicCell::new(params.pitch_semitones)),
            speed_percent: CachePadded::new(AtomicCell::new(params.speed_percent)),
            link: CachePadded::new(AtomicBool::new(params.link)),
            reverse: CachePadded::new(AtomicBool::new(params.reverse)),
            trigger_mode: CachePadded::new(AtomicU8::new(params.trigger_mode.index())),
            threshold_db: CachePadded::new(AtomicCell::new(params.threshold_db)),
            mix: CachePadded::new(AtomicCell::new(params.mix)),
            chain_order: CachePadded::new(AtomicU8::new(ChainConfiguration::default().to_bits())),
        }
    }

    /// Read every parameter once
    #[inline]
    pub fn snapshot(&self) -> EffectParameters {
        EffectParameters {
            stutter_rate: StutterRate::from_index(self.stutter_rate.load(Ordering::Relaxed) as i64),
            pitch_semitones: self.pitch_semitones.load(),
            speed_percent: self.speed_percent.load(),
            link: self.link.load(Ordering::Relaxed),
            reverse: self.reverse.load(Ordering::Relaxed),
            trigger_mode: TriggerMode::from_index(self.trigger_mode.load(Ordering::Relaxed) as i64),
            threshold_db: self.threshold_db.load(),
            mix: self.mix.load(),
        }
    }

    /// Overwrite every parameter slot (chain order untouched)
    pub fn apply(&self, params: &EffectParameters) {
        self.set_stutter_rate(params.stutter_rate);
        self.set_pitch_semitones(params.pitch_semitones);
        self.set_speed_percent(params.speed_percent);
        self.set_link(params.link);
        self.set_reverse(params.reverse);
        self.set_trigger_mode(params.trigger_mode);
        self.set_threshold_db(params.threshold_db);
        self.set_mix(params.mix);
    }

    pub fn set_stutter_rate(&self, rate: StutterRate) {
        self.stutter_rate.store(rate.index(), Ordering::Relaxed);
    }

    /// Set the rate from a raw parameter index (clamped)
    pub fn set_stutter_rate_index(&self, index: i64) {
        self.set_stutter_rate(StutterRate::from_index(index));
    }

    pub fn set_pitch_semitones(&self, semitones: f32) {
        self.pitch_semitones
            .store(clamp_or(semitones, limits::PITCH_MIN, limits::PITCH_MAX, 0.0));
    }

    pub fn set_speed_percent(&self, percent: f32) {
        self.speed_percent
            .store(clamp_or(percent, limits::SPEED_MIN, limits::SPEED_MAX, 100.0));
    }

    pub fn set_link(&self, link: bool) {
        self.link.store(link, Ordering::Relaxed);
    }

    pub fn set_reverse(&self, reverse: bool) {
        self.reverse.store(reverse, Ordering::Relaxed);
    }

    pub fn set_trigger_mode(&self, mode: TriggerMode) {
        self.trigger_mode.store(mode.index(), Ordering::Relaxed);
    }

    pub fn set_threshold_db(&self, db: f32) {
        self.threshold_db
            .store(clamp_or(db, limits::THRESHOLD_MIN, limits::THRESHOLD_MAX, -20.0));
    }

    pub fn set_mix(&self, mix: f32) {
        self.mix.store(clamp_or(mix, limits::MIX_MIN, limits::MIX_MAX, 1.0));
    }

    pub fn chain_order(&self) -> ChainConfiguration {
        ChainConfiguration::from_bits(self.chain_order.load(Ordering::Relaxed))
    }

    pub fn set_chain_order(&self, order: ChainConfiguration) {
        self.chain_order.store(order.to_bits(), Ordering::Relaxed);
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}
