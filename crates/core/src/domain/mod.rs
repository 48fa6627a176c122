//! Domain entities and real-time processing stages

pub mod audio;
pub mod capture;
pub mod chain;
pub mod config;
pub mod engine;
pub mod mixer;
pub mod params;
pub mod processor;
pub mod resampler;
pub mod stutter;
pub mod tempo;
pub mod transient;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{AudioBlock, AudioError, BlockContext, ProcessSpec, SampleRate};
pub use capture::RingBufferStore;
pub use chain::{ChainConfiguration, EffectChain, EffectStage};
pub use config::{factory_presets, AppConfig, ChopShopConfig, ConfigError, ConfigManager, PresetManager};
pub use engine::StutterEngine;
pub use mixer::{DryWetMixer, PeakLevel};
pub use params::{EffectParameters, ParameterStore, StutterRate, TriggerMode};
pub use processor::{ChopShopProcessor, ProcessorState};
pub use resampler::PitchSpeedResampler;
pub use stutter::{PlaybackCursor, StutterPlayer};
pub use tempo::segment_length;
pub use transient::{EnvelopeFollower, TransientDetector};
