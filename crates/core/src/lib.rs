//! ChopShop core: a tempo-synced stutter/glitch engine for block-based audio.
//!
//! Everything that runs on the audio thread lives under [`domain`] and is
//! allocation-free after [`ChopShopProcessor::prepare`]. Configuration and
//! preset I/O (async, TOML) sit alongside it in [`domain::config`].

pub mod domain;

pub use domain::audio::{AudioBlock, AudioError, BlockContext, ProcessSpec, Result, SampleRate};
pub use domain::chain::{ChainConfiguration, EffectStage};
pub use domain::params::{EffectParameters, ParameterStore, StutterRate, TriggerMode};
pub use domain::processor::{ChopShopProcessor, ProcessorState};
