//! Host-facing processor lifecycle
//!
//! `prepare` / `process` / `release` mirror what a plugin host drives. The
//! processor reads parameters from a shared [`ParameterStore`] once per
//! block and never allocates inside `process`.

use crate::domain::audio::{AudioBlock, BlockContext, ProcessSpec, Result};
use crate::domain::chain::ChainConfiguration;
use crate::domain::engine::StutterEngine;
use crate::domain::mixer::DryWetMixer;
use crate::domain::params::{EffectParameters, ParameterStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Persistable processor state: parameter values plus the textual chain order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorState {
    #[serde(default)]
    pub parameters: EffectParameters,
    #[serde(default = "default_chain_text")]
    pub chain_order: String,
}

fn default_chain_text() -> String {
    ChainConfiguration::default().to_string()
}

impl Default for ProcessorState {
    fn default() -> Self {
        Self {
            parameters: EffectParameters::default(),
            chain_order: default_chain_text(),
        }
    }
}

struct Prepared {
    engine: StutterEngine,
    mixer: DryWetMixer,
}

/// The stutter effect as a host sees it
pub struct ChopShopProcessor {
    params: Arc<ParameterStore>,
    prepared: Option<Prepared>,
}

impl ChopShopProcessor {
    pub fn new() -> Self {
        Self::with_store(Arc::new(ParameterStore::new()))
    }

    /// Build around an existing store, e.g. one a UI already holds
    pub fn with_store(params: Arc<ParameterStore>) -> Self {
        Self {
            params,
            prepared: None,
        }
    }

    /// Handle for the control side
    pub fn parameters(&self) -> Arc<ParameterStore> {
        Arc::clone(&self.params)
    }

    /// Allocate everything for a session
    ///
    /// Preparing again discards the previous capture and starts silent.
    pub fn prepare(&mut self, spec: ProcessSpec) -> Result<()> {
        spec.validate()?;
        let engine = StutterEngine::new(spec)?;
        let mixer = DryWetMixer::new(spec.num_channels, spec.max_block_size);

        info!(
            sample_rate = spec.sample_rate.hz(),
            block_size = spec.max_block_size,
            channels = spec.num_channels,
            "Processor prepared"
        );

        self.prepared = Some(Prepared { engine, mixer });
        Ok(())
    }

    /// Drop all session buffers
    pub fn release(&mut self) {
        if self.prepared.take().is_some() {
            debug!("Processor released");
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    pub fn spec(&self) -> Option<ProcessSpec> {
        self.prepared.as_ref().map(|p| *p.engine.spec())
    }

    /// Run one block in place; unprepared processors pass audio through
    pub fn process(&mut self, block: &mut AudioBlock, context: BlockContext) {
        let Some(prepared) = self.prepared.as_mut() else {
            return;
        };

        let params = self.params.snapshot();
        let order = self.params.chain_order();

        prepared.mixer.push_dry(block);
        prepared.engine.process_block(block, context, &params, &order);
        prepared.mixer.mix_wet(block, params.mix);
    }

    /// Current parameters and chain order
    pub fn state(&self) -> ProcessorState {
        ProcessorState {
            parameters: self.params.snapshot(),
            chain_order: self.params.chain_order().to_string(),
        }
    }

    /// Restore saved state; bad values are clamped or repaired
    pub fn set_state(&mut self, state: &ProcessorState) {
        self.params.apply(&state.parameters.sanitized());
        let order = ChainConfiguration::parse_lenient(&state.chain_order);
        self.params.set_chain_order(order);
        debug!(chain_order = %order, "Processor state restored");
    }
}

impl Default for ChopShopProcessor {
    fn default() -> Self {
        Self::new()
    }
}
