//! Per-block stutter pipeline
//!
//! Order of work for one block:
//! 1. capture the whole input block into the ring store
//! 2. recompute the segment length from the host tempo
//! 3. per sample: trigger detection on the input, then overwrite the block
//!    with loop playback
//! 4. run the configured effect chain over the result
//!
//! Everything is allocated in [`StutterEngine::new`].

use crate::domain::audio::{AudioBlock, BlockContext, ProcessSpec, Result};
use crate::domain::capture::RingBufferStore;
use crate::domain::chain::{ChainConfiguration, EffectChain};
use crate::domain::params::EffectParameters;
use crate::domain::stutter::StutterPlayer;
use crate::domain::tempo::segment_length;
use crate::domain::transient::TransientDetector;
use tracing::debug;

pub struct StutterEngine {
    spec: ProcessSpec,
    store: RingBufferStore,
    detector: TransientDetector,
    player: StutterPlayer,
    chain: EffectChain,
}

impl StutterEngine {
    /// Allocate store, detector state and scratch for a session
    pub fn new(spec: ProcessSpec) -> Result<Self> {
        spec.validate()?;
        let sample_rate = spec.sample_rate.as_f64();
        let store = RingBufferStore::for_sample_rate(spec.num_channels, sample_rate)?;

        debug!(
            sample_rate = spec.sample_rate.hz(),
            channels = spec.num_channels,
            capacity = store.capacity(),
            "Stutter engine allocated"
        );

        Ok(Self {
            spec,
            store,
            detector: TransientDetector::new(spec.num_channels, sample_rate),
            player: StutterPlayer::new(sample_rate),
            chain: EffectChain::new(spec.max_block_size),
        })
    }

    /// Process one block in place
    ///
    /// Frames beyond `max_block_size` are left untouched.
    pub fn process_block(
        &mut self,
        block: &mut AudioBlock,
        context: BlockContext,
        params: &EffectParameters,
        order: &ChainConfiguration,
    ) {
        let len = block.num_samples().min(self.spec.max_block_size);
        if len == 0 {
            return;
        }

        let block_start = self.store.capture_block(block, len);
        let capacity = self.store.capacity();

        let segment = segment_length(
            self.spec.sample_rate.as_f64(),
            context.tempo(),
            params.stutter_rate,
            capacity,
        );
        self.player.begin_block(segment, params.reverse);

        let channels = block.num_channels();
        for i in 0..len {
            if self.detector.should_trigger(
                params.trigger_mode,
                context.note_on,
                params.threshold_db,
                block,
                i,
            ) {
                self.player.trigger(block_start + i, capacity);
            }

            for ch in 0..channels {
                let sample = self.player.render(&self.store, ch);
                block.set(ch, i, sample);
            }
            self.player.advance();
        }

        self.chain.process(block, len, order, params);
    }

    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    pub fn store(&self) -> &RingBufferStore {
        &self.store
    }

    pub fn player(&self) -> &StutterPlayer {
        &self.player
    }

    /// Silence the store and rewind playback without reallocating
    pub fn reset(&mut self) {
        self.store.clear();
        self.detector.reset();
        self.player.reset();
    }
}
