//! Offline host: feeds a clip through the processor block by block
//!
//! Behaves like a plugin host with a fixed block size, a constant tempo
//! and a note-on schedule, so file renders match what a DAW would produce
//! for the same input and automation-free settings.

use crate::audio::wav::AudioClip;
use crate::Result;
use chopshop_core::domain::mixer::PeakLevel;
use chopshop_core::{AudioBlock, BlockContext, ChopShopProcessor, ProcessSpec};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// How the offline host drives the processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Frames per `process` call
    pub block_size: usize,
    /// Host tempo; `None` behaves like a host without transport info
    pub bpm: Option<f64>,
    /// Note-on times in seconds from the start of the clip
    pub note_on_times: Vec<f64>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            block_size: 512,
            bpm: Some(120.0),
            note_on_times: Vec::new(),
        }
    }
}

/// Summary of one render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderReport {
    pub blocks: usize,
    pub frames: usize,
    pub channels: usize,
    pub sample_rate: u32,
    /// Blocks that carried a note-on
    pub note_on_blocks: usize,
    pub peak_in_dbfs: f32,
    pub peak_out_dbfs: f32,
    pub elapsed_ms: f64,
}

/// Drives a [`ChopShopProcessor`] over whole clips
pub struct OfflineRenderer {
    processor: ChopShopProcessor,
    options: RenderOptions,
}

impl OfflineRenderer {
    pub fn new(processor: ChopShopProcessor, options: RenderOptions) -> Self {
        Self { processor, options }
    }

    pub fn processor(&self) -> &ChopShopProcessor {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut ChopShopProcessor {
        &mut self.processor
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Note-on frame positions, sorted
    fn note_on_frames(&self, sample_rate: u32) -> Vec<usize> {
        let mut frames: Vec<usize> = self
            .options
            .note_on_times
            .iter()
            .filter(|t| t.is_finite() && **t >= 0.0)
            .map(|t| (t * sample_rate as f64).round() as usize)
            .collect();
        frames.sort_unstable();
        frames
    }

    /// Process a clip, returning the rendered clip and a report
    ///
    /// The processor is re-prepared for the clip's rate and channel count,
    /// so every render starts from an empty capture store.
    pub fn render(&mut self, input: &AudioClip) -> Result<(AudioClip, RenderReport)> {
        let started = Instant::now();
        let num_channels = input.num_channels();
        let sample_rate = input.sample_rate();
        let block_size = self.options.block_size;

        self.processor
            .prepare(ProcessSpec::new(sample_rate, block_size, num_channels))?;

        info!(
            frames = input.num_frames(),
            channels = num_channels,
            sample_rate,
            block_size,
            "Rendering clip"
        );

        let note_ons = self.note_on_frames(sample_rate);
        let mut next_note = 0;

        let mut output = AudioClip::silent(num_channels, input.num_frames(), sample_rate)?;
        let mut block = AudioBlock::new(num_channels, block_size);
        let mut level_in = PeakLevel::new();
        let mut level_out = PeakLevel::new();
        let mut blocks = 0;
        let mut note_on_blocks = 0;

        let mut start = 0;
        while start < input.num_frames() {
            let len = block_size.min(input.num_frames() - start);
            block.set_len(len);
            for ch in 0..num_channels {
                block
                    .channel_mut(ch)
                    .copy_from_slice(&input.channel(ch)[start..start + len]);
            }

            let mut note_on = false;
            while next_note < note_ons.len() && note_ons[next_note] < start + len {
                note_on = true;
                next_note += 1;
            }
            if note_on {
                note_on_blocks += 1;
                debug!(block = blocks, frame = start, "Note-on");
            }

            level_in.update_block(&block);
            self.processor
                .process(&mut block, BlockContext::new(self.options.bpm, note_on));
            level_out.update_block(&block);

            for ch in 0..num_channels {
                output.channel_mut(ch)[start..start + len].copy_from_slice(block.channel(ch));
            }

            blocks += 1;
            start += len;
        }

        self.processor.release();

        let report = RenderReport {
            blocks,
            frames: input.num_frames(),
            channels: num_channels,
            sample_rate,
            note_on_blocks,
            peak_in_dbfs: level_in.peak_db,
            peak_out_dbfs: level_out.peak_db,
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        };

        info!(
            blocks = report.blocks,
            peak_out_dbfs = report.peak_out_dbfs,
            elapsed_ms = report.elapsed_ms,
            "Render complete"
        );

        Ok((output, report))
    }
}
