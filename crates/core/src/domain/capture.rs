//! Continuous capture into a fixed-capacity multichannel ring
//!
//! The store is sized once per sample-rate session for four bars at the
//! slowest supported tempo, so any segment the tempo calculator can produce
//! fits. All channels share one write position, which keeps captured
//! channels phase-aligned. Reads take the index modulo capacity, so there is
//! no out-of-bounds case to handle on the audio thread.

use crate::domain::audio::{AudioBlock, AudioError, Result};
use tracing::debug;

/// Slowest tempo the store must hold four bars of
pub const MIN_BPM: f64 = 40.0;

/// Bars of history kept at `MIN_BPM`
pub const CAPTURE_BARS: f64 = 4.0;

/// Beats per bar assumed by the capacity and segment math
pub const BEATS_PER_BAR: f64 = 4.0;

/// Multichannel circular sample store
#[derive(Debug, Clone)]
pub struct RingBufferStore {
    channels: Vec<Vec<f32>>,
    capacity: usize,
    write_pos: usize,
}

impl RingBufferStore {
    /// Samples per channel needed for four bars at 40 BPM
    pub fn capacity_for(sample_rate: f64) -> usize {
        let seconds = CAPTURE_BARS * BEATS_PER_BAR * 60.0 / MIN_BPM;
        (sample_rate * seconds).ceil().max(1.0) as usize
    }

    /// Allocate a zero-filled store with an explicit capacity
    pub fn with_capacity(num_channels: usize, capacity: usize) -> Result<Self> {
        if num_channels == 0 || capacity == 0 {
            return Err(AudioError::InvalidConfiguration(format!(
                "ring buffer needs channels and capacity (got {} x {})",
                num_channels, capacity
            )));
        }

        debug!(num_channels, capacity, "Allocating capture store");

        Ok(Self {
            channels: vec![vec![0.0; capacity]; num_channels],
            capacity,
            write_pos: 0,
        })
    }

    /// Allocate a store sized for the given sample rate
    pub fn for_sample_rate(num_channels: usize, sample_rate: f64) -> Result<Self> {
        Self::with_capacity(num_channels, Self::capacity_for(sample_rate))
    }

    /// Store one frame (one sample per channel) and advance the shared position
    ///
    /// Channels missing from `frame` are written as silence.
    #[inline]
    pub fn write_frame(&mut self, frame: &[f32]) {
        let pos = self.write_pos;
        for (ch, buffer) in self.channels.iter_mut().enumerate() {
            buffer[pos] = frame.get(ch).copied().unwrap_or(0.0);
        }
        self.advance();
    }

    /// Capture the first `len` frames of a block; returns the write position
    /// the first frame landed at.
    ///
    /// Every sample of every channel is written regardless of effect state.
    pub fn capture_block(&mut self, block: &AudioBlock, len: usize) -> usize {
        let start = self.write_pos;
        let len = len.min(block.num_samples());
        let block_channels = block.num_channels();

        for (ch, buffer) in self.channels.iter_mut().enumerate() {
            let mut pos = start;
            if ch < block_channels {
                let input = block.channel(ch);
                for &sample in &input[..len] {
                    buffer[pos] = sample;
                    pos += 1;
                    if pos == self.capacity {
                        pos = 0;
                    }
                }
            } else {
                for _ in 0..len {
                    buffer[pos] = 0.0;
                    pos += 1;
                    if pos == self.capacity {
                        pos = 0;
                    }
                }
            }
        }

        self.write_pos = (start + len) % self.capacity;
        start
    }

    /// Sample at `index mod capacity`; channels past the last read as silence
    #[inline]
    pub fn read(&self, channel: usize, index: usize) -> f32 {
        match self.channels.get(channel) {
            Some(buffer) => buffer[index % self.capacity],
            None => 0.0,
        }
    }

    #[inline]
    fn advance(&mut self) {
        self.write_pos += 1;
        if self.write_pos == self.capacity {
            self.write_pos = 0;
        }
    }

    /// Position the next captured frame will be written at
    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Back to silence with the write position at zero
    pub fn clear(&mut self) {
        for buffer in &mut self.channels {
            buffer.fill(0.0);
        }
        self.write_pos = 0;
    }
}
