//! Segment loop playback out of the capture store
//!
//! The cursor walks `0..segment_length` over and over; the anchor says
//! where in the store the segment begins. Two crossfades keep the output
//! click-free: one across the loop seam, one when the playback direction
//! flips between blocks.

use crate::domain::capture::RingBufferStore;

/// Crossfade length used at the loop seam and on direction changes
pub const CROSSFADE_SECONDS: f64 = 0.005;

/// Crossfade length in samples for a sample rate
pub fn crossfade_samples(sample_rate: f64) -> usize {
    (sample_rate * CROSSFADE_SECONDS).round().max(0.0) as usize
}

/// Position inside the looping segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCursor {
    read_pos: usize,
    segment_length: usize,
    anchor: usize,
}

impl PlaybackCursor {
    pub fn new(segment_length: usize) -> Self {
        Self {
            read_pos: 0,
            segment_length: segment_length.max(1),
            anchor: 0,
        }
    }

    /// Adopt a new segment length, wrapping the current position into it
    #[inline]
    pub fn set_segment_length(&mut self, segment_length: usize) {
        self.segment_length = segment_length.max(1);
        self.read_pos %= self.segment_length;
    }

    /// Restart the loop at a new segment start
    #[inline]
    pub fn retrigger(&mut self, anchor: usize) {
        self.anchor = anchor;
        self.read_pos = 0;
    }

    #[inline]
    pub fn advance(&mut self) {
        self.read_pos += 1;
        if self.read_pos >= self.segment_length {
            self.read_pos = 0;
        }
    }

    /// Position within the segment, always `< segment_length`
    pub fn position(&self) -> usize {
        self.read_pos
    }

    pub fn segment_length(&self) -> usize {
        self.segment_length
    }

    /// Store index of the first sample of the segment
    pub fn anchor(&self) -> usize {
        self.anchor
    }

    pub fn reset(&mut self) {
        self.read_pos = 0;
        self.anchor = 0;
    }
}

/// Reads the looping segment with seam and direction crossfades
#[derive(Debug, Clone)]
pub struct StutterPlayer {
    cursor: PlaybackCursor,
    crossfade: usize,
    /// Direction of the previous block; `None` until the first block
    last_reverse: Option<bool>,
    direction_fade_left: usize,
}

impl StutterPlayer {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            cursor: PlaybackCursor::new(1),
            crossfade: crossfade_samples(sample_rate),
            last_reverse: None,
            direction_fade_left: 0,
        }
    }

    pub fn cursor(&self) -> &PlaybackCursor {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut PlaybackCursor {
        &mut self.cursor
    }

    /// Crossfade length in samples at this sample rate
    pub fn crossfade_len(&self) -> usize {
        self.crossfade
    }

    /// Per-block setup: segment length and direction
    ///
    /// A direction flip starts a crossfade from the old direction's read
    /// to the new one. The first block after construction or reset has
    /// nothing to fade from.
    pub fn begin_block(&mut self, segment_length: usize, reverse: bool) {
        self.cursor.set_segment_length(segment_length);
        if self.last_reverse.is_some_and(|previous| previous != reverse) {
            self.direction_fade_left = self.crossfade;
        }
        self.last_reverse = Some(reverse);
    }

    #[inline]
    fn is_reverse(&self) -> bool {
        self.last_reverse.unwrap_or(false)
    }

    /// Restart the loop on a trigger captured at store index `trigger`
    ///
    /// Forward playback starts on the trigger sample. Reverse playback
    /// takes the segment that ends on it, so its first read is the trigger
    /// sample too.
    pub fn trigger(&mut self, trigger: usize, capacity: usize) {
        let capacity = capacity.max(1);
        let anchor = if self.is_reverse() {
            let length = self.cursor.segment_length.min(capacity);
            (trigger % capacity + 1 + capacity - length) % capacity
        } else {
            trigger % capacity
        };
        self.cursor.retrigger(anchor);
    }

    /// Seam crossfade length for the current segment
    #[inline]
    fn seam_len(&self) -> usize {
        self.crossfade.min(self.cursor.segment_length / 2)
    }

    /// Offset into the segment for a position and direction
    #[inline]
    fn offset(&self, position: usize, reverse: bool) -> usize {
        if reverse {
            self.cursor.segment_length - 1 - position
        } else {
            position
        }
    }

    /// Segment sample at `position`, with the loop-seam crossfade applied
    #[inline]
    fn segment_sample(&self, store: &RingBufferStore, channel: usize, position: usize, reverse: bool) -> f32 {
        let anchor = self.cursor.anchor;
        let current = store.read(channel, anchor + self.offset(position, reverse));

        let fade = self.seam_len();
        let fade_start = self.cursor.segment_length - fade;
        if fade == 0 || position < fade_start {
            return current;
        }

        let into = position - fade_start;
        let progress = into as f32 / fade as f32;
        let loop_start = store.read(channel, anchor + self.offset(into, reverse));
        current * (1.0 - progress) + loop_start * progress
    }

    /// Output for one channel at the current cursor position
    ///
    /// Call for every channel, then [`advance`](Self::advance) once.
    #[inline]
    pub fn render(&self, store: &RingBufferStore, channel: usize) -> f32 {
        let position = self.cursor.read_pos;
        let reverse = self.is_reverse();
        let sample = self.segment_sample(store, channel, position, reverse);

        if self.direction_fade_left == 0 {
            return sample;
        }

        let progress = 1.0 - self.direction_fade_left as f32 / self.crossfade as f32;
        let previous = self.segment_sample(store, channel, position, !reverse);
        previous * (1.0 - progress) + sample * progress
    }

    #[inline]
    pub fn advance(&mut self) {
        self.cursor.advance();
        self.direction_fade_left = self.direction_fade_left.saturating_sub(1);
    }

    pub fn is_direction_fading(&self) -> bool {
        self.direction_fade_left > 0
    }

    pub fn reset(&mut self) {
        self.cursor.reset();
        self.last_reverse = None;
        self.direction_fade_left = 0;
    }
}
