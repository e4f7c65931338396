//! Debug history of audio cursor observations
//!
//! Purely observational: the synchronizer records into it, the player may
//! draw it, and nothing reads it back into control decisions.

use ringbuf::{
    HeapRb,
    traits::{Consumer, Observer, RingBuffer},
};

use super::PlaybackCursors;

/// Cursor observations for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugTimeMarker {
    // Recorded when audio is written
    pub output_play_cursor: u32,
    pub output_write_cursor: u32,
    pub output_location: u32,
    pub output_byte_count: u32,
    pub expected_flip_play_cursor: u32,

    // Recorded at the end of the frame
    pub flip_play_cursor: u32,
    pub flip_write_cursor: u32,
}

/// Fixed-capacity marker history; the oldest entry is overwritten when full.
pub struct SyncMarkers {
    history: HeapRb<DebugTimeMarker>,
    pending: DebugTimeMarker,
    /// Audio was written during the tick in progress.
    has_output: bool,
}

impl SyncMarkers {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: HeapRb::new(capacity.max(1)),
            pending: DebugTimeMarker::default(),
            has_output: false,
        }
    }

    /// Record the write decision for the tick in progress.
    pub fn record_output(
        &mut self,
        cursors: PlaybackCursors,
        location: u32,
        byte_count: u32,
        expected_flip_play_cursor: u32,
    ) {
        self.pending.output_play_cursor = cursors.play_cursor;
        self.pending.output_write_cursor = cursors.write_cursor;
        self.pending.output_location = location;
        self.pending.output_byte_count = byte_count;
        self.pending.expected_flip_play_cursor = expected_flip_play_cursor;
        self.has_output = true;
    }

    /// Close the tick in progress with the cursors seen at the flip.
    ///
    /// Ticks that wrote no audio leave no marker.
    pub fn record_flip(&mut self, cursors: PlaybackCursors) {
        if !std::mem::take(&mut self.has_output) {
            return;
        }
        self.pending.flip_play_cursor = cursors.play_cursor;
        self.pending.flip_write_cursor = cursors.write_cursor;
        self.history.push_overwrite(self.pending);
        self.pending = DebugTimeMarker::default();
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &DebugTimeMarker> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.history.capacity().get()
    }
}
