//! Sound device abstraction
//!
//! A device exposes a circular byte buffer that its hardware (or audio thread)
//! reads from. The host never gets callbacks; it asks for the cursors, then
//! locks the ring for a short scoped write.

use std::ops::DerefMut;

/// Snapshot of the device's cursors for one tick, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackCursors {
    /// Where the device is currently reading.
    pub play_cursor: u32,
    /// Earliest byte the device will accept writes at.
    pub write_cursor: u32,
}

/// Transient device failures. None of these are fatal to the loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("sound device position query failed: {0}")]
    Position(String),

    #[error("sound device buffer could not be locked: {0}")]
    Lock(String),

    #[error("sound device lost")]
    Lost,
}

/// Ring-buffer sound output device.
pub trait SoundDevice {
    /// Guard granting exclusive access to the whole ring; dropping it unlocks.
    type Guard<'a>: DerefMut<Target = [u8]>
    where
        Self: 'a;

    /// Ring capacity in bytes.
    fn buffer_size(&self) -> u32;

    /// Sample frames per second the device consumes.
    fn samples_per_second(&self) -> u32;

    /// Query the device's play and write cursors.
    fn current_position(&mut self) -> Result<PlaybackCursors, DeviceError>;

    /// Lock the ring for writing.
    fn lock(&mut self) -> Result<Self::Guard<'_>, DeviceError>;

    /// Lock `len` bytes starting at `offset` as a single logical span.
    fn lock_span(&mut self, offset: u32, len: u32) -> Result<WriteSpan<Self::Guard<'_>>, DeviceError> {
        let guard = self.lock()?;
        Ok(WriteSpan::new(guard, offset as usize, len as usize))
    }
}

/// A locked write region that may straddle the end of the ring.
///
/// Internally it is at most two contiguous slices; callers just write
/// samples and the span handles the split. The device is unlocked when the
/// span is dropped.
pub struct WriteSpan<G: DerefMut<Target = [u8]>> {
    guard: G,
    offset: usize,
    len: usize,
    written: usize,
}

impl<G: DerefMut<Target = [u8]>> WriteSpan<G> {
    pub fn new(guard: G, offset: usize, len: usize) -> Self {
        let size = guard.len();
        debug_assert!(offset < size.max(1), "span offset {offset} outside ring of {size}");
        debug_assert!(len <= size, "span of {len} bytes exceeds ring of {size}");
        let len = len.min(size);
        Self {
            guard,
            offset: if size == 0 { 0 } else { offset % size },
            len,
            written: 0,
        }
    }

    /// Total bytes covered by the span.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes still free in the span.
    pub fn remaining(&self) -> usize {
        self.len - self.written
    }

    /// Sizes of the two contiguous regions backing the span.
    pub fn region_sizes(&self) -> (usize, usize) {
        let size = self.guard.len();
        let first = self.len.min(size - self.offset);
        (first, self.len - first)
    }

    /// Append little-endian `i16` samples; returns how many were written.
    pub fn write_samples(&mut self, samples: &[i16]) -> usize {
        let count = samples.len().min(self.remaining() / 2);
        let (first_size, second_size) = self.region_sizes();
        let (head, tail) = self.guard.split_at_mut(self.offset);
        let first = &mut tail[..first_size];
        let second = &mut head[..second_size];

        for &sample in &samples[..count] {
            let pos = self.written;
            let bytes = sample.to_le_bytes();
            for (i, byte) in bytes.into_iter().enumerate() {
                let at = pos + i;
                if at < first.len() {
                    first[at] = byte;
                } else {
                    second[at - first.len()] = byte;
                }
            }
            self.written += 2;
        }
        count
    }

    /// Zero everything not yet written.
    pub fn fill_silence(&mut self) {
        let silence = vec![0i16; self.remaining() / 2];
        self.write_samples(&silence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(ring: &mut Vec<u8>, offset: usize, len: usize) -> WriteSpan<&mut [u8]> {
        WriteSpan::new(ring.as_mut_slice(), offset, len)
    }

    #[test]
    fn test_span_without_wrap_has_one_region() {
        let mut ring = vec![0u8; 16];
        let s = span(&mut ring, 4, 8);
        assert_eq!(s.region_sizes(), (8, 0));
    }

    #[test]
    fn test_span_straddling_end_splits_in_two() {
        let mut ring = vec![0u8; 16];
        let mut s = span(&mut ring, 12, 8);
        assert_eq!(s.region_sizes(), (4, 4));

        let written = s.write_samples(&[0x0101, 0x0202, 0x0303, 0x0404]);
        assert_eq!(written, 4);
        assert_eq!(s.remaining(), 0);
        drop(s);

        assert_eq!(&ring[12..16], &[1, 1, 2, 2]);
        assert_eq!(&ring[0..4], &[3, 3, 4, 4]);
        assert!(ring[4..12].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_span_drops_samples_past_its_end() {
        let mut ring = vec![0u8; 16];
        let mut s = span(&mut ring, 0, 4);
        assert_eq!(s.write_samples(&[1, 2, 3, 4]), 2);
        assert_eq!(s.write_samples(&[5]), 0);
    }

    #[test]
    fn test_fill_silence_covers_remaining_bytes() {
        let mut ring = vec![0xFFu8; 8];
        let mut s = span(&mut ring, 6, 6);
        s.write_samples(&[0x0102]);
        s.fill_silence();
        drop(s);
        assert_eq!(ring, vec![0, 0, 0, 0, 0xFF, 0xFF, 0x02, 0x01]);
    }
}
