//! Ring-buffer cursor arithmetic

/// Bytes to write so that a region starting at `lock_pos` ends at `target_pos`.
///
/// The region is `[lock_pos, lock_pos + result) mod buffer_size`. Equal
/// positions mean there is nothing to write, never a full-buffer wrap.
pub fn bytes_to_write(lock_pos: u32, target_pos: u32, buffer_size: u32) -> u32 {
    debug_assert!(lock_pos < buffer_size && target_pos < buffer_size);
    if lock_pos > target_pos {
        (buffer_size - lock_pos) + target_pos
    } else {
        target_pos - lock_pos
    }
}

/// Byte offset of a running sample index inside the ring.
pub fn sample_offset(running_sample_index: u64, bytes_per_sample: u32, buffer_size: u32) -> u32 {
    ((running_sample_index * bytes_per_sample as u64) % buffer_size as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: u32 = 48_000;

    #[test]
    fn test_wrapping_region() {
        assert_eq!(bytes_to_write(47_000, 1_000, SIZE), 2_000);
    }

    #[test]
    fn test_forward_region() {
        assert_eq!(bytes_to_write(1_000, 47_000, SIZE), 46_000);
    }

    #[test]
    fn test_equal_positions_write_nothing() {
        assert_eq!(bytes_to_write(20_000, 20_000, SIZE), 0);
        assert_eq!(bytes_to_write(0, 0, SIZE), 0);
        assert_eq!(bytes_to_write(SIZE - 1, SIZE - 1, SIZE), 0);
    }

    #[test]
    fn test_region_always_lands_on_target() {
        let size = 64;
        for lock in 0..size {
            for target in 0..size {
                let bytes = bytes_to_write(lock, target, size);
                assert!(bytes < size);
                assert_eq!((lock + bytes) % size, target, "lock={lock} target={target}");
            }
        }
    }

    #[test]
    fn test_sample_offset_wraps() {
        assert_eq!(sample_offset(0, 4, SIZE), 0);
        assert_eq!(sample_offset(11_999, 4, SIZE), 47_996);
        assert_eq!(sample_offset(12_000, 4, SIZE), 0);
        assert_eq!(sample_offset(12_001, 4, SIZE), 4);
    }
}
