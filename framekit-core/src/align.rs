//! Alignment helpers shared by pools and slice buffers.

/// Default stride and buffer alignment, wide enough for AVX-512 loads.
pub const STRIDE_ALIGN: usize = 64;

/// Round `size` up to the next multiple of `alignment` (a power of two).
pub fn align_up(size: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (size + alignment - 1) & !(alignment - 1)
}

/// Check if pointer is aligned.
pub fn is_aligned(ptr: *const u8, alignment: usize) -> bool {
    (ptr as usize) % alignment == 0
}

/// The lowest set bit of `value`, or 0 for 0.
pub fn lowest_set_bit(value: usize) -> usize {
    value & value.wrapping_neg()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 8), 16);
        assert_eq!(align_up(4095, 4096), 4096);
        assert_eq!(align_up(0, 64), 0);
    }

    #[test]
    fn test_lowest_set_bit() {
        assert_eq!(lowest_set_bit(0), 0);
        assert_eq!(lowest_set_bit(48), 16);
        assert_eq!(lowest_set_bit(64), 64);
        assert_eq!(lowest_set_bit(7), 1);
    }

    #[test]
    fn test_is_aligned() {
        let data = [0u8; 128];
        let base = data.as_ptr();
        let offset = base.align_offset(16);
        assert!(is_aligned(base.wrapping_add(offset), 16));
        assert!(!is_aligned(base.wrapping_add(offset + 1), 16));
    }
}
