//! Property-based tests for plane layout and pool geometry.

use framekit_core::alloc::default_allocator;
use framekit_core::layout::{fill_linesizes, fill_plane_sizes};
use framekit_core::{FramePool, PixelFormat, PoolGeometry};
use proptest::prelude::*;

fn any_format() -> impl Strategy<Value = PixelFormat> {
    prop::sample::select(PixelFormat::ALL.to_vec())
}

proptest! {
    /// Every plane stride of a built pool is a multiple of the stride alignment.
    #[test]
    fn pool_strides_are_aligned(
        format in any_format(),
        width in 1u32..4096,
        height in 1u32..256,
        align_log2 in 3u32..7,
    ) {
        let stride_align = 1usize << align_log2;
        let geometry = PoolGeometry::Video { format, width, height };
        let pool = FramePool::build(geometry, stride_align, &default_allocator()).unwrap();

        for (plane, (&linesize, &align)) in pool
            .linesize()
            .iter()
            .zip(pool.stride_align().iter())
            .enumerate()
        {
            prop_assert_eq!(linesize % align, 0, "plane {} of {}", plane, format);
        }
    }

    /// Aligned strides never shrink below what the image width needs.
    #[test]
    fn pool_strides_cover_width(format in any_format(), width in 1u32..2048) {
        let geometry = PoolGeometry::Video { format, width, height: 16 };
        let pool = FramePool::build(geometry, 64, &default_allocator()).unwrap();
        let needed = fill_linesizes(format, width).unwrap();

        for plane in 0..format.num_planes() {
            prop_assert!(pool.linesize()[plane] >= needed[plane]);
            prop_assert!(pool.has_plane(plane));
        }
        for plane in format.num_planes()..4 {
            prop_assert!(!pool.has_plane(plane));
        }
    }

    /// Pool blocks hold a whole padded plane.
    #[test]
    fn pool_blocks_hold_plane(format in any_format(), width in 1u32..1024, height in 1u32..512) {
        let geometry = PoolGeometry::Video { format, width, height };
        let pool = FramePool::build(geometry, 32, &default_allocator()).unwrap();
        let sizes = fill_plane_sizes(format, height, pool.linesize()).unwrap();

        for plane in 0..format.num_planes() {
            let block = pool.sub_pool(plane).unwrap().block_size();
            prop_assert!(block >= sizes[plane] + 16);
        }
    }
}
