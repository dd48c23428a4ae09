//! Property-based tests for slice buffer addressing and sliced scaling.

mod common;

use common::{pattern, Image};
use framekit_core::alloc::default_allocator;
use framekit_core::PixelFormat;
use framekit_scale::slice::PlaneLayout;
use framekit_scale::{ScaleAlgorithm, ScaleConfig, ScaleContext, SliceBinding, SliceBuffer};
use proptest::prelude::*;

fn any_source() -> impl Strategy<Value = PixelFormat> {
    prop::sample::select(vec![
        PixelFormat::Gray8,
        PixelFormat::Yuv420p,
        PixelFormat::Yuv422p,
        PixelFormat::Yuv444p,
        PixelFormat::Yuv440p,
        PixelFormat::Yuv411p,
        PixelFormat::Yuva420p,
        PixelFormat::Nv12,
        PixelFormat::Nv21,
        PixelFormat::Gbrp,
        PixelFormat::Rgb24,
        PixelFormat::Bgra,
    ])
}

fn any_destination() -> impl Strategy<Value = PixelFormat> {
    prop::sample::select(vec![
        PixelFormat::Gray8,
        PixelFormat::Yuv420p,
        PixelFormat::Yuv422p,
        PixelFormat::Yuv444p,
        PixelFormat::Yuv440p,
        PixelFormat::Yuv411p,
        PixelFormat::Yuva420p,
        PixelFormat::Gbrp,
    ])
}

fn any_algorithm() -> impl Strategy<Value = ScaleAlgorithm> {
    prop::sample::select(vec![
        ScaleAlgorithm::Point,
        ScaleAlgorithm::Bilinear,
        ScaleAlgorithm::Bicubic,
        ScaleAlgorithm::Lanczos,
    ])
}

/// Scale `src` whole, then again in slices of `units` chroma rows each.
fn whole_and_sliced(config: ScaleConfig, src: &Image, units: &[u32]) -> (Image, Image) {
    let (dst_format, dst_w, dst_h) = (config.dst_format, config.dst_width, config.dst_height);
    let step = 1u32 << src.format.descriptor().log2_chroma_h;

    let mut ctx = ScaleContext::new(config).unwrap();
    let mut whole = Image::new(dst_format, dst_w, dst_h);
    ctx.scale(&src.refs(), &mut whole.refs_mut()).unwrap();

    let mut sliced = Image::new(dst_format, dst_w, dst_h);
    let mut y = 0;
    let mut rows = 0;
    for &unit in units.iter().cycle() {
        if y >= src.height {
            break;
        }
        let h = (unit * step).min(src.height - y);
        rows += ctx
            .scale_slice(&src.slice_refs(y, h), y, h, &mut sliced.refs_mut())
            .unwrap();
        y += h;
    }
    assert_eq!(rows, dst_h);
    (whole, sliced)
}

fn ring(lum: usize, chr: usize) -> SliceBuffer {
    let mut slice = SliceBuffer::allocate(
        &default_allocator(),
        PixelFormat::Yuv420p,
        lum,
        chr,
        1,
        1,
        true,
        SliceBinding::Owned,
    )
    .unwrap();
    slice.materialize_ring_lines(32, 16).unwrap();
    slice
}

proptest! {
    /// Ring lines `i` and `i + k * n` are the same physical row.
    #[test]
    fn ring_lines_alias_modulo_capacity(
        lum in 1usize..12,
        chr in 1usize..12,
        idx in -64i32..64,
        k in 1i32..3,
        value in any::<u8>(),
    ) {
        let mut slice = ring(lum, chr);
        for (plane, n) in [(0, lum), (1, chr), (2, chr), (3, lum)] {
            let n = n as i32;
            slice.owned_line_mut(plane, idx)[0] = value;
            prop_assert_eq!(slice.owned_line(plane, idx + k * n)[0], value);
            prop_assert_eq!(slice.owned_line(plane, idx - k * n)[0], value);
            prop_assert_eq!(
                slice.owned_line(plane, idx).as_ptr(),
                slice.owned_line(plane, idx + n).as_ptr()
            );
        }
    }

    /// Writes to one plane of a pair never land in the other.
    #[test]
    fn paired_planes_do_not_overlap(lum in 1usize..8, idx in 0i32..8) {
        let mut slice = ring(lum, lum);
        slice.owned_line_mut(0, idx).fill(0x11);
        slice.owned_line_mut(3, idx).fill(0x33);
        prop_assert!(slice.owned_line(0, idx).iter().all(|&v| v == 0x11));
        prop_assert!(slice.owned_line(3, idx).iter().all(|&v| v == 0x33));
    }

    /// Rotating towards non-decreasing targets never moves a window back.
    #[test]
    fn rotation_is_monotonic(
        lum in 1usize..8,
        steps in prop::collection::vec(0i32..6, 1..40),
    ) {
        let mut slice = ring(lum, lum);
        slice.set_window(0, 0, 0);
        let mut target = 0;
        let mut last = slice.slice_y(0);
        for step in steps {
            target += step;
            let end = slice.slice_y(0) + slice.slice_h(0);
            if target > end {
                slice.grow(0, target - end);
            }
            slice.rotate(target, 0);
            prop_assert!(slice.slice_y(0) >= last);
            prop_assert!(target - slice.slice_y(0) < 2 * lum as i32 || step >= lum as i32);
            last = slice.slice_y(0);
        }
    }

    /// Loading slices with non-decreasing start rows never moves a window back.
    #[test]
    fn loads_are_monotonic(
        capacity in 1usize..16,
        slices in prop::collection::vec((0i32..5, 1i32..6), 1..20),
    ) {
        let mut slice = SliceBuffer::allocate(
            &default_allocator(),
            PixelFormat::Gray8,
            capacity,
            0,
            0,
            0,
            false,
            SliceBinding::Source,
        )
        .unwrap();
        let layout = PlaneLayout {
            present: [true, false, false, false],
            strides: [8, 0, 0, 0],
        };
        let mut y = 0;
        let mut last = 0;
        for (skip, h) in slices {
            y += skip;
            slice.load_from_source(&layout, 8, y, h, 0, 0, true);
            prop_assert!(slice.slice_y(0) >= last);
            prop_assert!(slice.slice_y(0) <= y);
            prop_assert!(slice.slice_h(0) as usize <= capacity);
            last = slice.slice_y(0);
            y += h;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    /// Feeding the source in slices gives the same image as one call.
    #[test]
    fn sliced_input_matches_whole_frame(
        src_format in any_source(),
        dst_format in any_destination(),
        algorithm in any_algorithm(),
        src_w in 1u32..40,
        src_h in 1u32..40,
        dst_w in 1u32..40,
        dst_h in 1u32..40,
        units in prop::collection::vec(1u32..5, 1..8),
    ) {
        let config = ScaleConfig::new(src_w, src_h, src_format, dst_w, dst_h, dst_format)
            .with_algorithm(algorithm);
        prop_assume!(config.validate().is_ok());

        let mut src = Image::new(src_format, src_w, src_h);
        src.fill(pattern);
        let (whole, sliced) = whole_and_sliced(config, &src, &units);
        prop_assert_eq!(sliced, whole);
    }
}
