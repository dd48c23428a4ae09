//! Input conversion into planar 8-bit rows.
//!
//! Packed RGB is turned into BT.601 limited-range YUV or unpacked into
//! planar G/B/R, and semi-planar chroma is de-interleaved, so that the
//! horizontal scaler only ever reads planar rows.

use super::{pair_mut, stage_instance, FilterStage, FrameIo};
use crate::slice::{PlaneRefs, SliceBuffer};
use framekit_core::alloc::{Allocation, Allocator};
use framekit_core::{PixelFormat, Result};
use std::sync::Arc;

/// BT.601 limited-range luma of an RGB triple.
#[inline]
pub fn rgb_to_y(r: u8, g: u8, b: u8) -> u8 {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16) as u8
}

/// BT.601 limited-range blue-difference chroma of an RGB triple.
#[inline]
pub fn rgb_to_u(r: u8, g: u8, b: u8) -> u8 {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    (((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128) as u8
}

/// BT.601 limited-range red-difference chroma of an RGB triple.
#[inline]
pub fn rgb_to_v(r: u8, g: u8, b: u8) -> u8 {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    (((112 * r - 94 * g - 18 * b + 128) >> 8) + 128) as u8
}

/// How source pixels are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertInput {
    /// Interleaved RGB with the byte offset of each component.
    Packed {
        r: usize,
        g: usize,
        b: usize,
        a: Option<usize>,
        step: usize,
    },
    /// Planar G, B, R in planes 0, 1, 2.
    PlanarGbr,
    /// Interleaved chroma pairs in plane 1, V first when `swap` is set.
    SemiPlanar { swap: bool },
}

impl ConvertInput {
    /// Input layout of `format`, if it needs conversion at all.
    pub fn for_format(format: PixelFormat) -> Option<Self> {
        let packed = |r, g, b, a, step| Self::Packed { r, g, b, a, step };
        match format {
            PixelFormat::Rgb24 => Some(packed(0, 1, 2, None, 3)),
            PixelFormat::Bgr24 => Some(packed(2, 1, 0, None, 3)),
            PixelFormat::Rgba => Some(packed(0, 1, 2, Some(3), 4)),
            PixelFormat::Bgra => Some(packed(2, 1, 0, Some(3), 4)),
            PixelFormat::Gbrp => Some(Self::PlanarGbr),
            PixelFormat::Nv12 => Some(Self::SemiPlanar { swap: false }),
            PixelFormat::Nv21 => Some(Self::SemiPlanar { swap: true }),
            _ => None,
        }
    }
}

/// What a conversion writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertOutput {
    /// Limited-range YUV.
    Yuv,
    /// Planar G, B, R.
    Gbr,
}

/// One source row of RGB pixels.
pub(crate) struct RgbRow<'a> {
    input: ConvertInput,
    lines: [&'a [u8]; 3],
}

impl<'a> RgbRow<'a> {
    /// Fetch the row at luma line `lum_idx`, chroma line `chr_idx` of `src`.
    pub(crate) fn fetch(
        input: ConvertInput,
        src: &'a SliceBuffer,
        ext: &PlaneRefs<'a>,
        lum_idx: i32,
        chr_idx: i32,
    ) -> Self {
        let lines = match input {
            ConvertInput::PlanarGbr => [
                src.line(ext, 0, lum_idx),
                src.line(ext, 1, chr_idx),
                src.line(ext, 2, chr_idx),
            ],
            _ => {
                let empty: &[u8] = &[];
                [src.line(ext, 0, lum_idx), empty, empty]
            }
        };
        Self { input, lines }
    }

    /// Red, green, blue and alpha of pixel `x`.
    #[inline]
    pub(crate) fn pixel(&self, x: usize) -> [u8; 4] {
        match self.input {
            ConvertInput::Packed { r, g, b, a, step } => {
                let px = &self.lines[0][x * step..x * step + step];
                [px[r], px[g], px[b], a.map_or(255, |a| px[a])]
            }
            ConvertInput::PlanarGbr => [self.lines[2][x], self.lines[0][x], self.lines[1][x], 255],
            ConvertInput::SemiPlanar { .. } => [0, 0, 0, 255],
        }
    }
}

/// Converts source rows into the luma (and alpha) planes of a planar slice.
pub struct LumaConvert {
    src: usize,
    dst: usize,
    input: ConvertInput,
    output: ConvertOutput,
    alpha: bool,
    _instance: Allocation,
}

impl LumaConvert {
    /// Create a luma conversion from slice `src` into slice `dst`.
    pub fn new(
        allocator: &Arc<dyn Allocator>,
        src: usize,
        dst: usize,
        input: ConvertInput,
        output: ConvertOutput,
        alpha: bool,
    ) -> Result<Self> {
        Ok(Self {
            src,
            dst,
            input,
            output,
            alpha,
            _instance: stage_instance(allocator, std::mem::size_of::<Self>())?,
        })
    }
}

impl FilterStage for LumaConvert {
    fn name(&self) -> &'static str {
        "lum_convert"
    }

    fn process(
        &mut self,
        slices: &mut [SliceBuffer],
        io: &mut FrameIo<'_>,
        slice_y: i32,
        slice_h: i32,
    ) -> i32 {
        let (src, dst) = pair_mut(slices, self.src, self.dst);
        let width = src.width() as usize;

        dst.set_window(0, slice_y, slice_h);
        if self.alpha {
            dst.set_window(3, slice_y, slice_h);
        }

        for i in 0..slice_h {
            let row = slice_y + i;
            let lum_idx = row - src.slice_y(0);
            let chr_idx = (row >> src.v_chr_sub_sample()) - src.slice_y(1);
            let pixels = RgbRow::fetch(self.input, src, &io.src, lum_idx, chr_idx);

            let out = dst.owned_line_mut(0, i);
            for (x, o) in out[..width].iter_mut().enumerate() {
                let [r, g, b, _] = pixels.pixel(x);
                *o = match self.output {
                    ConvertOutput::Yuv => rgb_to_y(r, g, b),
                    ConvertOutput::Gbr => g,
                };
            }
            if self.alpha {
                let out = dst.owned_line_mut(3, i);
                for (x, o) in out[..width].iter_mut().enumerate() {
                    *o = pixels.pixel(x)[3];
                }
            }
        }
        slice_h
    }
}

/// Converts source rows into the chroma planes of a planar slice.
pub struct ChromaConvert {
    src: usize,
    dst: usize,
    input: ConvertInput,
    output: ConvertOutput,
    _instance: Allocation,
}

impl ChromaConvert {
    /// Create a chroma conversion from slice `src` into slice `dst`.
    pub fn new(
        allocator: &Arc<dyn Allocator>,
        src: usize,
        dst: usize,
        input: ConvertInput,
        output: ConvertOutput,
    ) -> Result<Self> {
        Ok(Self {
            src,
            dst,
            input,
            output,
            _instance: stage_instance(allocator, std::mem::size_of::<Self>())?,
        })
    }
}

impl FilterStage for ChromaConvert {
    fn name(&self) -> &'static str {
        "chr_convert"
    }

    fn process(
        &mut self,
        slices: &mut [SliceBuffer],
        io: &mut FrameIo<'_>,
        slice_y: i32,
        slice_h: i32,
    ) -> i32 {
        let (src, dst) = pair_mut(slices, self.src, self.dst);
        let width = src.chroma_width() as usize;

        dst.set_window(1, slice_y, slice_h);
        dst.set_window(2, slice_y, slice_h);

        for i in 0..slice_h {
            let row = slice_y + i;
            let chr_idx = row - src.slice_y(1);

            if let ConvertInput::SemiPlanar { swap } = self.input {
                let line = src.line(&io.src, 1, chr_idx);
                let (u_off, v_off) = if swap { (1, 0) } else { (0, 1) };
                for (plane, off) in [(1, u_off), (2, v_off)] {
                    let out = dst.owned_line_mut(plane, i);
                    for (x, o) in out[..width].iter_mut().enumerate() {
                        *o = line[2 * x + off];
                    }
                }
                continue;
            }

            let lum_idx = (row << src.v_chr_sub_sample()) - src.slice_y(0);
            let pixels = RgbRow::fetch(self.input, src, &io.src, lum_idx, chr_idx);
            for plane in [1, 2] {
                let out = dst.owned_line_mut(plane, i);
                for (x, o) in out[..width].iter_mut().enumerate() {
                    let [r, g, b, _] = pixels.pixel(x);
                    *o = match (self.output, plane) {
                        (ConvertOutput::Yuv, 1) => rgb_to_u(r, g, b),
                        (ConvertOutput::Yuv, _) => rgb_to_v(r, g, b),
                        (ConvertOutput::Gbr, 1) => b,
                        (ConvertOutput::Gbr, _) => r,
                    };
                }
            }
        }
        slice_h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::{PlaneRefsMut, SliceBinding};
    use framekit_core::alloc::default_allocator;

    #[test]
    fn test_bt601_reference_points() {
        assert_eq!(rgb_to_y(255, 255, 255), 235);
        assert_eq!(rgb_to_y(0, 0, 0), 16);
        assert_eq!(rgb_to_u(255, 255, 255), 128);
        assert_eq!(rgb_to_v(255, 255, 255), 128);
        assert_eq!(rgb_to_y(255, 0, 0), 82);
        assert_eq!(rgb_to_u(255, 0, 0), 90);
        assert_eq!(rgb_to_v(255, 0, 0), 240);
        assert_eq!(rgb_to_u(0, 0, 255), 240);
        assert_eq!(rgb_to_u(255, 255, 0), 16);
    }

    #[test]
    fn test_input_layouts() {
        assert_eq!(
            ConvertInput::for_format(PixelFormat::Bgra),
            Some(ConvertInput::Packed {
                r: 2,
                g: 1,
                b: 0,
                a: Some(3),
                step: 4
            })
        );
        assert_eq!(ConvertInput::for_format(PixelFormat::Yuv420p), None);
    }

    fn slices(format: PixelFormat, h_sub: u32, v_sub: u32) -> Vec<SliceBuffer> {
        let alloc = default_allocator();
        let src = SliceBuffer::allocate(&alloc, format, 2, 2, h_sub, v_sub, false, SliceBinding::Source)
            .unwrap();
        let mut conv =
            SliceBuffer::allocate(&alloc, format, 2, 2, h_sub, v_sub, false, SliceBinding::Owned)
                .unwrap();
        conv.materialize_ring_lines(32, 4).unwrap();
        vec![src, conv]
    }

    #[test]
    fn test_packed_rgba_to_yuv_with_alpha() {
        let alloc = default_allocator();
        let mut slices = slices(PixelFormat::Rgba, 0, 0);
        let pixels = [255u8, 255, 255, 7, 0, 0, 0, 9, 255, 0, 0, 11];
        let src = PlaneRefs::from_slices([(&pixels[..], 12)]);
        slices[0].load_from_source(&src.layout(), 3, 0, 1, 0, 1, true);

        let mut io = FrameIo {
            src,
            dst: PlaneRefsMut::default(),
        };
        let input = ConvertInput::for_format(PixelFormat::Rgba).unwrap();
        let mut luma = LumaConvert::new(&alloc, 0, 1, input, ConvertOutput::Yuv, true).unwrap();
        assert_eq!(luma.process(&mut slices, &mut io, 0, 1), 1);
        assert_eq!(&slices[1].owned_line(0, 0)[..3], &[235, 16, 82]);
        assert_eq!(&slices[1].owned_line(3, 0)[..3], &[7, 9, 11]);

        let mut chroma = ChromaConvert::new(&alloc, 0, 1, input, ConvertOutput::Yuv).unwrap();
        chroma.process(&mut slices, &mut io, 0, 1);
        assert_eq!(&slices[1].owned_line(1, 0)[..3], &[128, 128, 90]);
        assert_eq!(&slices[1].owned_line(2, 0)[..3], &[128, 128, 240]);
    }

    #[test]
    fn test_nv21_deinterleave() {
        let alloc = default_allocator();
        let mut slices = slices(PixelFormat::Nv21, 1, 1);
        let luma = [0u8; 8];
        let chroma = [10u8, 20, 30, 40];
        let src = PlaneRefs::from_slices([(&luma[..], 4), (&chroma[..], 4)]);
        slices[0].load_from_source(&src.layout(), 4, 0, 2, 0, 1, true);

        let mut io = FrameIo {
            src,
            dst: PlaneRefsMut::default(),
        };
        let input = ConvertInput::for_format(PixelFormat::Nv21).unwrap();
        let mut stage = ChromaConvert::new(&alloc, 0, 1, input, ConvertOutput::Yuv).unwrap();
        stage.process(&mut slices, &mut io, 0, 1);
        assert_eq!(&slices[1].owned_line(1, 0)[..2], &[20, 40]);
        assert_eq!(&slices[1].owned_line(2, 0)[..2], &[10, 30]);
    }
}
