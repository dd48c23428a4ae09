//! Horizontal scaling into 15-bit intermediate rows.

use super::{pair_mut, stage_instance, write_i16, FilterStage, FrameIo};
use crate::coeffs::FilterCoefficients;
use crate::slice::SliceBuffer;
use framekit_core::alloc::{Allocation, Allocator};
use framekit_core::Result;
use std::sync::Arc;

/// Scale one 8-bit row into 15-bit samples.
fn hscale_row(filter: &FilterCoefficients, input: &[u8], out: &mut [u8]) {
    for x in 0..filter.dst_size() {
        let pos = filter.position(x) as usize;
        let val: i32 = filter
            .taps(x)
            .iter()
            .zip(&input[pos..])
            .map(|(&coef, &px)| px as i32 * coef)
            .sum();
        write_i16(out, x, (val >> 7).clamp(i16::MIN as i32, i16::MAX as i32) as i16);
    }
}

/// Scales luma rows, and alpha rows when the chain carries alpha.
pub struct LumaHScale {
    src: usize,
    dst: usize,
    filter: FilterCoefficients,
    alpha: bool,
    _instance: Allocation,
}

impl LumaHScale {
    /// Create a luma scaler from slice `src` into slice `dst`.
    pub fn new(
        allocator: &Arc<dyn Allocator>,
        src: usize,
        dst: usize,
        filter: FilterCoefficients,
        alpha: bool,
    ) -> Result<Self> {
        Ok(Self {
            src,
            dst,
            filter,
            alpha,
            _instance: stage_instance(allocator, std::mem::size_of::<Self>())?,
        })
    }
}

impl FilterStage for LumaHScale {
    fn name(&self) -> &'static str {
        "lum_h_scale"
    }

    fn process(
        &mut self,
        slices: &mut [SliceBuffer],
        io: &mut FrameIo<'_>,
        slice_y: i32,
        slice_h: i32,
    ) -> i32 {
        let (src, dst) = pair_mut(slices, self.src, self.dst);
        let planes: &[usize] = if self.alpha { &[0, 3] } else { &[0] };

        for row in slice_y..slice_y + slice_h {
            for &plane in planes {
                let input = src.line(&io.src, plane, row - src.slice_y(plane));
                let dst_pos = row - dst.slice_y(plane);
                hscale_row(&self.filter, input, dst.owned_line_mut(plane, dst_pos));
                dst.grow(plane, 1);
            }
        }
        slice_h
    }
}

/// Scales both chroma planes.
pub struct ChromaHScale {
    src: usize,
    dst: usize,
    filter: FilterCoefficients,
    _instance: Allocation,
}

impl ChromaHScale {
    /// Create a chroma scaler from slice `src` into slice `dst`.
    pub fn new(
        allocator: &Arc<dyn Allocator>,
        src: usize,
        dst: usize,
        filter: FilterCoefficients,
    ) -> Result<Self> {
        Ok(Self {
            src,
            dst,
            filter,
            _instance: stage_instance(allocator, std::mem::size_of::<Self>())?,
        })
    }
}

impl FilterStage for ChromaHScale {
    fn name(&self) -> &'static str {
        "chr_h_scale"
    }

    fn process(
        &mut self,
        slices: &mut [SliceBuffer],
        io: &mut FrameIo<'_>,
        slice_y: i32,
        slice_h: i32,
    ) -> i32 {
        let (src, dst) = pair_mut(slices, self.src, self.dst);

        for row in slice_y..slice_y + slice_h {
            for plane in [1, 2] {
                let input = src.line(&io.src, plane, row - src.slice_y(plane));
                let dst_pos = row - dst.slice_y(plane);
                hscale_row(&self.filter, input, dst.owned_line_mut(plane, dst_pos));
            }
            dst.grow(1, 1);
            dst.grow(2, 1);
        }
        slice_h
    }
}

/// Stands in for chroma scaling when the source has no chroma.
///
/// Marks the whole chroma ring as valid up to the requested row so the
/// vertical stage reads the neutral rows seeded at setup.
pub struct NoChromaScale {
    dst: usize,
    _instance: Allocation,
}

impl NoChromaScale {
    /// Create a placeholder for chroma rows of slice `dst`.
    pub fn new(allocator: &Arc<dyn Allocator>, dst: usize) -> Result<Self> {
        Ok(Self {
            dst,
            _instance: stage_instance(allocator, std::mem::size_of::<Self>())?,
        })
    }
}

impl FilterStage for NoChromaScale {
    fn name(&self) -> &'static str {
        "no_chr_scale"
    }

    fn process(
        &mut self,
        slices: &mut [SliceBuffer],
        _io: &mut FrameIo<'_>,
        slice_y: i32,
        slice_h: i32,
    ) -> i32 {
        let dst = &mut slices[self.dst];
        let available = dst.available_lines(1) as i32;
        for plane in [1, 2] {
            dst.set_window(plane, slice_y + slice_h - available, available);
        }
        0
    }
}
