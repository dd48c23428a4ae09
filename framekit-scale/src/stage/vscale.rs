//! Vertical scaling of intermediate rows into 8-bit output rows.

use super::{clip_u8, pair_mut, read_i16, stage_instance, FilterStage, FrameIo};
use crate::coeffs::FilterCoefficients;
use crate::slice::SliceBuffer;
use framekit_core::alloc::{Allocation, Allocator};
use framekit_core::Result;
use std::sync::Arc;

const ROUNDING: i32 = 1 << 18;
const SHIFT: u32 = 19;

/// Blend the window of rows feeding output row `y` of `plane` into `acc`.
fn accumulate(
    acc: &mut [i32],
    filter: &FilterCoefficients,
    y: usize,
    src: &SliceBuffer,
    io: &FrameIo<'_>,
    plane: usize,
) {
    let first = (1 - filter.filter_size() as i32).max(filter.position(y));
    acc.fill(ROUNDING);
    for (k, &coef) in filter.taps(y).iter().enumerate() {
        let line = src.line(&io.src, plane, first + k as i32 - src.slice_y(plane));
        for (x, a) in acc.iter_mut().enumerate() {
            *a += read_i16(line, x) as i32 * coef;
        }
    }
}

fn store(acc: &[i32], out: &mut [u8]) {
    for (o, &a) in out.iter_mut().zip(acc) {
        *o = clip_u8(a >> SHIFT);
    }
}

/// Produces luma (and alpha) output rows.
pub struct LumaVScale {
    src: usize,
    dst: usize,
    filter: Arc<FilterCoefficients>,
    alpha: bool,
    acc: Vec<i32>,
    _instance: Allocation,
}

impl LumaVScale {
    /// Create a vertical luma scaler writing `width` pixels per row.
    pub fn new(
        allocator: &Arc<dyn Allocator>,
        src: usize,
        dst: usize,
        filter: Arc<FilterCoefficients>,
        alpha: bool,
        width: usize,
    ) -> Result<Self> {
        let instance = stage_instance(
            allocator,
            std::mem::size_of::<Self>() + width * std::mem::size_of::<i32>(),
        )?;
        Ok(Self {
            src,
            dst,
            filter,
            alpha,
            acc: vec![0; width],
            _instance: instance,
        })
    }
}

impl FilterStage for LumaVScale {
    fn name(&self) -> &'static str {
        "lum_v_scale"
    }

    fn process(
        &mut self,
        slices: &mut [SliceBuffer],
        io: &mut FrameIo<'_>,
        slice_y: i32,
        _slice_h: i32,
    ) -> i32 {
        let (src, dst) = pair_mut(slices, self.src, self.dst);
        let planes: &[usize] = if self.alpha { &[0, 3] } else { &[0] };

        for &plane in planes {
            accumulate(&mut self.acc, &self.filter, slice_y as usize, src, io, plane);
            let out = dst.line_mut(&mut io.dst, plane, slice_y - dst.slice_y(plane));
            store(&self.acc, out);
        }
        1
    }
}

/// Produces chroma output rows, skipping luma rows between chroma rows.
pub struct ChromaVScale {
    src: usize,
    dst: usize,
    filter: Arc<FilterCoefficients>,
    acc: Vec<i32>,
    _instance: Allocation,
}

impl ChromaVScale {
    /// Create a vertical chroma scaler writing `width` pixels per row.
    pub fn new(
        allocator: &Arc<dyn Allocator>,
        src: usize,
        dst: usize,
        filter: Arc<FilterCoefficients>,
        width: usize,
    ) -> Result<Self> {
        let instance = stage_instance(
            allocator,
            std::mem::size_of::<Self>() + width * std::mem::size_of::<i32>(),
        )?;
        Ok(Self {
            src,
            dst,
            filter,
            acc: vec![0; width],
            _instance: instance,
        })
    }
}

impl FilterStage for ChromaVScale {
    fn name(&self) -> &'static str {
        "chr_v_scale"
    }

    fn process(
        &mut self,
        slices: &mut [SliceBuffer],
        io: &mut FrameIo<'_>,
        slice_y: i32,
        _slice_h: i32,
    ) -> i32 {
        let (src, dst) = pair_mut(slices, self.src, self.dst);
        let sub = dst.v_chr_sub_sample();
        if slice_y & ((1 << sub) - 1) != 0 {
            return 0;
        }
        let chr_y = slice_y >> sub;

        for plane in [1, 2] {
            accumulate(&mut self.acc, &self.filter, chr_y as usize, src, io, plane);
            let out = dst.line_mut(&mut io.dst, plane, chr_y - dst.slice_y(plane));
            store(&self.acc, out);
        }
        1
    }
}
