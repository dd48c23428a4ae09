//! Filter stages of a scaler chain.
//!
//! Each stage reads rows from one slice buffer and writes rows into another.
//! The driver runs the luma stages, then the chroma stages, then the
//! vertical stages for every output row it can complete.

mod convert;
mod gamma;
mod hscale;
mod vscale;

pub use convert::{rgb_to_u, rgb_to_v, rgb_to_y, ChromaConvert, ConvertInput, ConvertOutput, LumaConvert};
pub use gamma::{GammaDecode, GammaEncode, GammaTable};
pub use hscale::{ChromaHScale, LumaHScale, NoChromaScale};
pub use vscale::{ChromaVScale, LumaVScale};

use crate::slice::{PlaneRefs, PlaneRefsMut, SliceBuffer};
use framekit_core::alloc::{AllocKind, Allocation, Allocator};
use framekit_core::Result;
use std::sync::Arc;

/// Caller planes bound for the duration of one conversion call.
#[derive(Debug)]
pub struct FrameIo<'a> {
    /// Source image planes.
    pub src: PlaneRefs<'a>,
    /// Destination image planes.
    pub dst: PlaneRefsMut<'a>,
}

/// Which half of the chain a stage belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneClass {
    /// Luma and alpha rows.
    Luma,
    /// Chroma rows.
    Chroma,
}

/// A processing step between two slice buffers.
pub trait FilterStage: Send {
    /// Get the stage name.
    fn name(&self) -> &'static str;

    /// Process `slice_h` rows starting at `slice_y`, returning how many were
    /// produced.
    fn process(
        &mut self,
        slices: &mut [SliceBuffer],
        io: &mut FrameIo<'_>,
        slice_y: i32,
        slice_h: i32,
    ) -> i32;
}

/// Reserve the per-instance accounting of a stage.
pub(crate) fn stage_instance(
    allocator: &Arc<dyn Allocator>,
    bytes: usize,
) -> Result<Allocation> {
    Allocation::new(allocator, AllocKind::Stage, bytes)
}

/// Borrow slice `src` shared and slice `dst` exclusively.
pub(crate) fn pair_mut(
    slices: &mut [SliceBuffer],
    src: usize,
    dst: usize,
) -> (&SliceBuffer, &mut SliceBuffer) {
    assert_ne!(src, dst);
    if src < dst {
        let (head, tail) = slices.split_at_mut(dst);
        (&head[src], &mut tail[0])
    } else {
        let (head, tail) = slices.split_at_mut(src);
        (&tail[0], &mut head[dst])
    }
}

#[inline]
pub(crate) fn read_i16(line: &[u8], x: usize) -> i16 {
    i16::from_ne_bytes([line[2 * x], line[2 * x + 1]])
}

#[inline]
pub(crate) fn write_i16(line: &mut [u8], x: usize, value: i16) {
    line[2 * x..2 * x + 2].copy_from_slice(&value.to_ne_bytes());
}

#[inline]
pub(crate) fn clip_u8(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i16_helpers() {
        let mut line = [0u8; 8];
        write_i16(&mut line, 2, -1234);
        assert_eq!(read_i16(&line, 2), -1234);
        assert_eq!(read_i16(&line, 1), 0);
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip_u8(-5), 0);
        assert_eq!(clip_u8(300), 255);
        assert_eq!(clip_u8(17), 17);
    }
}
