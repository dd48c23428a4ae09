//! Gamma-correct scaling: decode to linear light before the horizontal
//! stage, re-encode output rows after the vertical stage.

use super::convert::RgbRow;
use super::{pair_mut, stage_instance, ConvertInput, FilterStage, FrameIo, PlaneClass};
use crate::slice::SliceBuffer;
use framekit_core::alloc::{Allocation, Allocator};
use framekit_core::Result;
use std::fmt;
use std::sync::Arc;

/// 8-bit transfer lookup table.
#[derive(Clone)]
pub struct GammaTable {
    lut: [u8; 256],
}

impl GammaTable {
    /// Table raising normalized values to `exponent`.
    pub fn new(exponent: f64) -> Self {
        let mut lut = [0u8; 256];
        for (i, out) in lut.iter_mut().enumerate() {
            let v = (i as f64 / 255.0).powf(exponent);
            *out = (v * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        Self { lut }
    }

    /// Table converting encoded values to linear light.
    pub fn decode(gamma: f64) -> Self {
        Self::new(gamma)
    }

    /// Table converting linear light back to encoded values.
    pub fn encode(gamma: f64) -> Self {
        Self::new(1.0 / gamma)
    }

    /// Map one value.
    #[inline]
    pub fn apply(&self, value: u8) -> u8 {
        self.lut[value as usize]
    }
}

impl fmt::Debug for GammaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GammaTable")
            .field("mid", &self.lut[128])
            .finish()
    }
}

/// Decodes RGB source rows into linear planar G/B/R rows.
pub struct GammaDecode {
    src: usize,
    dst: usize,
    class: PlaneClass,
    input: ConvertInput,
    table: GammaTable,
    _instance: Allocation,
}

impl GammaDecode {
    /// Create a decoder for the `class` planes of slice `dst`.
    pub fn new(
        allocator: &Arc<dyn Allocator>,
        src: usize,
        dst: usize,
        class: PlaneClass,
        input: ConvertInput,
        gamma: f64,
    ) -> Result<Self> {
        Ok(Self {
            src,
            dst,
            class,
            input,
            table: GammaTable::decode(gamma),
            _instance: stage_instance(allocator, std::mem::size_of::<Self>())?,
        })
    }
}

impl FilterStage for GammaDecode {
    fn name(&self) -> &'static str {
        match self.class {
            PlaneClass::Luma => "lum_gamma_decode",
            PlaneClass::Chroma => "chr_gamma_decode",
        }
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
        // Component index into [r, g, b, a] per output plane.
        let planes: &[(usize, usize)] = match self.class {
            PlaneClass::Luma => &[(0, 1)],
            PlaneClass::Chroma => &[(1, 2), (2, 0)],
        };
        for &(plane, _) in planes {
            dst.set_window(plane, slice_y, slice_h);
        }

        for i in 0..slice_h {
            let row = slice_y + i;
            let pixels = RgbRow::fetch(
                self.input,
                src,
                &io.src,
                row - src.slice_y(0),
                row - src.slice_y(1),
            );
            for &(plane, component) in planes {
                let out = dst.owned_line_mut(plane, i);
                for (x, o) in out[..width].iter_mut().enumerate() {
                    *o = self.table.apply(pixels.pixel(x)[component]);
                }
            }
        }
        slice_h
    }
}

/// Re-encodes finished planar G/B/R output rows in place.
pub struct GammaEncode {
    dst: usize,
    table: GammaTable,
    _instance: Allocation,
}

impl GammaEncode {
    /// Create an encoder for the rows of slice `dst`.
    pub fn new(allocator: &Arc<dyn Allocator>, dst: usize, gamma: f64) -> Result<Self> {
        Ok(Self {
            dst,
            table: GammaTable::encode(gamma),
            _instance: stage_instance(allocator, std::mem::size_of::<Self>())?,
        })
    }
}

impl FilterStage for GammaEncode {
    fn name(&self) -> &'static str {
        "gamma_encode"
    }

    fn process(
        &mut self,
        slices: &mut [SliceBuffer],
        io: &mut FrameIo<'_>,
        slice_y: i32,
        slice_h: i32,
    ) -> i32 {
        let dst = &mut slices[self.dst];
        let width = dst.width() as usize;
        for row in slice_y..slice_y + slice_h {
            for plane in 0..3 {
                let idx = row - dst.slice_y(plane);
                for px in dst.line_mut(&mut io.dst, plane, idx)[..width].iter_mut() {
                    *px = self.table.apply(*px);
                }
            }
        }
        slice_h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_fix_endpoints() {
        for gamma in [1.8, 2.2, 2.4] {
            let decode = GammaTable::decode(gamma);
            let encode = GammaTable::encode(gamma);
            assert_eq!(decode.apply(0), 0);
            assert_eq!(decode.apply(255), 255);
            assert_eq!(encode.apply(255), 255);
            assert!(decode.apply(128) < 128);
            assert!(encode.apply(128) > 128);
        }
    }

    #[test]
    fn test_unit_gamma_is_identity() {
        let table = GammaTable::decode(1.0);
        assert!((0..=255u8).all(|v| table.apply(v) == v));
    }

    #[test]
    fn test_round_trip_is_close() {
        let decode = GammaTable::decode(2.2);
        let encode = GammaTable::encode(2.2);
        for v in [64u8, 128, 200, 255] {
            let back = encode.apply(decode.apply(v)) as i32;
            assert!((back - v as i32).abs() <= 12, "{} -> {}", v, back);
        }
    }
}
