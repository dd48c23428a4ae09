//! Pixel format descriptors and media kinds.

use bitflags::bitflags;
use std::fmt;

/// Kind of media a context produces frames for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Video frames made of pixel planes.
    Video,
    /// Audio frames made of sample planes.
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

bitflags! {
    /// Properties of a pixel format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PixFmtFlags: u32 {
        /// Components are stored in separate planes.
        const PLANAR = 0x0001;
        /// Components are red, green and blue rather than luma and chroma.
        const RGB = 0x0002;
        /// The format carries an alpha component.
        const ALPHA = 0x0004;
        /// Single luma component, no chroma.
        const GRAY = 0x0008;
        /// Chroma is stored interleaved in a single plane.
        const SEMI_PLANAR = 0x0010;
    }
}

/// Static description of a pixel format's memory layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixFmtDescriptor {
    /// Short name, as used in logs.
    pub name: &'static str,
    /// Number of planes holding data.
    pub planes: usize,
    /// Bytes between horizontally adjacent pixels, per plane.
    pub step: [usize; 4],
    /// Right shift applied to the luma width to get the chroma width.
    pub log2_chroma_w: u32,
    /// Right shift applied to the luma height to get the chroma height.
    pub log2_chroma_h: u32,
    /// Bits per component.
    pub depth: u32,
    /// Layout flags.
    pub flags: PixFmtFlags,
}

/// Pixel format for video frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// Grayscale, 8bpp.
    Gray8,
    /// Planar YUV 4:2:0, 12bpp (1 Cr & Cb sample per 2x2 Y samples).
    Yuv420p,
    /// Planar YUV 4:2:2, 16bpp (1 Cr & Cb sample per 2x1 Y samples).
    Yuv422p,
    /// Planar YUV 4:4:4, 24bpp (no subsampling).
    Yuv444p,
    /// Planar YUV 4:4:0, 16bpp (1 Cr & Cb sample per 1x2 Y samples).
    Yuv440p,
    /// Planar YUV 4:1:1, 12bpp (1 Cr & Cb sample per 4x1 Y samples).
    Yuv411p,
    /// Planar YUV 4:2:0 with a full-resolution alpha plane, 20bpp.
    Yuva420p,
    /// Planar YUV 4:2:0, 15bpp, 10-bit.
    Yuv420p10le,
    /// Semi-planar NV12 (Y plane, interleaved UV plane).
    Nv12,
    /// Semi-planar NV21 (Y plane, interleaved VU plane).
    Nv21,
    /// Planar GBR 4:4:4, 24bpp.
    Gbrp,
    /// Packed RGB24, 24bpp.
    Rgb24,
    /// Packed BGR24, 24bpp.
    Bgr24,
    /// Packed RGBA, 32bpp.
    Rgba,
    /// Packed BGRA, 32bpp.
    Bgra,
}

impl PixelFormat {
    /// All pixel formats known to the library.
    pub const ALL: [PixelFormat; 15] = [
        Self::Gray8,
        Self::Yuv420p,
        Self::Yuv422p,
        Self::Yuv444p,
        Self::Yuv440p,
        Self::Yuv411p,
        Self::Yuva420p,
        Self::Yuv420p10le,
        Self::Nv12,
        Self::Nv21,
        Self::Gbrp,
        Self::Rgb24,
        Self::Bgr24,
        Self::Rgba,
        Self::Bgra,
    ];

    /// Get the layout descriptor for this format.
    pub fn descriptor(&self) -> PixFmtDescriptor {
        use PixFmtFlags as F;

        let (name, planes, step, log2_w, log2_h, depth, flags) = match self {
            Self::Gray8 => ("gray8", 1, [1, 0, 0, 0], 0, 0, 8, F::GRAY),
            Self::Yuv420p => ("yuv420p", 3, [1, 1, 1, 0], 1, 1, 8, F::PLANAR),
            Self::Yuv422p => ("yuv422p", 3, [1, 1, 1, 0], 1, 0, 8, F::PLANAR),
            Self::Yuv444p => ("yuv444p", 3, [1, 1, 1, 0], 0, 0, 8, F::PLANAR),
            Self::Yuv440p => ("yuv440p", 3, [1, 1, 1, 0], 0, 1, 8, F::PLANAR),
            Self::Yuv411p => ("yuv411p", 3, [1, 1, 1, 0], 2, 0, 8, F::PLANAR),
            Self::Yuva420p => (
                "yuva420p",
                4,
                [1, 1, 1, 1],
                1,
                1,
                8,
                F::PLANAR.union(F::ALPHA),
            ),
            Self::Yuv420p10le => ("yuv420p10le", 3, [2, 2, 2, 0], 1, 1, 10, F::PLANAR),
            Self::Nv12 => (
                "nv12",
                2,
                [1, 2, 0, 0],
                1,
                1,
                8,
                F::PLANAR.union(F::SEMI_PLANAR),
            ),
            Self::Nv21 => (
                "nv21",
                2,
                [1, 2, 0, 0],
                1,
                1,
                8,
                F::PLANAR.union(F::SEMI_PLANAR),
            ),
            Self::Gbrp => ("gbrp", 3, [1, 1, 1, 0], 0, 0, 8, F::PLANAR.union(F::RGB)),
            Self::Rgb24 => ("rgb24", 1, [3, 0, 0, 0], 0, 0, 8, F::RGB),
            Self::Bgr24 => ("bgr24", 1, [3, 0, 0, 0], 0, 0, 8, F::RGB),
            Self::Rgba => ("rgba", 1, [4, 0, 0, 0], 0, 0, 8, F::RGB.union(F::ALPHA)),
            Self::Bgra => ("bgra", 1, [4, 0, 0, 0], 0, 0, 8, F::RGB.union(F::ALPHA)),
        };

        PixFmtDescriptor {
            name,
            planes,
            step,
            log2_chroma_w: log2_w,
            log2_chroma_h: log2_h,
            depth,
            flags,
        }
    }

    /// Get the number of planes for this pixel format.
    pub fn num_planes(&self) -> usize {
        self.descriptor().planes
    }

    /// Check if this is a planar format (semi-planar included).
    pub fn is_planar(&self) -> bool {
        self.descriptor().flags.contains(PixFmtFlags::PLANAR)
    }

    /// Check if components are red/green/blue.
    pub fn is_rgb(&self) -> bool {
        self.descriptor().flags.contains(PixFmtFlags::RGB)
    }

    /// Check if this is a packed (single plane, interleaved) RGB format.
    pub fn is_packed_rgb(&self) -> bool {
        self.is_rgb() && !self.is_planar()
    }

    /// Check if the format carries alpha.
    pub fn has_alpha(&self) -> bool {
        self.descriptor().flags.contains(PixFmtFlags::ALPHA)
    }

    /// Check if the format is luma only.
    pub fn is_gray(&self) -> bool {
        self.descriptor().flags.contains(PixFmtFlags::GRAY)
    }

    /// Check if chroma is interleaved in a single plane.
    pub fn is_semi_planar(&self) -> bool {
        self.descriptor().flags.contains(PixFmtFlags::SEMI_PLANAR)
    }

    /// Get chroma subsampling factors (horizontal, vertical).
    pub fn chroma_subsampling(&self) -> (u32, u32) {
        let desc = self.descriptor();
        (1 << desc.log2_chroma_w, 1 << desc.log2_chroma_h)
    }

    /// Check whether plane `plane` is a chroma plane subject to subsampling.
    pub fn is_chroma_plane(&self, plane: usize) -> bool {
        (plane == 1 || plane == 2) && !self.is_rgb()
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor().name)
    }
}

/// Shift `value` right by `shift`, rounding up.
pub fn ceil_rshift(value: u32, shift: u32) -> u32 {
    if shift == 0 {
        value
    } else {
        (value + (1 << shift) - 1) >> shift
    }
}
