//! Plane geometry: line sizes, plane sizes and dimension alignment.
//!
//! These helpers turn a format plus dimensions into the byte layout the
//! buffer pool allocates for. All arithmetic is checked against `i32::MAX`
//! so downstream code can index with plain `usize` math.

use crate::error::{Error, Result};
use crate::format::{ceil_rshift, PixelFormat};
use crate::sample::SampleFormat;

/// Largest byte count any single plane or buffer may reach.
pub const MAX_PLANE_BYTES: usize = i32::MAX as usize;

/// Reject image dimensions that are zero or large enough to overflow
/// plane arithmetic.
pub fn check_image_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_param(format!(
            "image size {}x{} is empty",
            width, height
        )));
    }
    let padded = (width as u64 + 128) * (height as u64 + 128);
    if padded >= (i32::MAX / 8) as u64 {
        return Err(Error::invalid_param(format!(
            "image size {}x{} is too large",
            width, height
        )));
    }
    Ok(())
}

/// Width and height alignment required for `format`, plus the per-plane
/// stride alignment.
///
/// Planar YUV/GBR/gray formats are padded to whole 16x16 macroblocks, with
/// a doubled height so interlaced content always has two macroblock rows.
pub fn align_dimensions(
    format: PixelFormat,
    width: u32,
    height: u32,
    stride_align: usize,
) -> (u32, u32, [usize; 4]) {
    let desc = format.descriptor();
    let (w_align, h_align) = match format {
        PixelFormat::Gray8
        | PixelFormat::Yuv420p
        | PixelFormat::Yuv422p
        | PixelFormat::Yuv444p
        | PixelFormat::Yuv440p
        | PixelFormat::Yuva420p
        | PixelFormat::Yuv420p10le
        | PixelFormat::Gbrp => (16, 16 * 2),
        PixelFormat::Yuv411p => (32, 16 * 2),
        _ => (1 << desc.log2_chroma_w, 1 << desc.log2_chroma_h),
    };

    let width = width.div_ceil(w_align) * w_align;
    let height = height.div_ceil(h_align) * h_align;
    (width, height, [stride_align; 4])
}

/// Bytes per line of each plane for an image `width` pixels wide.
///
/// Unused plane slots are zero.
pub fn fill_linesizes(format: PixelFormat, width: u32) -> Result<[usize; 4]> {
    if width == 0 {
        return Err(Error::invalid_param("linesize requested for zero width"));
    }
    let desc = format.descriptor();
    let mut linesizes = [0usize; 4];

    for (plane, linesize) in linesizes.iter_mut().enumerate().take(desc.planes) {
        let plane_width = if format.is_chroma_plane(plane) {
            ceil_rshift(width, desc.log2_chroma_w)
        } else {
            width
        };
        let bytes = (plane_width as usize)
            .checked_mul(desc.step[plane])
            .filter(|&bytes| bytes <= MAX_PLANE_BYTES)
            .ok_or(Error::Overflow {
                what: "linesize",
                size: plane_width as usize * desc.step[plane],
                limit: MAX_PLANE_BYTES,
            })?;
        *linesize = bytes;
    }

    Ok(linesizes)
}

/// Byte size of each plane for an image `height` rows tall with the given
/// line sizes.
pub fn fill_plane_sizes(
    format: PixelFormat,
    height: u32,
    linesizes: &[usize; 4],
) -> Result<[usize; 4]> {
    let desc = format.descriptor();
    let mut sizes = [0usize; 4];

    for (plane, size) in sizes.iter_mut().enumerate().take(desc.planes) {
        let rows = if format.is_chroma_plane(plane) {
            ceil_rshift(height, desc.log2_chroma_h)
        } else {
            height
        };
        *size = linesizes[plane]
            .checked_mul(rows as usize)
            .filter(|&bytes| bytes <= MAX_PLANE_BYTES)
            .ok_or(Error::Overflow {
                what: "plane",
                size: linesizes[plane].saturating_mul(rows as usize),
                limit: MAX_PLANE_BYTES,
            })?;
    }

    Ok(sizes)
}

/// Size of an audio buffer and of each of its planes.
///
/// Returns `(total_bytes, linesize)`. With `align == 0` the sample count is
/// padded to a multiple of 32 and lines are not further aligned.
pub fn samples_buffer_size(
    channels: u32,
    nb_samples: usize,
    format: SampleFormat,
    align: usize,
) -> Result<(usize, usize)> {
    if channels == 0 || nb_samples == 0 {
        return Err(Error::invalid_param(format!(
            "audio buffer of {} channels x {} samples",
            channels, nb_samples
        )));
    }

    let (nb_samples, align) = if align == 0 {
        if nb_samples > MAX_PLANE_BYTES - 31 {
            return Err(Error::invalid_param("sample count too large"));
        }
        (nb_samples.div_ceil(32) * 32, 1)
    } else {
        (nb_samples, align)
    };

    let per_line = if format.is_planar() {
        nb_samples.checked_mul(format.bytes_per_sample())
    } else {
        nb_samples
            .checked_mul(format.bytes_per_sample())
            .and_then(|bytes| bytes.checked_mul(channels as usize))
    };
    let overflow = Error::Overflow {
        what: "audio buffer",
        size: usize::MAX,
        limit: MAX_PLANE_BYTES,
    };
    let linesize = per_line
        .map(|bytes| bytes.div_ceil(align) * align)
        .filter(|&bytes| bytes <= MAX_PLANE_BYTES)
        .ok_or_else(|| overflow.clone())?;

    let total = if format.is_planar() {
        linesize.checked_mul(channels as usize)
    } else {
        Some(linesize)
    };
    let total = total
        .filter(|&bytes| bytes <= MAX_PLANE_BYTES)
        .ok_or(overflow)?;

    Ok((total, linesize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linesizes_planar() {
        let ls = fill_linesizes(PixelFormat::Yuv420p, 65).unwrap();
        assert_eq!(ls, [65, 33, 33, 0]);

        let ls = fill_linesizes(PixelFormat::Yuva420p, 64).unwrap();
        assert_eq!(ls, [64, 32, 32, 64]);

        let ls = fill_linesizes(PixelFormat::Yuv420p10le, 64).unwrap();
        assert_eq!(ls, [128, 64, 64, 0]);
    }

    #[test]
    fn test_linesizes_packed_and_semi_planar() {
        assert_eq!(fill_linesizes(PixelFormat::Rgb24, 10).unwrap(), [30, 0, 0, 0]);
        assert_eq!(fill_linesizes(PixelFormat::Bgra, 10).unwrap(), [40, 0, 0, 0]);
        assert_eq!(fill_linesizes(PixelFormat::Nv12, 11).unwrap(), [11, 12, 0, 0]);
        assert_eq!(fill_linesizes(PixelFormat::Gbrp, 7).unwrap(), [7, 7, 7, 0]);
    }

    #[test]
    fn test_plane_sizes() {
        let ls = fill_linesizes(PixelFormat::Yuv420p, 64).unwrap();
        let sizes = fill_plane_sizes(PixelFormat::Yuv420p, 47, &ls).unwrap();
        assert_eq!(sizes, [64 * 47, 32 * 24, 32 * 24, 0]);
    }

    #[test]
    fn test_zero_width_rejected() {
        assert!(fill_linesizes(PixelFormat::Gray8, 0).is_err());
    }

    #[test]
    fn test_align_dimensions() {
        let (w, h, align) = align_dimensions(PixelFormat::Yuv420p, 65, 47, 64);
        assert_eq!((w, h), (80, 64));
        assert_eq!(align, [64; 4]);

        let (w, h, _) = align_dimensions(PixelFormat::Yuv411p, 33, 1, 32);
        assert_eq!((w, h), (64, 32));

        let (w, h, _) = align_dimensions(PixelFormat::Nv12, 33, 33, 32);
        assert_eq!((w, h), (34, 34));

        let (w, h, _) = align_dimensions(PixelFormat::Rgb24, 33, 33, 32);
        assert_eq!((w, h), (33, 33));
    }

    #[test]
    fn test_check_image_size() {
        assert!(check_image_size(1920, 1080).is_ok());
        assert!(check_image_size(0, 1080).is_err());
        assert!(check_image_size(100_000, 100_000).is_err());
    }

    #[test]
    fn test_samples_buffer_size() {
        // 1000 samples padded to 1024, interleaved stereo s16.
        let (total, line) = samples_buffer_size(2, 1000, SampleFormat::S16, 0).unwrap();
        assert_eq!(line, 1024 * 2 * 2);
        assert_eq!(total, line);

        // Planar: one line per channel.
        let (total, line) = samples_buffer_size(6, 1024, SampleFormat::F32p, 0).unwrap();
        assert_eq!(line, 1024 * 4);
        assert_eq!(total, line * 6);

        // Explicit alignment.
        let (_, line) = samples_buffer_size(1, 3, SampleFormat::U8, 16).unwrap();
        assert_eq!(line, 16);
    }

    #[test]
    fn test_samples_buffer_size_rejects_empty() {
        assert!(samples_buffer_size(0, 1024, SampleFormat::S16, 0).is_err());
        assert!(samples_buffer_size(2, 0, SampleFormat::S16, 0).is_err());
    }
}
