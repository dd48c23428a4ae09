//! Per-context frame pools.
//!
//! A [`FramePool`] groups up to four [`BufferPool`]s, one per plane, sized
//! for a single frame geometry. Pools are never resized: a geometry change
//! builds a new pool and the old one is dropped, leaving any buffers it
//! handed out valid until their last reference goes away.

use crate::align::{lowest_set_bit, STRIDE_ALIGN};
use crate::alloc::Allocator;
use crate::buffer::{BufferPool, BufferRef};
use crate::error::{Error, Result};
use crate::format::{MediaKind, PixelFormat};
use crate::layout::{
    align_dimensions, check_image_size, fill_linesizes, fill_plane_sizes, samples_buffer_size,
    MAX_PLANE_BYTES,
};
use crate::sample::SampleFormat;
use std::sync::Arc;
use tracing::debug;

/// Bytes added to every plane block for vector over-reads and alignment slack.
pub const PLANE_PADDING: usize = 16 + STRIDE_ALIGN - 1;

/// Upper bound on width-widening steps while searching for aligned strides.
pub const MAX_ALIGN_ATTEMPTS: usize = 32;

/// Geometry a frame pool is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolGeometry {
    /// Video frames.
    Video {
        format: PixelFormat,
        width: u32,
        height: u32,
    },
    /// Audio frames.
    Audio {
        format: SampleFormat,
        channels: u32,
        nb_samples: usize,
    },
}

impl PoolGeometry {
    /// Media kind this geometry describes.
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Video { .. } => MediaKind::Video,
            Self::Audio { .. } => MediaKind::Audio,
        }
    }
}

/// Sub-pools and plane layout for one frame geometry.
#[derive(Debug)]
pub struct FramePool {
    geometry: PoolGeometry,
    pools: [Option<BufferPool>; 4],
    linesize: [usize; 4],
    stride_align: [usize; 4],
    planes: usize,
}

impl FramePool {
    /// Build a pool for `geometry`.
    ///
    /// Fails without side effects: sub-pools created before a failure are
    /// released before the error is returned.
    pub fn build(
        geometry: PoolGeometry,
        stride_align: usize,
        allocator: &Arc<dyn Allocator>,
    ) -> Result<Self> {
        match geometry {
            PoolGeometry::Video {
                format,
                width,
                height,
            } => Self::build_video(geometry, format, width, height, stride_align, allocator),
            PoolGeometry::Audio {
                format,
                channels,
                nb_samples,
            } => Self::build_audio(geometry, format, channels, nb_samples, stride_align, allocator),
        }
    }

    fn build_video(
        geometry: PoolGeometry,
        format: PixelFormat,
        width: u32,
        height: u32,
        stride_align: usize,
        allocator: &Arc<dyn Allocator>,
    ) -> Result<Self> {
        check_image_size(width, height)?;
        let (aligned_w, aligned_h, plane_align) =
            align_dimensions(format, width, height, stride_align);

        let mut w = aligned_w as usize;
        let mut attempts = 0;
        let linesize = loop {
            let plane_width = u32::try_from(w).map_err(|_| Error::Overflow {
                what: "aligned width",
                size: w,
                limit: u32::MAX as usize,
            })?;
            let linesize = fill_linesizes(format, plane_width)?;
            let aligned = linesize
                .iter()
                .zip(plane_align.iter())
                .all(|(&size, &align)| size % align == 0);
            if aligned {
                break linesize;
            }
            attempts += 1;
            if attempts >= MAX_ALIGN_ATTEMPTS {
                return Err(Error::invalid_param(format!(
                    "no stride alignment of {} found for {} at width {} after {} attempts",
                    stride_align, format, width, attempts
                )));
            }
            w += lowest_set_bit(w);
        };

        let sizes = fill_plane_sizes(format, aligned_h, &linesize)?;
        let mut pools: [Option<BufferPool>; 4] = Default::default();
        for (plane, &size) in sizes.iter().enumerate() {
            if size == 0 {
                continue;
            }
            if size > MAX_PLANE_BYTES - PLANE_PADDING {
                return Err(Error::Overflow {
                    what: "plane",
                    size,
                    limit: MAX_PLANE_BYTES - PLANE_PADDING,
                });
            }
            pools[plane] = Some(BufferPool::new(
                size + PLANE_PADDING,
                stride_align,
                Arc::clone(allocator),
            )?);
        }

        debug!(
            %format,
            width,
            height,
            aligned_w = w,
            aligned_h,
            ?linesize,
            "built video frame pool"
        );

        Ok(Self {
            geometry,
            pools,
            linesize,
            stride_align: plane_align,
            planes: format.num_planes(),
        })
    }

    fn build_audio(
        geometry: PoolGeometry,
        format: SampleFormat,
        channels: u32,
        nb_samples: usize,
        stride_align: usize,
        allocator: &Arc<dyn Allocator>,
    ) -> Result<Self> {
        let (_, linesize) = samples_buffer_size(channels, nb_samples, format, 0)?;
        let pool = BufferPool::new(linesize, stride_align, Arc::clone(allocator))?;

        debug!(
            ?format,
            channels,
            nb_samples,
            linesize,
            "built audio frame pool"
        );

        Ok(Self {
            geometry,
            pools: [Some(pool), None, None, None],
            linesize: [linesize, 0, 0, 0],
            stride_align: [stride_align; 4],
            planes: format.planes(channels),
        })
    }

    /// Check if this pool serves `geometry` unchanged.
    pub fn matches(&self, geometry: &PoolGeometry) -> bool {
        self.geometry == *geometry
    }

    /// Geometry the pool was built for.
    pub fn geometry(&self) -> &PoolGeometry {
        &self.geometry
    }

    /// Check if plane `plane` has a sub-pool.
    pub fn has_plane(&self, plane: usize) -> bool {
        self.pools.get(plane).is_some_and(Option::is_some)
    }

    /// Check out a buffer for plane `plane`.
    ///
    /// Audio frames draw every plane from sub-pool 0.
    pub fn checkout_plane(&self, plane: usize) -> Result<BufferRef> {
        let pool = self
            .pools
            .get(plane)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::invalid_param(format!("pool has no plane {}", plane)))?;
        pool.get()
    }

    /// Sub-pool of plane `plane`, if any.
    pub fn sub_pool(&self, plane: usize) -> Option<&BufferPool> {
        self.pools.get(plane).and_then(Option::as_ref)
    }

    /// Bytes per line of each plane.
    pub fn linesize(&self) -> &[usize; 4] {
        &self.linesize
    }

    /// Required stride alignment of each plane.
    pub fn stride_align(&self) -> &[usize; 4] {
        &self.stride_align
    }

    /// Number of data planes a frame from this pool has.
    pub fn planes(&self) -> usize {
        self.planes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::default_allocator;

    fn video(format: PixelFormat, width: u32, height: u32) -> PoolGeometry {
        PoolGeometry::Video {
            format,
            width,
            height,
        }
    }

    #[test]
    fn test_build_yuv420p() {
        let pool = FramePool::build(video(PixelFormat::Yuv420p, 64, 48), 64, &default_allocator())
            .unwrap();
        // Chroma lines must be 64-byte multiples as well, which doubles the
        // luma stride.
        assert_eq!(pool.linesize(), &[128, 64, 64, 0]);
        assert!(pool.has_plane(0) && pool.has_plane(1) && pool.has_plane(2));
        assert!(!pool.has_plane(3));
        // 48 rows are padded to 64.
        assert_eq!(pool.sub_pool(0).unwrap().block_size(), 128 * 64 + PLANE_PADDING);
        assert_eq!(pool.sub_pool(1).unwrap().block_size(), 64 * 32 + PLANE_PADDING);
    }

    #[test]
    fn test_chroma_stride_widening() {
        // Width 80 gives chroma lines of 40 bytes; widening continues until
        // chroma lines are 64-byte multiples too.
        let pool = FramePool::build(video(PixelFormat::Yuv420p, 80, 16), 64, &default_allocator())
            .unwrap();
        let ls = pool.linesize();
        assert_eq!(ls[0], 128);
        assert_eq!(ls[1], 64);
    }

    #[test]
    fn test_matches() {
        let geometry = video(PixelFormat::Gray8, 32, 32);
        let pool = FramePool::build(geometry, 32, &default_allocator()).unwrap();
        assert!(pool.matches(&geometry));
        assert!(!pool.matches(&video(PixelFormat::Gray8, 32, 33)));
        assert!(!pool.matches(&video(PixelFormat::Yuv420p, 32, 32)));
        assert_eq!(pool.geometry().kind(), MediaKind::Video);
    }

    #[test]
    fn test_audio_pool() {
        let geometry = PoolGeometry::Audio {
            format: SampleFormat::F32p,
            channels: 6,
            nb_samples: 1000,
        };
        let pool = FramePool::build(geometry, 64, &default_allocator()).unwrap();
        assert_eq!(pool.planes(), 6);
        assert_eq!(pool.linesize()[0], 1024 * 4);
        assert!(!pool.has_plane(1));
        assert_eq!(pool.checkout_plane(0).unwrap().len(), 1024 * 4);
    }

    #[test]
    fn test_invalid_geometry() {
        let alloc = default_allocator();
        assert!(FramePool::build(video(PixelFormat::Yuv420p, 0, 48), 64, &alloc).is_err());
        let audio = PoolGeometry::Audio {
            format: SampleFormat::S16,
            channels: 0,
            nb_samples: 1024,
        };
        assert!(FramePool::build(audio, 64, &alloc).is_err());
    }

    #[test]
    fn test_checkout_missing_plane() {
        let pool = FramePool::build(video(PixelFormat::Gray8, 16, 16), 16, &default_allocator())
            .unwrap();
        assert!(pool.checkout_plane(1).is_err());
        assert!(pool.checkout_plane(0).is_ok());
    }
}
