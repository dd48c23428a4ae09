//! Frame acquisition.
//!
//! A [`FrameContext`] belongs to one decoder or filter instance. It owns the
//! current [`FramePool`], rebuilds it whenever the requested geometry
//! changes, and attaches pooled plane buffers to caller frames.

use crate::align::STRIDE_ALIGN;
use crate::alloc::{default_allocator, AllocKind, Allocation, Allocator};
use crate::buffer::BufferRef;
use crate::error::{Error, Result};
use crate::format::MediaKind;
use crate::frame::{ExtendedPlanes, Frame, FrameFormat, NUM_DATA_POINTERS};
use crate::hw::HwFrameAllocator;
use crate::pool::{FramePool, PoolGeometry};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Configuration of a frame context.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Stride and block alignment in bytes.
    pub stride_align: usize,
    /// Allocator admitting pool allocations.
    pub allocator: Arc<dyn Allocator>,
    /// Hardware frame source; bypasses the software pool when set.
    pub hw_frames: Option<Arc<dyn HwFrameAllocator>>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            stride_align: STRIDE_ALIGN,
            allocator: default_allocator(),
            hw_frames: None,
        }
    }
}

impl PoolConfig {
    /// Create a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stride alignment.
    pub fn with_stride_align(mut self, stride_align: usize) -> Self {
        self.stride_align = stride_align;
        self
    }

    /// Set the allocator.
    pub fn with_allocator(mut self, allocator: Arc<dyn Allocator>) -> Self {
        self.allocator = allocator;
        self
    }

    /// Route frame requests to a hardware frame allocator.
    pub fn with_hw_frames(mut self, hw_frames: Arc<dyn HwFrameAllocator>) -> Self {
        self.hw_frames = Some(hw_frames);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.stride_align.is_power_of_two() {
            return Err(Error::invalid_param(format!(
                "stride alignment {} is not a power of two",
                self.stride_align
            )));
        }
        Ok(())
    }
}

/// Per-instance frame source.
#[derive(Debug)]
pub struct FrameContext {
    kind: MediaKind,
    config: PoolConfig,
    pool: Option<Arc<FramePool>>,
    hw_pool_warned: bool,
}

impl FrameContext {
    /// Create a context producing frames of `kind`.
    pub fn new(kind: MediaKind, config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            kind,
            config,
            pool: None,
            hw_pool_warned: false,
        })
    }

    /// Media kind of the context.
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Current pool, if one was built.
    pub fn pool(&self) -> Option<&Arc<FramePool>> {
        self.pool.as_ref()
    }

    /// Return a pool matching `frame`, building a new one if needed.
    ///
    /// The current pool is kept when format and geometry are unchanged. A
    /// new pool replaces it only once fully built; on failure the old pool
    /// stays in place.
    pub fn acquire_or_rebuild(&mut self, frame: &Frame) -> Result<Arc<FramePool>> {
        let geometry = self.geometry_of(frame)?;
        if let Some(pool) = &self.pool {
            if pool.matches(&geometry) {
                return Ok(Arc::clone(pool));
            }
        }

        let pool = Arc::new(FramePool::build(
            geometry,
            self.config.stride_align,
            &self.config.allocator,
        )?);
        if self.pool.is_some() {
            debug!(kind = %self.kind, ?geometry, "replacing frame pool");
        }
        self.pool = Some(Arc::clone(&pool));
        Ok(pool)
    }

    fn geometry_of(&self, frame: &Frame) -> Result<PoolGeometry> {
        let geometry = match frame.format {
            FrameFormat::Video(format) => PoolGeometry::Video {
                format,
                width: frame.width,
                height: frame.height,
            },
            FrameFormat::Audio(format) => PoolGeometry::Audio {
                format,
                channels: frame.layout.channels(),
                nb_samples: frame.nb_samples,
            },
            FrameFormat::None => {
                return Err(Error::invalid_param("frame has no format"));
            }
        };
        if geometry.kind() != self.kind {
            return Err(Error::invalid_param(format!(
                "{} frame requested from a {} context",
                geometry.kind(),
                self.kind
            )));
        }
        Ok(geometry)
    }

    /// Attach buffers to `frame`, from the hardware allocator or the pool.
    ///
    /// A frame that already holds data is rejected untouched. Any other
    /// failure leaves the frame without buffers.
    pub fn get_buffer(&mut self, frame: &mut Frame) -> Result<()> {
        if frame.is_populated() {
            error!(kind = %self.kind, "get_buffer() called on a populated frame");
            return Err(Error::invalid_state("frame already holds data"));
        }
        let result = match self.config.hw_frames.clone() {
            Some(hw) => self.get_hw_buffer(hw.as_ref(), frame),
            None => match self.kind {
                MediaKind::Video => self.get_video_buffer(frame),
                MediaKind::Audio => self.get_audio_buffer(frame),
            },
        };

        if let Err(err) = &result {
            error!(kind = %self.kind, error = %err, "get_buffer() failed");
            frame.release_planes();
        }
        result
    }

    fn get_hw_buffer(&mut self, hw: &dyn HwFrameAllocator, frame: &mut Frame) -> Result<()> {
        match hw.alloc_frame(frame) {
            Err(err @ Error::HwPoolExhausted { pool_size }) => {
                if !self.hw_pool_warned {
                    warn!(
                        pool_size,
                        "hardware frame pool exhausted; consider increasing the pool \
                         size or the number of extra hardware frames"
                    );
                    self.hw_pool_warned = true;
                }
                Err(err)
            }
            other => other,
        }
    }

    /// Attach pooled plane buffers to a video frame.
    ///
    /// Fails with [`Error::InvalidState`] if the frame already holds planes.
    /// If any plane cannot be checked out, planes acquired so far are
    /// released and [`Error::OutOfMemory`] is returned.
    pub fn get_video_buffer(&mut self, frame: &mut Frame) -> Result<()> {
        if frame.is_populated() {
            return Err(Error::invalid_state("frame planes already populated"));
        }
        let pool = self.acquire_or_rebuild(frame)?;

        for plane in 0..4 {
            if !pool.has_plane(plane) {
                continue;
            }
            match pool.checkout_plane(plane) {
                Ok(buf) => {
                    frame.linesize[plane] = pool.linesize()[plane];
                    frame.buf[plane] = Some(buf);
                }
                Err(err) => {
                    frame.release_planes();
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Attach pooled sample buffers to an audio frame.
    ///
    /// Planar formats get one buffer per channel, packed formats a single
    /// buffer. Planes beyond [`NUM_DATA_POINTERS`] go to an extended table.
    /// Any failure resets the frame completely.
    pub fn get_audio_buffer(&mut self, frame: &mut Frame) -> Result<()> {
        if frame.is_populated() {
            return Err(Error::invalid_state("frame planes already populated"));
        }
        let pool = self.acquire_or_rebuild(frame)?;

        let result = Self::fill_audio_planes(&pool, &self.config.allocator, frame);
        if result.is_err() {
            frame.unref();
        }
        result
    }

    fn fill_audio_planes(
        pool: &FramePool,
        allocator: &Arc<dyn Allocator>,
        frame: &mut Frame,
    ) -> Result<()> {
        let planes = pool.planes();
        if planes > NUM_DATA_POINTERS {
            let extra = planes - NUM_DATA_POINTERS;
            let table = Allocation::new(
                allocator,
                AllocKind::ExtendedTable,
                extra * std::mem::size_of::<BufferRef>(),
            )?;
            frame.extended = Some(ExtendedPlanes {
                bufs: Vec::with_capacity(extra),
                _table: table,
            });
        }

        frame.linesize[0] = pool.linesize()[0];
        for plane in 0..planes {
            let buf = pool.checkout_plane(0)?;
            if plane < NUM_DATA_POINTERS {
                frame.buf[plane] = Some(buf);
            } else if let Some(ext) = frame.extended.as_mut() {
                ext.bufs.push(buf);
            }
        }
        Ok(())
    }
}
