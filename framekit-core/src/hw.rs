//! Hardware frame allocation.
//!
//! Contexts bound to a hardware device skip the software pool and ask a
//! [`HwFrameAllocator`] for surfaces instead. [`FixedHwFramePool`] models
//! the common case of a device pool with a fixed surface count.

use crate::error::{Error, Result};
use crate::frame::Frame;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Source of hardware-backed frames.
pub trait HwFrameAllocator: Send + Sync + fmt::Debug {
    /// Attach a surface to `frame`.
    ///
    /// A fixed-size pool with no free surface must fail with
    /// [`Error::HwPoolExhausted`].
    fn alloc_frame(&self, frame: &mut Frame) -> Result<()>;
}

/// A checked-out hardware surface; returns to its pool on drop.
pub struct HwSurface {
    id: usize,
    free: Arc<Mutex<Vec<usize>>>,
}

impl HwSurface {
    /// Identifier of the surface within its pool.
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Drop for HwSurface {
    fn drop(&mut self) {
        self.free.lock().push(self.id);
    }
}

impl fmt::Debug for HwSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HwSurface").field("id", &self.id).finish()
    }
}

/// Hardware pool with a fixed number of surfaces.
#[derive(Debug)]
pub struct FixedHwFramePool {
    pool_size: usize,
    free: Arc<Mutex<Vec<usize>>>,
}

impl FixedHwFramePool {
    /// Create a pool of `pool_size` surfaces.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            free: Arc::new(Mutex::new((0..pool_size).rev().collect())),
        }
    }

    /// Total number of surfaces.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of surfaces not checked out.
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }
}

impl HwFrameAllocator for FixedHwFramePool {
    fn alloc_frame(&self, frame: &mut Frame) -> Result<()> {
        let id = self.free.lock().pop().ok_or(Error::HwPoolExhausted {
            pool_size: self.pool_size,
        })?;
        trace!(id, "hardware surface checked out");
        frame.set_hw_surface(HwSurface {
            id,
            free: Arc::clone(&self.free),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PixelFormat;

    #[test]
    fn test_fixed_pool_exhaustion() {
        let pool = FixedHwFramePool::new(2);
        let mut a = Frame::video(PixelFormat::Nv12, 64, 64);
        let mut b = Frame::video(PixelFormat::Nv12, 64, 64);
        let mut c = Frame::video(PixelFormat::Nv12, 64, 64);

        pool.alloc_frame(&mut a).unwrap();
        pool.alloc_frame(&mut b).unwrap();
        assert_eq!(a.hw_surface().unwrap().id(), 0);
        assert_eq!(b.hw_surface().unwrap().id(), 1);

        let err = pool.alloc_frame(&mut c).unwrap_err();
        assert_eq!(err, Error::HwPoolExhausted { pool_size: 2 });

        a.unref();
        assert_eq!(pool.available(), 1);
        pool.alloc_frame(&mut c).unwrap();
        assert!(c.is_populated());
    }
}
