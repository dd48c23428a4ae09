//! Reference-counted, pooled data blocks.
//!
//! A [`BufferPool`] hands out fixed-size blocks as [`BufferRef`] handles.
//! When the last handle to a block is dropped the block goes back to the
//! pool's free list, or is freed if the pool has since been retired.
//! Handles never depend on the pool handle that created them staying alive.

use crate::alloc::{AlignedBlock, AllocKind, Allocation, Allocator};
use crate::error::Result;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

struct FreeList {
    blocks: Vec<AlignedBlock>,
    retired: bool,
}

struct PoolInner {
    size: usize,
    alignment: usize,
    allocator: Arc<dyn Allocator>,
    free: Mutex<FreeList>,
    total_allocated: AtomicUsize,
    in_use: AtomicUsize,
    _header: Allocation,
}

impl PoolInner {
    fn recycle(&self, block: AlignedBlock) {
        self.in_use.fetch_sub(1, Ordering::AcqRel);
        let mut free = self.free.lock();
        if free.retired {
            drop(free);
            drop(block);
        } else {
            free.blocks.push(block);
        }
    }
}

/// A pool of equally sized, aligned blocks.
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Create a pool of `size`-byte blocks aligned to `alignment`.
    ///
    /// No block is allocated until the first [`get`](Self::get).
    pub fn new(size: usize, alignment: usize, allocator: Arc<dyn Allocator>) -> Result<Self> {
        let header = Allocation::new(&allocator, AllocKind::Pool, std::mem::size_of::<PoolInner>())?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                size,
                alignment,
                allocator,
                free: Mutex::new(FreeList {
                    blocks: Vec::new(),
                    retired: false,
                }),
                total_allocated: AtomicUsize::new(0),
                in_use: AtomicUsize::new(0),
                _header: header,
            }),
        })
    }

    /// Check out a block, reusing a free one when possible.
    pub fn get(&self) -> Result<BufferRef> {
        let reused = self.inner.free.lock().blocks.pop();
        let block = match reused {
            Some(block) => block,
            None => {
                let block = AlignedBlock::new(
                    &self.inner.allocator,
                    AllocKind::Block,
                    self.inner.size,
                    self.inner.alignment,
                )?;
                self.inner.total_allocated.fetch_add(1, Ordering::Relaxed);
                block
            }
        };
        self.inner.in_use.fetch_add(1, Ordering::AcqRel);
        trace!(size = self.inner.size, "buffer checked out");

        Ok(BufferRef {
            block: Arc::new(PooledBlock {
                block: Some(block),
                pool: Arc::clone(&self.inner),
            }),
        })
    }

    /// Size of every block in bytes.
    pub fn block_size(&self) -> usize {
        self.inner.size
    }

    /// Number of blocks waiting on the free list.
    pub fn available(&self) -> usize {
        self.inner.free.lock().blocks.len()
    }

    /// Number of blocks currently checked out.
    pub fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }

    /// Number of blocks allocated over the pool's lifetime.
    pub fn total_allocated(&self) -> usize {
        self.inner.total_allocated.load(Ordering::Relaxed)
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        let blocks = {
            let mut free = self.inner.free.lock();
            free.retired = true;
            std::mem::take(&mut free.blocks)
        };
        drop(blocks);
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("block_size", &self.inner.size)
            .field("alignment", &self.inner.alignment)
            .field("available", &self.available())
            .field("in_use", &self.in_use())
            .finish()
    }
}

struct PooledBlock {
    block: Option<AlignedBlock>,
    pool: Arc<PoolInner>,
}

impl Drop for PooledBlock {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            self.pool.recycle(block);
        }
    }
}

/// Shared handle to a pooled block.
#[derive(Clone)]
pub struct BufferRef {
    block: Arc<PooledBlock>,
}

impl BufferRef {
    /// Get the block contents.
    pub fn data(&self) -> &[u8] {
        self.block
            .block
            .as_ref()
            .map(AlignedBlock::as_slice)
            .unwrap_or(&[])
    }

    /// Get mutable access to the contents, if this is the only handle.
    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        Arc::get_mut(&mut self.block)
            .and_then(|pooled| pooled.block.as_mut())
            .map(AlignedBlock::as_mut_slice)
    }

    /// Check if no other handle shares this block.
    pub fn is_writable(&self) -> bool {
        Arc::strong_count(&self.block) == 1
    }

    /// Number of handles sharing this block.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.block)
    }

    /// Size of the block in bytes.
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Check if the block is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for BufferRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferRef")
            .field("len", &self.len())
            .field("refs", &self.ref_count())
            .finish()
    }
}
