//! Allocation accounting.
//!
//! Every long-lived allocation made by the pool and the scaler is first
//! admitted by an [`Allocator`] and then held by an [`Allocation`] guard.
//! Dropping the guard reports the release, so whatever a failed call built
//! is unwound simply by dropping it.

use crate::error::{Error, Result};
use aligned_vec::{AVec, RuntimeAlign};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// What an allocation is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocKind {
    /// A sub-pool header.
    Pool,
    /// A pooled data block.
    Block,
    /// A per-plane line table of a slice buffer.
    LineTable,
    /// Physical storage for slice buffer lines.
    Line,
    /// Filter coefficient tables.
    Filter,
    /// Per-stage instance data of a scaler chain.
    Stage,
    /// Side table for frames with more planes than fit inline.
    ExtendedTable,
}

impl AllocKind {
    /// Every kind, in index order.
    pub const ALL: [AllocKind; 7] = [
        Self::Pool,
        Self::Block,
        Self::LineTable,
        Self::Line,
        Self::Filter,
        Self::Stage,
        Self::ExtendedTable,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Short name used in errors and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pool => "sub-pool",
            Self::Block => "pool block",
            Self::LineTable => "line table",
            Self::Line => "slice line",
            Self::Filter => "filter coefficients",
            Self::Stage => "filter stage",
            Self::ExtendedTable => "extended plane table",
        }
    }
}

impl fmt::Display for AllocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Admission control for allocations.
pub trait Allocator: Send + Sync + fmt::Debug {
    /// Admit an allocation of `bytes` bytes, or refuse it.
    fn reserve(&self, kind: AllocKind, bytes: usize) -> Result<()>;

    /// Report that a previously admitted allocation was freed.
    fn release(&self, kind: AllocKind, bytes: usize);
}

/// Allocator that admits everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn reserve(&self, _kind: AllocKind, _bytes: usize) -> Result<()> {
        Ok(())
    }

    fn release(&self, _kind: AllocKind, _bytes: usize) {}
}

/// The allocator used when none is configured.
pub fn default_allocator() -> Arc<dyn Allocator> {
    Arc::new(SystemAllocator)
}

/// Guard for an admitted allocation; releases it on drop.
pub struct Allocation {
    allocator: Arc<dyn Allocator>,
    kind: AllocKind,
    bytes: usize,
}

impl Allocation {
    /// Ask `allocator` to admit an allocation.
    pub fn new(allocator: &Arc<dyn Allocator>, kind: AllocKind, bytes: usize) -> Result<Self> {
        allocator.reserve(kind, bytes)?;
        Ok(Self {
            allocator: Arc::clone(allocator),
            kind,
            bytes,
        })
    }

    /// Kind of the allocation.
    pub fn kind(&self) -> AllocKind {
        self.kind
    }

    /// Size of the allocation in bytes.
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        self.allocator.release(self.kind, self.bytes);
    }
}

impl fmt::Debug for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocation")
            .field("kind", &self.kind)
            .field("bytes", &self.bytes)
            .finish()
    }
}

/// A zero-initialised, aligned byte buffer whose lifetime is accounted.
pub struct AlignedBlock {
    data: AVec<u8, RuntimeAlign>,
    _allocation: Allocation,
}

impl AlignedBlock {
    /// Allocate `size` bytes aligned to `alignment`.
    pub fn new(
        allocator: &Arc<dyn Allocator>,
        kind: AllocKind,
        size: usize,
        alignment: usize,
    ) -> Result<Self> {
        if !alignment.is_power_of_two() {
            return Err(Error::invalid_param(format!(
                "alignment {} is not a power of two",
                alignment
            )));
        }
        let allocation = Allocation::new(allocator, kind, size)?;
        let mut data = AVec::with_capacity(alignment, size);
        data.resize(size, 0u8);
        Ok(Self {
            data,
            _allocation: allocation,
        })
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the block is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the data as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get the data as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl fmt::Debug for AlignedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBlock")
            .field("len", &self.data.len())
            .field("ptr", &self.data.as_ptr())
            .finish()
    }
}

#[derive(Debug, Default)]
struct Counters {
    live: [usize; AllocKind::ALL.len()],
    live_bytes: [usize; AllocKind::ALL.len()],
    reserved: [usize; AllocKind::ALL.len()],
    seen: usize,
    seen_matching: usize,
    fail: Option<(Option<AllocKind>, usize)>,
}

/// Allocator that counts admissions and can refuse a chosen one.
///
/// Used by tests to check that failed operations leave nothing behind.
#[derive(Debug, Default)]
pub struct CountingAllocator {
    counters: Mutex<Counters>,
}

impl CountingAllocator {
    /// Create an allocator that admits everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the `nth` reservation (1-based) of any kind.
    pub fn fail_nth(&self, nth: usize) {
        let mut c = self.counters.lock();
        c.fail = Some((None, nth));
        c.seen_matching = 0;
    }

    /// Refuse the `nth` reservation (1-based) of `kind`.
    pub fn fail_nth_of(&self, kind: AllocKind, nth: usize) {
        let mut c = self.counters.lock();
        c.fail = Some((Some(kind), nth));
        c.seen_matching = 0;
    }

    /// Stop injecting failures.
    pub fn clear_failure(&self) {
        self.counters.lock().fail = None;
    }

    /// Allocations of `kind` currently alive.
    pub fn live(&self, kind: AllocKind) -> usize {
        self.counters.lock().live[kind.index()]
    }

    /// Bytes of `kind` currently alive.
    pub fn live_bytes(&self, kind: AllocKind) -> usize {
        self.counters.lock().live_bytes[kind.index()]
    }

    /// Allocations of every kind currently alive.
    pub fn live_total(&self) -> usize {
        self.counters.lock().live.iter().sum()
    }

    /// Successful reservations of `kind` so far.
    pub fn reserved(&self, kind: AllocKind) -> usize {
        self.counters.lock().reserved[kind.index()]
    }

    /// Reservations attempted so far, refused ones included.
    pub fn attempts(&self) -> usize {
        self.counters.lock().seen
    }
}

impl Allocator for CountingAllocator {
    fn reserve(&self, kind: AllocKind, bytes: usize) -> Result<()> {
        let mut c = self.counters.lock();
        c.seen += 1;
        if let Some((filter, nth)) = c.fail {
            if filter.map_or(true, |k| k == kind) {
                c.seen_matching += 1;
                if c.seen_matching == nth {
                    return Err(Error::oom(kind.name(), bytes));
                }
            }
        }
        c.live[kind.index()] += 1;
        c.live_bytes[kind.index()] += bytes;
        c.reserved[kind.index()] += 1;
        Ok(())
    }

    fn release(&self, kind: AllocKind, bytes: usize) {
        let mut c = self.counters.lock();
        c.live[kind.index()] -= 1;
        c.live_bytes[kind.index()] -= bytes;
    }
}
