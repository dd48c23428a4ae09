//! # Framekit Core
//!
//! Pooled, reference-counted frame memory for video and audio pipelines.
//!
//! This crate provides:
//! - Error handling types
//! - Pixel and sample format descriptors
//! - Plane layout and alignment helpers
//! - Allocation accounting and aligned blocks
//! - Buffer pools and per-context frame pools
//! - Frame acquisition, including hardware-backed contexts

pub mod align;
pub mod alloc;
pub mod buffer;
pub mod context;
pub mod error;
pub mod format;
pub mod frame;
pub mod hw;
pub mod layout;
pub mod pool;
pub mod sample;

pub use align::{align_up, STRIDE_ALIGN};
pub use alloc::{AlignedBlock, AllocKind, Allocation, Allocator, CountingAllocator, SystemAllocator};
pub use buffer::{BufferPool, BufferRef};
pub use context::{FrameContext, PoolConfig};
pub use error::{Error, Result};
pub use format::{MediaKind, PixFmtDescriptor, PixFmtFlags, PixelFormat};
pub use frame::{Frame, FrameFormat, NUM_DATA_POINTERS};
pub use hw::{FixedHwFramePool, HwFrameAllocator, HwSurface};
pub use pool::{FramePool, PoolGeometry, MAX_ALIGN_ATTEMPTS};
pub use sample::{ChannelLayout, SampleFormat};
