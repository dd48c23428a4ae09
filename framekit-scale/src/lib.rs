//! # Framekit Scale
//!
//! Slice-based image scaling and pixel format conversion.
//!
//! This crate provides:
//! - Fixed-point filter coefficients for several kernels
//! - Slice buffers, windows of lines over caller or owned memory
//! - A chain of filter stages driven one source slice at a time
//! - Frame-level filters and a registry of named filters
//!
//! ## Example
//!
//! ```
//! use framekit_core::PixelFormat;
//! use framekit_scale::{PlaneRefs, PlaneRefsMut, ScaleConfig, ScaleContext};
//!
//! let mut ctx = ScaleContext::new(ScaleConfig::new(
//!     4, 4, PixelFormat::Gray8,
//!     2, 2, PixelFormat::Gray8,
//! ))?;
//! let src = [100u8; 16];
//! let mut dst = [0u8; 4];
//! let rows = ctx.scale(
//!     &PlaneRefs::from_slices([(&src[..], 4)]),
//!     &mut PlaneRefsMut::from_slices([(&mut dst[..], 2)]),
//! )?;
//! assert_eq!(rows, 2);
//! assert_eq!(dst, [100; 4]);
//! # Ok::<(), framekit_scale::ScaleError>(())
//! ```

pub mod coeffs;
pub mod context;
pub mod error;
pub mod filter;
pub mod registry;
pub mod slice;
pub mod stage;

pub use coeffs::{FilterCoefficients, ScaleAlgorithm};
pub use context::{min_buffer_size, ScaleConfig, ScaleContext, MAX_LINES_AHEAD};
pub use error::{Result, ScaleError};
pub use filter::{Filter, FilterChain, NullFilter, ScaleFilter, VideoFilter};
pub use registry::{FilterArgs, FilterRegistry};
pub use slice::{PlaneRefs, PlaneRefsMut, SliceBinding, SliceBuffer};
pub use stage::{FilterStage, FrameIo};
