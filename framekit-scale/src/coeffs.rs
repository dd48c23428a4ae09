//! Fixed-point resampling filter coefficients.
//!
//! For every destination sample a filter names the first source sample it
//! reads and `filter_size` integer weights summing exactly to the fixed-point
//! unit. Windows that would reach outside the source are folded onto the edge
//! samples, so every window lies inside `[0, src_size)`.

use framekit_core::alloc::{AllocKind, Allocation, Allocator};
use framekit_core::{Error, Result};
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

/// Fixed-point unit of horizontal filter coefficients.
pub const H_FILTER_ONE: i32 = 1 << 14;

/// Fixed-point unit of vertical filter coefficients.
pub const V_FILTER_ONE: i32 = 1 << 12;

/// Resampling kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleAlgorithm {
    /// Nearest neighbour.
    Point,
    /// Linear interpolation.
    Bilinear,
    /// Cubic convolution (Keys, a = -0.5).
    #[default]
    Bicubic,
    /// Lanczos with three lobes.
    Lanczos,
}

impl ScaleAlgorithm {
    /// Kernel support radius in source samples at unit scale.
    pub fn radius(&self) -> f64 {
        match self {
            Self::Point => 0.5,
            Self::Bilinear => 1.0,
            Self::Bicubic => 2.0,
            Self::Lanczos => 3.0,
        }
    }

    /// Kernel weight at distance `x`.
    pub fn weight(&self, x: f64) -> f64 {
        let ax = x.abs();
        match self {
            Self::Point => {
                if ax <= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Bilinear => (1.0 - ax).max(0.0),
            Self::Bicubic => {
                const A: f64 = -0.5;
                if ax < 1.0 {
                    ((A + 2.0) * ax - (A + 3.0)) * ax * ax + 1.0
                } else if ax < 2.0 {
                    ((A * ax - 5.0 * A) * ax + 8.0 * A) * ax - 4.0 * A
                } else {
                    0.0
                }
            }
            Self::Lanczos => {
                if ax < 1e-10 {
                    1.0
                } else if ax < 3.0 {
                    let px = PI * x;
                    3.0 * px.sin() * (px / 3.0).sin() / (px * px)
                } else {
                    0.0
                }
            }
        }
    }
}

impl fmt::Display for ScaleAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => write!(f, "point"),
            Self::Bilinear => write!(f, "bilinear"),
            Self::Bicubic => write!(f, "bicubic"),
            Self::Lanczos => write!(f, "lanczos"),
        }
    }
}

/// Per-destination filter windows for one axis.
pub struct FilterCoefficients {
    filter_size: usize,
    positions: Vec<i32>,
    coeffs: Vec<i32>,
    _allocation: Allocation,
}

impl FilterCoefficients {
    /// Build a filter mapping `src_size` samples onto `dst_size` samples.
    ///
    /// Coefficients of each window sum to `one`. Equal sizes give a one-tap
    /// identity filter regardless of `algorithm`.
    pub fn build(
        src_size: u32,
        dst_size: u32,
        algorithm: ScaleAlgorithm,
        one: i32,
        allocator: &Arc<dyn Allocator>,
    ) -> Result<Self> {
        if src_size == 0 || dst_size == 0 {
            return Err(Error::invalid_param(format!(
                "cannot build a {} -> {} filter",
                src_size, dst_size
            )));
        }

        let dst = dst_size as usize;
        let src = src_size as usize;
        let scale = src_size as f64 / dst_size as f64;
        let filter_size = if src_size == dst_size || algorithm == ScaleAlgorithm::Point {
            1
        } else {
            let support = 2.0 * algorithm.radius() * scale.max(1.0);
            (support.ceil() as usize).clamp(1, src)
        };

        let bytes = dst * (filter_size + 1) * std::mem::size_of::<i32>();
        let allocation = Allocation::new(allocator, AllocKind::Filter, bytes)?;

        let mut positions = Vec::with_capacity(dst);
        let mut coeffs = Vec::with_capacity(dst * filter_size);
        let mut window = vec![0i32; filter_size];

        for i in 0..dst {
            let center = (i as f64 + 0.5) * scale - 0.5;
            let mut pos = if filter_size == 1 {
                if src_size == dst_size {
                    i as i64
                } else {
                    (center + 0.5).floor() as i64
                }
            } else {
                (center - filter_size as f64 / 2.0 + 1.0).floor() as i64
            };

            if filter_size == 1 {
                window[0] = one;
                pos = pos.clamp(0, src as i64 - 1);
            } else {
                Self::fill_window(&mut window, pos, center, scale.max(1.0), algorithm, one);
                pos = Self::fold_edges(&mut window, pos, src as i64);
            }

            positions.push(pos as i32);
            coeffs.extend_from_slice(&window);
        }

        Ok(Self {
            filter_size,
            positions,
            coeffs,
            _allocation: allocation,
        })
    }

    fn fill_window(
        window: &mut [i32],
        pos: i64,
        center: f64,
        stretch: f64,
        algorithm: ScaleAlgorithm,
        one: i32,
    ) {
        let weights: Vec<f64> = (0..window.len())
            .map(|k| algorithm.weight(((pos + k as i64) as f64 - center) / stretch))
            .collect();
        let sum: f64 = weights.iter().sum();

        if sum.abs() < 1e-12 {
            // Degenerate kernel: take the sample nearest the center.
            window.fill(0);
            let nearest = ((center - pos as f64).round().max(0.0) as usize).min(window.len() - 1);
            window[nearest] = one;
            return;
        }

        for (coeff, weight) in window.iter_mut().zip(&weights) {
            *coeff = (weight / sum * one as f64).round() as i32;
        }

        let error = one - window.iter().sum::<i32>();
        if error != 0 {
            let largest = window
                .iter()
                .enumerate()
                .max_by_key(|(_, c)| c.abs())
                .map(|(k, _)| k)
                .unwrap_or(0);
            window[largest] += error;
        }
    }

    /// Move taps lying outside `[0, src_size)` onto the edge samples.
    fn fold_edges(window: &mut [i32], mut pos: i64, src_size: i64) -> i64 {
        let size = window.len();
        while pos < 0 {
            window[1] += window[0];
            window.copy_within(1.., 0);
            window[size - 1] = 0;
            pos += 1;
        }
        while pos + size as i64 > src_size {
            window[size - 2] += window[size - 1];
            window.copy_within(..size - 1, 1);
            window[0] = 0;
            pos -= 1;
        }
        pos
    }

    /// Number of taps per window.
    pub fn filter_size(&self) -> usize {
        self.filter_size
    }

    /// Number of destination samples.
    pub fn dst_size(&self) -> usize {
        self.positions.len()
    }

    /// First source sample read for every destination sample.
    pub fn positions(&self) -> &[i32] {
        &self.positions
    }

    /// First source sample read for destination sample `i`.
    pub fn position(&self, i: usize) -> i32 {
        self.positions[i]
    }

    /// Coefficients of destination sample `i`.
    pub fn taps(&self, i: usize) -> &[i32] {
        &self.coeffs[i * self.filter_size..(i + 1) * self.filter_size]
    }

    /// Check if the filter copies its input unchanged.
    pub fn is_identity(&self) -> bool {
        self.filter_size == 1
            && self
                .positions
                .iter()
                .enumerate()
                .all(|(i, &pos)| pos as usize == i)
    }
}

impl fmt::Debug for FilterCoefficients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterCoefficients")
            .field("filter_size", &self.filter_size)
            .field("dst_size", &self.positions.len())
            .finish()
    }
}
