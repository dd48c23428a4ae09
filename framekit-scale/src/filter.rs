//! Frame-level filters built on the scaler.

use crate::coeffs::ScaleAlgorithm;
use crate::context::{ScaleConfig, ScaleContext};
use crate::error::{Result, ScaleError};
use framekit_core::{Frame, FrameContext, MediaKind, PixelFormat, PoolConfig};
use tracing::debug;

/// Base filter trait.
pub trait Filter: Send {
    /// Get filter name.
    fn name(&self) -> &str;

    /// Check if filter is enabled.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Video filter trait.
pub trait VideoFilter: Filter {
    /// Process a video frame.
    fn process(&mut self, frame: Frame) -> Result<Frame>;

    /// Flush any buffered frames.
    fn flush(&mut self) -> Result<Vec<Frame>> {
        Ok(Vec::new())
    }
}

/// Chain of filters.
pub struct FilterChain<F: ?Sized> {
    filters: Vec<Box<F>>,
}

impl<F: ?Sized> Default for FilterChain<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> FilterChain<F> {
    /// Create a new empty filter chain.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the chain.
    pub fn add(&mut self, filter: Box<F>) {
        self.filters.push(filter);
    }

    /// Get number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if chain is empty.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl FilterChain<dyn VideoFilter> {
    /// Process a video frame through all filters.
    pub fn process(&mut self, mut frame: Frame) -> Result<Frame> {
        for filter in &mut self.filters {
            if filter.is_enabled() {
                frame = filter.process(frame)?;
            }
        }
        Ok(frame)
    }

    /// Flush all filters.
    pub fn flush(&mut self) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        for filter in &mut self.filters {
            frames.extend(filter.flush()?);
        }
        Ok(frames)
    }
}

/// Pass-through video filter.
#[derive(Debug, Default)]
pub struct NullFilter;

impl NullFilter {
    /// Create a new null filter.
    pub fn new() -> Self {
        Self
    }
}

impl Filter for NullFilter {
    fn name(&self) -> &str {
        "null"
    }
}

impl VideoFilter for NullFilter {
    fn process(&mut self, frame: Frame) -> Result<Frame> {
        Ok(frame)
    }
}

/// Resizes and converts frames, drawing output frames from a pool.
///
/// The scaler is rebuilt whenever the input geometry or format changes;
/// output frames come from a [`FrameContext`], so frames dropped by the
/// consumer are recycled for later output.
pub struct ScaleFilter {
    name: String,
    target_width: u32,
    target_height: u32,
    target_format: Option<PixelFormat>,
    algorithm: ScaleAlgorithm,
    frames: FrameContext,
    scaler: Option<ScaleContext>,
    enabled: bool,
}

impl ScaleFilter {
    /// Create a scale filter keeping the input pixel format.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_pool(width, height, PoolConfig::default())
    }

    /// Create a scale filter drawing frames from a pool configured by `pool`.
    pub fn with_pool(width: u32, height: u32, pool: PoolConfig) -> Result<Self> {
        Ok(Self {
            name: format!("scale_{}x{}", width, height),
            target_width: width,
            target_height: height,
            target_format: None,
            algorithm: ScaleAlgorithm::default(),
            frames: FrameContext::new(MediaKind::Video, pool)?,
            scaler: None,
            enabled: true,
        })
    }

    /// Convert output frames to `format`.
    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.target_format = Some(format);
        self
    }

    /// Set the resampling kernel.
    pub fn with_algorithm(mut self, algorithm: ScaleAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Enable or disable the filter.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Frame source of the output frames.
    pub fn frame_context(&self) -> &FrameContext {
        &self.frames
    }

    fn scaler_for(&mut self, src_format: PixelFormat, width: u32, height: u32) -> Result<&mut ScaleContext> {
        let dst_format = self.target_format.unwrap_or(src_format);
        let stale = self.scaler.as_ref().map_or(true, |s| {
            let c = s.config();
            c.src_format != src_format
                || c.src_width != width
                || c.src_height != height
                || c.dst_format != dst_format
        });
        if stale {
            // Release the old chain before building its replacement.
            self.scaler = None;
            debug!(
                "Rebuilding scaler for {}x{} {} input",
                width, height, src_format
            );
            let config = ScaleConfig::new(
                width,
                height,
                src_format,
                self.target_width,
                self.target_height,
                dst_format,
            )
            .with_algorithm(self.algorithm);
            self.scaler = Some(ScaleContext::new(config)?);
        }
        self.scaler
            .as_mut()
            .ok_or_else(|| ScaleError::InvalidConfig("scaler unavailable".into()))
    }
}

impl Filter for ScaleFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl VideoFilter for ScaleFilter {
    fn process(&mut self, frame: Frame) -> Result<Frame> {
        let src_format = frame
            .pixel_format()
            .ok_or_else(|| ScaleError::InvalidConfig("scale filter needs a video frame".into()))?;
        let dst_format = self.target_format.unwrap_or(src_format);
        if frame.width == self.target_width
            && frame.height == self.target_height
            && src_format == dst_format
        {
            return Ok(frame);
        }

        let mut scaled = Frame::video(dst_format, self.target_width, self.target_height);
        self.frames.get_buffer(&mut scaled)?;
        self.scaler_for(src_format, frame.width, frame.height)?
            .scale_frame(&frame, &mut scaled)?;
        Ok(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_frame(ctx: &mut FrameContext, width: u32, height: u32, value: u8) -> Frame {
        let mut frame = Frame::video(PixelFormat::Gray8, width, height);
        ctx.get_buffer(&mut frame).unwrap();
        frame.plane_mut(0).unwrap().fill(value);
        frame
    }

    #[test]
    fn test_null_filter() {
        let mut filter = NullFilter::new();
        let frame = Frame::video(PixelFormat::Yuv420p, 4, 4);
        let out = filter.process(frame).unwrap();
        assert_eq!(out.width, 4);
        assert_eq!(filter.name(), "null");
    }

    #[test]
    fn test_scale_filter_resizes() {
        let mut source = FrameContext::new(MediaKind::Video, PoolConfig::default()).unwrap();
        let frame = gray_frame(&mut source, 32, 16, 77);

        let mut filter = ScaleFilter::new(16, 8).unwrap();
        assert_eq!(filter.name(), "scale_16x8");
        let out = filter.process(frame).unwrap();
        assert_eq!((out.width, out.height), (16, 8));
        let stride = out.linesize(0);
        let plane = out.plane(0).unwrap();
        for y in 0..8 {
            assert!(plane[y * stride..y * stride + 16].iter().all(|&v| v == 77));
        }
    }

    #[test]
    fn test_scale_filter_converts_format() {
        let mut source = FrameContext::new(MediaKind::Video, PoolConfig::default()).unwrap();
        let frame = gray_frame(&mut source, 16, 16, 200);

        let mut filter = ScaleFilter::new(16, 16)
            .unwrap()
            .with_format(PixelFormat::Yuv420p);
        let out = filter.process(frame).unwrap();
        assert_eq!(out.pixel_format(), Some(PixelFormat::Yuv420p));
        assert_eq!(out.plane(0).unwrap()[0], 200);
        assert_eq!(out.plane(1).unwrap()[0], 128);
        assert_eq!(out.plane(2).unwrap()[0], 128);
    }

    #[test]
    fn test_matching_frame_passes_through() {
        let mut source = FrameContext::new(MediaKind::Video, PoolConfig::default()).unwrap();
        let frame = gray_frame(&mut source, 8, 8, 1);
        let mut filter = ScaleFilter::new(8, 8).unwrap();
        let out = filter.process(frame).unwrap();
        assert!(filter.frame_context().pool().is_none());
        assert_eq!(out.plane(0).unwrap()[0], 1);
    }

    #[test]
    fn test_chain_runs_in_order() {
        let mut source = FrameContext::new(MediaKind::Video, PoolConfig::default()).unwrap();
        let frame = gray_frame(&mut source, 32, 32, 10);

        let mut chain: FilterChain<dyn VideoFilter> = FilterChain::new();
        chain.add(Box::new(NullFilter::new()));
        chain.add(Box::new(ScaleFilter::new(16, 16).unwrap()));
        let mut disabled = ScaleFilter::new(4, 4).unwrap();
        disabled.set_enabled(false);
        chain.add(Box::new(disabled));
        assert_eq!(chain.len(), 3);

        let out = chain.process(frame).unwrap();
        assert_eq!((out.width, out.height), (16, 16));
        assert!(chain.flush().unwrap().is_empty());
    }

    #[test]
    fn test_non_video_frame_rejected() {
        let mut filter = ScaleFilter::new(8, 8).unwrap();
        assert!(matches!(
            filter.process(Frame::new()),
            Err(ScaleError::InvalidConfig(_))
        ));
    }
}
