//! Scaler setup and the slice-driven conversion loop.
//!
//! A [`ScaleContext`] owns a chain of slice buffers and filter stages built
//! once for a fixed source and destination geometry. Source rows may arrive
//! in slices, top to bottom; every call emits all output rows the rows seen
//! so far allow, keeping partially consumed input in a ring of horizontally
//! scaled lines.

use crate::coeffs::{FilterCoefficients, ScaleAlgorithm, H_FILTER_ONE, V_FILTER_ONE};
use crate::error::{Result, ScaleError};
use crate::slice::{AccumDepth, PlaneLayout, PlaneRefs, PlaneRefsMut, SliceBinding, SliceBuffer};
use crate::stage::{
    ChromaConvert, ChromaHScale, ChromaVScale, ConvertInput, ConvertOutput, FilterStage, FrameIo,
    GammaDecode, GammaEncode, LumaConvert, LumaHScale, LumaVScale, NoChromaScale, PlaneClass,
};
use framekit_core::alloc::{default_allocator, Allocator};
use framekit_core::format::ceil_rshift;
use framekit_core::layout::check_image_size;
use framekit_core::{align_up, Error as CoreError, Frame, PixelFormat};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Extra horizontally scaled lines kept beyond the vertical filter size.
pub const MAX_LINES_AHEAD: usize = 4;

/// Geometry and options of a scaler.
#[derive(Debug, Clone)]
pub struct ScaleConfig {
    /// Source width in pixels.
    pub src_width: u32,
    /// Source height in pixels.
    pub src_height: u32,
    /// Source pixel format.
    pub src_format: PixelFormat,
    /// Destination width in pixels.
    pub dst_width: u32,
    /// Destination height in pixels.
    pub dst_height: u32,
    /// Destination pixel format.
    pub dst_format: PixelFormat,
    /// Resampling kernel.
    pub algorithm: ScaleAlgorithm,
    /// Scale in linear light using this transfer exponent.
    pub gamma: Option<f64>,
    /// Allocator charged for every buffer of the chain.
    pub allocator: Arc<dyn Allocator>,
}

impl ScaleConfig {
    /// Create a configuration with the default kernel.
    pub fn new(
        src_width: u32,
        src_height: u32,
        src_format: PixelFormat,
        dst_width: u32,
        dst_height: u32,
        dst_format: PixelFormat,
    ) -> Self {
        Self {
            src_width,
            src_height,
            src_format,
            dst_width,
            dst_height,
            dst_format,
            algorithm: ScaleAlgorithm::default(),
            gamma: None,
            allocator: default_allocator(),
        }
    }

    /// Set the resampling kernel.
    pub fn with_algorithm(mut self, algorithm: ScaleAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Scale in linear light.
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    /// Set the allocator.
    pub fn with_allocator(mut self, allocator: Arc<dyn Allocator>) -> Self {
        self.allocator = allocator;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        check_image_size(self.src_width, self.src_height)?;
        check_image_size(self.dst_width, self.dst_height)?;

        let (src, dst) = (self.src_format, self.dst_format);
        if src.descriptor().depth != 8 {
            return Err(ScaleError::Unsupported(format!("input format {}", src)));
        }
        if !matches!(
            dst,
            PixelFormat::Gray8
                | PixelFormat::Yuv420p
                | PixelFormat::Yuv422p
                | PixelFormat::Yuv444p
                | PixelFormat::Yuv440p
                | PixelFormat::Yuv411p
                | PixelFormat::Yuva420p
                | PixelFormat::Gbrp
        ) {
            return Err(ScaleError::Unsupported(format!("output format {}", dst)));
        }
        if dst == PixelFormat::Gbrp && !src.is_rgb() {
            return Err(ScaleError::Unsupported(format!("{} -> {}", src, dst)));
        }

        if let Some(gamma) = self.gamma {
            if !gamma.is_finite() || gamma <= 0.0 {
                return Err(ScaleError::InvalidConfig(format!("gamma {} out of range", gamma)));
            }
            if !src.is_rgb() || dst != PixelFormat::Gbrp {
                return Err(ScaleError::Unsupported(format!(
                    "gamma-correct {} -> {}",
                    src, dst
                )));
            }
        }
        Ok(())
    }
}

/// Chroma subsampling shifts the scaler works with; RGB and gray have none.
fn chroma_shift(format: PixelFormat) -> (u32, u32) {
    if format.is_rgb() || format.is_gray() {
        (0, 0)
    } else {
        let desc = format.descriptor();
        (desc.log2_chroma_w, desc.log2_chroma_h)
    }
}

/// Minimum horizontally scaled lines needed to produce any output row.
///
/// `lum_pos` and `chr_pos` are the first input rows of every output luma
/// and chroma row. Output chroma row `y >> dst_v_sub` is produced together
/// with luma rows `y` and `y | mask`, so their whole window must fit, as
/// must the luma rows a source slice covers up to the next chroma row
/// boundary of the source. The scaler holds at least the larger of the
/// returned sizes and filter size plus [`MAX_LINES_AHEAD`].
pub fn min_buffer_size(
    lum_pos: &[i32],
    lum_size: usize,
    chr_pos: &[i32],
    chr_size: usize,
    src_v_sub: u32,
    dst_v_sub: u32,
) -> (usize, usize) {
    let mut lum = lum_size as i64;
    let mut chr = chr_size as i64;
    let mask = (1usize << dst_v_sub) - 1;

    for (y, &lp) in lum_pos.iter().enumerate() {
        let Some(&cp) = chr_pos.get(y >> dst_v_sub) else {
            continue;
        };
        let last_row = (y | mask).min(lum_pos.len() - 1);
        let first = lp as i64;
        let first_chr = cp as i64;
        let last = lum_pos[last_row] as i64 + lum_size as i64 - 1;
        let last_chr = first_chr + chr_size as i64 - 1;

        let mut next = last.max(last_chr << src_v_sub);
        next = (next >> src_v_sub) << src_v_sub;
        lum = lum.max(next - first + 1);
        chr = chr.max((next >> src_v_sub) - first_chr + 1);
    }
    (lum as usize, chr as usize)
}

/// Scaler bound to one source and destination geometry.
pub struct ScaleContext {
    // Stages reference slices by index and are torn down first.
    stages: Vec<Box<dyn FilterStage>>,
    slices: Vec<SliceBuffer>,
    config: ScaleConfig,
    lum_end: usize,
    chr_end: usize,
    hout: usize,
    vout: usize,
    v_lum: Arc<FilterCoefficients>,
    v_chr: Arc<FilterCoefficients>,
    src_v_sub: u32,
    dst_h_sub: u32,
    dst_v_sub: u32,
    chr_src_h: i32,
    chr_dst_h: i32,
    lum_lines: usize,
    chr_lines: usize,
    fill_alpha: bool,
    dst_y: i32,
    last_in_lum_buf: i32,
    last_in_chr_buf: i32,
    next_src_y: u32,
}

impl ScaleContext {
    /// Build the slice buffers and stages for `config`.
    ///
    /// Either the whole chain is built or nothing stays allocated.
    pub fn new(config: ScaleConfig) -> Result<Self> {
        config.validate()?;
        let alloc = Arc::clone(&config.allocator);
        let (src_fmt, dst_fmt) = (config.src_format, config.dst_format);
        let (src_w, src_h) = (config.src_width, config.src_height);
        let (dst_w, dst_h) = (config.dst_width, config.dst_height);
        let (src_h_sub, src_v_sub) = chroma_shift(src_fmt);
        let (dst_h_sub, dst_v_sub) = chroma_shift(dst_fmt);
        let chr_src_w = ceil_rshift(src_w, src_h_sub);
        let chr_src_h = ceil_rshift(src_h, src_v_sub);
        let chr_dst_w = ceil_rshift(dst_w, dst_h_sub);
        let chr_dst_h = ceil_rshift(dst_h, dst_v_sub);
        let algorithm = config.algorithm;

        let h_lum = FilterCoefficients::build(src_w, dst_w, algorithm, H_FILTER_ONE, &alloc)?;
        let h_chr = FilterCoefficients::build(chr_src_w, chr_dst_w, algorithm, H_FILTER_ONE, &alloc)?;
        let v_lum = Arc::new(FilterCoefficients::build(
            src_h,
            dst_h,
            algorithm,
            V_FILTER_ONE,
            &alloc,
        )?);
        let v_chr = Arc::new(FilterCoefficients::build(
            chr_src_h,
            chr_dst_h,
            algorithm,
            V_FILTER_ONE,
            &alloc,
        )?);

        let (lum_lines, chr_lines) = min_buffer_size(
            v_lum.positions(),
            v_lum.filter_size(),
            v_chr.positions(),
            v_chr.filter_size(),
            src_v_sub,
            dst_v_sub,
        );
        let lum_lines = lum_lines.max(v_lum.filter_size() + MAX_LINES_AHEAD);
        let chr_lines = chr_lines.max(v_chr.filter_size() + MAX_LINES_AHEAD);

        let gamma = config.gamma;
        let needs_hcscale = !src_fmt.is_gray() && !dst_fmt.is_gray();
        let need_lum_conv = gamma.is_none()
            && src_fmt.is_rgb()
            && !(src_fmt == PixelFormat::Gbrp && dst_fmt == PixelFormat::Gbrp);
        let need_chr_conv =
            gamma.is_none() && needs_hcscale && (src_fmt.is_semi_planar() || need_lum_conv);
        let need_alpha = src_fmt.has_alpha() && dst_fmt.has_alpha();
        let output = if dst_fmt == PixelFormat::Gbrp {
            ConvertOutput::Gbr
        } else {
            ConvertOutput::Yuv
        };
        let input = || {
            ConvertInput::for_format(src_fmt)
                .ok_or_else(|| ScaleError::Unsupported(format!("conversion from {}", src_fmt)))
        };

        let mut slices = Vec::with_capacity(4);
        slices.push(SliceBuffer::allocate(
            &alloc,
            src_fmt,
            src_h as usize,
            chr_src_h as usize,
            src_h_sub,
            src_v_sub,
            false,
            SliceBinding::Source,
        )?);
        let has_conv = gamma.is_some() || need_lum_conv || need_chr_conv;
        if has_conv {
            let mut conv = SliceBuffer::allocate(
                &alloc,
                src_fmt,
                lum_lines,
                chr_lines,
                src_h_sub,
                src_v_sub,
                false,
                SliceBinding::Owned,
            )?;
            conv.materialize_ring_lines(align_up(src_w as usize * 2 + 78, 16), src_w)?;
            slices.push(conv);
        }

        let dst_stride = align_up(dst_w as usize * 2 + 66, 16);
        let mut hout = SliceBuffer::allocate(
            &alloc,
            dst_fmt,
            lum_lines,
            chr_lines,
            dst_h_sub,
            dst_v_sub,
            true,
            SliceBinding::Owned,
        )?;
        hout.materialize_ring_lines(dst_stride, dst_w)?;
        hout.fill_constant(dst_stride >> 1, AccumDepth::Bits16);
        slices.push(hout);
        slices.push(SliceBuffer::allocate(
            &alloc,
            dst_fmt,
            dst_h as usize,
            chr_dst_h as usize,
            dst_h_sub,
            dst_v_sub,
            false,
            SliceBinding::Destination,
        )?);

        let conv_idx = 1;
        let vout = slices.len() - 1;
        let hout = vout - 1;
        let mut stages: Vec<Box<dyn FilterStage>> = Vec::with_capacity(8);

        let lum_src = if let Some(g) = gamma {
            stages.push(Box::new(GammaDecode::new(
                &alloc,
                0,
                conv_idx,
                PlaneClass::Luma,
                input()?,
                g,
            )?));
            conv_idx
        } else if need_lum_conv {
            stages.push(Box::new(LumaConvert::new(
                &alloc,
                0,
                conv_idx,
                input()?,
                output,
                need_alpha,
            )?));
            conv_idx
        } else {
            0
        };
        stages.push(Box::new(LumaHScale::new(&alloc, lum_src, hout, h_lum, need_alpha)?));
        let lum_end = stages.len();

        if needs_hcscale {
            let chr_src = if let Some(g) = gamma {
                stages.push(Box::new(GammaDecode::new(
                    &alloc,
                    0,
                    conv_idx,
                    PlaneClass::Chroma,
                    input()?,
                    g,
                )?));
                conv_idx
            } else if need_chr_conv {
                stages.push(Box::new(ChromaConvert::new(
                    &alloc,
                    0,
                    conv_idx,
                    input()?,
                    output,
                )?));
                conv_idx
            } else {
                0
            };
            stages.push(Box::new(ChromaHScale::new(&alloc, chr_src, hout, h_chr)?));
        } else {
            stages.push(Box::new(NoChromaScale::new(&alloc, hout)?));
        }
        let chr_end = stages.len();

        stages.push(Box::new(LumaVScale::new(
            &alloc,
            hout,
            vout,
            Arc::clone(&v_lum),
            need_alpha,
            dst_w as usize,
        )?));
        if !dst_fmt.is_gray() {
            stages.push(Box::new(ChromaVScale::new(
                &alloc,
                hout,
                vout,
                Arc::clone(&v_chr),
                chr_dst_w as usize,
            )?));
        }
        if let Some(g) = gamma {
            stages.push(Box::new(GammaEncode::new(&alloc, vout, g)?));
        }

        let names: Vec<_> = stages.iter().map(|s| s.name()).collect();
        debug!(
            "Initialized scaler {}x{} {} -> {}x{} {}, {} luma / {} chroma lines, stages {:?}",
            src_w, src_h, src_fmt, dst_w, dst_h, dst_fmt, lum_lines, chr_lines, names
        );

        Ok(Self {
            stages,
            slices,
            lum_end,
            chr_end,
            hout,
            vout,
            v_lum,
            v_chr,
            src_v_sub,
            dst_h_sub,
            dst_v_sub,
            chr_src_h: chr_src_h as i32,
            chr_dst_h: chr_dst_h as i32,
            lum_lines,
            chr_lines,
            fill_alpha: dst_fmt.has_alpha() && !need_alpha,
            dst_y: 0,
            last_in_lum_buf: -1,
            last_in_chr_buf: -1,
            next_src_y: 0,
            config,
        })
    }

    /// The configuration this context was built for.
    pub fn config(&self) -> &ScaleConfig {
        &self.config
    }

    /// Names of the chain's stages, in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Number of slice buffers in the chain.
    pub fn num_slices(&self) -> usize {
        self.slices.len()
    }

    /// Capacity of the horizontally scaled ring, luma and chroma lines.
    pub fn buffer_lines(&self) -> (usize, usize) {
        (self.lum_lines, self.chr_lines)
    }

    /// Destination rows written so far for the current frame.
    pub fn rows_done(&self) -> u32 {
        self.dst_y as u32
    }

    /// Convert a whole source image.
    pub fn scale(&mut self, src: &PlaneRefs<'_>, dst: &mut PlaneRefsMut<'_>) -> Result<u32> {
        self.scale_slice(src, 0, self.config.src_height, dst)
    }

    /// Convert a whole source frame into a destination frame.
    pub fn scale_frame(&mut self, src: &Frame, dst: &mut Frame) -> Result<()> {
        let expect = |frame: &Frame, format: PixelFormat, width: u32, height: u32, what: &str| {
            if frame.pixel_format() != Some(format) || frame.width != width || frame.height != height {
                return Err(ScaleError::InvalidConfig(format!(
                    "{} frame is not {}x{} {}",
                    what, width, height, format
                )));
            }
            Ok(())
        };
        let c = &self.config;
        expect(src, c.src_format, c.src_width, c.src_height, "source")?;
        expect(dst, c.dst_format, c.dst_width, c.dst_height, "destination")?;
        for plane in 0..c.dst_format.num_planes() {
            if dst.buffer(plane).is_some_and(|buf| !buf.is_writable()) {
                return Err(CoreError::invalid_state(format!(
                    "destination plane {} is shared",
                    plane
                ))
                .into());
            }
        }

        let src_refs = PlaneRefs::from_frame(src);
        let mut dst_refs = PlaneRefsMut::from_frame(dst);
        self.scale(&src_refs, &mut dst_refs).map(|_| ())
    }

    /// Convert `src_slice_h` source rows starting at `src_slice_y`.
    ///
    /// `src` holds the slice's rows only, its first row being
    /// `src_slice_y`; `dst` holds the whole destination image. Slices must
    /// arrive in order, a slice at row 0 starting a new frame. Returns the
    /// number of destination rows written by this call.
    pub fn scale_slice(
        &mut self,
        src: &PlaneRefs<'_>,
        src_slice_y: u32,
        src_slice_h: u32,
        dst: &mut PlaneRefsMut<'_>,
    ) -> Result<u32> {
        self.check_slice(src_slice_y, src_slice_h)?;
        let src_layout = self.check_source(src, src_slice_y, src_slice_h)?;
        let dst_layout = self.check_destination(dst)?;

        let src_w = self.config.src_width;
        let src_h = self.config.src_height as i32;
        let dst_w = self.config.dst_width;
        let dst_h = self.config.dst_height as i32;
        let slice_y = src_slice_y as i32;
        let slice_h = src_slice_h as i32;
        let slice_end = slice_y + slice_h;
        let chr_src_slice_y = slice_y >> self.src_v_sub;
        let chr_src_slice_h = ceil_rshift(src_slice_h, self.src_v_sub) as i32;
        let chr_slice_end = ceil_rshift(src_slice_y + src_slice_h, self.src_v_sub) as i32;

        if slice_y == 0 {
            self.dst_y = 0;
            self.last_in_lum_buf = -1;
            self.last_in_chr_buf = -1;
        }
        let mut dst_y = self.dst_y;
        let last_dst_y = dst_y;
        let mut last_in_lum_buf = self.last_in_lum_buf;
        let mut last_in_chr_buf = self.last_in_chr_buf;

        self.slices[0].load_from_source(
            &src_layout,
            src_w,
            slice_y,
            slice_h,
            chr_src_slice_y,
            chr_src_slice_h,
            true,
        );
        let chr_dst_y = dst_y >> self.dst_v_sub;
        self.slices[self.vout].load_from_source(
            &dst_layout,
            dst_w,
            dst_y,
            dst_h - dst_y,
            chr_dst_y,
            self.chr_dst_h - chr_dst_y,
            false,
        );
        if slice_y == 0 {
            let hout = &mut self.slices[self.hout];
            for plane in [0, 3] {
                hout.set_window(plane, last_in_lum_buf + 1, 0);
            }
            for plane in [1, 2] {
                hout.set_window(plane, last_in_chr_buf + 1, 0);
            }
            hout.set_width(dst_w);
        }

        let lum_fs = self.v_lum.filter_size() as i32;
        let chr_fs = self.v_chr.filter_size() as i32;
        let chr_skip_mask = (1i32 << self.dst_v_sub) - 1;
        let mut has_lum_holes = true;
        let mut has_chr_holes = true;
        let mut io = FrameIo {
            src: *src,
            dst: dst.reborrow(),
        };

        while dst_y < dst_h {
            let chr_dst_y = dst_y >> self.dst_v_sub;
            let last_luma_row = (dst_y | chr_skip_mask).min(dst_h - 1);
            let first_lum = (1 - lum_fs).max(self.v_lum.position(dst_y as usize));
            let first_lum2 = (1 - lum_fs).max(self.v_lum.position(last_luma_row as usize));
            let first_chr = (1 - chr_fs).max(self.v_chr.position(chr_dst_y as usize));
            let mut last_lum = src_h.min(first_lum + lum_fs) - 1;
            let last_lum2 = src_h.min(first_lum2 + lum_fs) - 1;
            let mut last_chr = self.chr_src_h.min(first_chr + chr_fs) - 1;

            let hout = &mut self.slices[self.hout];
            if first_lum > last_in_lum_buf {
                has_lum_holes = last_in_lum_buf != first_lum - 1;
                if has_lum_holes {
                    hout.set_window(0, first_lum, 0);
                    hout.set_window(3, first_lum, 0);
                }
            }
            if first_chr > last_in_chr_buf {
                has_chr_holes = last_in_chr_buf != first_chr - 1;
                if has_chr_holes {
                    hout.set_window(1, first_chr, 0);
                    hout.set_window(2, first_chr, 0);
                }
            }

            let enough_lines = last_lum2 < slice_end && last_chr < chr_slice_end;
            if !enough_lines {
                last_lum = slice_end - 1;
                last_chr = chr_src_slice_y + chr_src_slice_h - 1;
            }

            let lum_avail = hout.available_lines(0) as i32;
            let chr_avail = hout.available_lines(1) as i32;
            assert!(
                last_lum - first_lum + 1 <= lum_avail,
                "luma rows {}..={} exceed {} buffered lines",
                first_lum,
                last_lum,
                lum_avail
            );
            assert!(
                last_chr - first_chr + 1 <= chr_avail,
                "chroma rows {}..={} exceed {} buffered lines",
                first_chr,
                last_chr,
                chr_avail
            );

            let pos_y = hout.slice_y(0) + hout.slice_h(0);
            let (first_pos, last_pos) = if pos_y <= last_lum && !has_lum_holes {
                (
                    first_lum.max(pos_y),
                    (first_lum + lum_avail - 1).min(slice_end - 1),
                )
            } else {
                (pos_y, last_lum)
            };
            let c_pos_y = hout.slice_y(1) + hout.slice_h(1);
            let (first_c_pos, last_c_pos) = if c_pos_y <= last_chr && !has_chr_holes {
                (
                    first_chr.max(c_pos_y),
                    (first_chr + chr_avail - 1).min(chr_slice_end - 1),
                )
            } else {
                (c_pos_y, last_chr)
            };
            hout.rotate(last_pos, last_c_pos);

            if pos_y < last_lum + 1 {
                for stage in &mut self.stages[..self.lum_end] {
                    stage.process(&mut self.slices, &mut io, first_pos, last_pos - first_pos + 1);
                }
            }
            last_in_lum_buf = last_lum;

            if c_pos_y < last_chr + 1 {
                for stage in &mut self.stages[self.lum_end..self.chr_end] {
                    stage.process(
                        &mut self.slices,
                        &mut io,
                        first_c_pos,
                        last_c_pos - first_c_pos + 1,
                    );
                }
            }
            last_in_chr_buf = last_chr;

            if !enough_lines {
                break;
            }

            for stage in &mut self.stages[self.chr_end..] {
                stage.process(&mut self.slices, &mut io, dst_y, 1);
            }
            dst_y += 1;
        }
        drop(io);

        if self.fill_alpha {
            let stride = dst.strides[3];
            if let Some(alpha) = dst.data[3].as_deref_mut() {
                for row in last_dst_y..dst_y {
                    let start = row as usize * stride;
                    alpha[start..start + dst_w as usize].fill(255);
                }
            }
        }

        self.dst_y = dst_y;
        self.last_in_lum_buf = last_in_lum_buf;
        self.last_in_chr_buf = last_in_chr_buf;
        self.next_src_y = src_slice_y + src_slice_h;
        trace!(
            slice_y,
            slice_h,
            rows = dst_y - last_dst_y,
            "scaled source slice"
        );
        Ok((dst_y - last_dst_y) as u32)
    }

    fn check_slice(&self, y: u32, h: u32) -> Result<()> {
        let src_h = self.config.src_height;
        let mask = (1u32 << self.src_v_sub) - 1;
        if h == 0 || y.checked_add(h).map_or(true, |end| end > src_h) {
            return Err(ScaleError::InvalidSlice(format!(
                "rows {}+{} outside a {}-row source",
                y, h, src_h
            )));
        }
        if (y & mask) != 0 || ((h & mask) != 0 && y + h != src_h) {
            return Err(ScaleError::InvalidSlice(format!(
                "rows {}+{} split a chroma row",
                y, h
            )));
        }
        if y != 0 && y != self.next_src_y {
            return Err(ScaleError::SliceOrder {
                expected: self.next_src_y,
                got: y,
            });
        }
        Ok(())
    }

    fn check_source(&self, src: &PlaneRefs<'_>, y: u32, h: u32) -> Result<PlaneLayout> {
        let format = self.config.src_format;
        let desc = format.descriptor();
        let width = self.config.src_width;
        let mut layout = src.layout();

        for plane in 0..4 {
            if plane >= desc.planes {
                layout.present[plane] = false;
                continue;
            }
            let (plane_w, rows) = if format.is_chroma_plane(plane) {
                (
                    ceil_rshift(width, desc.log2_chroma_w),
                    ceil_rshift(y + h, desc.log2_chroma_h) - (y >> desc.log2_chroma_h),
                )
            } else {
                (width, h)
            };
            let row_bytes = plane_w as usize * desc.step[plane];
            check_plane(plane, src.data[plane].map(<[u8]>::len), src.strides[plane], row_bytes, rows)?;
        }
        Ok(layout)
    }

    fn check_destination(&self, dst: &PlaneRefsMut<'_>) -> Result<PlaneLayout> {
        let format = self.config.dst_format;
        let planes = format.num_planes();
        let width = self.config.dst_width;
        let height = self.config.dst_height;
        let mut layout = dst.layout();

        for plane in 0..4 {
            if plane >= planes {
                layout.present[plane] = false;
                continue;
            }
            let (plane_w, rows) = if format.is_chroma_plane(plane) {
                (
                    ceil_rshift(width, self.dst_h_sub),
                    ceil_rshift(height, self.dst_v_sub),
                )
            } else {
                (width, height)
            };
            let len = dst.data[plane].as_deref().map(<[u8]>::len);
            check_plane(plane, len, dst.strides[plane], plane_w as usize, rows)?;
        }
        Ok(layout)
    }
}

fn check_plane(
    plane: usize,
    len: Option<usize>,
    stride: usize,
    row_bytes: usize,
    rows: u32,
) -> Result<()> {
    if stride < row_bytes {
        return Err(ScaleError::InvalidConfig(format!(
            "plane {} stride {} is shorter than a {}-byte row",
            plane, stride, row_bytes
        )));
    }
    let needed = stride * (rows as usize).saturating_sub(1) + row_bytes;
    let actual = len.unwrap_or(0);
    if actual < needed {
        return Err(ScaleError::PlaneTooSmall {
            plane,
            needed,
            actual,
        });
    }
    Ok(())
}

impl fmt::Debug for ScaleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScaleContext")
            .field("config", &self.config)
            .field("stages", &self.stage_names())
            .field("slices", &self.slices)
            .field("dst_y", &self.dst_y)
            .finish()
    }
}

impl Drop for ScaleContext {
    fn drop(&mut self) {
        debug!(
            "Releasing scaler with {} stages and {} slices",
            self.stages.len(),
            self.slices.len()
        );
    }
}
