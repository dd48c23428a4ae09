//! Slice buffers: per-plane windows of line references.
//!
//! A [`SliceBuffer`] maps row indices of up to four planes onto line storage.
//! Its lines either alias caller memory (source or destination planes,
//! addressed by byte offset and resolved per call through [`PlaneRefs`] and
//! [`PlaneRefsMut`]) or live in physical rows the buffer owns.
//!
//! Planes come in pairs sharing storage: luma with alpha, and the two chroma
//! planes. Every owned physical row serves both planes of its pair, the
//! second plane starting `row_size + 16` bytes into the row.
//!
//! In ring mode the line table is three times the physical capacity `n` and
//! entries `j`, `j + n` and `j + 2n` name the same physical row, so a window
//! can slide forward without copying lines.

use framekit_core::align::STRIDE_ALIGN;
use framekit_core::alloc::{AlignedBlock, AllocKind, Allocation, Allocator};
use framekit_core::{Frame, PixelFormat, Result};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Storage pair of each plane: luma and alpha share pair 0, chroma pair 1.
const PAIR: [usize; 4] = [0, 1, 1, 0];

/// Bytes between the two planes of a pair inside one physical row.
const PAIR_GAP: usize = 16;

/// Borrowed planes of a caller image.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaneRefs<'a> {
    /// Plane data, `None` for absent planes.
    pub data: [Option<&'a [u8]>; 4],
    /// Bytes between consecutive rows of each plane.
    pub strides: [usize; 4],
}

impl<'a> PlaneRefs<'a> {
    /// Wrap planes given as `(data, stride)` pairs, in plane order.
    pub fn from_slices<I>(planes: I) -> Self
    where
        I: IntoIterator<Item = (&'a [u8], usize)>,
    {
        let mut refs = Self::default();
        for (i, (data, stride)) in planes.into_iter().take(4).enumerate() {
            refs.data[i] = Some(data);
            refs.strides[i] = stride;
        }
        refs
    }

    /// Borrow the planes of a frame.
    pub fn from_frame(frame: &'a Frame) -> Self {
        let mut refs = Self::default();
        for plane in 0..4 {
            refs.data[plane] = frame.plane(plane);
            refs.strides[plane] = frame.linesize(plane);
        }
        refs
    }

    /// Presence and strides of the planes.
    pub fn layout(&self) -> PlaneLayout {
        PlaneLayout {
            present: self.data.map(|plane| plane.is_some()),
            strides: self.strides,
        }
    }
}

/// Mutably borrowed planes of a caller image.
#[derive(Debug, Default)]
pub struct PlaneRefsMut<'a> {
    /// Plane data, `None` for absent planes.
    pub data: [Option<&'a mut [u8]>; 4],
    /// Bytes between consecutive rows of each plane.
    pub strides: [usize; 4],
}

impl<'a> PlaneRefsMut<'a> {
    /// Wrap planes given as `(data, stride)` pairs, in plane order.
    pub fn from_slices<I>(planes: I) -> Self
    where
        I: IntoIterator<Item = (&'a mut [u8], usize)>,
    {
        let mut refs = Self::default();
        for (i, (data, stride)) in planes.into_iter().take(4).enumerate() {
            refs.data[i] = Some(data);
            refs.strides[i] = stride;
        }
        refs
    }

    /// Borrow the planes of a frame that holds the only reference to them.
    pub fn from_frame(frame: &'a mut Frame) -> Self {
        let strides = [
            frame.linesize(0),
            frame.linesize(1),
            frame.linesize(2),
            frame.linesize(3),
        ];
        Self {
            data: frame.planes_mut(),
            strides,
        }
    }

    /// Reborrow for a shorter lifetime.
    pub fn reborrow(&mut self) -> PlaneRefsMut<'_> {
        let mut data: [Option<&mut [u8]>; 4] = Default::default();
        for (out, plane) in data.iter_mut().zip(self.data.iter_mut()) {
            *out = plane.as_deref_mut();
        }
        PlaneRefsMut {
            data,
            strides: self.strides,
        }
    }

    /// Presence and strides of the planes.
    pub fn layout(&self) -> PlaneLayout {
        let mut present = [false; 4];
        for (flag, plane) in present.iter_mut().zip(&self.data) {
            *flag = plane.is_some();
        }
        PlaneLayout {
            present,
            strides: self.strides,
        }
    }
}

/// Which planes of a caller image exist, and their strides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaneLayout {
    /// Plane presence.
    pub present: [bool; 4],
    /// Row strides in bytes.
    pub strides: [usize; 4],
}

/// Where the lines of a slice buffer live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceBinding {
    /// Physical rows owned by the buffer.
    Owned,
    /// Lines alias the caller's source planes.
    Source,
    /// Lines alias the caller's destination planes.
    Destination,
}

/// Accumulator width of horizontally scaled lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumDepth {
    /// 16-bit samples, up to 14-bit output.
    Bits16,
    /// 32-bit samples, for 16-bit output.
    Bits32,
    /// 64-bit samples, for float output.
    Bits64,
}

impl AccumDepth {
    /// Value of an unwritten sample: mid-grey at the accumulator's scale.
    pub fn neutral(&self) -> i64 {
        match self {
            Self::Bits16 => 1 << 14,
            Self::Bits32 => 1 << 18,
            Self::Bits64 => 1 << 34,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineSlot {
    Empty,
    External { offset: usize },
    Owned { row: usize },
}

struct SlicePlane {
    available_lines: usize,
    slice_y: i32,
    slice_h: i32,
    lines: Vec<LineSlot>,
    _table: Option<Allocation>,
}

/// Row window over up to four planes.
pub struct SliceBuffer {
    format: PixelFormat,
    width: u32,
    h_chr_sub_sample: u32,
    v_chr_sub_sample: u32,
    is_ring: bool,
    binding: SliceBinding,
    row_size: usize,
    planes: [SlicePlane; 4],
    rows: [Vec<AlignedBlock>; 2],
    allocator: Arc<dyn Allocator>,
}

impl SliceBuffer {
    /// Allocate line tables for `lum_lines` luma/alpha rows and `chr_lines`
    /// chroma rows; ring buffers get three table entries per physical row.
    ///
    /// Planes with no rows get no table. Owned buffers still need
    /// [`materialize_ring_lines`](Self::materialize_ring_lines) before use.
    #[allow(clippy::too_many_arguments)]
    pub fn allocate(
        allocator: &Arc<dyn Allocator>,
        format: PixelFormat,
        lum_lines: usize,
        chr_lines: usize,
        h_sub_sample: u32,
        v_sub_sample: u32,
        ring: bool,
        binding: SliceBinding,
    ) -> Result<Self> {
        let size = [lum_lines, chr_lines, chr_lines, lum_lines];
        let mut planes = Vec::with_capacity(4);

        for &available_lines in &size {
            let entries = if ring {
                available_lines * 3
            } else {
                available_lines
            };
            let table = if entries > 0 {
                Some(Allocation::new(
                    allocator,
                    AllocKind::LineTable,
                    entries * std::mem::size_of::<LineSlot>(),
                )?)
            } else {
                None
            };
            planes.push(SlicePlane {
                available_lines,
                slice_y: 0,
                slice_h: 0,
                lines: vec![LineSlot::Empty; entries],
                _table: table,
            });
        }

        let mut planes = planes.into_iter();
        let planes = [(); 4].map(|_| planes.next().unwrap_or_else(SlicePlane::empty));

        Ok(Self {
            format,
            width: 0,
            h_chr_sub_sample: h_sub_sample,
            v_chr_sub_sample: v_sub_sample,
            is_ring: ring,
            binding,
            row_size: 0,
            planes,
            rows: [Vec::new(), Vec::new()],
            allocator: Arc::clone(allocator),
        })
    }

    /// Allocate the physical rows of an owned buffer.
    ///
    /// Each row holds `row_size * 2 + 32` bytes and serves both planes of a
    /// pair. In ring mode all three table copies are pointed at it. On
    /// failure every row allocated by this call is freed again.
    pub fn materialize_ring_lines(&mut self, row_size: usize, width: u32) -> Result<()> {
        debug_assert_eq!(self.binding, SliceBinding::Owned);
        let mut rows: [Vec<AlignedBlock>; 2] = [Vec::new(), Vec::new()];

        for (pair, (first, second)) in [(0usize, 3usize), (1, 2)].into_iter().enumerate() {
            let n = self.planes[first].available_lines;
            debug_assert_eq!(n, self.planes[second].available_lines);
            rows[pair].reserve_exact(n);
            for _ in 0..n {
                rows[pair].push(AlignedBlock::new(
                    &self.allocator,
                    AllocKind::Line,
                    row_size * 2 + 2 * PAIR_GAP,
                    STRIDE_ALIGN,
                )?);
            }
        }

        for plane in &mut self.planes {
            let n = plane.available_lines;
            for (j, slot) in plane.lines.iter_mut().enumerate() {
                *slot = LineSlot::Owned { row: j % n.max(1) };
            }
        }
        self.rows = rows;
        self.row_size = row_size;
        self.width = width;
        trace!(
            format = %self.format,
            row_size,
            width,
            ring = self.is_ring,
            "materialized slice lines"
        );
        Ok(())
    }

    /// Point lines at caller planes without copying.
    ///
    /// The requested rows start at `lum_y` (luma/alpha) and `chr_y` (chroma).
    /// With `relative` the caller planes start at those rows, otherwise at
    /// row 0. If the rows continue the current window and fit, the window
    /// grows; otherwise it restarts at the requested row, clipped to the
    /// buffer's capacity. Planes from the first absent one on are skipped.
    #[allow(clippy::too_many_arguments)]
    pub fn load_from_source(
        &mut self,
        layout: &PlaneLayout,
        width: u32,
        lum_y: i32,
        lum_h: i32,
        chr_y: i32,
        chr_h: i32,
        relative: bool,
    ) {
        debug_assert_ne!(self.binding, SliceBinding::Owned);
        let start = [lum_y, chr_y, chr_y, lum_y];
        let end = [lum_y + lum_h, chr_y + chr_h, chr_y + chr_h, lum_y + lum_h];
        self.width = width;

        for i in 0..4 {
            if !layout.present[i] {
                break;
            }
            let stride = layout.strides[i];
            let base = if relative { 0 } else { start[i] as usize * stride };
            let plane = &mut self.planes[i];
            let first = plane.slice_y;
            let n = plane.available_lines as i32;
            let lines = end[i] - start[i];
            let tot_lines = end[i] - first;

            if start[i] >= first && n >= tot_lines {
                plane.slice_h = plane.slice_h.max(tot_lines);
                for j in 0..lines {
                    plane.lines[(start[i] - first + j) as usize] = LineSlot::External {
                        offset: base + j as usize * stride,
                    };
                }
            } else {
                plane.slice_y = start[i];
                let lines = lines.min(n);
                plane.slice_h = lines;
                for j in 0..lines {
                    plane.lines[j as usize] = LineSlot::External {
                        offset: base + j as usize * stride,
                    };
                }
            }
        }
    }

    /// Advance ring windows by a whole capacity once the target row is two
    /// capacities past the window start. A zero target leaves that plane
    /// class untouched.
    pub fn rotate(&mut self, lum: i32, chr: i32) {
        let advance = |plane: &mut SlicePlane, target: i32| {
            let n = plane.available_lines as i32;
            if target - plane.slice_y >= n * 2 {
                plane.slice_y += n;
                plane.slice_h -= n;
            }
        };
        if lum != 0 {
            for i in [0, 3] {
                advance(&mut self.planes[i], lum);
            }
        }
        if chr != 0 {
            for i in [1, 2] {
                advance(&mut self.planes[i], chr);
            }
        }
    }

    /// Seed the first `n + 1` samples of every physical line with the
    /// neutral value of `depth`; `n` counts 16-bit units.
    pub fn fill_constant(&mut self, n: usize, depth: AccumDepth) {
        let neutral = depth.neutral();
        for plane in 0..4 {
            for j in 0..self.planes[plane].available_lines {
                let line = self.owned_line_mut(plane, j as i32);
                match depth {
                    AccumDepth::Bits16 => {
                        let bytes = (neutral as i16).to_ne_bytes();
                        for chunk in line.chunks_exact_mut(2).take(n + 1) {
                            chunk.copy_from_slice(&bytes);
                        }
                    }
                    AccumDepth::Bits32 => {
                        let bytes = (neutral as i32).to_ne_bytes();
                        for chunk in line.chunks_exact_mut(4).take((n >> 1) + 1) {
                            chunk.copy_from_slice(&bytes);
                        }
                    }
                    AccumDepth::Bits64 => {
                        let bytes = neutral.to_ne_bytes();
                        for chunk in line.chunks_exact_mut(8).take((n >> 2) + 1) {
                            chunk.copy_from_slice(&bytes);
                        }
                    }
                }
            }
        }
    }

    fn slot(&self, plane: usize, idx: i32) -> LineSlot {
        let lines = &self.planes[plane].lines;
        if self.is_ring && !lines.is_empty() {
            return lines[idx.rem_euclid(lines.len() as i32) as usize];
        }
        debug_assert!(
            idx >= 0 && (idx as usize) < lines.len(),
            "line {} outside table of {} on plane {}",
            idx,
            lines.len(),
            plane
        );
        lines[idx as usize]
    }

    fn owned_range(&self, plane: usize) -> std::ops::Range<usize> {
        let half = self.row_size + PAIR_GAP;
        if plane == 0 || plane == 1 {
            0..half
        } else {
            half..2 * half
        }
    }

    /// Line `idx` of `plane`, resolving caller lines through `ext`.
    pub fn line<'a>(&'a self, ext: &PlaneRefs<'a>, plane: usize, idx: i32) -> &'a [u8] {
        match self.slot(plane, idx) {
            LineSlot::Owned { row } => &self.rows[PAIR[plane]][row].as_slice()[self.owned_range(plane)],
            LineSlot::External { offset } => {
                debug_assert_eq!(self.binding, SliceBinding::Source);
                let data = ext.data[plane].unwrap_or(&[]);
                let end = (offset + ext.strides[plane]).min(data.len());
                &data[offset.min(end)..end]
            }
            LineSlot::Empty => {
                debug_assert!(false, "read of unset line {} on plane {}", idx, plane);
                &[]
            }
        }
    }

    /// Mutable line `idx` of `plane`, resolving caller lines through `ext`.
    pub fn line_mut<'a>(
        &'a mut self,
        ext: &'a mut PlaneRefsMut<'_>,
        plane: usize,
        idx: i32,
    ) -> &'a mut [u8] {
        match self.slot(plane, idx) {
            LineSlot::Owned { .. } => self.owned_line_mut(plane, idx),
            LineSlot::External { offset } => {
                debug_assert_eq!(self.binding, SliceBinding::Destination);
                let stride = ext.strides[plane];
                match ext.data[plane].as_deref_mut() {
                    Some(data) => {
                        let end = (offset + stride).min(data.len());
                        &mut data[offset.min(end)..end]
                    }
                    None => &mut [],
                }
            }
            LineSlot::Empty => {
                debug_assert!(false, "write to unset line {} on plane {}", idx, plane);
                &mut []
            }
        }
    }

    /// Owned line `idx` of `plane`.
    pub fn owned_line(&self, plane: usize, idx: i32) -> &[u8] {
        match self.slot(plane, idx) {
            LineSlot::Owned { row } => &self.rows[PAIR[plane]][row].as_slice()[self.owned_range(plane)],
            _ => &[],
        }
    }

    /// Mutable owned line `idx` of `plane`.
    pub fn owned_line_mut(&mut self, plane: usize, idx: i32) -> &mut [u8] {
        match self.slot(plane, idx) {
            LineSlot::Owned { row } => {
                let range = self.owned_range(plane);
                &mut self.rows[PAIR[plane]][row].as_mut_slice()[range]
            }
            _ => &mut [],
        }
    }

    /// First valid row of `plane`.
    pub fn slice_y(&self, plane: usize) -> i32 {
        self.planes[plane].slice_y
    }

    /// Number of valid rows of `plane`.
    pub fn slice_h(&self, plane: usize) -> i32 {
        self.planes[plane].slice_h
    }

    /// Physical line capacity of `plane`.
    pub fn available_lines(&self, plane: usize) -> usize {
        self.planes[plane].available_lines
    }

    /// Set the valid window of `plane`.
    pub fn set_window(&mut self, plane: usize, slice_y: i32, slice_h: i32) {
        self.planes[plane].slice_y = slice_y;
        self.planes[plane].slice_h = slice_h;
    }

    /// Extend the valid window of `plane` by `rows`.
    pub fn grow(&mut self, plane: usize, rows: i32) {
        self.planes[plane].slice_h += rows;
    }

    /// Width in pixels of the luma plane.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Set the luma width.
    pub fn set_width(&mut self, width: u32) {
        self.width = width;
    }

    /// Width of the chroma planes.
    pub fn chroma_width(&self) -> u32 {
        framekit_core::format::ceil_rshift(self.width, self.h_chr_sub_sample)
    }

    /// Horizontal chroma subsampling shift.
    pub fn h_chr_sub_sample(&self) -> u32 {
        self.h_chr_sub_sample
    }

    /// Vertical chroma subsampling shift.
    pub fn v_chr_sub_sample(&self) -> u32 {
        self.v_chr_sub_sample
    }

    /// Check if the buffer is a ring.
    pub fn is_ring(&self) -> bool {
        self.is_ring
    }

    /// Where the lines live.
    pub fn binding(&self) -> SliceBinding {
        self.binding
    }

    /// Format the buffer was allocated for.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Physical row size of owned lines, excluding padding.
    pub fn row_size(&self) -> usize {
        self.row_size
    }
}

impl SlicePlane {
    fn empty() -> Self {
        Self {
            available_lines: 0,
            slice_y: 0,
            slice_h: 0,
            lines: Vec::new(),
            _table: None,
        }
    }
}

impl fmt::Debug for SliceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let windows: Vec<_> = self
            .planes
            .iter()
            .map(|p| (p.slice_y, p.slice_h, p.available_lines))
            .collect();
        f.debug_struct("SliceBuffer")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("ring", &self.is_ring)
            .field("binding", &self.binding)
            .field("windows", &windows)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framekit_core::alloc::{default_allocator, CountingAllocator};

    fn ring(lum: usize, chr: usize) -> SliceBuffer {
        let mut slice = SliceBuffer::allocate(
            &default_allocator(),
            PixelFormat::Yuv420p,
            lum,
            chr,
            1,
            1,
            true,
            SliceBinding::Owned,
        )
        .unwrap();
        slice.materialize_ring_lines(64, 16).unwrap();
        slice
    }

    fn source(lum: usize, chr: usize) -> SliceBuffer {
        SliceBuffer::allocate(
            &default_allocator(),
            PixelFormat::Yuv420p,
            lum,
            chr,
            1,
            1,
            false,
            SliceBinding::Source,
        )
        .unwrap()
    }

    #[test]
    fn test_ring_copies_alias() {
        let mut slice = ring(4, 2);
        slice.owned_line_mut(0, 1)[0] = 42;
        assert_eq!(slice.owned_line(0, 5)[0], 42);
        assert_eq!(slice.owned_line(0, 9)[0], 42);
        assert_eq!(
            slice.owned_line(0, 1).as_ptr(),
            slice.owned_line(0, 5).as_ptr()
        );
    }

    #[test]
    fn test_pair_planes_share_rows() {
        let slice = ring(3, 3);
        let u = slice.owned_line(1, 0).as_ptr() as usize;
        let v = slice.owned_line(2, 0).as_ptr() as usize;
        assert_eq!(v - u, 64 + PAIR_GAP);
        assert_eq!(slice.owned_line(1, 0).len(), 64 + PAIR_GAP);

        let y = slice.owned_line(0, 2).as_ptr() as usize;
        let a = slice.owned_line(3, 2).as_ptr() as usize;
        assert_eq!(a - y, 64 + PAIR_GAP);
    }

    #[test]
    fn test_zero_line_planes_skip_tables() {
        let counting = Arc::new(CountingAllocator::new());
        let alloc: Arc<dyn Allocator> = counting.clone();
        let slice = SliceBuffer::allocate(
            &alloc,
            PixelFormat::Gray8,
            8,
            0,
            0,
            0,
            false,
            SliceBinding::Source,
        )
        .unwrap();
        assert_eq!(counting.live(AllocKind::LineTable), 2);
        drop(slice);
        assert_eq!(counting.live_total(), 0);
    }

    #[test]
    fn test_materialize_failure_frees_lines() {
        let counting = Arc::new(CountingAllocator::new());
        let alloc: Arc<dyn Allocator> = counting.clone();
        let mut slice = SliceBuffer::allocate(
            &alloc,
            PixelFormat::Yuv420p,
            4,
            4,
            1,
            1,
            true,
            SliceBinding::Owned,
        )
        .unwrap();
        counting.fail_nth_of(AllocKind::Line, 6);
        assert!(slice.materialize_ring_lines(32, 8).is_err());
        assert_eq!(counting.live(AllocKind::Line), 0);
        assert_eq!(counting.live(AllocKind::LineTable), 4);
    }

    #[test]
    fn test_load_extends_contiguous_window() {
        let mut slice = source(16, 8);
        let layout = PlaneLayout {
            present: [true, true, true, false],
            strides: [32, 16, 16, 0],
        };
        slice.load_from_source(&layout, 32, 0, 4, 0, 2, true);
        assert_eq!((slice.slice_y(0), slice.slice_h(0)), (0, 4));
        assert_eq!((slice.slice_y(1), slice.slice_h(1)), (0, 2));

        slice.load_from_source(&layout, 32, 4, 6, 2, 3, true);
        assert_eq!((slice.slice_y(0), slice.slice_h(0)), (0, 10));
        assert_eq!((slice.slice_y(2), slice.slice_h(2)), (0, 5));
        assert_eq!(slice.slot(0, 4), LineSlot::External { offset: 0 });
        assert_eq!(slice.slot(0, 5), LineSlot::External { offset: 32 });
        // Alpha is absent and untouched.
        assert_eq!(slice.slice_h(3), 0);
    }

    #[test]
    fn test_load_resets_when_window_overflows() {
        let mut slice = source(4, 2);
        let layout = PlaneLayout {
            present: [true, false, false, false],
            strides: [8, 0, 0, 0],
        };
        slice.load_from_source(&layout, 8, 0, 3, 0, 0, true);
        slice.load_from_source(&layout, 8, 3, 6, 0, 0, true);
        assert_eq!(slice.slice_y(0), 3);
        assert_eq!(slice.slice_h(0), 4);
    }

    #[test]
    fn test_absolute_addressing() {
        let mut slice = source(8, 4);
        let layout = PlaneLayout {
            present: [true, true, true, false],
            strides: [10, 5, 5, 0],
        };
        slice.load_from_source(&layout, 10, 2, 6, 1, 3, false);
        assert_eq!(slice.slot(0, 2), LineSlot::External { offset: 20 });
        assert_eq!(slice.slot(1, 1), LineSlot::External { offset: 5 });
    }

    #[test]
    fn test_rotate_in_whole_capacities() {
        let mut slice = ring(4, 2);
        slice.set_window(0, 0, 7);
        slice.set_window(3, 0, 7);
        slice.rotate(7, 0);
        assert_eq!(slice.slice_y(0), 0);

        slice.rotate(8, 0);
        assert_eq!((slice.slice_y(0), slice.slice_h(0)), (4, 3));
        assert_eq!((slice.slice_y(3), slice.slice_h(3)), (4, 3));
        assert_eq!(slice.slice_y(1), 0);

        slice.set_window(1, 0, 4);
        slice.rotate(0, 4);
        assert_eq!(slice.slice_y(1), 2);
    }

    #[test]
    fn test_fill_constant_depths() {
        let mut slice = ring(2, 2);
        slice.fill_constant(20, AccumDepth::Bits16);
        let line = slice.owned_line(2, 1);
        for x in 0..21 {
            assert_eq!(i16::from_ne_bytes([line[2 * x], line[2 * x + 1]]), 1 << 14);
        }

        slice.fill_constant(20, AccumDepth::Bits32);
        let line = slice.owned_line(0, 0);
        let value = i32::from_ne_bytes([line[0], line[1], line[2], line[3]]);
        assert_eq!(value, 1 << 18);

        slice.fill_constant(20, AccumDepth::Bits64);
        let line = slice.owned_line(3, 1);
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&line[40..48]);
        assert_eq!(i64::from_ne_bytes(bytes), 1 << 34);
    }

    #[test]
    fn test_external_lines_resolve_through_refs() {
        let mut slice = source(2, 1);
        let luma = [1u8, 2, 3, 4, 5, 6];
        let refs = PlaneRefs::from_slices([(&luma[..], 3)]);
        slice.load_from_source(&refs.layout(), 3, 0, 2, 0, 1, true);
        assert_eq!(slice.line(&refs, 0, 1), &[4, 5, 6]);
    }
}
