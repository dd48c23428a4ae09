//! Frames backed by pooled plane buffers.
//!
//! A [`Frame`] starts out as a bare descriptor (format plus dimensions or
//! sample count). Frame acquisition then attaches one [`BufferRef`] per
//! plane together with its line size. Audio frames with more planes than
//! [`NUM_DATA_POINTERS`] keep the excess in an extended side table.

use crate::alloc::Allocation;
use crate::buffer::BufferRef;
use crate::format::{MediaKind, PixelFormat};
use crate::hw::HwSurface;
use crate::sample::{ChannelLayout, SampleFormat};
use std::fmt;

/// Number of planes a frame holds inline.
pub const NUM_DATA_POINTERS: usize = 8;

/// Format of the data a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFormat {
    /// Not yet described.
    #[default]
    None,
    /// Video with the given pixel format.
    Video(PixelFormat),
    /// Audio with the given sample format.
    Audio(SampleFormat),
}

impl FrameFormat {
    /// Media kind of the format, if described.
    pub fn kind(&self) -> Option<MediaKind> {
        match self {
            Self::None => None,
            Self::Video(_) => Some(MediaKind::Video),
            Self::Audio(_) => Some(MediaKind::Audio),
        }
    }
}

pub(crate) struct ExtendedPlanes {
    pub(crate) bufs: Vec<BufferRef>,
    pub(crate) _table: Allocation,
}

/// A video or audio frame.
#[derive(Default)]
pub struct Frame {
    /// Data format.
    pub format: FrameFormat,
    /// Width in pixels (video).
    pub width: u32,
    /// Height in pixels (video).
    pub height: u32,
    /// Samples per channel (audio).
    pub nb_samples: usize,
    /// Channel layout (audio).
    pub layout: ChannelLayout,
    pub(crate) linesize: [usize; NUM_DATA_POINTERS],
    pub(crate) buf: [Option<BufferRef>; NUM_DATA_POINTERS],
    pub(crate) extended: Option<ExtendedPlanes>,
    pub(crate) hw_surface: Option<HwSurface>,
}

impl Frame {
    /// Create an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Describe a video frame; planes are attached by frame acquisition.
    pub fn video(format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            format: FrameFormat::Video(format),
            width,
            height,
            ..Self::default()
        }
    }

    /// Describe an audio frame; planes are attached by frame acquisition.
    pub fn audio(format: SampleFormat, layout: ChannelLayout, nb_samples: usize) -> Self {
        Self {
            format: FrameFormat::Audio(format),
            nb_samples,
            layout,
            ..Self::default()
        }
    }

    /// Pixel format, for video frames.
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        match self.format {
            FrameFormat::Video(format) => Some(format),
            _ => None,
        }
    }

    /// Sample format, for audio frames.
    pub fn sample_format(&self) -> Option<SampleFormat> {
        match self.format {
            FrameFormat::Audio(format) => Some(format),
            _ => None,
        }
    }

    /// Get the line size of plane `plane`.
    ///
    /// Audio frames report their shared per-plane size at index 0 only.
    pub fn linesize(&self, plane: usize) -> usize {
        self.linesize.get(plane).copied().unwrap_or(0)
    }

    /// Number of planes with data attached.
    pub fn nb_planes(&self) -> usize {
        let inline = self.buf.iter().filter(|buf| buf.is_some()).count();
        inline + self.extended.as_ref().map_or(0, |ext| ext.bufs.len())
    }

    /// Buffer backing plane `plane`.
    pub fn buffer(&self, plane: usize) -> Option<&BufferRef> {
        if plane < NUM_DATA_POINTERS {
            self.buf[plane].as_ref()
        } else {
            self.extended
                .as_ref()
                .and_then(|ext| ext.bufs.get(plane - NUM_DATA_POINTERS))
        }
    }

    fn buffer_mut(&mut self, plane: usize) -> Option<&mut BufferRef> {
        if plane < NUM_DATA_POINTERS {
            self.buf[plane].as_mut()
        } else {
            self.extended
                .as_mut()
                .and_then(|ext| ext.bufs.get_mut(plane - NUM_DATA_POINTERS))
        }
    }

    /// Get a plane's data.
    pub fn plane(&self, plane: usize) -> Option<&[u8]> {
        self.buffer(plane).map(BufferRef::data)
    }

    /// Get a plane's data mutably, if the frame holds the only reference.
    pub fn plane_mut(&mut self, plane: usize) -> Option<&mut [u8]> {
        self.buffer_mut(plane).and_then(BufferRef::data_mut)
    }

    /// Mutable access to the first four planes at once.
    pub fn planes_mut(&mut self) -> [Option<&mut [u8]>; 4] {
        let mut planes: [Option<&mut [u8]>; 4] = Default::default();
        for (slot, buf) in planes.iter_mut().zip(self.buf.iter_mut()) {
            *slot = buf.as_mut().and_then(BufferRef::data_mut);
        }
        planes
    }

    /// Check if any plane data or hardware surface is attached.
    pub fn is_populated(&self) -> bool {
        self.buf.iter().any(Option::is_some)
            || self.extended.is_some()
            || self.hw_surface.is_some()
    }

    /// Hardware surface backing the frame, if any.
    pub fn hw_surface(&self) -> Option<&HwSurface> {
        self.hw_surface.as_ref()
    }

    /// Attach a hardware surface.
    pub fn set_hw_surface(&mut self, surface: HwSurface) {
        self.hw_surface = Some(surface);
    }

    /// Drop every plane reference, keeping the frame description.
    pub fn release_planes(&mut self) {
        self.buf = Default::default();
        self.linesize = [0; NUM_DATA_POINTERS];
        self.extended = None;
        self.hw_surface = None;
    }

    /// Drop every reference and reset the frame to its empty state.
    pub fn unref(&mut self) {
        *self = Self::default();
    }

    /// Create a new frame sharing this frame's buffers.
    pub fn ref_clone(&self) -> Option<Self> {
        if self.extended.is_some() || self.hw_surface.is_some() {
            return None;
        }
        Some(Self {
            format: self.format,
            width: self.width,
            height: self.height,
            nb_samples: self.nb_samples,
            layout: self.layout,
            linesize: self.linesize,
            buf: self.buf.clone(),
            extended: None,
            hw_surface: None,
        })
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("nb_samples", &self.nb_samples)
            .field("planes", &self.nb_planes())
            .field("linesize", &&self.linesize[..4])
            .finish()
    }
}
