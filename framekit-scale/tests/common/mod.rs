//! Planar test images.

#![allow(dead_code)]

use framekit_core::format::ceil_rshift;
use framekit_core::PixelFormat;
use framekit_scale::{PlaneRefs, PlaneRefsMut};

/// Caller-owned planar image with padded strides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub planes: Vec<Vec<u8>>,
    pub strides: Vec<usize>,
}

impl Image {
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        let desc = format.descriptor();
        let mut planes = Vec::new();
        let mut strides = Vec::new();
        for plane in 0..desc.planes {
            let (w, h) = plane_size(format, plane, width, height);
            let stride = w as usize * desc.step[plane] + 7;
            planes.push(vec![0u8; stride * h as usize]);
            strides.push(stride);
        }
        Self {
            format,
            width,
            height,
            planes,
            strides,
        }
    }

    /// Fill every sample with `f(plane, x, y, component)`.
    pub fn fill(&mut self, f: impl Fn(usize, usize, usize, usize) -> u8) {
        let desc = self.format.descriptor();
        for plane in 0..self.planes.len() {
            let (w, h) = plane_size(self.format, plane, self.width, self.height);
            let step = desc.step[plane];
            for y in 0..h as usize {
                for x in 0..w as usize {
                    for c in 0..step {
                        self.planes[plane][y * self.strides[plane] + x * step + c] = f(plane, x, y, c);
                    }
                }
            }
        }
    }

    /// Visible samples of one row, without stride padding.
    pub fn row(&self, plane: usize, y: usize) -> &[u8] {
        let (w, _) = plane_size(self.format, plane, self.width, self.height);
        let start = y * self.strides[plane];
        &self.planes[plane][start..start + w as usize * self.format.descriptor().step[plane]]
    }

    /// Visible samples of a plane, row after row.
    pub fn visible(&self, plane: usize) -> Vec<u8> {
        let (_, h) = plane_size(self.format, plane, self.width, self.height);
        (0..h as usize).flat_map(|y| self.row(plane, y).to_vec()).collect()
    }

    pub fn refs(&self) -> PlaneRefs<'_> {
        PlaneRefs::from_slices(self.planes.iter().map(Vec::as_slice).zip(self.strides.iter().copied()))
    }

    /// Rows `y..y + h` of the image, the first of them at offset 0.
    pub fn slice_refs(&self, y: u32, h: u32) -> PlaneRefs<'_> {
        let desc = self.format.descriptor();
        let mut refs = PlaneRefs::default();
        for plane in 0..self.planes.len() {
            let shift = if self.format.is_chroma_plane(plane) {
                desc.log2_chroma_h
            } else {
                0
            };
            let first = (y >> shift) as usize;
            let last = ceil_rshift(y + h, shift) as usize;
            let stride = self.strides[plane];
            refs.data[plane] = Some(&self.planes[plane][first * stride..last * stride]);
            refs.strides[plane] = stride;
        }
        refs
    }

    pub fn refs_mut(&mut self) -> PlaneRefsMut<'_> {
        let strides = self.strides.clone();
        PlaneRefsMut::from_slices(self.planes.iter_mut().map(Vec::as_mut_slice).zip(strides))
    }
}

pub fn plane_size(format: PixelFormat, plane: usize, width: u32, height: u32) -> (u32, u32) {
    let desc = format.descriptor();
    if format.is_chroma_plane(plane) {
        (
            ceil_rshift(width, desc.log2_chroma_w),
            ceil_rshift(height, desc.log2_chroma_h),
        )
    } else {
        (width, height)
    }
}

/// Deterministic pattern that differs per plane and position.
pub fn pattern(plane: usize, x: usize, y: usize, c: usize) -> u8 {
    ((x * 7 + y * 13 + plane * 31 + c * 57) % 256) as u8
}
