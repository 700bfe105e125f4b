use crate::crop::CropRegion;
use crate::error::{Error, Result};

/// Channel layout of a decoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Gray,
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// A decoded frame: tightly packed, row-major pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl Frame {
    /// Wrap a pixel buffer. Returns `None` if the length does not match
    /// `width * height * channels`.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * format.channels();
        (data.len() == expected).then_some(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Copy pixel rows out of a strided plane (FFmpeg pads rows to `stride`)
    pub fn from_strided(
        width: u32,
        height: u32,
        format: PixelFormat,
        plane: &[u8],
        stride: usize,
    ) -> Self {
        let row_len = width as usize * format.channels();
        let mut data = Vec::with_capacity(row_len * height as usize);
        for row in plane.chunks(stride).take(height as usize) {
            data.extend_from_slice(&row[..row_len]);
        }
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// `(height, width, channels)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.format.channels(),
        )
    }

    /// Pixel value at `(x, y)`, or `None` outside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let channels = self.format.channels();
        let start = (y as usize * self.width as usize + x as usize) * channels;
        Some(&self.data[start..start + channels])
    }

    /// Rows `[y_min, y_max)` and columns `[x_min, x_max)` of this frame
    pub fn crop(&self, region: &CropRegion) -> Result<Frame> {
        if !region.fits(self.width, self.height) {
            return Err(Error::CropOutOfBounds {
                region: *region,
                width: self.width,
                height: self.height,
            });
        }

        if *region == CropRegion::full(self.width, self.height) {
            return Ok(self.clone());
        }

        let channels = self.format.channels();
        let row_len = self.width as usize * channels;
        let start = region.x_min() as usize * channels;
        let end = region.x_max() as usize * channels;

        let mut data = Vec::with_capacity((end - start) * region.height() as usize);
        for row in self
            .data
            .chunks_exact(row_len)
            .skip(region.y_min() as usize)
            .take(region.height() as usize)
        {
            data.extend_from_slice(&row[start..end]);
        }

        Ok(Frame {
            width: region.width(),
            height: region.height(),
            format: self.format,
            data,
        })
    }

    /// Expand to RGBA for display
    pub fn to_rgba(&self) -> Vec<u8> {
        match self.format {
            PixelFormat::Rgba => self.data.clone(),
            PixelFormat::Rgb => self
                .data
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            PixelFormat::Gray => self.data.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        }
    }
}
