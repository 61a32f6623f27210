use crate::error::{CoreError, Result};

/// Channel layout of a [`PixelBuffer`]. Both layouts use 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn channels(&self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, Self::Rgba8)
    }
}

/// An owned, interleaved 8-bit pixel buffer. Row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a zeroed buffer (black, and transparent for RGBA).
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            data: vec![0u8; expected_len(width, height, format)],
        }
    }

    /// Wrap decoded sample data. The length must be `width * height * channels`.
    pub fn from_raw(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let expected = expected_len(width, height, format);
        if data.len() != expected {
            return Err(CoreError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Create from RGBA data. Convenience over [`PixelBuffer::from_raw`].
    pub fn from_rgba_vec(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::from_raw(width, height, PixelFormat::Rgba8, data)
    }

    /// Create from RGB data. Convenience over [`PixelBuffer::from_raw`].
    pub fn from_rgb_vec(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::from_raw(width, height, PixelFormat::Rgb8, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    /// Raw interleaved samples.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the buffer and hand back its samples (e.g. for an encoder).
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Bytes in a single row.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.channels()
    }

    /// Get the samples of pixel (x, y). Panics if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let ch = self.channels();
        let idx = (y as usize * self.width as usize + x as usize) * ch;
        &self.data[idx..idx + ch]
    }

    /// Get mutable samples of pixel (x, y). Panics if out of bounds.
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let ch = self.channels();
        let idx = (y as usize * self.width as usize + x as usize) * ch;
        &mut self.data[idx..idx + ch]
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn expected_len(width: u32, height: u32, format: PixelFormat) -> usize {
    width as usize * height as usize * format.channels()
}
