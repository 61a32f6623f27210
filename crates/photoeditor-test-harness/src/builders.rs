use photoeditor_core::buffer::{PixelBuffer, PixelFormat};

/// Builder for creating test PixelBuffers with sensible defaults.
pub struct PixelBufferBuilder {
    width: u32,
    height: u32,
    format: PixelFormat,
    fill: [u8; 4],
    pixels: Vec<(u32, u32, [u8; 4])>,
}

impl PixelBufferBuilder {
    /// A 4x4 opaque black RGBA image.
    pub fn new() -> Self {
        Self {
            width: 4,
            height: 4,
            format: PixelFormat::Rgba8,
            fill: [0, 0, 0, 255],
            pixels: Vec::new(),
        }
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn rgb(mut self) -> Self {
        self.format = PixelFormat::Rgb8;
        self
    }

    pub fn rgba(mut self) -> Self {
        self.format = PixelFormat::Rgba8;
        self
    }

    /// Fill every pixel with an opaque color.
    pub fn fill(mut self, r: u8, g: u8, b: u8) -> Self {
        self.fill = [r, g, b, 255];
        self
    }

    /// Fill every pixel including alpha (ignored for RGB).
    pub fn fill_rgba(mut self, rgba: [u8; 4]) -> Self {
        self.fill = rgba;
        self
    }

    /// Override a single pixel with an opaque color.
    pub fn pixel(mut self, x: u32, y: u32, rgb: [u8; 3]) -> Self {
        self.pixels.push((x, y, [rgb[0], rgb[1], rgb[2], 255]));
        self
    }

    /// Override a single pixel including alpha (ignored for RGB).
    pub fn pixel_rgba(mut self, x: u32, y: u32, rgba: [u8; 4]) -> Self {
        self.pixels.push((x, y, rgba));
        self
    }

    pub fn build(self) -> PixelBuffer {
        let channels = self.format.channels();
        let mut buf = PixelBuffer::new(self.width, self.height, self.format);
        for px in buf.data_mut().chunks_exact_mut(channels) {
            px.copy_from_slice(&self.fill[..channels]);
        }
        for (x, y, rgba) in self.pixels {
            buf.pixel_mut(x, y).copy_from_slice(&rgba[..channels]);
        }
        buf
    }
}

impl Default for PixelBufferBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-row RGB image from a list of pixels.
pub fn rgb_row(pixels: &[[u8; 3]]) -> PixelBuffer {
    let data = pixels.iter().flatten().copied().collect();
    PixelBuffer::from_rgb_vec(pixels.len() as u32, 1, data)
        .expect("rgb_row produced mismatched buffer")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_opaque_black_rgba() {
        let buf = PixelBufferBuilder::default().build();
        assert_eq!((buf.width(), buf.height()), (4, 4));
        assert_eq!(buf.format(), PixelFormat::Rgba8);
        assert!(buf.data().chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn test_fill_rgba_and_overrides() {
        let buf = PixelBufferBuilder::new()
            .rgb()
            .rgba()
            .size(3, 2)
            .fill_rgba([10, 20, 30, 40])
            .pixel(2, 1, [1, 2, 3])
            .build();
        assert_eq!(buf.format(), PixelFormat::Rgba8);
        assert_eq!(buf.pixel(0, 0), &[10, 20, 30, 40]);
        assert_eq!(buf.pixel(2, 1), &[1, 2, 3, 255]);
    }

    #[test]
    fn test_rgb_ignores_alpha() {
        let buf = PixelBufferBuilder::new()
            .size(1, 1)
            .rgb()
            .fill_rgba([7, 8, 9, 0])
            .build();
        assert_eq!(buf.data(), &[7, 8, 9]);
    }

    #[test]
    fn test_rgb_row_layout() {
        let buf = rgb_row(&[[1, 2, 3], [4, 5, 6]]);
        assert_eq!((buf.width(), buf.height()), (2, 1));
        assert_eq!(buf.pixel(1, 0), &[4, 5, 6]);
    }
}
