use photoeditor_core::buffer::{PixelBuffer, PixelFormat};

/// A 256x1 RGB image whose pixel `i` is `(i, i, i)`. Covers every channel value.
pub fn channel_ramp() -> PixelBuffer {
    let data = (0..=255u8).flat_map(|v| [v, v, v]).collect();
    PixelBuffer::from_rgb_vec(256, 1, data).expect("channel ramp has 256 pixels")
}

/// An RGBA image with red varying along x, green along y, a fixed blue and
/// alpha varying along x. Large enough to make a filter run take a moment.
pub fn gradient_image(width: u32, height: u32) -> PixelBuffer {
    let mut buf = PixelBuffer::new(width, height, PixelFormat::Rgba8);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / (width - 1).max(1)) as u8;
            let g = (y * 255 / (height - 1).max(1)) as u8;
            let a = 255 - (x % 64) as u8;
            buf.pixel_mut(x, y).copy_from_slice(&[r, g, 96, a]);
        }
    }
    buf
}

/// The 200x100 RGB image the editor opens with before the user picks a photo:
/// `R = x % 100 + 40`, `G = y % 100 + 80`, `B = (x + y) % 100 + 120`.
pub fn starter_image() -> PixelBuffer {
    let (width, height) = (200u32, 100u32);
    let mut buf = PixelBuffer::new(width, height, PixelFormat::Rgb8);
    for y in 0..height {
        for x in 0..width {
            let r = (x % 100 + 40) as u8;
            let g = (y % 100 + 80) as u8;
            let b = ((x + y) % 100 + 120) as u8;
            buf.pixel_mut(x, y).copy_from_slice(&[r, g, b]);
        }
    }
    buf
}

/// Get a temporary directory for test output that persists for the test run.
pub fn fixture_dir() -> tempfile::TempDir {
    tempfile::TempDir::new().expect("failed to create temp dir for fixtures")
}
