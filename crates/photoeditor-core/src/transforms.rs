//! Per-pixel color adjustments.
//!
//! Every transform borrows its input and returns [`Cow::Borrowed`] when the
//! parameter leaves the image unchanged, otherwise a freshly allocated buffer.
//! Inputs are never modified. Only the color channels are touched; alpha is
//! copied through as-is.
//!
//! Contrast and saturation share the factor `(255 + v) / (255 - v)` but differ
//! in what they pivot around: contrast uses one average over the whole image,
//! saturation uses each pixel's own average.

use std::borrow::Cow;

use rayon::prelude::*;

use crate::buffer::PixelBuffer;
use crate::error::Result;
use crate::filters::FilterKind;

/// Signature shared by all transforms, used by the pipeline's stage table.
pub type TransformFn = fn(&PixelBuffer, f32) -> Result<Cow<'_, PixelBuffer>>;

impl FilterKind {
    /// The transform implementing this filter.
    pub fn transform(&self) -> TransformFn {
        match self {
            Self::Brightness => adjust_brightness,
            Self::Contrast => adjust_contrast,
            Self::Saturation => adjust_saturation,
            Self::Gamma => adjust_gamma,
        }
    }
}

/// Adds `round(value)` to every color channel, clamped to [0, 255].
pub fn adjust_brightness(input: &PixelBuffer, value: f32) -> Result<Cow<'_, PixelBuffer>> {
    FilterKind::Brightness.validate(value)?;
    // Any offset past 255 already saturates every channel.
    let offset = value.round().clamp(-255.0, 255.0) as i32;
    if offset == 0 || input.is_empty() {
        return Ok(Cow::Borrowed(input));
    }

    Ok(Cow::Owned(map_pixels(input, |pixel| {
        for c in &mut pixel[..3] {
            *c = (*c as i32 + offset).clamp(0, 255) as u8;
        }
    })))
}

/// Stretches every channel away from (or toward) the global mean intensity.
///
/// The mean is `sum(R + G + B) / (3 * pixel_count)` over the whole image,
/// truncated to an integer, and is shared by every pixel and channel.
///
/// `value` must not be 255, where the factor's denominator vanishes.
pub fn adjust_contrast(input: &PixelBuffer, value: f32) -> Result<Cow<'_, PixelBuffer>> {
    FilterKind::Contrast.validate(value)?;
    if value == 0.0 || input.is_empty() {
        return Ok(Cow::Borrowed(input));
    }

    let factor = spread_factor(value);
    let avg = global_average(input) as f32;

    Ok(Cow::Owned(map_pixels(input, |pixel| {
        for c in &mut pixel[..3] {
            *c = clamp_channel(factor * (*c as f32 - avg) + avg);
        }
    })))
}

/// Stretches each pixel's channels away from (or toward) that pixel's own
/// mean. Negative values desaturate.
///
/// `value` must not be 255, where the factor's denominator vanishes.
pub fn adjust_saturation(input: &PixelBuffer, value: f32) -> Result<Cow<'_, PixelBuffer>> {
    FilterKind::Saturation.validate(value)?;
    if value == 0.0 || input.is_empty() {
        return Ok(Cow::Borrowed(input));
    }

    let factor = spread_factor(value);

    Ok(Cow::Owned(map_pixels(input, |pixel| {
        let avg = ((pixel[0] as u32 + pixel[1] as u32 + pixel[2] as u32) / 3) as f32;
        for c in &mut pixel[..3] {
            *c = clamp_channel(factor * (*c as f32 - avg) + avg);
        }
    })))
}

/// Applies `255 * (c / 255) ^ value` to every color channel.
///
/// `value` must be positive. Values above 1 darken, below 1 brighten.
pub fn adjust_gamma(input: &PixelBuffer, value: f32) -> Result<Cow<'_, PixelBuffer>> {
    FilterKind::Gamma.validate(value)?;
    if value == 1.0 || input.is_empty() {
        return Ok(Cow::Borrowed(input));
    }

    let exponent = value as f64;
    let lut: [u8; 256] = std::array::from_fn(|i| {
        (255.0 * (i as f64 / 255.0).powf(exponent))
            .round()
            .clamp(0.0, 255.0) as u8
    });

    Ok(Cow::Owned(map_pixels(input, |pixel| {
        for c in &mut pixel[..3] {
            *c = lut[*c as usize];
        }
    })))
}

/// Copy `input` and run `f` over every pixel of the copy.
/// Row-based parallelism to avoid rayon micro-task overhead.
fn map_pixels<F>(input: &PixelBuffer, f: F) -> PixelBuffer
where
    F: Fn(&mut [u8]) + Sync,
{
    let mut output = input.clone();
    let channels = output.channels();
    let row_bytes = output.row_bytes();
    output
        .data_mut()
        .par_chunks_exact_mut(row_bytes)
        .for_each(|row| {
            for pixel in row.chunks_exact_mut(channels) {
                f(pixel);
            }
        });
    output
}

fn spread_factor(value: f32) -> f32 {
    (255.0 + value) / (255.0 - value)
}

/// Mean of R, G and B over every pixel, truncated. Caller ensures the buffer is non-empty.
fn global_average(input: &PixelBuffer) -> u32 {
    let sum: u64 = input
        .data()
        .par_chunks_exact(input.channels())
        .map(|p| p[0] as u64 + p[1] as u64 + p[2] as u64)
        .sum();
    (sum / (3 * input.pixel_count() as u64)) as u32
}

fn clamp_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
