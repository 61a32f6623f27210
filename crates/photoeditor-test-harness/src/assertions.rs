use photoeditor_core::buffer::PixelBuffer;

/// Assert two buffers have the same dimensions and format.
pub fn assert_same_dimensions(actual: &PixelBuffer, expected: &PixelBuffer) {
    assert_eq!(
        (actual.width(), actual.height(), actual.format()),
        (expected.width(), expected.height(), expected.format()),
        "buffer shape mismatch"
    );
}

/// Assert two buffers are bitwise equal, reporting the first differing pixel.
pub fn assert_pixels_eq(actual: &PixelBuffer, expected: &PixelBuffer) {
    assert_same_dimensions(actual, expected);
    let channels = actual.channels();
    let mismatch = actual
        .data()
        .chunks_exact(channels)
        .zip(expected.data().chunks_exact(channels))
        .position(|(a, e)| a != e);
    if let Some(index) = mismatch {
        let x = index as u32 % actual.width();
        let y = index as u32 / actual.width();
        panic!(
            "pixel ({x}, {y}) differs: got {:?}, expected {:?}",
            actual.pixel(x, y),
            expected.pixel(x, y)
        );
    }
}

/// Assert the alpha channel of `actual` is identical to `original`.
pub fn assert_alpha_untouched(actual: &PixelBuffer, original: &PixelBuffer) {
    assert_same_dimensions(actual, original);
    if !actual.format().has_alpha() {
        return;
    }
    for (i, (a, o)) in actual
        .data()
        .chunks_exact(4)
        .zip(original.data().chunks_exact(4))
        .enumerate()
    {
        assert_eq!(a[3], o[3], "alpha changed at pixel index {i}");
    }
}

/// Assert every color channel of `actual` is `<=` (or `>=`) the matching one in `original`.
pub fn assert_channels_ordered(actual: &PixelBuffer, original: &PixelBuffer, at_most: bool) {
    assert_same_dimensions(actual, original);
    let channels = actual.channels();
    for (i, (a, o)) in actual
        .data()
        .chunks_exact(channels)
        .zip(original.data().chunks_exact(channels))
        .enumerate()
    {
        for c in 0..3 {
            let ok = if at_most { a[c] <= o[c] } else { a[c] >= o[c] };
            assert!(
                ok,
                "pixel index {i} channel {c}: {} vs original {} (at_most={at_most})",
                a[c], o[c]
            );
        }
    }
}
