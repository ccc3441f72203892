//! Unit conversions between SpreadsheetML dimensions and screen pixels
//!
//! - 9525 EMUs = 1 pixel (at 96 DPI)
//! - column widths are stored in characters of the default font's maximum
//!   digit width (7 px for Calibri 11)
//! - row heights are stored in points (72 per inch)

/// EMUs per pixel at 96 DPI (9525)
pub const EMU_PER_PIXEL: i64 = 9525;

/// Maximum digit width of the default font, in pixels
pub const MAX_DIGIT_WIDTH_PX: f64 = 7.0;

/// Pixel width of a column without an explicit width (8.43 characters)
pub const DEFAULT_COLUMN_WIDTH_PX: u32 = 64;

/// Height in points of a row without an explicit height
pub const DEFAULT_ROW_HEIGHT_PT: f64 = 15.0;

/// Convert pixels to EMUs at 96 DPI
pub fn pixels_to_emu(pixels: u32) -> i64 {
    pixels as i64 * EMU_PER_PIXEL
}

/// Convert EMUs to pixels at 96 DPI
pub fn emu_to_pixels(emu: i64) -> i64 {
    (emu as f64 / EMU_PER_PIXEL as f64).round() as i64
}

/// Pixel width of a stored `<col width="..">` value
pub fn column_width_to_pixels(width: f64) -> u32 {
    if width <= 0.0 {
        return 0;
    }
    let padding = (128.0 / MAX_DIGIT_WIDTH_PX).trunc();
    (((256.0 * width + padding) / 256.0) * MAX_DIGIT_WIDTH_PX).trunc() as u32
}

/// Smallest stored column width that renders at least `pixels` wide
pub fn pixels_to_column_width(pixels: u32) -> f64 {
    let mut width = (pixels as f64 * 256.0 / MAX_DIGIT_WIDTH_PX).trunc() / 256.0;
    // Step up in 1/256 increments until the rendered width reaches the target
    while column_width_to_pixels(width) < pixels {
        width += 1.0 / 256.0;
    }
    width
}

/// Pixel height of a row height in points
pub fn points_to_pixels(points: f64) -> u32 {
    if points <= 0.0 {
        return 0;
    }
    (points * 96.0 / 72.0).round() as u32
}

/// Row height in points for a pixel height
pub fn pixels_to_points(pixels: u32) -> f64 {
    pixels as f64 * 72.0 / 96.0
}
