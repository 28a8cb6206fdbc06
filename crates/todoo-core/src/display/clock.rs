//! Fixed-width countdown readout.

/// Characters in the readout row.
pub const COLUMNS: usize = 20;
/// Leading pad before `HH:MM:SS`.
pub const PAD: usize = 5;
/// Panel row of the readout (text line 9 of a 12-pixel font).
pub const ROW_Y: u16 = 108;
/// Glyph advance in pixels.
pub const GLYPH_WIDTH: u16 = 7;

fn digit(value: u32) -> u8 {
    b'0' + (value % 10) as u8
}

/// Formats `seconds` as a padded `HH:MM:SS` row. Hours clamp at 99.
pub fn countdown_row(seconds: u32) -> [u8; COLUMNS] {
    let mut row = [b' '; COLUMNS];

    let hours = (seconds / 3600).min(99);
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    row[PAD] = digit(hours / 10);
    row[PAD + 1] = digit(hours);
    row[PAD + 2] = b':';
    row[PAD + 3] = digit(minutes / 10);
    row[PAD + 4] = digit(minutes);
    row[PAD + 5] = b':';
    row[PAD + 6] = digit(secs / 10);
    row[PAD + 7] = digit(secs);

    row
}
