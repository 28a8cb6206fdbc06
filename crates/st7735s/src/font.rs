//! 7x12 glyphs for the countdown readout.
//!
//! Row bytes are MSB-leftmost; only digits, the colon separator and a
//! fallback question mark are needed.

/// Glyph cell width in pixels.
pub const WIDTH: u16 = 7;
/// Glyph cell height in pixels.
pub const HEIGHT: u16 = 12;

type Glyph = [u8; HEIGHT as usize];

const BLANK: Glyph = [0; 12];

const DIGITS: [Glyph; 10] = [
    [
        0x00, 0x38, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x38, 0x00, 0x00,
    ],
    [
        0x00, 0x10, 0x30, 0x50, 0x10, 0x10, 0x10, 0x10, 0x10, 0x7C, 0x00, 0x00,
    ],
    [
        0x00, 0x38, 0x44, 0x04, 0x04, 0x08, 0x10, 0x20, 0x40, 0x7C, 0x00, 0x00,
    ],
    [
        0x00, 0x38, 0x44, 0x04, 0x04, 0x18, 0x04, 0x04, 0x44, 0x38, 0x00, 0x00,
    ],
    [
        0x00, 0x08, 0x18, 0x28, 0x48, 0x48, 0x7C, 0x08, 0x08, 0x08, 0x00, 0x00,
    ],
    [
        0x00, 0x7C, 0x40, 0x40, 0x78, 0x04, 0x04, 0x04, 0x44, 0x38, 0x00, 0x00,
    ],
    [
        0x00, 0x38, 0x44, 0x40, 0x78, 0x44, 0x44, 0x44, 0x44, 0x38, 0x00, 0x00,
    ],
    [
        0x00, 0x7C, 0x04, 0x04, 0x08, 0x08, 0x10, 0x10, 0x20, 0x20, 0x00, 0x00,
    ],
    [
        0x00, 0x38, 0x44, 0x44, 0x44, 0x38, 0x44, 0x44, 0x44, 0x38, 0x00, 0x00,
    ],
    [
        0x00, 0x38, 0x44, 0x44, 0x44, 0x3C, 0x04, 0x04, 0x44, 0x38, 0x00, 0x00,
    ],
];

const COLON: Glyph = [
    0x00, 0x00, 0x00, 0x30, 0x30, 0x00, 0x00, 0x30, 0x30, 0x00, 0x00, 0x00,
];

const QUESTION: Glyph = [
    0x00, 0x38, 0x44, 0x44, 0x04, 0x08, 0x10, 0x10, 0x00, 0x10, 0x10, 0x00,
];

/// Looks up the glyph for an ASCII byte. Unmapped bytes render blank.
pub fn glyph(ch: u8) -> &'static Glyph {
    match ch {
        b'0'..=b'9' => &DIGITS[usize::from(ch - b'0')],
        b':' => &COLON,
        b'?' => &QUESTION,
        _ => &BLANK,
    }
}
