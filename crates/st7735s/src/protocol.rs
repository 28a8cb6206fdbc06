//! Command set for the ST7735S panel controller.

/// Software reset.
pub const CMD_SWRESET: u8 = 0x01;
/// Exit sleep mode.
pub const CMD_SLPOUT: u8 = 0x11;
/// Display on.
pub const CMD_DISPON: u8 = 0x29;
/// Column address set.
pub const CMD_CASET: u8 = 0x2A;
/// Row address set.
pub const CMD_RASET: u8 = 0x2B;
/// Memory write.
pub const CMD_RAMWR: u8 = 0x2C;
/// Memory access control.
pub const CMD_MADCTL: u8 = 0x36;
/// Interface pixel format.
pub const CMD_COLMOD: u8 = 0x3A;

/// COLMOD parameter: 16 bits per pixel.
pub const COLOR_MODE_16BIT: u8 = 0x05;

/// MADCTL for bottom-up BMP streaming (MX set, BGR order).
pub const MADCTL_BMP: u8 = 0x48;

/// Encodes an inclusive CASET/RASET address range.
#[inline]
pub fn encode_range(start: u16, end: u16) -> [u8; 4] {
    let start = start.to_be_bytes();
    let end = end.to_be_bytes();

    [start[0], start[1], end[0], end[1]]
}
