//! Flash-resident BMP streaming.
//!
//! Pictures are stored as 16-bit BMP files. Only the header fields the
//! panel needs are parsed; pixel data is streamed through a small
//! buffer straight into the display window, byte-swapped to the
//! panel's big-endian RGB565 order.

use super::{DisplaySurface, ImageFetch, HEIGHT, WIDTH};

/// Bytes fetched to cover the BMP header.
pub const HEADER_BYTES: usize = 100;

const STREAM_BYTES: usize = 64;

/// Blit errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BlitError<SurfErr> {
    /// Display write failed.
    Surface(SurfErr),
    /// Picture could not be fetched or is not a usable BMP.
    Source,
}

/// Parsed BMP header fields.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BmpInfo {
    pub width: u16,
    pub height: u16,
    /// File offset of the pixel array.
    pub pixel_offset: u32,
    /// Length of the pixel array.
    pub pixel_bytes: u32,
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

impl BmpInfo {
    /// Parses the fields used for blitting. Returns `None` when the
    /// header is not a BMP that fits the panel.
    pub fn parse(header: &[u8]) -> Option<Self> {
        if header.len() < 54 || header[0] != b'B' || header[1] != b'M' {
            return None;
        }

        let file_size = read_u32(header, 2);
        let pixel_offset = read_u32(header, 10);
        let width = read_u32(header, 18);
        let height = read_u32(header, 22);

        if width == 0 || height == 0 {
            return None;
        }
        if width > u32::from(WIDTH) || height > u32::from(HEIGHT) {
            return None;
        }
        if pixel_offset >= file_size {
            return None;
        }

        Some(Self {
            width: width as u16,
            height: height as u16,
            pixel_offset,
            pixel_bytes: file_size - pixel_offset,
        })
    }
}

/// Streams the BMP at flash address `addr` into the panel with its
/// bottom-left corner placed `y` pixels up from the panel bottom.
///
/// The panel scans bitmaps bottom-up, so the window row is remapped
/// from the caller's top-down `y`.
pub fn blit<S, F>(
    surface: &mut S,
    fetch: &mut F,
    x: u16,
    y: u16,
    addr: u32,
) -> Result<(), BlitError<S::Error>>
where
    S: DisplaySurface,
    F: ImageFetch,
{
    let mut header = [0u8; HEADER_BYTES];
    fetch
        .read(addr, &mut header)
        .map_err(|_| BlitError::Source)?;

    let info = BmpInfo::parse(&header).ok_or(BlitError::Source)?;

    let row = HEIGHT
        .checked_sub(y + info.height)
        .ok_or(BlitError::Source)?;
    surface
        .set_window(x, row, info.width, info.height)
        .map_err(BlitError::Surface)?;

    let mut buf = [0u8; STREAM_BYTES];
    let mut offset = addr + info.pixel_offset;
    let mut remaining = info.pixel_bytes;

    while remaining > 0 {
        let n = remaining.min(STREAM_BYTES as u32) as usize;

        fetch
            .read(offset, &mut buf[..n])
            .map_err(|_| BlitError::Source)?;

        for pair in buf[..n].chunks_exact_mut(2) {
            pair.swap(0, 1);
        }

        surface
            .push_pixels(&buf[..n])
            .map_err(BlitError::Surface)?;

        offset += n as u32;
        remaining -= n as u32;
    }

    Ok(())
}
