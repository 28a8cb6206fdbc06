//! Drawing primitives for the countdown frame.
//!
//! The progress indicator is a 20-pixel border band around the picture
//! area. A rounded "cap" sweeps along the band as time elapses; the
//! band behind it is filled solid. Geometry below is in fixed panel
//! coordinates for the 128x128 theme.

use super::{DisplaySurface, RED, WHITE};

/// Cap profile: column/row lengths of the rounded leading edge.
const CAP_LUT: [u16; 20] = [
    11, 10, 9, 8, 7, 6, 6, 5, 5, 5, 5, 5, 5, 6, 6, 7, 8, 9, 10, 11,
];

/// Which band edge a cap is drawn against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

/// Progress buckets, in sweep order from the start of the countdown.
///
/// Thresholds are on percent elapsed: the sweep starts on the right
/// column, turns across the top row and finishes down the left column.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Bucket {
    /// Percent 71..=100: cap descends the left column.
    LeadingSweep,
    /// Percent 70: left column fully lit.
    LeadingFull,
    /// Percent 69: cap parks in the outer corner.
    CornerOuter,
    /// Percent 68: cap parks one pixel into the corner.
    CornerInner,
    /// Percent 31..=67: cap crosses the top row.
    MidSweep,
    /// Percent 30: top row fully lit.
    MidFull,
    /// Percent 29: cap turns into the right column.
    FinalCorner,
    /// Percent 0..=28: cap climbs the right column.
    TailSweep,
}

impl Bucket {
    /// Maps percent elapsed to its bucket.
    pub fn for_percent(percent: u32) -> Self {
        if percent > 70 {
            Bucket::LeadingSweep
        } else if percent > 69 {
            Bucket::LeadingFull
        } else if percent > 68 {
            Bucket::CornerOuter
        } else if percent > 67 {
            Bucket::CornerInner
        } else if percent > 30 {
            Bucket::MidSweep
        } else if percent > 29 {
            Bucket::MidFull
        } else if percent > 28 {
            Bucket::FinalCorner
        } else {
            Bucket::TailSweep
        }
    }
}

/// Percent of the slot already elapsed.
pub fn percent_elapsed(remaining_secs: u32, duration_secs: u32) -> u32 {
    if duration_secs == 0 {
        return 100;
    }

    100 - remaining_secs * 100 / duration_secs
}

/// Fills a solid rectangle. Zero-sized rectangles draw nothing.
pub fn fill_rect<S: DisplaySurface>(
    surface: &mut S,
    x: u16,
    y: u16,
    width: u16,
    height: u16,
    color: u16,
) -> Result<(), S::Error> {
    if width == 0 || height == 0 {
        return Ok(());
    }

    surface.set_window(x, y, width, height)?;

    let px = color.to_be_bytes();
    let mut run = [0u8; 64];
    for pair in run.chunks_exact_mut(2) {
        pair.copy_from_slice(&px);
    }

    let mut remaining = u32::from(width) * u32::from(height) * 2;
    while remaining > 0 {
        let n = remaining.min(run.len() as u32) as usize;
        surface.push_pixels(&run[..n])?;
        remaining -= n as u32;
    }

    Ok(())
}

fn draw_hline<S: DisplaySurface>(
    surface: &mut S,
    x: u16,
    y: u16,
    len: u16,
    color: u16,
) -> Result<(), S::Error> {
    fill_rect(surface, x, y, len, 1, color)
}

fn draw_vline<S: DisplaySurface>(
    surface: &mut S,
    x: u16,
    y: u16,
    len: u16,
    color: u16,
) -> Result<(), S::Error> {
    fill_rect(surface, x, y, 1, len, color)
}

/// Draws the rounded cap with its flat side against `edge`, anchored
/// at `(x, y)`.
pub fn fill_cap<S: DisplaySurface>(
    surface: &mut S,
    x: u16,
    y: u16,
    edge: Edge,
    color: u16,
) -> Result<(), S::Error> {
    for (i, &len) in CAP_LUT.iter().enumerate() {
        let i = i as u16;

        match edge {
            Edge::Top => draw_vline(surface, x + i, y + 14 - len, len, color)?,
            Edge::Bottom => draw_vline(surface, x + i, y, len, color)?,
            Edge::Left => draw_hline(surface, x, y + i, len, color)?,
            Edge::Right => draw_hline(surface, x + 14 - len, y + i, len, color)?,
        }
    }

    Ok(())
}

/// Paints the red border band and the idle cap, the fixed backdrop the
/// time bar sweeps over.
pub fn draw_progress_frame<S: DisplaySurface>(surface: &mut S) -> Result<(), S::Error> {
    fill_rect(surface, 0, 0, 128, 20, RED)?;
    fill_rect(surface, 108, 0, 20, 128, RED)?;
    fill_rect(surface, 20, 108, 88, 20, RED)?;
    fill_rect(surface, 0, 20, 20, 108, RED)?;

    fill_cap(surface, 0, 21, Edge::Bottom, WHITE)?;
    fill_cap(surface, 0, 23, Edge::Bottom, WHITE)
}

/// Redraws the active segment of the progress band for `percent`
/// elapsed.
pub fn draw_time_bar<S: DisplaySurface>(surface: &mut S, percent: u32) -> Result<(), S::Error> {
    match Bucket::for_percent(percent) {
        Bucket::LeadingSweep => {
            let edge = (281 - 13 * percent / 5) as u16;
            fill_cap(surface, 0, edge, Edge::Bottom, WHITE)?;
            fill_rect(surface, 0, 21, 20, edge - 20, WHITE)
        }
        Bucket::LeadingFull => fill_rect(surface, 0, 21, 20, 86, WHITE),
        Bucket::CornerOuter => fill_cap(surface, 0, 108, Edge::Left, WHITE),
        Bucket::CornerInner => fill_cap(surface, 1, 108, Edge::Left, WHITE),
        Bucket::MidSweep => {
            let edge = (175 - 13 * percent / 5) as u16;
            fill_cap(surface, edge, 108, Edge::Left, WHITE)?;
            fill_rect(surface, 0, 108, edge, 20, WHITE)
        }
        Bucket::MidFull => fill_rect(surface, 0, 108, 108, 20, WHITE),
        Bucket::FinalCorner => fill_cap(surface, 108, 114, Edge::Top, WHITE),
        Bucket::TailSweep => {
            let edge = (35 + 13 * percent / 5) as u16;
            fill_cap(surface, 108, edge, Edge::Top, WHITE)?;
            fill_rect(surface, 108, edge + 14, 20, 128 - edge, WHITE)
        }
    }
}
