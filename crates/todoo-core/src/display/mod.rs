//! Countdown display pipeline: panel/flash seams, screen state machine
//! and the per-second service routine.

pub mod bitmap;
pub mod clock;
pub mod render;


use log::warn;

use crate::ingest::IngestEvent;
use crate::layout;
use crate::schedule::{self, ScheduleStore};

use bitmap::BlitError;

/// Panel width in pixels.
pub const WIDTH: u16 = 128;
/// Panel height in pixels.
pub const HEIGHT: u16 = 128;

/// RGB565 white.
pub const WHITE: u16 = 0xFFFF;
/// RGB565 red, the theme's border color.
pub const RED: u16 = 0xF800;

/// Service periods spent on the boot splash.
const BOOT_PERIODS: u8 = 5;

/// Top-left corner of the activity picture area.
const PIC_X: u16 = 20;
const PIC_Y: u16 = 20;

/// Position of the activity-number glyphs.
const INDEX_X: u16 = 64;
const INDEX_Y: u16 = 64;

/// Pixel sink for one panel.
///
/// Implementations own orientation and must clip writes that fall off
/// the panel; the renderer deliberately lets the fixed-width clock row
/// run past the right edge.
pub trait DisplaySurface {
    type Error;

    /// Opens a write window and leaves the panel expecting pixel data.
    fn set_window(&mut self, x: u16, y: u16, width: u16, height: u16)
    -> Result<(), Self::Error>;

    /// Streams big-endian RGB565 pixel pairs into the open window.
    fn push_pixels(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Draws one font glyph with its cell's top-left corner at `(x, y)`.
    fn draw_glyph(&mut self, x: u16, y: u16, glyph: u8) -> Result<(), Self::Error>;
}

/// Read access to flash-resident pictures.
pub trait ImageFetch {
    type Error;

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// Render errors. Picture-fetch failures are soft: the caller logs
/// them and the screen shows a fallback glyph until the retry.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RenderError<SurfErr> {
    Surface(SurfErr),
    Fetch,
}

/// Screen states.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DisplayState {
    /// Brand splash shown for a few periods after power-on.
    Boot,
    /// Waiting for a companion device; "connect me" picture.
    BleRequest,
    /// A transfer is streaming pictures to flash; "sharing" picture.
    ReceivePictures,
    /// Countdown over the published schedule.
    ShowsActivity,
}

/// The screen task: owns its state, the selection cursor and the
/// countdown, renders one frame per service period.
pub struct ScreenTask {
    state: DisplayState,
    needs_config: bool,
    boot_periods: u8,
    cursor: usize,
    duration_secs: u32,
    remaining_secs: u32,
}

impl ScreenTask {
    pub const fn new() -> Self {
        Self {
            state: DisplayState::Boot,
            needs_config: true,
            boot_periods: 0,
            cursor: 0,
            duration_secs: 0,
            remaining_secs: 0,
        }
    }

    pub fn state(&self) -> DisplayState {
        self.state
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Applies a pipeline event from the ingestion path.
    pub fn on_event(&mut self, event: IngestEvent) {
        match event {
            IngestEvent::ScheduleReceived => {
                self.state = DisplayState::ReceivePictures;
            }
            IngestEvent::TransferComplete => {
                self.state = DisplayState::ShowsActivity;
                self.cursor = 0;
            }
        }

        self.needs_config = true;
    }

    /// Renders one frame. Called once per second.
    pub fn service<S, F>(
        &mut self,
        store: &ScheduleStore,
        surface: &mut S,
        fetch: &mut F,
    ) -> Result<(), RenderError<S::Error>>
    where
        S: DisplaySurface,
        F: ImageFetch,
    {
        match self.state {
            DisplayState::Boot => {
                let drawn = self.refresh_backdrop(surface, fetch, 0, 0, layout::BRAND_PIC);

                self.boot_periods += 1;
                if self.boot_periods > BOOT_PERIODS {
                    self.state = DisplayState::BleRequest;
                    self.needs_config = true;
                    self.boot_periods = 0;
                }

                drawn
            }
            DisplayState::BleRequest => {
                self.refresh_backdrop(surface, fetch, 0, 0, layout::ADVERTISE_REQUEST_PIC)
            }
            DisplayState::ReceivePictures => {
                self.refresh_backdrop(surface, fetch, 0, 0, layout::SHARING_PIC)
            }
            DisplayState::ShowsActivity => self.service_activity(store, surface, fetch),
        }
    }

    /// Redraws the full-screen backdrop once per state entry. The flag
    /// stays armed on failure so the picture is retried next period.
    fn refresh_backdrop<S, F>(
        &mut self,
        surface: &mut S,
        fetch: &mut F,
        x: u16,
        y: u16,
        addr: u32,
    ) -> Result<(), RenderError<S::Error>>
    where
        S: DisplaySurface,
        F: ImageFetch,
    {
        if !self.needs_config {
            return Ok(());
        }

        show_picture(surface, fetch, x, y, addr)?;
        self.needs_config = false;

        Ok(())
    }

    fn service_activity<S, F>(
        &mut self,
        store: &ScheduleStore,
        surface: &mut S,
        fetch: &mut F,
    ) -> Result<(), RenderError<S::Error>>
    where
        S: DisplaySurface,
        F: ImageFetch,
    {
        if self.needs_config {
            let Some(activities) = store.activities() else {
                warn!("no published schedule to show");
                return Ok(());
            };

            let selection = schedule::select_activity(activities, store.current_minute(), self.cursor);
            self.cursor = selection.previous;
            self.duration_secs = schedule::slot_duration_seconds(activities, selection);
            self.remaining_secs = self.duration_secs;

            let current = (selection.previous == selection.next)
                .then(|| activities.get(selection.previous))
                .flatten();

            match current {
                Some(activity) => {
                    show_picture(surface, fetch, PIC_X, PIC_Y, activity.pic_addr)?;

                    let index = selection.previous % 100;
                    surface
                        .draw_glyph(INDEX_X, INDEX_Y, b'0' + (index / 10) as u8)
                        .map_err(RenderError::Surface)?;
                    surface
                        .draw_glyph(INDEX_X + 5, INDEX_Y, b'0' + (index % 10) as u8)
                        .map_err(RenderError::Surface)?;
                }
                None => show_picture(surface, fetch, PIC_X, PIC_Y, layout::FREE_TIME_PIC)?,
            }

            render::draw_progress_frame(surface).map_err(RenderError::Surface)?;
            self.needs_config = false;
        }

        if self.remaining_secs > 0 {
            self.remaining_secs -= 1;
        }

        let percent = render::percent_elapsed(self.remaining_secs, self.duration_secs);
        render::draw_time_bar(surface, percent).map_err(RenderError::Surface)?;

        let row = clock::countdown_row(self.remaining_secs);
        for (i, &glyph) in row.iter().enumerate() {
            surface
                .draw_glyph(i as u16 * clock::GLYPH_WIDTH, clock::ROW_Y, glyph)
                .map_err(RenderError::Surface)?;
        }

        if self.remaining_secs == 0 {
            self.needs_config = true;
        }

        Ok(())
    }
}

impl Default for ScreenTask {
    fn default() -> Self {
        Self::new()
    }
}

/// Blits a flash picture, falling back to a `?` glyph when the source
/// is unavailable so a dead flash part never takes the screen down.
fn show_picture<S, F>(
    surface: &mut S,
    fetch: &mut F,
    x: u16,
    y: u16,
    addr: u32,
) -> Result<(), RenderError<S::Error>>
where
    S: DisplaySurface,
    F: ImageFetch,
{
    match bitmap::blit(surface, fetch, x, y, addr) {
        Ok(()) => Ok(()),
        Err(BlitError::Surface(e)) => Err(RenderError::Surface(e)),
        Err(BlitError::Source) => {
            warn!("picture at {addr:#08X} unavailable");
            surface
                .draw_glyph(INDEX_X, INDEX_Y, b'?')
                .map_err(RenderError::Surface)?;
            Err(RenderError::Fetch)
        }
    }
}
