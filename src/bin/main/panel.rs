use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use st7735s::{DriverResult, St7735};
use todoo_core::display::{self, DisplaySurface, RED, WHITE};

/// Adapts the ST7735S driver to the renderer's pixel-sink seam.
///
/// The renderer draws in fixed theme coordinates and lets some shapes
/// run past the panel edge; windows are clamped here and the surplus
/// pixel bytes are swallowed. Glyphs always render white-on-red, the
/// only text the theme draws.
pub(super) struct PanelSurface<SPI, DC, CS> {
    driver: St7735<SPI, DC, CS>,
    window_bytes: usize,
}

impl<SPI, DC, CS> PanelSurface<SPI, DC, CS>
where
    SPI: SpiBus<u8>,
    DC: OutputPin,
    CS: OutputPin,
{
    pub(super) fn new(spi: SPI, dc: DC, cs: CS) -> Self {
        Self {
            driver: St7735::new(spi, dc, cs, st7735s::Config::default()),
            window_bytes: 0,
        }
    }

    pub(super) fn init(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> DriverResult<SPI::Error, DC::Error, CS::Error> {
        self.driver.init(delay)
    }
}

impl<SPI, DC, CS> DisplaySurface for PanelSurface<SPI, DC, CS>
where
    SPI: SpiBus<u8>,
    DC: OutputPin,
    CS: OutputPin,
{
    type Error = st7735s::Error<SPI::Error, DC::Error, CS::Error>;

    fn set_window(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    ) -> Result<(), Self::Error> {
        let width = width.min(display::WIDTH.saturating_sub(x));
        let height = height.min(display::HEIGHT.saturating_sub(y));

        if width == 0 || height == 0 {
            self.window_bytes = 0;
            return Ok(());
        }

        self.driver.set_window(x, y, width, height)?;
        self.window_bytes = usize::from(width) * usize::from(height) * 2;

        Ok(())
    }

    fn push_pixels(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let take = data.len().min(self.window_bytes);
        if take == 0 {
            return Ok(());
        }

        self.driver.write_pixels(&data[..take])?;
        self.window_bytes -= take;

        Ok(())
    }

    fn draw_glyph(&mut self, x: u16, y: u16, glyph: u8) -> Result<(), Self::Error> {
        self.driver.draw_char(x, y, glyph, WHITE, RED)
    }
}
