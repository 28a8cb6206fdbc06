#![cfg_attr(not(test), no_std)]

//! ST7735S (128x128 color TFT) driver primitives.

pub mod font;
pub mod protocol;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

/// Driver configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Panel width in pixels.
    pub width: u16,
    /// Panel height in pixels.
    pub height: u16,
    /// MADCTL value fixing scan direction and color order.
    pub madctl: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            madctl: protocol::MADCTL_BMP,
        }
    }
}

/// Driver errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error<SpiErr, DcErr, CsErr> {
    /// SPI transfer failed.
    Spi(SpiErr),
    /// DC pin operation failed.
    Dc(DcErr),
    /// CS pin operation failed.
    Cs(CsErr),
    /// Window falls outside the panel.
    InvalidWindow,
}

pub type DriverResult<SpiErr, DcErr, CsErr> = Result<(), Error<SpiErr, DcErr, CsErr>>;

/// ST7735S driver over a shared SPI bus with dedicated CS and DC pins.
#[derive(Debug)]
pub struct St7735<SPI, DC, CS> {
    spi: SPI,
    dc: DC,
    cs: CS,
    config: Config,
}

impl<SPI, DC, CS> St7735<SPI, DC, CS>
where
    SPI: SpiBus<u8>,
    DC: OutputPin,
    CS: OutputPin,
{
    /// Creates a new driver instance.
    pub fn new(spi: SPI, dc: DC, cs: CS, config: Config) -> Self {
        Self {
            spi,
            dc,
            cs,
            config,
        }
    }

    /// Returns current configuration.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Releases owned bus and pins.
    pub fn release(self) -> (SPI, DC, CS) {
        (self.spi, self.dc, self.cs)
    }

    /// Brings the panel out of reset into 16-bit color mode.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> DriverResult<SPI::Error, DC::Error, CS::Error> {
        self.command(protocol::CMD_SWRESET, &[])?;
        delay.delay_ms(120);

        self.command(protocol::CMD_SLPOUT, &[])?;
        delay.delay_ms(120);

        self.command(protocol::CMD_COLMOD, &[protocol::COLOR_MODE_16BIT])?;
        self.command(protocol::CMD_MADCTL, &[self.config.madctl])?;

        self.command(protocol::CMD_DISPON, &[])?;
        delay.delay_ms(10);

        Ok(())
    }

    /// Opens a pixel write window; the next data bytes go to GRAM.
    pub fn set_window(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    ) -> DriverResult<SPI::Error, DC::Error, CS::Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidWindow);
        }
        if x + width > self.config.width || y + height > self.config.height {
            return Err(Error::InvalidWindow);
        }

        self.command(protocol::CMD_CASET, &protocol::encode_range(x, x + width - 1))?;
        self.command(protocol::CMD_RASET, &protocol::encode_range(y, y + height - 1))?;
        self.command(protocol::CMD_RAMWR, &[])
    }

    /// Streams pixel bytes into the window opened by [`Self::set_window`].
    pub fn write_pixels(&mut self, data: &[u8]) -> DriverResult<SPI::Error, DC::Error, CS::Error> {
        self.cs.set_low().map_err(Error::Cs)?;
        self.dc.set_high().map_err(Error::Dc)?;

        let result = match self.spi.write(data) {
            Ok(()) => self.spi.flush().map_err(Error::Spi),
            Err(e) => Err(Error::Spi(e)),
        };

        self.cs.set_high().map_err(Error::Cs)?;
        result
    }

    /// Draws one font glyph at `(x, y)` in `fg` on `bg`. Glyphs that
    /// do not fit the panel are skipped.
    pub fn draw_char(
        &mut self,
        x: u16,
        y: u16,
        ch: u8,
        fg: u16,
        bg: u16,
    ) -> DriverResult<SPI::Error, DC::Error, CS::Error> {
        if x + font::WIDTH > self.config.width || y + font::HEIGHT > self.config.height {
            return Ok(());
        }

        self.set_window(x, y, font::WIDTH, font::HEIGHT)?;

        let fg = fg.to_be_bytes();
        let bg = bg.to_be_bytes();
        let mut cell = [0u8; (font::WIDTH * font::HEIGHT * 2) as usize];

        for (r, row) in font::glyph(ch).iter().enumerate() {
            for c in 0..usize::from(font::WIDTH) {
                let px = if row & (0x80 >> c) != 0 { fg } else { bg };
                let at = (r * usize::from(font::WIDTH) + c) * 2;
                cell[at..at + 2].copy_from_slice(&px);
            }
        }

        self.write_pixels(&cell)
    }

    fn command(
        &mut self,
        command: u8,
        params: &[u8],
    ) -> DriverResult<SPI::Error, DC::Error, CS::Error> {
        self.cs.set_low().map_err(Error::Cs)?;

        let result = self.command_inner(command, params);

        self.cs.set_high().map_err(Error::Cs)?;
        result
    }

    fn command_inner(
        &mut self,
        command: u8,
        params: &[u8],
    ) -> DriverResult<SPI::Error, DC::Error, CS::Error> {
        self.dc.set_low().map_err(Error::Dc)?;
        self.spi.write(&[command]).map_err(Error::Spi)?;
        self.spi.flush().map_err(Error::Spi)?;

        if !params.is_empty() {
            self.dc.set_high().map_err(Error::Dc)?;
            self.spi.write(params).map_err(Error::Spi)?;
        }

        self.spi.flush().map_err(Error::Spi)
    }
}
