use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use sst26vf::{DriverResult, Sst26, protocol};
use todoo_core::display::ImageFetch;
use todoo_core::layout;

/// The SST26 part behind the renderer's picture-fetch seam.
pub(super) struct PictureFlash<SPI, D> {
    flash: Sst26<SPI, D>,
}

impl<SPI, D> PictureFlash<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    pub(super) fn new(spi: SPI, delay: D) -> Self {
        Self {
            flash: Sst26::new(spi, delay, sst26vf::Config::default()),
        }
    }

    pub(super) fn init(&mut self) -> DriverResult<SPI::Error> {
        self.flash.init()
    }

    pub(super) fn flash(&mut self) -> &mut Sst26<SPI, D> {
        &mut self.flash
    }
}

impl<SPI, D> ImageFetch for PictureFlash<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    type Error = sst26vf::Error<SPI::Error>;

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.flash.read(addr, buf)
    }
}

/// Write cursor for the activity-picture region.
///
/// Pictures stream in as FIFO chunks with no addresses of their own;
/// the cursor places them back to back from the first activity slot.
/// Sectors are erased just ahead of the cursor, so a restart mid-way
/// through a transfer simply rewinds and erases again.
#[derive(Clone, Copy, Debug)]
pub(super) struct FlashWriter {
    cursor: u32,
    erased_until: u32,
}

impl FlashWriter {
    pub(super) const fn new() -> Self {
        Self {
            cursor: layout::FIRST_ACTIVITY_PIC,
            erased_until: layout::FIRST_ACTIVITY_PIC & !(protocol::SECTOR_SIZE - 1),
        }
    }

    /// Rewinds to the start of the activity region for a new transfer.
    pub(super) fn restart(&mut self) {
        *self = Self::new();
    }

    pub(super) fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Programs one chunk at the cursor, erasing ahead as needed.
    ///
    /// The cursor advances by the chunk's length even on failure so a
    /// dropped chunk cannot shift every later picture out of its slot.
    pub(super) fn write_chunk<SPI, D>(
        &mut self,
        flash: &mut Sst26<SPI, D>,
        chunk: &[u8],
    ) -> DriverResult<SPI::Error>
    where
        SPI: SpiDevice,
        D: DelayNs,
    {
        let end = self.cursor + chunk.len() as u32;
        let result = self.erase_and_program(flash, end, chunk);
        self.cursor = end;
        result
    }

    fn erase_and_program<SPI, D>(
        &mut self,
        flash: &mut Sst26<SPI, D>,
        end: u32,
        chunk: &[u8],
    ) -> DriverResult<SPI::Error>
    where
        SPI: SpiDevice,
        D: DelayNs,
    {
        while self.erased_until < end {
            flash.erase_sector(self.erased_until)?;
            self.erased_until += protocol::SECTOR_SIZE;
        }
        flash.write(self.cursor, chunk)
    }
}
