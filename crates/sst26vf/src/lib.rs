#![cfg_attr(not(test), no_std)]

//! SST26VF-series (SuperFlash) SPI NOR flash driver primitives.

pub mod protocol;

#[cfg(test)]
mod tests;

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};
use embedded_storage::{ReadStorage, Storage};

/// Driver configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Number of 256-byte program pages on the part.
    pub page_count: u32,
    /// Delay between status polls while the part is busy.
    pub poll_interval_us: u32,
    /// Maximum number of status polls before a stuck part is reported.
    pub max_polls: u32,
}

impl Default for Config {
    fn default() -> Self {
        // 64 Mbit part; 3 s of polling covers a worst-case chip erase.
        Self {
            page_count: 32_768,
            poll_interval_us: 100,
            max_polls: 30_000,
        }
    }
}

/// Driver errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error<SpiErr> {
    /// SPI transaction failed.
    Spi(SpiErr),
    /// Part did not respond as ready during bring-up.
    Unavailable,
    /// Part stayed busy past the configured poll budget.
    Timeout,
    /// Address range falls outside the part.
    OutOfBounds,
}

pub type DriverResult<SpiErr> = Result<(), Error<SpiErr>>;

/// SST26VF driver.
///
/// Writes go through a page-granular read-modify-write so callers can
/// treat the part as byte addressable between erases.
#[derive(Debug)]
pub struct Sst26<SPI, D> {
    spi: SPI,
    delay: D,
    config: Config,
    page: [u8; protocol::PAGE_SIZE as usize],
}

impl<SPI, D> Sst26<SPI, D>
where
    SPI: SpiDevice<u8>,
    D: DelayNs,
{
    /// Creates a new driver instance. No bus traffic happens here.
    pub fn new(spi: SPI, delay: D, config: Config) -> Self {
        Self {
            spi,
            delay,
            config,
            page: [0; protocol::PAGE_SIZE as usize],
        }
    }

    /// Returns current configuration.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Releases the owned bus and delay.
    pub fn release(self) -> (SPI, D) {
        (self.spi, self.delay)
    }

    /// Addressable size in bytes.
    pub fn capacity(&self) -> u32 {
        self.config.page_count * protocol::PAGE_SIZE
    }

    /// Probes the part and lifts global block protection.
    ///
    /// Any failure here is reported as [`Error::Unavailable`] so callers
    /// can park the storage path instead of retrying blind.
    pub fn init(&mut self) -> DriverResult<SPI::Error> {
        Self::wait_ready(&mut self.spi, &mut self.delay, &self.config)
            .map_err(|_| Error::Unavailable)?;

        self.spi
            .write(&[protocol::CMD_GLOBAL_UNLOCK])
            .map_err(|_| Error::Unavailable)
    }

    /// Reads `buf.len()` bytes starting at `address`.
    pub fn read(&mut self, address: u32, buf: &mut [u8]) -> DriverResult<SPI::Error> {
        self.check_range(address, buf.len())?;

        if buf.is_empty() {
            return Ok(());
        }

        Self::wait_ready(&mut self.spi, &mut self.delay, &self.config)?;
        Self::read_at(&mut self.spi, address, buf)
    }

    /// Programs `data` starting at `address`, page by page.
    ///
    /// Partial pages are read back, patched and reprogrammed, so bytes
    /// outside the written range keep their previous contents.
    pub fn write(&mut self, address: u32, data: &[u8]) -> DriverResult<SPI::Error> {
        self.check_range(address, data.len())?;

        if data.is_empty() {
            return Ok(());
        }

        let page_size = protocol::PAGE_SIZE;
        let mut pages = protocol::pages_spanned(address, data.len() as u32, page_size);
        let mut cursor = address;
        let mut offset = 0usize;
        let mut remaining = data.len();

        while pages > 0 {
            Self::wait_ready(&mut self.spi, &mut self.delay, &self.config)?;

            let start = protocol::page_start(cursor, page_size);
            let lead = (cursor - start) as usize;
            let amount = remaining.min(page_size as usize - lead);

            if lead == 0 && amount == page_size as usize {
                Self::program_page(&mut self.spi, start, &data[offset..offset + amount])?;
            } else {
                Self::read_at(&mut self.spi, start, &mut self.page)?;
                self.page[lead..lead + amount].copy_from_slice(&data[offset..offset + amount]);
                Self::program_page(&mut self.spi, start, &self.page)?;
            }

            cursor = start + page_size;
            offset += amount;
            remaining -= amount;
            pages -= 1;
        }

        Ok(())
    }

    /// Erases the 4 KiB sector containing `address`.
    pub fn erase_sector(&mut self, address: u32) -> DriverResult<SPI::Error> {
        self.check_range(address, 0)?;
        self.erase_command(protocol::CMD_SECTOR_ERASE, Some(address))
    }

    /// Erases the 64 KiB block containing `address`.
    pub fn erase_block(&mut self, address: u32) -> DriverResult<SPI::Error> {
        self.check_range(address, 0)?;
        self.erase_command(protocol::CMD_BLOCK_ERASE, Some(address))
    }

    /// Erases the whole part.
    pub fn erase_chip(&mut self) -> DriverResult<SPI::Error> {
        self.erase_command(protocol::CMD_CHIP_ERASE, None)
    }

    fn erase_command(&mut self, command: u8, address: Option<u32>) -> DriverResult<SPI::Error> {
        Self::wait_ready(&mut self.spi, &mut self.delay, &self.config)?;
        self.spi
            .write(&[protocol::CMD_WRITE_ENABLE])
            .map_err(Error::Spi)?;

        match address {
            Some(address) => self
                .spi
                .write(&protocol::encode_command(command, address))
                .map_err(Error::Spi)?,
            None => self.spi.write(&[command]).map_err(Error::Spi)?,
        }

        Self::wait_ready(&mut self.spi, &mut self.delay, &self.config)
    }

    fn check_range(&self, address: u32, len: usize) -> DriverResult<SPI::Error> {
        let capacity = self.capacity();

        if address >= capacity || len as u64 > u64::from(capacity - address) {
            return Err(Error::OutOfBounds);
        }

        Ok(())
    }

    fn read_status(spi: &mut SPI) -> Result<u8, Error<SPI::Error>> {
        let mut status = [0u8];
        let mut ops = [
            Operation::Write(&[protocol::CMD_READ_STATUS]),
            Operation::Read(&mut status),
        ];
        spi.transaction(&mut ops).map_err(Error::Spi)?;

        Ok(status[0])
    }

    fn wait_ready(spi: &mut SPI, delay: &mut D, config: &Config) -> DriverResult<SPI::Error> {
        for _ in 0..config.max_polls {
            if Self::read_status(spi)? & protocol::STATUS_BUSY == 0 {
                return Ok(());
            }

            delay.delay_us(config.poll_interval_us);
        }

        Err(Error::Timeout)
    }

    fn read_at(spi: &mut SPI, address: u32, buf: &mut [u8]) -> DriverResult<SPI::Error> {
        let header = protocol::encode_command(protocol::CMD_READ, address);
        let mut ops = [Operation::Write(&header), Operation::Read(buf)];
        spi.transaction(&mut ops).map_err(Error::Spi)
    }

    fn program_page(spi: &mut SPI, address: u32, data: &[u8]) -> DriverResult<SPI::Error> {
        spi.write(&[protocol::CMD_WRITE_ENABLE])
            .map_err(Error::Spi)?;

        let header = protocol::encode_command(protocol::CMD_PAGE_PROGRAM, address);
        let mut ops = [Operation::Write(&header), Operation::Write(data)];
        spi.transaction(&mut ops).map_err(Error::Spi)
    }
}

impl<SPI, D> ReadStorage for Sst26<SPI, D>
where
    SPI: SpiDevice<u8>,
    D: DelayNs,
{
    type Error = Error<SPI::Error>;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        Sst26::read(self, offset, bytes)
    }

    fn capacity(&self) -> usize {
        Sst26::capacity(self) as usize
    }
}

impl<SPI, D> Storage for Sst26<SPI, D>
where
    SPI: SpiDevice<u8>,
    D: DelayNs,
{
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        Sst26::write(self, offset, bytes)
    }
}
