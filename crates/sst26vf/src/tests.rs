use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{ErrorType, Operation, SpiDevice};

use super::{Config, Error, Sst26};
use crate::protocol::{
    CMD_BLOCK_ERASE, CMD_CHIP_ERASE, CMD_GLOBAL_UNLOCK, CMD_PAGE_PROGRAM, CMD_READ,
    CMD_READ_STATUS, CMD_SECTOR_ERASE, CMD_WRITE_ENABLE, BLOCK_SIZE, PAGE_SIZE, SECTOR_SIZE,
    STATUS_BUSY,
};

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Behavioral model of the part: memory array plus write-enable latch
/// and a busy counter decremented by status polls.
struct FlashModel {
    mem: Vec<u8>,
    write_enabled: bool,
    busy_polls: u32,
    stuck_busy: bool,
}

impl FlashModel {
    fn new(len: usize) -> Self {
        Self {
            mem: vec![0xFF; len],
            write_enabled: false,
            busy_polls: 0,
            stuck_busy: false,
        }
    }
}

impl ErrorType for FlashModel {
    type Error = core::convert::Infallible;
}

impl SpiDevice<u8> for FlashModel {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let (command, address) = match &operations[0] {
            Operation::Write(bytes) => {
                let address = if bytes.len() >= 4 {
                    u32::from(bytes[1]) << 16 | u32::from(bytes[2]) << 8 | u32::from(bytes[3])
                } else {
                    0
                };
                (bytes[0], address as usize)
            }
            _ => panic!("transaction must start with a command write"),
        };

        match command {
            CMD_READ_STATUS => {
                let busy = self.stuck_busy || self.busy_polls > 0;
                self.busy_polls = self.busy_polls.saturating_sub(1);

                if let Operation::Read(buf) = &mut operations[1] {
                    buf[0] = if busy { STATUS_BUSY } else { 0 };
                }
            }
            CMD_READ => {
                if let Operation::Read(buf) = &mut operations[1] {
                    buf.copy_from_slice(&self.mem[address..address + buf.len()]);
                }
            }
            CMD_WRITE_ENABLE => self.write_enabled = true,
            CMD_GLOBAL_UNLOCK => {}
            CMD_PAGE_PROGRAM => {
                assert!(self.write_enabled, "page program without write enable");
                self.write_enabled = false;

                if let Operation::Write(data) = &operations[1] {
                    self.mem[address..address + data.len()].copy_from_slice(data);
                }

                self.busy_polls = 2;
            }
            CMD_SECTOR_ERASE => {
                assert!(self.write_enabled);
                self.write_enabled = false;

                let start = address - address % SECTOR_SIZE as usize;
                self.mem[start..start + SECTOR_SIZE as usize].fill(0xFF);
                self.busy_polls = 3;
            }
            CMD_BLOCK_ERASE => {
                assert!(self.write_enabled);
                self.write_enabled = false;

                let start = address - address % BLOCK_SIZE as usize;
                let end = (start + BLOCK_SIZE as usize).min(self.mem.len());
                self.mem[start..end].fill(0xFF);
                self.busy_polls = 3;
            }
            CMD_CHIP_ERASE => {
                assert!(self.write_enabled);
                self.write_enabled = false;

                self.mem.fill(0xFF);
                self.busy_polls = 5;
            }
            other => panic!("unexpected command {other:#04X}"),
        }

        Ok(())
    }
}

fn small_config() -> Config {
    Config {
        page_count: 16,
        poll_interval_us: 1,
        max_polls: 64,
    }
}

fn small_driver() -> Sst26<FlashModel, NoDelay> {
    let model = FlashModel::new(16 * PAGE_SIZE as usize);
    Sst26::new(model, NoDelay, small_config())
}

#[test]
fn init_unlocks_and_reports_stuck_part() {
    let mut driver = small_driver();
    assert_eq!(driver.init(), Ok(()));

    let mut model = FlashModel::new(16 * PAGE_SIZE as usize);
    model.stuck_busy = true;
    let mut driver = Sst26::new(model, NoDelay, small_config());
    assert_eq!(driver.init(), Err(Error::Unavailable));
}

#[test]
fn unaligned_write_preserves_neighboring_bytes() {
    let mut model = FlashModel::new(16 * PAGE_SIZE as usize);
    for (i, byte) in model.mem.iter_mut().enumerate() {
        *byte = i as u8;
    }

    let mut driver = Sst26::new(model, NoDelay, small_config());
    driver.write(250, &[0xAB; 20]).unwrap();

    let (model, _) = driver.release();
    assert!(model.mem[250..270].iter().all(|&b| b == 0xAB));
    assert_eq!(model.mem[249], 249);
    assert_eq!(model.mem[270], (270 % 256) as u8);
}

#[test]
fn multi_page_write_reads_back_intact() {
    let mut driver = small_driver();

    let data: Vec<u8> = (0..600u32).map(|i| (i * 7) as u8).collect();
    driver.write(128, &data).unwrap();

    let mut back = vec![0u8; data.len()];
    driver.read(128, &mut back).unwrap();
    assert_eq!(back, data);
}

#[test]
fn erases_reset_to_all_ones() {
    let mut driver = small_driver();

    driver.write(0, &[0x00; 64]).unwrap();
    driver.erase_sector(10).unwrap();

    let mut back = [0u8; 64];
    driver.read(0, &mut back).unwrap();
    assert!(back.iter().all(|&b| b == 0xFF));
}

#[test]
fn stuck_busy_write_times_out() {
    let mut model = FlashModel::new(16 * PAGE_SIZE as usize);
    model.stuck_busy = true;

    let mut driver = Sst26::new(model, NoDelay, small_config());
    assert_eq!(driver.write(0, &[1, 2, 3]), Err(Error::Timeout));
}

#[test]
fn out_of_range_access_is_rejected() {
    let mut driver = small_driver();
    let capacity = driver.capacity();

    let mut buf = [0u8; 8];
    assert_eq!(driver.read(capacity, &mut buf), Err(Error::OutOfBounds));
    assert_eq!(driver.write(capacity - 4, &buf), Err(Error::OutOfBounds));
    assert_eq!(driver.read(capacity - 8, &mut buf), Ok(()));
}
