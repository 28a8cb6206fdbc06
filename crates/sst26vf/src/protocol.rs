//! Command set and page arithmetic for SST26VF-series NOR flash.

/// Read data bytes (normal speed).
pub const CMD_READ: u8 = 0x03;
/// Page program.
pub const CMD_PAGE_PROGRAM: u8 = 0x02;
/// Write enable.
pub const CMD_WRITE_ENABLE: u8 = 0x06;
/// 4 KiB sector erase.
pub const CMD_SECTOR_ERASE: u8 = 0x20;
/// 64 KiB block erase.
pub const CMD_BLOCK_ERASE: u8 = 0xD8;
/// Chip erase.
pub const CMD_CHIP_ERASE: u8 = 0xC7;
/// Read status register.
pub const CMD_READ_STATUS: u8 = 0x05;
/// Global block-protection unlock.
pub const CMD_GLOBAL_UNLOCK: u8 = 0x98;

/// Busy flag in the status register.
pub const STATUS_BUSY: u8 = 0x80;

/// Bytes in one program page.
pub const PAGE_SIZE: u32 = 256;
/// Bytes in one erase sector.
pub const SECTOR_SIZE: u32 = 4096;
/// Bytes in one erase block.
pub const BLOCK_SIZE: u32 = 65_536;

/// Builds the header for a command addressing `address` (24-bit, MSB first).
#[inline]
pub fn encode_command(command: u8, address: u32) -> [u8; 4] {
    [
        command,
        (address >> 16) as u8,
        (address >> 8) as u8,
        address as u8,
    ]
}

/// First address of the page containing `address`.
#[inline]
pub const fn page_start(address: u32, page_size: u32) -> u32 {
    address - (address % page_size)
}

/// Number of program pages a write of `len` bytes at `address` touches.
#[inline]
pub const fn pages_spanned(address: u32, len: u32, page_size: u32) -> u32 {
    let mut count = 1 + len / (page_size + 1);

    if (address % page_size) + len > page_size * count {
        count += 1;
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_header_is_big_endian() {
        assert_eq!(encode_command(CMD_READ, 0x03814A), [0x03, 0x03, 0x81, 0x4A]);
        assert_eq!(encode_command(CMD_PAGE_PROGRAM, 0), [0x02, 0, 0, 0]);
    }

    #[test]
    fn page_start_rounds_down() {
        assert_eq!(page_start(0, 256), 0);
        assert_eq!(page_start(255, 256), 0);
        assert_eq!(page_start(256, 256), 256);
        assert_eq!(page_start(700, 256), 512);
    }

    #[test]
    fn pages_spanned_counts_boundaries() {
        // Aligned write of exactly one page.
        assert_eq!(pages_spanned(0, 256, 256), 1);
        // Small write straddling a page boundary.
        assert_eq!(pages_spanned(250, 20, 256), 2);
        // Aligned write spilling into a third page.
        assert_eq!(pages_spanned(0, 600, 256), 3);

        assert_eq!(pages_spanned(0, 1, 256), 1);
        assert_eq!(pages_spanned(255, 1, 256), 1);
        assert_eq!(pages_spanned(255, 2, 256), 2);
        assert_eq!(pages_spanned(0, 512, 256), 2);
    }
}
