//! External flash region map.
//!
//! Built-in pictures live at fixed addresses below the activity area;
//! activity pictures are packed from [`FIRST_ACTIVITY_PIC`] upwards at a
//! fixed stride. All pictures are 16-bit BMP files written verbatim.

/// Scratch picture used by the factory test path.
pub const TEST_PIC: u32 = 0x01_0000;
/// "Connect me" prompt shown while waiting for a companion device.
pub const ADVERTISE_REQUEST_PIC: u32 = 0x01_8042;
/// Picture shown while a schedule transfer is in flight.
pub const SHARING_PIC: u32 = 0x02_0084;
/// Placeholder shown between scheduled activities.
pub const FREE_TIME_PIC: u32 = 0x02_80C6;
/// Boot splash.
pub const BRAND_PIC: u32 = 0x03_0108;
/// Base address of the activity picture array.
pub const FIRST_ACTIVITY_PIC: u32 = 0x03_814A;
/// Distance between consecutive activity pictures.
pub const ACTIVITY_PIC_STRIDE: u32 = 0x3F48;

/// On-disk size of a 128x128 16-bit BMP.
pub const PIC_128X128_BYTES: u32 = 22_834;
/// On-disk size of a 90x90 16-bit BMP.
pub const PIC_90X90_BYTES: u32 = 16_266;
/// Pixel payload of one 90x90 activity picture (2 bytes per pixel).
pub const ACTIVITY_PIC_BYTES: u32 = 16_200;

/// Flash address of the picture bound to activity `index`.
#[inline]
pub const fn activity_pic_addr(index: usize) -> u32 {
    FIRST_ACTIVITY_PIC + index as u32 * ACTIVITY_PIC_STRIDE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_pictures_are_packed_at_stride() {
        assert_eq!(activity_pic_addr(0), FIRST_ACTIVITY_PIC);
        assert_eq!(activity_pic_addr(1), FIRST_ACTIVITY_PIC + 0x3F48);
        assert_eq!(activity_pic_addr(4), FIRST_ACTIVITY_PIC + 4 * 0x3F48);
    }

    #[test]
    fn built_in_regions_fit_a_full_size_picture() {
        let regions = [
            TEST_PIC,
            ADVERTISE_REQUEST_PIC,
            SHARING_PIC,
            FREE_TIME_PIC,
            BRAND_PIC,
            FIRST_ACTIVITY_PIC,
        ];

        for pair in regions.windows(2) {
            assert!(pair[1] - pair[0] >= PIC_128X128_BYTES);
        }

        assert_eq!(ACTIVITY_PIC_STRIDE, ACTIVITY_PIC_BYTES);
        assert_eq!(ACTIVITY_PIC_BYTES, 90 * 90 * 2);
    }
}
