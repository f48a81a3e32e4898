// src/image/footer.rs
//
// Fixed-disk VHD footer. All multi-byte fields are big-endian.

use crate::disk_formats::DiskGeometry;
use crate::error::{ImageError, Result};
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use std::io::{Cursor, Read};
use time::OffsetDateTime;

pub const FOOTER_SIZE: usize = 512;

pub const COOKIE: [u8; 8] = *b"conectix";
pub const FEATURES: u32 = 0x0000_0002;
pub const FORMAT_VERSION: u32 = 0x0001_0000;
/// No block allocation table follows.
pub const FIXED_DATA_OFFSET: u64 = u64::MAX;
pub const CREATOR_APP: [u8; 4] = *b"vhdt";
pub const CREATOR_VERSION: u32 = 0x0001_0000;
pub const CREATOR_HOST_OS: [u8; 4] = *b"Wi2k";
pub const DISK_TYPE_FIXED: u32 = 2;

/// Seconds between 1970-01-01 and 2000-01-01 UTC.
pub const VHD_EPOCH_OFFSET: i64 = 946_684_800;

pub const TIMESTAMP_OFFSET: usize = 24;
pub const CHECKSUM_OFFSET: usize = 64;

/// Source of "now" for the footer timestamp.
pub trait Clock {
    /// Seconds since the Unix epoch.
    fn unix_now(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_now(&self) -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }
}

/// Always reports the same instant.
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn unix_now(&self) -> i64 {
        self.0
    }
}

/// Converts Unix seconds to seconds since the VHD epoch, clamped to the u32 field.
pub fn vhd_timestamp(unix_seconds: i64) -> u32 {
    let since = unix_seconds.saturating_sub(VHD_EPOCH_OFFSET);
    since.clamp(0, u32::MAX as i64) as u32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VhdFooter {
    pub cookie: [u8; 8],
    pub features: u32,
    pub format_version: u32,
    pub data_offset: u64,
    pub timestamp: u32,
    pub creator_app: [u8; 4],
    pub creator_version: u32,
    pub creator_host_os: [u8; 4],
    pub original_size: u64,
    pub current_size: u64,
    pub geometry: DiskGeometry,
    pub disk_type: u32,
    pub checksum: u32,
    pub unique_id: [u8; 16],
}

impl VhdFooter {
    /// Footer for a fixed disk of `size` bytes. The checksum is filled in by `encode`.
    pub fn new_fixed(size: u64, geometry: DiskGeometry, clock: &dyn Clock) -> Self {
        VhdFooter {
            cookie: COOKIE,
            features: FEATURES,
            format_version: FORMAT_VERSION,
            data_offset: FIXED_DATA_OFFSET,
            timestamp: vhd_timestamp(clock.unix_now()),
            creator_app: CREATOR_APP,
            creator_version: CREATOR_VERSION,
            creator_host_os: CREATOR_HOST_OS,
            original_size: size,
            current_size: size,
            geometry,
            disk_type: DISK_TYPE_FIXED,
            checksum: 0,
            unique_id: [0; 16],
        }
    }

    /// Lays out every field, then stores the checksum computed over the result.
    pub fn encode(&self) -> [u8; FOOTER_SIZE] {
        let mut buf = [0u8; FOOTER_SIZE];
        buf[0..8].copy_from_slice(&self.cookie);
        BigEndian::write_u32(&mut buf[8..12], self.features);
        BigEndian::write_u32(&mut buf[12..16], self.format_version);
        BigEndian::write_u64(&mut buf[16..24], self.data_offset);
        BigEndian::write_u32(&mut buf[24..28], self.timestamp);
        buf[28..32].copy_from_slice(&self.creator_app);
        BigEndian::write_u32(&mut buf[32..36], self.creator_version);
        buf[36..40].copy_from_slice(&self.creator_host_os);
        BigEndian::write_u64(&mut buf[40..48], self.original_size);
        BigEndian::write_u64(&mut buf[48..56], self.current_size);
        BigEndian::write_u32(&mut buf[56..60], self.geometry.packed());
        BigEndian::write_u32(&mut buf[60..64], self.disk_type);
        buf[68..84].copy_from_slice(&self.unique_id);

        let checksum = compute_checksum(&buf);
        BigEndian::write_u32(&mut buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4], checksum);
        buf
    }

    /// Parses a footer and checks its cookie and checksum.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() != FOOTER_SIZE {
            return Err(ImageError::InvalidFooter(format!("expected {} bytes, got {}", FOOTER_SIZE, raw.len())));
        }
        let mut cursor = Cursor::new(raw);
        let mut cookie = [0u8; 8];
        cursor.read_exact(&mut cookie)?;
        if cookie != COOKIE {
            return Err(ImageError::InvalidFooter(format!(
                "bad cookie {:?}",
                String::from_utf8_lossy(&cookie)
            )));
        }
        let features = cursor.read_u32::<BigEndian>()?;
        let format_version = cursor.read_u32::<BigEndian>()?;
        let data_offset = cursor.read_u64::<BigEndian>()?;
        let timestamp = cursor.read_u32::<BigEndian>()?;
        let mut creator_app = [0u8; 4];
        cursor.read_exact(&mut creator_app)?;
        let creator_version = cursor.read_u32::<BigEndian>()?;
        let mut creator_host_os = [0u8; 4];
        cursor.read_exact(&mut creator_host_os)?;
        let original_size = cursor.read_u64::<BigEndian>()?;
        let current_size = cursor.read_u64::<BigEndian>()?;
        let geometry = DiskGeometry::unpack(cursor.read_u32::<BigEndian>()?);
        let disk_type = cursor.read_u32::<BigEndian>()?;
        let checksum = cursor.read_u32::<BigEndian>()?;
        let mut unique_id = [0u8; 16];
        cursor.read_exact(&mut unique_id)?;

        let expected = compute_checksum(raw);
        if checksum != expected {
            return Err(ImageError::InvalidFooter(format!(
                "checksum 0x{:08X} does not match computed 0x{:08X}",
                checksum, expected
            )));
        }

        Ok(VhdFooter {
            cookie,
            features,
            format_version,
            data_offset,
            timestamp,
            creator_app,
            creator_version,
            creator_host_os,
            original_size,
            current_size,
            geometry,
            disk_type,
            checksum,
            unique_id,
        })
    }

    /// Footer timestamp as a calendar time.
    pub fn created_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.timestamp as i64 + VHD_EPOCH_OFFSET).ok()
    }
}

/// One's complement of the byte sum, with the checksum field counted as zero.
pub fn compute_checksum(footer: &[u8]) -> u32 {
    let sum: u32 = footer
        .iter()
        .enumerate()
        .filter(|(i, _)| !(CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4).contains(i))
        .map(|(_, &b)| b as u32)
        .sum();
    !sum
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOMETRY: DiskGeometry = DiskGeometry::new(20, 16, 63);
    // 2024-01-01T00:00:00Z
    const NOW: i64 = 1_704_067_200;

    fn footer_at(unix: i64) -> [u8; FOOTER_SIZE] {
        VhdFooter::new_fixed(GEOMETRY.total_size(), GEOMETRY, &FixedClock(unix)).encode()
    }

    #[test]
    fn writes_fields_at_published_offsets() {
        let raw = footer_at(NOW);
        assert_eq!(&raw[0..8], b"conectix");
        assert_eq!(BigEndian::read_u32(&raw[8..12]), 2);
        assert_eq!(BigEndian::read_u32(&raw[12..16]), 0x0001_0000);
        assert_eq!(BigEndian::read_u64(&raw[16..24]), u64::MAX);
        assert_eq!(BigEndian::read_u32(&raw[24..28]), (NOW - VHD_EPOCH_OFFSET) as u32);
        assert_eq!(&raw[28..32], b"vhdt");
        assert_eq!(&raw[36..40], b"Wi2k");
        assert_eq!(BigEndian::read_u64(&raw[40..48]), 10_321_920);
        assert_eq!(BigEndian::read_u64(&raw[48..56]), 10_321_920);
        assert_eq!(BigEndian::read_u32(&raw[56..60]), 0x0014_103F);
        assert_eq!(BigEndian::read_u32(&raw[60..64]), DISK_TYPE_FIXED);
        assert!(raw[68..].iter().all(|&b| b == 0));
    }

    #[test]
    fn stored_checksum_matches_recomputed_sum() {
        let raw = footer_at(NOW);
        let stored = BigEndian::read_u32(&raw[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4]);

        let mut zeroed = raw;
        zeroed[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].fill(0);
        let sum: u32 = zeroed.iter().map(|&b| b as u32).sum();
        assert_eq!(stored, !sum);
    }

    #[test]
    fn clock_only_changes_timestamp_and_checksum() {
        let a = footer_at(NOW);
        let b = footer_at(NOW + 3_600);
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            let volatile = (TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 4).contains(&i)
                || (CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4).contains(&i);
            if !volatile {
                assert_eq!(x, y, "byte {} differs", i);
            }
        }
        assert_ne!(&a[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 4], &b[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 4]);
        assert_eq!(footer_at(NOW), footer_at(NOW));
    }

    #[test]
    fn timestamp_clamps_to_field_range() {
        assert_eq!(vhd_timestamp(0), 0);
        assert_eq!(vhd_timestamp(VHD_EPOCH_OFFSET), 0);
        assert_eq!(vhd_timestamp(VHD_EPOCH_OFFSET + 42), 42);
        assert_eq!(vhd_timestamp(i64::MAX), u32::MAX);
    }

    #[test]
    fn decode_reads_back_encoded_footer() {
        let footer = VhdFooter::new_fixed(GEOMETRY.total_size(), GEOMETRY, &FixedClock(NOW));
        let decoded = VhdFooter::decode(&footer.encode()).unwrap();
        assert_eq!(decoded.geometry, GEOMETRY);
        assert_eq!(decoded.current_size, GEOMETRY.total_size());
        assert_eq!(decoded.created_at().map(|t| t.unix_timestamp()), Some(NOW));
    }

    #[test]
    fn decode_rejects_corruption() {
        let mut raw = footer_at(NOW);
        raw[100] = 1;
        assert!(matches!(VhdFooter::decode(&raw), Err(ImageError::InvalidFooter(_))));

        let mut raw = footer_at(NOW);
        raw[0] = b'X';
        assert!(matches!(VhdFooter::decode(&raw), Err(ImageError::InvalidFooter(_))));

        assert!(VhdFooter::decode(&[0u8; 100]).is_err());
    }
}
