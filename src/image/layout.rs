// src/image/layout.rs

use super::fs_table::{FsFile, FsTable};
use crate::disk_formats::{DiskGeometry, SECTOR_SIZE};
use crate::error::{ImageError, Result};

pub const BOOT_SECTOR_SIZE: usize = SECTOR_SIZE;
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];

/// Where each region of the disk body lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLayout {
    pub geometry: DiskGeometry,
    pub kernel_sectors: u32,
}

/// Offsets of a body produced by `ImageLayout::build`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutSummary {
    pub kernel_len: usize,
    pub fs_table_offset: usize,
    pub fs_data_offset: usize,
    pub body_end: usize,
    pub disk_size: usize,
    pub boot_signature_ok: bool,
}

impl LayoutSummary {
    pub fn free_bytes(&self) -> usize {
        self.disk_size - self.body_end
    }
}

impl ImageLayout {
    pub fn new(geometry: DiskGeometry, kernel_sectors: u32) -> Self {
        ImageLayout { geometry, kernel_sectors }
    }

    pub fn kernel_capacity(&self) -> usize {
        self.kernel_sectors as usize * SECTOR_SIZE
    }

    /// The filesystem table starts right after the kernel window.
    pub fn fs_table_offset(&self) -> usize {
        BOOT_SECTOR_SIZE + self.kernel_capacity()
    }

    pub fn disk_size(&self) -> Result<usize> {
        let size = self.geometry.total_size();
        usize::try_from(size).map_err(|_| ImageError::CapacityExceeded {
            what: "Disk",
            limit: usize::MAX as u64,
            actual: size,
        })
    }

    /// Produces the padded disk body: boot sector, kernel window, table, data, zeros.
    pub fn build(&self, boot: &[u8], kernel: &[u8], files: &[FsFile]) -> Result<(Vec<u8>, LayoutSummary)> {
        if boot.len() != BOOT_SECTOR_SIZE {
            return Err(ImageError::SizeMismatch {
                what: "Bootloader",
                expected: BOOT_SECTOR_SIZE,
                actual: boot.len(),
            });
        }
        let capacity = self.kernel_capacity();
        if kernel.len() > capacity {
            return Err(ImageError::CapacityExceeded {
                what: "Kernel",
                limit: capacity as u64,
                actual: kernel.len() as u64,
            });
        }

        let disk_size = self.disk_size()?;
        let table = FsTable::from_files(files)?;
        let body_end = self.fs_table_offset() as u64 + table.encoded_len() as u64 + table.data_len();
        if body_end > disk_size as u64 {
            return Err(ImageError::CapacityExceeded {
                what: "Image",
                limit: disk_size as u64,
                actual: body_end,
            });
        }

        let mut data = Vec::with_capacity(disk_size);
        data.extend_from_slice(boot);
        data.extend_from_slice(kernel);
        data.resize(self.fs_table_offset(), 0);

        let fs_table_offset = data.len();
        data.extend_from_slice(&table.encode()?);
        let fs_data_offset = data.len();
        for file in files {
            data.extend_from_slice(&file.data);
        }
        let body_end = data.len();
        data.resize(disk_size, 0);

        let summary = LayoutSummary {
            kernel_len: kernel.len(),
            fs_table_offset,
            fs_data_offset,
            body_end,
            disk_size,
            boot_signature_ok: boot[BOOT_SECTOR_SIZE - 2..] == BOOT_SIGNATURE,
        };
        Ok((data, summary))
    }
}
