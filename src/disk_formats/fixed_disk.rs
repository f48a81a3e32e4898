// src/disk_formats/fixed_disk.rs

use super::DiskGeometry;

/// A named fixed-disk geometry.
#[derive(Debug, Clone, Copy)]
pub struct DiskFormat {
    pub name: &'static str,
    pub geometry: DiskGeometry,
}

/// 10 MB disk, the layout the bootloader expects by default.
pub const VHD_10M: DiskFormat = DiskFormat {
    name: "vhd-10m",
    geometry: DiskGeometry::new(20, 16, 63),
};

pub const VHD_32M: DiskFormat = DiskFormat {
    name: "vhd-32m",
    geometry: DiskGeometry::new(65, 16, 63),
};

pub const VHD_64M: DiskFormat = DiskFormat {
    name: "vhd-64m",
    geometry: DiskGeometry::new(130, 16, 63),
};

pub const PRESETS: [DiskFormat; 3] = [VHD_10M, VHD_32M, VHD_64M];

pub fn preset(name: &str) -> Option<&'static DiskFormat> {
    PRESETS.iter().find(|f| f.name.eq_ignore_ascii_case(name))
}

/// Infers the disk format from the size of a raw body.
pub fn infer_format(size: u64) -> Option<&'static DiskFormat> {
    PRESETS.iter().find(|f| f.geometry.total_size() == size)
}
