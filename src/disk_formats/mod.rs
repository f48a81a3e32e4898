// src/disk_formats/mod.rs

pub mod fixed_disk;

pub use fixed_disk::{infer_format, preset};

pub const SECTOR_SIZE: usize = 512;

/// Classic CHS addressing triple for a fixed virtual hard disk.
///
/// The field widths match the packed geometry word of the VHD footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskGeometry {
    pub cylinders: u16,
    pub heads: u8,
    pub sectors_per_track: u8,
}

impl DiskGeometry {
    pub const fn new(cylinders: u16, heads: u8, sectors_per_track: u8) -> Self {
        DiskGeometry { cylinders, heads, sectors_per_track }
    }

    pub fn total_sectors(&self) -> u64 {
        self.cylinders as u64 * self.heads as u64 * self.sectors_per_track as u64
    }

    /// Calculates the total size in bytes for this geometry.
    pub fn total_size(&self) -> u64 {
        self.total_sectors() * SECTOR_SIZE as u64
    }

    /// Cylinders in the upper 16 bits, heads in the next 8, sectors in the low 8.
    pub fn packed(&self) -> u32 {
        ((self.cylinders as u32) << 16) | ((self.heads as u32) << 8) | self.sectors_per_track as u32
    }

    pub fn unpack(word: u32) -> Self {
        DiskGeometry {
            cylinders: (word >> 16) as u16,
            heads: (word >> 8) as u8,
            sectors_per_track: word as u8,
        }
    }
}

pub fn parse_geometry(s: &str) -> Result<DiskGeometry, String> {
    if let Some(g) = preset(s) {
        return Ok(g.geometry);
    }
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err("Geometry must be 'cylinders,heads,sectors' (e.g., '20,16,63') or a preset name".to_string());
    }
    let geometry = DiskGeometry {
        cylinders: parts[0].parse().map_err(|e| format!("Invalid cylinders: {}", e))?,
        heads: parts[1].parse().map_err(|e| format!("Invalid heads: {}", e))?,
        sectors_per_track: parts[2].parse().map_err(|e| format!("Invalid sectors: {}", e))?,
    };
    if geometry.total_sectors() == 0 {
        return Err("Geometry components must all be non-zero".to_string());
    }
    Ok(geometry)
}
