// src/formats/vhd.rs

use super::FormatHandler;
use crate::disk_formats::DiskGeometry;
use crate::error::{ImageError, Result};
use crate::image::footer::{VhdFooter, DISK_TYPE_FIXED, FOOTER_SIZE};

pub struct VhdHandler {
    data: Vec<u8>,
}

impl VhdHandler {
    pub fn new(data: Vec<u8>) -> Self {
        VhdHandler { data }
    }

    pub fn footer(&self) -> Result<VhdFooter> {
        if self.data.len() < FOOTER_SIZE {
            return Err(ImageError::InvalidFooter(format!("file is only {} bytes", self.data.len())));
        }
        VhdFooter::decode(&self.data[self.data.len() - FOOTER_SIZE..])
    }
}

impl FormatHandler for VhdHandler {
    fn name(&self) -> &'static str {
        "VHD (fixed)"
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn body(&self) -> Result<&[u8]> {
        let footer = self.footer()?;
        let body_len = self.data.len() - FOOTER_SIZE;
        if footer.current_size != body_len as u64 {
            return Err(ImageError::InvalidFooter(format!(
                "declared size {} does not match body size {}",
                footer.current_size, body_len
            )));
        }
        Ok(&self.data[..body_len])
    }

    fn geometry(&self) -> Result<Option<DiskGeometry>> {
        Ok(Some(self.footer()?.geometry))
    }

    fn describe(&self) -> Result<Vec<String>> {
        let footer = self.footer()?;
        let g = footer.geometry;
        let created = footer
            .created_at()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "invalid".to_string());
        Ok(vec![
            format!(
                "Creator: {} v{}.{} on {}",
                String::from_utf8_lossy(&footer.creator_app),
                footer.creator_version >> 16,
                footer.creator_version & 0xFFFF,
                String::from_utf8_lossy(&footer.creator_host_os)
            ),
            format!("Created: {} (timestamp {})", created, footer.timestamp),
            format!(
                "Disk Type: {} ({})",
                footer.disk_type,
                if footer.disk_type == DISK_TYPE_FIXED { "fixed" } else { "unsupported" }
            ),
            format!("Size: {} bytes (original {})", footer.current_size, footer.original_size),
            format!(
                "Geometry: {} cylinders, {} heads, {} sectors/track ({} bytes)",
                g.cylinders,
                g.heads,
                g.sectors_per_track,
                g.total_size()
            ),
            format!("Checksum: 0x{:08X} (valid)", footer.checksum),
        ])
    }
}
