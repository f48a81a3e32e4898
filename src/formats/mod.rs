// src/formats/mod.rs

pub mod img;
pub mod vhd;

use crate::disk_formats::{DiskGeometry, SECTOR_SIZE};
use crate::error::{ImageError, Result};
use crate::image::fs_table::FsTable;
use crate::image::layout::BOOT_SECTOR_SIZE;
use crate::image::OutputFormat;
use anyhow::{anyhow, Context};
use std::fs;
use std::path::Path;

pub trait FormatHandler {
    fn name(&self) -> &'static str;
    /// The whole file.
    fn data(&self) -> &[u8];
    /// The disk body, without any container trailer.
    fn body(&self) -> Result<&[u8]>;
    fn geometry(&self) -> Result<Option<DiskGeometry>>;
    /// Container-specific lines for `display`.
    fn describe(&self) -> Result<Vec<String>>;

    /// Bytes from the filesystem table to the end of the body.
    fn fs_region(&self, kernel_sectors: u32) -> Result<&[u8]> {
        let body = self.body()?;
        let start = BOOT_SECTOR_SIZE + kernel_sectors as usize * SECTOR_SIZE;
        body.get(start..).ok_or_else(|| {
            ImageError::InvalidTable(format!("body is only {} bytes, table expected at {}", body.len(), start))
        })
    }

    fn fs_table(&self, kernel_sectors: u32) -> Result<FsTable> {
        FsTable::decode(self.fs_region(kernel_sectors)?)
    }

    /// Looks a file up by name and returns its bytes.
    fn read_file(&self, kernel_sectors: u32, name: &str) -> Result<Vec<u8>> {
        let region = self.fs_region(kernel_sectors)?;
        let table = FsTable::decode(region)?;
        let entry = table.find(name).ok_or_else(|| ImageError::NotFound(name.to_string()))?;
        Ok(table.file_data(region, entry)?.to_vec())
    }
}

pub fn handler_for(format: OutputFormat, data: Vec<u8>) -> Box<dyn FormatHandler> {
    match format {
        OutputFormat::Vhd => Box::new(vhd::VhdHandler::new(data)),
        OutputFormat::Img => Box::new(img::ImgHandler::new(data)),
    }
}

pub fn load_handler(file_path: &Path) -> anyhow::Result<Box<dyn FormatHandler>> {
    let ext = file_path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("No file extension"))?;
    let format = OutputFormat::from_extension(ext).ok_or_else(|| anyhow!("Unsupported format: {}", ext))?;

    let data = fs::read(file_path).with_context(|| format!("reading {}", file_path.display()))?;
    Ok(handler_for(format, data))
}
