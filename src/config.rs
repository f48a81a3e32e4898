// src/config.rs

use crate::disk_formats::DiskGeometry;
use crate::error::{ImageError, Result};
use crate::image::fs_table::{FsFile, NAME_LEN};
use crate::image::layout::ImageLayout;
use crate::image::OutputFormat;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BOOT: &str = "build/boot.bin";
pub const DEFAULT_KERNEL: &str = "build/kernel.bin";
pub const DEFAULT_OUTPUT: &str = "build/os_with_fs.vhd";
pub const DEFAULT_FILE: &str = "app.bin=app/build/user_app.bin";
/// Must match the sector count the boot sector loads.
pub const DEFAULT_KERNEL_SECTORS: u32 = 63;

/// What to do when a listed file cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFilePolicy {
    /// Warn and leave the file out of the table.
    #[default]
    Skip,
    Fail,
}

/// A (virtual name, host path) pair from the file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub name: String,
    pub path: PathBuf,
}

pub fn parse_file_entry(s: &str) -> std::result::Result<FileSpec, String> {
    let (name, path) = s
        .split_once('=')
        .ok_or_else(|| format!("File entry must be 'NAME=PATH' (e.g., '{}')", DEFAULT_FILE))?;
    validate_name(name).map_err(|e| e.to_string())?;
    if path.is_empty() {
        return Err(format!("Missing path for {}", name));
    }
    Ok(FileSpec { name: name.to_string(), path: PathBuf::from(path) })
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.is_ascii() || name.contains('\0') {
        return Err(ImageError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub boot: PathBuf,
    pub kernel: PathBuf,
    pub files: Vec<FileSpec>,
    pub output: PathBuf,
    pub geometry: DiskGeometry,
    pub kernel_sectors: u32,
    pub format: OutputFormat,
    pub missing_files: MissingFilePolicy,
    pub verbose: bool,
}

/// Everything read from disk for one build.
#[derive(Debug)]
pub struct Sources {
    pub boot: Vec<u8>,
    pub kernel: Vec<u8>,
    pub files: Vec<FsFile>,
    pub skipped: Vec<PathBuf>,
}

impl BuildConfig {
    pub fn layout(&self) -> ImageLayout {
        ImageLayout::new(self.geometry, self.kernel_sectors)
    }

    /// Reads the boot sector, kernel and listed files. Unreadable listed files follow `missing_files`.
    pub fn load_sources(&self) -> Result<Sources> {
        let boot = read_required(&self.boot)?;
        let kernel = read_required(&self.kernel)?;

        let mut files = Vec::with_capacity(self.files.len());
        let mut skipped = Vec::new();
        for spec in &self.files {
            validate_name(&spec.name)?;
            match fs::read(&spec.path) {
                Ok(data) => {
                    if spec.name.len() > NAME_LEN {
                        println!(" ! Warning: name {} truncated to {} bytes", spec.name, NAME_LEN);
                    }
                    if self.verbose {
                        println!(" + Added {} ({} bytes from {})", spec.name, data.len(), spec.path.display());
                    } else {
                        println!(" + Added {}", spec.name);
                    }
                    files.push(FsFile::new(spec.name.clone(), data));
                }
                Err(e) => match self.missing_files {
                    MissingFilePolicy::Skip => {
                        println!(" ! Warning: {} not found. Skipping.", spec.path.display());
                        if self.verbose {
                            println!("   ({})", e);
                        }
                        skipped.push(spec.path.clone());
                    }
                    MissingFilePolicy::Fail => {
                        return Err(ImageError::MissingSource { path: spec.path.clone() });
                    }
                },
            }
        }
        Ok(Sources { boot, kernel, files, skipped })
    }
}

fn read_required(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        ImageError::Io(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
    })
}
