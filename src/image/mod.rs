// src/image/mod.rs

pub mod footer;
pub mod fs_table;
pub mod layout;

use crate::error::Result;
use footer::{Clock, VhdFooter};
use fs_table::FsFile;
use layout::{ImageLayout, LayoutSummary};

/// Container written around the disk body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Body followed by a fixed-disk VHD footer.
    Vhd,
    /// Body only.
    Img,
}

impl OutputFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "vhd" => Some(OutputFormat::Vhd),
            "img" => Some(OutputFormat::Img),
            _ => None,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("Unknown output format: {} (expected vhd or img)", s))
    }
}

/// Lays out the body and, for VHD output, appends a footer describing the padded size.
pub fn assemble(
    layout: &ImageLayout,
    boot: &[u8],
    kernel: &[u8],
    files: &[FsFile],
    format: OutputFormat,
    clock: &dyn Clock,
) -> Result<(Vec<u8>, LayoutSummary)> {
    let (mut data, summary) = layout.build(boot, kernel, files)?;
    if format == OutputFormat::Vhd {
        let footer = VhdFooter::new_fixed(data.len() as u64, layout.geometry, clock);
        data.extend_from_slice(&footer.encode());
    }
    Ok((data, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk_formats::DiskGeometry;
    use super::footer::{FixedClock, FOOTER_SIZE};

    #[test]
    fn vhd_image_is_disk_size_plus_footer() {
        let layout = ImageLayout::new(DiskGeometry::new(20, 16, 63), 63);
        let files = [FsFile::new("app.bin", vec![0x42; 1234])];
        let (image, _) =
            assemble(&layout, &[0; 512], &[1; 2000], &files, OutputFormat::Vhd, &FixedClock(1_700_000_000)).unwrap();

        assert_eq!(image.len(), 10_322_432);
        let footer = VhdFooter::decode(&image[image.len() - FOOTER_SIZE..]).unwrap();
        assert_eq!(footer.current_size, 10_321_920);
        assert_eq!(footer.original_size, 10_321_920);
        assert_eq!(footer.geometry, layout.geometry);
    }

    #[test]
    fn img_image_has_no_footer() {
        let layout = ImageLayout::new(DiskGeometry::new(4, 2, 8), 8);
        let (image, _) = assemble(&layout, &[0; 512], &[], &[], OutputFormat::Img, &FixedClock(0)).unwrap();
        assert_eq!(image.len(), 32 * 1024);
    }

    #[test]
    fn parses_output_format_names() {
        assert_eq!("VHD".parse::<OutputFormat>(), Ok(OutputFormat::Vhd));
        assert_eq!("img".parse::<OutputFormat>(), Ok(OutputFormat::Img));
        assert!("iso".parse::<OutputFormat>().is_err());
    }
}
