// src/report.rs
use crate::formats::FormatHandler;
use crate::image::layout::{BOOT_SECTOR_SIZE, BOOT_SIGNATURE};
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

fn ascii_preview(chunk: &[u8]) -> String {
    chunk.iter()
        .take(32)
        .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
        .collect()
}

pub fn display(handler: &dyn FormatHandler, kernel_sectors: u32, ascii: bool) -> Result<String> {
    let mut output = Vec::new();
    output.push(format!("{}: {} bytes", handler.name(), handler.data().len()));
    output.extend(handler.describe()?);

    let body = handler.body()?;
    let signature_ok = body.len() >= BOOT_SECTOR_SIZE && body[BOOT_SECTOR_SIZE - 2..BOOT_SECTOR_SIZE] == BOOT_SIGNATURE;
    output.push(format!("Boot Signature: {}", if signature_ok { "55 AA" } else { "missing" }));

    let region = handler.fs_region(kernel_sectors)?;
    let table = handler.fs_table(kernel_sectors)?;
    output.push(format!(
        "Filesystem: {} files, {} data bytes, table at offset {}",
        table.entries.len(),
        table.data_len(),
        body.len() - region.len()
    ));
    for entry in &table.entries {
        let mut line = format!("  {:<16} size {:>8}  offset 0x{:08X}", entry.name_str(), entry.size, entry.offset);
        if ascii {
            let data = table.file_data(region, entry)?;
            line.push_str(&format!("  {}", ascii_preview(data)));
        }
        output.push(line);
    }
    Ok(output.join("\n"))
}

/// Writes `data` next to `path` and renames it into place, so a failed write never leaves a partial file.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let mut tmp = PathBuf::from(path);
    tmp.as_mut_os_string().push(".tmp");

    let result = fs::File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&tmp, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("writing {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk_formats::DiskGeometry;
    use crate::formats::vhd::VhdHandler;
    use crate::image::footer::FixedClock;
    use crate::image::fs_table::FsFile;
    use crate::image::layout::ImageLayout;
    use crate::image::{assemble, OutputFormat};
    use tempfile::TempDir;

    #[test]
    fn display_lists_table_entries() {
        let layout = ImageLayout::new(DiskGeometry::new(4, 2, 8), 8);
        let mut boot = vec![0; 512];
        boot[510..].copy_from_slice(&BOOT_SIGNATURE);
        let files = [FsFile::new("app.bin", b"\x7fELF-ish app".to_vec())];
        let (image, _) = assemble(&layout, &boot, &[], &files, OutputFormat::Vhd, &FixedClock(1_700_000_000)).unwrap();

        let text = display(&VhdHandler::new(image), 8, true).unwrap();
        assert!(text.contains("Boot Signature: 55 AA"));
        assert!(text.contains("Filesystem: 1 files, 12 data bytes, table at offset 4608"));
        assert!(text.contains("app.bin"));
        assert!(text.contains(".ELF-ish app"));
        assert!(text.contains("Checksum: 0x"));
    }

    #[test]
    fn write_atomic_replaces_target_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("disk.vhd");
        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"second");
        assert!(!dir.path().join("nested").join("disk.vhd.tmp").exists());
    }
}
