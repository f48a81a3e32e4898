// src/image/fs_table.rs
//
// Flat directory written right after the kernel region:
//   "FS" | count: u16 LE | count * (name[16] | size: u32 LE | offset: u32 LE)
// Offsets are relative to the first byte after the table.

use crate::error::{ImageError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

pub const MAGIC: [u8; 2] = *b"FS";
pub const HEADER_SIZE: usize = 4;
pub const NAME_LEN: usize = 16;
pub const ENTRY_SIZE: usize = NAME_LEN + 4 + 4;

/// A file as it will be stored in the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl FsFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        FsFile { name: name.into(), data }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    pub name: [u8; NAME_LEN],
    pub size: u32,
    pub offset: u32,
}

impl FsEntry {
    /// Name with trailing NULs stripped.
    pub fn name_str(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset as usize..self.offset as usize + self.size as usize
    }
}

/// Truncates or NUL-pads an ASCII name to the fixed field width.
pub fn encode_name(name: &str) -> [u8; NAME_LEN] {
    let mut field = [0u8; NAME_LEN];
    let bytes = name.as_bytes();
    let len = bytes.len().min(NAME_LEN);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsTable {
    pub entries: Vec<FsEntry>,
}

impl FsTable {
    /// Builds entries in input order with running offsets.
    pub fn from_files(files: &[FsFile]) -> Result<Self> {
        if files.len() > u16::MAX as usize {
            return Err(ImageError::CapacityExceeded {
                what: "File count",
                limit: u16::MAX as u64,
                actual: files.len() as u64,
            });
        }
        let mut entries = Vec::with_capacity(files.len());
        let mut offset: u64 = 0;
        for file in files {
            let size = u32::try_from(file.data.len()).map_err(|_| ImageError::CapacityExceeded {
                what: "File",
                limit: u32::MAX as u64,
                actual: file.data.len() as u64,
            })?;
            let entry_offset = u32::try_from(offset).map_err(|_| ImageError::CapacityExceeded {
                what: "Filesystem data",
                limit: u32::MAX as u64,
                actual: offset,
            })?;
            entries.push(FsEntry { name: encode_name(&file.name), size, offset: entry_offset });
            offset += size as u64;
        }
        Ok(FsTable { entries })
    }

    /// Bytes occupied by the header and entries.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.entries.len() * ENTRY_SIZE
    }

    /// Sum of all file sizes.
    pub fn data_len(&self) -> u64 {
        self.entries.iter().map(|e| e.size as u64).sum()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&MAGIC);
        out.write_u16::<LittleEndian>(self.entries.len() as u16)?;
        for entry in &self.entries {
            out.extend_from_slice(&entry.name);
            out.write_u32::<LittleEndian>(entry.size)?;
            out.write_u32::<LittleEndian>(entry.offset)?;
        }
        Ok(out)
    }

    /// Parses a table from the bytes that start at the table offset.
    pub fn decode(region: &[u8]) -> Result<Self> {
        if region.len() < HEADER_SIZE {
            return Err(ImageError::InvalidTable("region shorter than header".to_string()));
        }
        let mut cursor = Cursor::new(region);
        let mut magic = [0u8; 2];
        cursor.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(ImageError::InvalidTable(format!("bad magic {:02X} {:02X}", magic[0], magic[1])));
        }
        let count = cursor.read_u16::<LittleEndian>()? as usize;
        if region.len() < HEADER_SIZE + count * ENTRY_SIZE {
            return Err(ImageError::InvalidTable(format!("{} entries do not fit in {} bytes", count, region.len())));
        }
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let mut name = [0u8; NAME_LEN];
            cursor.read_exact(&mut name)?;
            let size = cursor.read_u32::<LittleEndian>()?;
            let offset = cursor.read_u32::<LittleEndian>()?;
            entries.push(FsEntry { name, size, offset });
        }
        Ok(FsTable { entries })
    }

    /// Looks up an entry the way the stored name was written (truncated to 16 bytes).
    pub fn find(&self, name: &str) -> Option<&FsEntry> {
        let wanted = encode_name(name);
        self.entries.iter().find(|e| e.name == wanted)
    }

    /// Returns a file's bytes from the region that starts at the table offset.
    pub fn file_data<'a>(&self, region: &'a [u8], entry: &FsEntry) -> Result<&'a [u8]> {
        let data_start = self.encoded_len();
        let range = entry.range();
        region
            .get(data_start + range.start..data_start + range.end)
            .ok_or_else(|| ImageError::InvalidTable(format!("{} extends past the end of the image", entry.name_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_files() -> Vec<FsFile> {
        vec![
            FsFile::new("app.bin", vec![0xAA; 100]),
            FsFile::new("readme.txt", b"hello".to_vec()),
            FsFile::new("empty", Vec::new()),
            FsFile::new("last.dat", vec![7; 33]),
        ]
    }

    #[test]
    fn offsets_are_running_sum_of_sizes() {
        let table = FsTable::from_files(&sample_files()).unwrap();
        let mut expected = 0u32;
        for entry in &table.entries {
            assert_eq!(entry.offset, expected);
            expected += entry.size;
        }
        assert_eq!(table.data_len(), 138);
    }

    #[test]
    fn encodes_header_and_entries_little_endian() {
        let table = FsTable::from_files(&sample_files()[..2]).unwrap();
        let raw = table.encode().unwrap();
        assert_eq!(raw.len(), HEADER_SIZE + 2 * ENTRY_SIZE);
        assert_eq!(&raw[0..4], &[b'F', b'S', 2, 0]);
        assert_eq!(&raw[4..20], b"app.bin\0\0\0\0\0\0\0\0\0");
        assert_eq!(&raw[20..24], &100u32.to_le_bytes());
        assert_eq!(&raw[24..28], &0u32.to_le_bytes());
        assert_eq!(&raw[48..52], &100u32.to_le_bytes());
    }

    #[test]
    fn long_names_are_truncated_to_field() {
        let name = encode_name("a_rather_long_file_name.bin");
        assert_eq!(&name, b"a_rather_long_fi");
        let table = FsTable::from_files(&[FsFile::new("a_rather_long_file_name.bin", vec![1])]).unwrap();
        assert_eq!(table.entries[0].name_str(), "a_rather_long_fi");
        assert!(table.find("a_rather_long_file_name.bin").is_some());
    }

    #[test]
    fn decode_and_find_read_back_files() {
        let files = sample_files();
        let table = FsTable::from_files(&files).unwrap();
        let mut region = table.encode().unwrap();
        for f in &files {
            region.extend_from_slice(&f.data);
        }
        region.extend_from_slice(&[0; 64]);

        let decoded = FsTable::decode(&region).unwrap();
        assert_eq!(decoded, table);
        let entry = decoded.find("readme.txt").unwrap();
        assert_eq!(decoded.file_data(&region, entry).unwrap(), b"hello");
        assert!(decoded.find("missing").is_none());
    }

    #[test]
    fn decode_rejects_bad_magic_and_truncation() {
        assert!(matches!(FsTable::decode(b"XX\0\0"), Err(ImageError::InvalidTable(_))));
        assert!(matches!(FsTable::decode(b"FS\x05\0"), Err(ImageError::InvalidTable(_))));
        assert!(FsTable::decode(b"F").is_err());
    }

    #[test]
    fn empty_table_is_just_a_header() {
        let table = FsTable::from_files(&[]).unwrap();
        assert_eq!(table.encode().unwrap(), b"FS\0\0");
    }
}
