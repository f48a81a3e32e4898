// src/formats/img.rs

use super::FormatHandler;
use crate::disk_formats::{infer_format, DiskGeometry};
use crate::error::Result;

/// Raw disk body with no trailer.
pub struct ImgHandler {
    data: Vec<u8>,
}

impl ImgHandler {
    pub fn new(data: Vec<u8>) -> Self {
        ImgHandler { data }
    }
}

impl FormatHandler for ImgHandler {
    fn name(&self) -> &'static str {
        "Raw IMG"
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn body(&self) -> Result<&[u8]> {
        Ok(&self.data)
    }

    fn geometry(&self) -> Result<Option<DiskGeometry>> {
        Ok(infer_format(self.data.len() as u64).map(|f| f.geometry))
    }

    fn describe(&self) -> Result<Vec<String>> {
        Ok(vec![match infer_format(self.data.len() as u64) {
            Some(format) => format!(
                "Detected Format: {}\nGeometry: {} cylinders, {} heads, {} sectors/track",
                format.name, format.geometry.cylinders, format.geometry.heads, format.geometry.sectors_per_track
            ),
            None => "Detected Format: unknown (no preset matches this size)".to_string(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_comes_from_presets() {
        assert_eq!(ImgHandler::new(vec![0; 10_321_920]).geometry().unwrap(), Some(DiskGeometry::new(20, 16, 63)));
        assert_eq!(ImgHandler::new(vec![0; 4096]).geometry().unwrap(), None);
    }
}
