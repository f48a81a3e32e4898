// src/error.rs

use std::fmt;
use std::path::PathBuf;

/// Errors raised while assembling or reading back a disk image.
#[derive(Debug)]
pub enum ImageError {
    Io(std::io::Error),
    /// A region that must have an exact length did not.
    SizeMismatch { what: &'static str, expected: usize, actual: usize },
    /// A payload does not fit the region or field reserved for it.
    CapacityExceeded { what: &'static str, limit: u64, actual: u64 },
    MissingSource { path: PathBuf },
    InvalidName(String),
    InvalidFooter(String),
    InvalidTable(String),
    NotFound(String),
}

impl From<std::io::Error> for ImageError {
    fn from(e: std::io::Error) -> Self {
        ImageError::Io(e)
    }
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::SizeMismatch { what, expected, actual } => {
                write!(f, "{} must be exactly {} bytes (got {})", what, expected, actual)
            }
            Self::CapacityExceeded { what, limit, actual } => {
                write!(f, "{} too large! ({} > {})", what, actual, limit)
            }
            Self::MissingSource { path } => write!(f, "Source file not readable: {}", path.display()),
            Self::InvalidName(name) => write!(f, "Invalid virtual file name: {:?}", name),
            Self::InvalidFooter(desc) => write!(f, "Invalid VHD footer: {}", desc),
            Self::InvalidTable(desc) => write!(f, "Invalid filesystem table: {}", desc),
            Self::NotFound(name) => write!(f, "File not found in image: {}", name),
        }
    }
}

impl std::error::Error for ImageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ImageError>;
