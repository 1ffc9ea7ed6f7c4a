//! Program images: a big-endian origin word followed by big-endian program words.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image has no origin word")]
    MissingOrigin,
}

/// A decoded image, ready to be placed in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub origin: u16,
    pub words: Vec<u16>,
}

impl Image {
    pub fn new(origin: u16, words: Vec<u16>) -> Self {
        Image { origin, words }
    }

    /// Parses raw image bytes. A dangling final byte is dropped.
    pub fn from_bytes(bytes: &[u8]) -> Result<Image, LoadError> {
        let mut chunks = bytes.chunks_exact(2);
        let origin = chunks
            .next()
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .ok_or(LoadError::MissingOrigin)?;
        let words: Vec<u16> = chunks
            .by_ref()
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        if !chunks.remainder().is_empty() {
            warn!("image ends with an odd byte; ignoring it");
        }
        Ok(Image { origin, words })
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Image, LoadError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Image::from_bytes(&bytes)
    }

    /// Serialises back to the on-disk format.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.origin)
            .chain(self.words.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }
}
