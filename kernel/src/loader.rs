//! Loading of program images from the host file system.
//!
//! An image is a raw sequence of little-endian 16-bit words. A trailing odd
//! byte is ignored.

use crate::config::Word;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to read an image
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read
    #[error("cannot read image {}: {}", .path.display(), .source)]
    Io {
        /// Image that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Reads the image at `path`.
pub fn load_image(path: impl AsRef<Path>) -> Result<Vec<Word>, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("loaded {} bytes from {}", bytes.len(), path.display());
    Ok(words_from_bytes(&bytes))
}

/// Decodes little-endian words.
pub fn words_from_bytes(bytes: &[u8]) -> Vec<Word> {
    bytes
        .chunks_exact(2)
        .map(|pair| Word::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_words_from_bytes() {
        assert_eq!(words_from_bytes(&[0x25, 0xf0, 0x01, 0x00]), [0xf025, 0x0001]);
        assert_eq!(words_from_bytes(&[0x34, 0x12, 0xff]), [0x1234]);
        assert!(words_from_bytes(&[]).is_empty());
    }

    #[test]
    fn test_load_image() {
        let path = std::env::temp_dir().join(format!("pagevm-loader-{}.obj", std::process::id()));
        std::fs::write(&path, [0x00, 0x30, 0x25, 0xf0]).expect("write image");
        let words = load_image(&path);
        std::fs::remove_file(&path).expect("remove image");
        assert_eq!(words.expect("load"), [0x3000, 0xf025]);
    }

    #[test]
    fn test_missing_image() {
        let err = load_image("/nonexistent/pagevm/image.obj").unwrap_err();
        let LoadError::Io { path, source } = &err;
        assert_eq!(path, Path::new("/nonexistent/pagevm/image.obj"));
        assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        assert!(err.to_string().starts_with("cannot read image /nonexistent/pagevm/image.obj"));
    }
}
