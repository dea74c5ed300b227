use sha2::{Digest, Sha256};
use std::{fs, path::PathBuf};

use crate::error::SourceError;

/// Where the text of a unit comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    /// Text supplied by the caller.
    Inline(String),
    /// Read lazily by the worker that scans the unit.
    Disk(PathBuf),
}

/// One file to scan, tagged with the organization and repository it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub org: String,
    pub repo: String,
    /// Path as it should appear in the report.
    pub path: String,
    pub origin: SourceOrigin,
}

impl SourceUnit {
    pub fn inline(org: &str, repo: &str, path: &str, text: impl Into<String>) -> Self {
        Self {
            org: org.to_string(),
            repo: repo.to_string(),
            path: path.to_string(),
            origin: SourceOrigin::Inline(text.into()),
        }
    }

    pub fn disk(org: &str, repo: &str, path: &str, file: impl Into<PathBuf>) -> Self {
        Self {
            org: org.to_string(),
            repo: repo.to_string(),
            path: path.to_string(),
            origin: SourceOrigin::Disk(file.into()),
        }
    }

    /// Obtain the text and its fingerprint.
    pub fn read(&self) -> Result<SourceText, SourceError> {
        match &self.origin {
            SourceOrigin::Inline(text) => Ok(SourceText::new(text.clone())),
            SourceOrigin::Disk(file) => {
                let bytes = fs::read(file).map_err(|source| SourceError::Io {
                    path: file.clone(),
                    source,
                })?;
                let text = String::from_utf8(bytes)
                    .map_err(|_| SourceError::Encoding { path: file.clone() })?;
                Ok(SourceText::new(text))
            }
        }
    }
}

/// Source text plus a SHA-256 fingerprint of its bytes.
///
/// The fingerprint depends only on content, so identical files scanned from
/// different locations carry the same hash.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub text: String,
    /// Hex-encoded SHA-256 of `text`.
    pub sha256: String,
}

impl SourceText {
    fn new(text: String) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let sha256 = hex::encode(hasher.finalize());
        Self { text, sha256 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_source(data: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn reads_disk_text_and_computes_stable_hash() {
        let file = temp_source(b"pinscan-test");
        let unit = SourceUnit::disk("o", "r", "a.py", file.path());

        let src = unit.read().expect("readable");

        assert_eq!(src.text, "pinscan-test");
        assert_eq!(src.sha256.len(), 64);

        let inline = SourceUnit::inline("o", "r", "b.py", "pinscan-test").read().unwrap();
        assert_eq!(src.sha256, inline.sha256);
    }

    #[test]
    fn empty_text_hashes_to_the_well_known_digest() {
        let src = SourceUnit::inline("o", "r", "e.py", "").read().unwrap();
        assert_eq!(
            src.sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn different_inputs_produce_different_hashes() {
        let a = SourceUnit::inline("o", "r", "a.py", "x = 1").read().unwrap();
        let b = SourceUnit::inline("o", "r", "a.py", "x = 2").read().unwrap();
        assert_ne!(a.sha256, b.sha256);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let unit = SourceUnit::disk("o", "r", "gone.py", "does/not/exist.py");
        assert!(matches!(unit.read(), Err(SourceError::Io { .. })));
    }

    #[test]
    fn invalid_utf8_is_an_encoding_error() {
        let file = temp_source(&[0x66, 0x6f, 0xff, 0xfe]);
        let unit = SourceUnit::disk("o", "r", "bin.py", file.path());
        assert!(matches!(unit.read(), Err(SourceError::Encoding { .. })));
    }
}
