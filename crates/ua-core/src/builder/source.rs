//! Definition sources on disk.
//!
//! A base definition is either a plain XML document or a ZIP archive whose
//! first entry is the XML document. Patches are always plain XML.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use ua_common::{Error, Result};
use zip::ZipArchive;

/// Container format of a definition source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Xml,
    Zip,
}

impl SourceKind {
    /// Kind from the file extension; anything but `.zip` is read as XML.
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("zip") => SourceKind::Zip,
            _ => SourceKind::Xml,
        }
    }
}

/// Reads the XML bytes of a definition source.
pub fn read_document(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(Error::SourceMissing {
            path: path.to_path_buf(),
        });
    }
    match SourceKind::of(path) {
        SourceKind::Xml => Ok(std::fs::read(path)?),
        SourceKind::Zip => read_first_entry(path),
    }
}

/// Upper bound on the buffer reserved up front for an archive entry.
const MAX_PREALLOC: u64 = 1024 * 1024;

fn read_first_entry(path: &Path) -> Result<Vec<u8>> {
    let unsupported = |message: String| Error::UnsupportedSource {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| unsupported(e.to_string()))?;
    if archive.is_empty() {
        return Err(unsupported("archive has no entries".to_string()));
    }
    let mut entry = archive
        .by_index(0)
        .map_err(|e| unsupported(e.to_string()))?;
    debug!(path = %path.display(), entry = entry.name(), "reading definition from archive");

    // The declared size comes from the archive header and is not trusted.
    let capacity = entry.size().min(MAX_PREALLOC) as usize;
    let mut data = Vec::with_capacity(capacity);
    entry.read_to_end(&mut data)?;
    Ok(data)
}

/// Identity of one source file as seen by the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStamp {
    pub path: PathBuf,
    pub len: u64,
    /// SHA-256 of the file bytes as stored on disk.
    pub digest: [u8; 32],
}

impl SourceStamp {
    pub fn of(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|_| Error::SourceMissing {
            path: path.to_path_buf(),
        })?;
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(&bytes));
        Ok(Self {
            path: path.to_path_buf(),
            len: bytes.len() as u64,
            digest,
        })
    }
}

/// Hex SHA-256 over source paths, contents and the capability filter.
///
/// Editing any source, reordering patches or changing the filter yields a
/// different fingerprint. Touching a file without changing it does not.
pub fn fingerprint(stamps: &[SourceStamp], filter: &[String]) -> String {
    let mut hasher = Sha256::new();
    for stamp in stamps {
        hasher.update(stamp.path.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(stamp.len.to_le_bytes());
        hasher.update(stamp.digest);
    }
    hasher.update(b"filter");
    for name in filter {
        hasher.update(name.as_bytes());
        hasher.update([0]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn stamp(path: &str, len: u64) -> SourceStamp {
        SourceStamp {
            path: PathBuf::from(path),
            len,
            digest: [7; 32],
        }
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(SourceKind::of(Path::new("wurfl.zip")), SourceKind::Zip);
        assert_eq!(SourceKind::of(Path::new("WURFL.ZIP")), SourceKind::Zip);
        assert_eq!(SourceKind::of(Path::new("wurfl.xml")), SourceKind::Xml);
        assert_eq!(SourceKind::of(Path::new("wurfl")), SourceKind::Xml);
    }

    #[test]
    fn missing_source_is_reported() {
        let err = read_document(Path::new("/nonexistent/wurfl.xml")).unwrap_err();
        assert!(matches!(err, Error::SourceMissing { .. }));
    }

    #[test]
    fn zip_first_entry_is_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wurfl.zip");
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("wurfl.xml", options).unwrap();
        zip.write_all(b"<wurfl/>").unwrap();
        zip.start_file("readme.txt", options).unwrap();
        zip.write_all(b"ignored").unwrap();
        zip.finish().unwrap();

        assert_eq!(read_document(&path).unwrap(), b"<wurfl/>");
    }

    #[test]
    fn garbage_zip_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"not a zip").unwrap();
        let err = read_document(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSource { .. }));
    }

    #[test]
    fn fingerprint_tracks_every_input() {
        let base = fingerprint(&[stamp("a.xml", 10), stamp("p.xml", 3)], &[]);
        assert_eq!(base.len(), 64);
        assert_eq!(base, fingerprint(&[stamp("a.xml", 10), stamp("p.xml", 3)], &[]));
        assert_ne!(base, fingerprint(&[stamp("a.xml", 11), stamp("p.xml", 3)], &[]));
        assert_ne!(base, fingerprint(&[stamp("p.xml", 3), stamp("a.xml", 10)], &[]));
        assert_ne!(
            base,
            fingerprint(&[stamp("a.xml", 10), stamp("p.xml", 3)], &["display".to_string()])
        );
    }

    #[test]
    fn same_length_edit_changes_stamp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patch.xml");
        std::fs::write(&path, b"<v>176</v>").unwrap();
        let before = SourceStamp::of(&path).unwrap();
        std::fs::write(&path, b"<v>240</v>").unwrap();
        let after = SourceStamp::of(&path).unwrap();

        assert_eq!(before.len, after.len);
        assert_ne!(before.digest, after.digest);
        assert_ne!(fingerprint(&[before], &[]), fingerprint(&[after], &[]));
    }

    #[test]
    fn archive_entry_is_read_fully_past_the_prealloc_cap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.zip");
        let body = vec![b'x'; 2 * MAX_PREALLOC as usize];
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("wurfl.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(&body).unwrap();
        zip.finish().unwrap();

        assert_eq!(read_document(&path).unwrap().len(), body.len());
    }
}
