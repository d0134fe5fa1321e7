//! In-memory ustar/PAX tar archive decoder
//!
//! # Usage
//!
//! ## Listing files in a TAR archive
//!
//! ```rust,no_run
//! use untar_light::list;
//!
//! match list("archive.tar") {
//!     Ok(entries) => {
//!         println!("Files in archive:");
//!         for entry in entries {
//!             println!("  {} ({} bytes)", entry.name, entry.size);
//!         }
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! ## Unpacking files from a TAR archive
//!
//! ```rust,no_run
//! use untar_light::unpack;
//!
//! unpack("archive.tar", "output_directory").unwrap();
//! ```
//!
//! ## Decoding a buffer in the background
//!
//! ```rust,no_run
//! use untar_light::{untar, PayloadView};
//!
//! let buffer = std::fs::read("archive.tar").unwrap();
//! let files = untar(buffer, |entry| println!("got {}", entry.name)).unwrap();
//! for file in files.iter().filter(|f| f.name.ends_with(".json")) {
//!     println!("{}", file.read_as_json().unwrap());
//! }
//! ```

pub mod cursor;
pub mod error;
pub mod pax;
pub mod tar;
pub mod utf8;
pub mod view;
pub mod worker;

#[cfg(test)]
mod testing;

use std::fs;
use std::path::{Component, Path, PathBuf};

use log::{debug, info};

pub use cursor::ByteCursor;
pub use error::{Error, Result};
pub use pax::{PaxField, PaxHeader, PaxValue};
pub use tar::{ArchiveIterator, TarEntry, TypeFlag, read_tar};
pub use view::PayloadView;
pub use worker::{Request, Response, untar};

/// Lists the entries of a tar archive on disk.
pub fn list(tarfile: impl AsRef<Path>) -> Result<Vec<TarEntry>> {
    let data = fs::read(tarfile)?;
    read_tar(&data)
}

/// Rejects names that would land outside the output directory.
fn safe_path(output_dir: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if name.is_empty() || escapes {
        return Err(Error::UnsafePath(name.to_string()));
    }
    Ok(output_dir.join(relative))
}

/// Unpacks regular files and directories from a tar archive.
///
/// Links, devices and FIFOs are skipped. Nothing is written unless the whole
/// archive decodes and every name stays inside `output_dir`.
pub fn unpack(tarfile: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Result<()> {
    let output_dir = output_dir.as_ref();
    let entries = list(tarfile)?;
    let targets = entries
        .iter()
        .map(|entry| safe_path(output_dir, &entry.name))
        .collect::<Result<Vec<_>>>()?;

    fs::create_dir_all(output_dir)?;
    for (entry, path) in entries.iter().zip(targets) {
        if entry.is_dir() {
            fs::create_dir_all(&path)?;
        } else if entry.is_file() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &entry.payload)?;
            info!("Extracted: {}", entry.name);
        } else {
            debug!("skipping {} ({:?})", entry.name, entry.type_flag);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ArchiveBuilder, HeaderSpec};

    #[test]
    fn test_list() {
        let dir = tempfile::tempdir().unwrap();
        let tarfile = dir.path().join("list.tar");
        let data = ArchiveBuilder::new()
            .file("Content1.txt", b"Content 1")
            .file("Content2.txt", b"Content 2 longer")
            .finish();
        fs::write(&tarfile, data).unwrap();

        let entries = list(&tarfile).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Content1.txt");
        assert_eq!(entries[0].size, 9);
        assert_eq!(entries[1].name, "Content2.txt");
        assert_eq!(entries[1].size, 16);
    }

    #[test]
    fn test_list_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(list(dir.path().join("nope.tar")), Err(Error::Io(_))));
    }

    #[test]
    fn test_unpack() {
        let dir = tempfile::tempdir().unwrap();
        let tarfile = dir.path().join("unpack.tar");
        let output = dir.path().join("out");
        let subdir = HeaderSpec {
            name: "sub/".into(),
            type_flag: b'5',
            ..HeaderSpec::default()
        };
        let link = HeaderSpec {
            name: "sub/link".into(),
            type_flag: b'2',
            linkname: "/etc/passwd".into(),
            ..HeaderSpec::default()
        };
        let data = ArchiveBuilder::new()
            .entry(subdir, b"")
            .file("sub/inner.txt", b"Unpack test content")
            .entry(link, b"")
            .pax(b'x', &[("path", "renamed/top.txt")])
            .file("top.txt", b"top")
            .finish();
        fs::write(&tarfile, data).unwrap();

        unpack(&tarfile, &output).unwrap();
        assert_eq!(
            fs::read_to_string(output.join("sub/inner.txt")).unwrap(),
            "Unpack test content"
        );
        assert_eq!(fs::read_to_string(output.join("renamed/top.txt")).unwrap(), "top");
        assert!(!output.join("sub/link").exists());
        assert!(!output.join("top.txt").exists());
    }

    #[test]
    fn test_unpack_path_traversal() {
        let malicious_names = ["../../../etc/passwd", "subdir/../../outside.txt", "/absolute/path/file.txt"];
        for name in malicious_names {
            let dir = tempfile::tempdir().unwrap();
            let tarfile = dir.path().join("evil.tar");
            let output = dir.path().join("out");
            let data = ArchiveBuilder::new()
                .file("fine.txt", b"ok")
                .file(name, b"malicious!")
                .finish();
            fs::write(&tarfile, data).unwrap();

            let err = unpack(&tarfile, &output).unwrap_err();
            assert!(matches!(err, Error::UnsafePath(ref n) if n == name));
            assert!(!output.join("fine.txt").exists());
        }
    }
}
