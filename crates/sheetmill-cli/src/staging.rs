//! Image folder staging
//!
//! Lookup images arrive either as a directory or as a `.zip` archive. An
//! archive is unpacked into a temporary directory that lives as long as
//! the returned [`StagedImages`].

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use tracing::debug;

/// Metadata folder macOS adds to archives
const MACOS_METADATA: &str = "__MACOSX";

/// A directory of lookup images ready for the resolver
#[derive(Debug)]
pub struct StagedImages {
    directory: PathBuf,
    temp: Option<TempDir>,
}

impl StagedImages {
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Whether the images were unpacked from an archive
    pub fn is_extracted(&self) -> bool {
        self.temp.is_some()
    }
}

/// Make `source` usable as an image directory
pub fn stage_images(source: &Path) -> Result<StagedImages> {
    if source.is_dir() {
        return Ok(StagedImages {
            directory: source.to_path_buf(),
            temp: None,
        });
    }
    if !source.exists() {
        anyhow::bail!("Image source not found: {}", source.display());
    }

    let temp = TempDir::new().context("Failed to create a directory for the image archive")?;
    extract_zip(source, temp.path())?;
    let directory = single_subfolder(temp.path())?.unwrap_or_else(|| temp.path().to_path_buf());
    debug!(
        archive = %source.display(),
        directory = %directory.display(),
        "image archive extracted"
    );

    Ok(StagedImages {
        directory,
        temp: Some(temp),
    })
}

fn extract_zip(source: &Path, target: &Path) -> Result<()> {
    let file = File::open(source)
        .with_context(|| format!("Failed to open image archive: {}", source.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Not a zip archive: {}", source.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        // Entries escaping the target directory have no enclosed name
        let Some(relative) = entry.enclosed_name() else {
            debug!(name = entry.name(), "unsafe archive entry skipped");
            continue;
        };
        if relative.starts_with(MACOS_METADATA) {
            continue;
        }

        let path = target.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&path)?;
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&path)
            .with_context(|| format!("Failed to extract {}", path.display()))?;
        io::copy(&mut entry, &mut out)?;
    }
    Ok(())
}

/// The only entry of `dir` when that entry is a folder
fn single_subfolder(dir: &Path) -> Result<Option<PathBuf>> {
    let entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    match entries.as_slice() {
        [only] if only.is_dir() => Ok(Some(only.clone())),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, bytes) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_directory_used_as_is() {
        let dir = TempDir::new().unwrap();
        let staged = stage_images(dir.path()).unwrap();
        assert_eq!(staged.directory(), dir.path());
        assert!(!staged.is_extracted());
    }

    #[test]
    fn test_flat_archive() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("barcodes.zip");
        write_zip(&archive, &[("ABC.png", b"a"), ("XYZ.jpg", b"x")]);

        let staged = stage_images(&archive).unwrap();
        assert!(staged.is_extracted());
        assert_eq!(fs::read(staged.directory().join("ABC.png")).unwrap(), b"a");
        assert!(staged.directory().join("XYZ.jpg").exists());
    }

    #[test]
    fn test_archive_with_top_folder() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("barcodes.zip");
        write_zip(
            &archive,
            &[
                ("barcodes/ABC.png", b"a"),
                ("__MACOSX/barcodes/._ABC.png", b"junk"),
            ],
        );

        let staged = stage_images(&archive).unwrap();
        assert!(staged.directory().ends_with("barcodes"));
        assert!(staged.directory().join("ABC.png").exists());
    }

    #[test]
    fn test_extracted_files_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("barcodes.zip");
        write_zip(&archive, &[("ABC.png", b"a")]);

        let staged = stage_images(&archive).unwrap();
        let extracted = staged.directory().to_path_buf();
        drop(staged);
        assert!(!extracted.exists());
    }

    #[test]
    fn test_bad_sources() {
        let dir = TempDir::new().unwrap();
        assert!(stage_images(&dir.path().join("absent.zip")).is_err());

        let bogus = dir.path().join("bogus.zip");
        fs::write(&bogus, b"not a zip").unwrap();
        assert!(stage_images(&bogus).is_err());
    }
}
