//! Lookup images keyed by a row value.
//!
//! Images live in one directory as `<key>.png` or `<key>.jpg`. A key that
//! has no image is not an error; the row simply gets no picture.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

/// Encoding of a resolved image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// Probe order
    pub const ALL: [ImageFormat; 2] = [ImageFormat::Png, ImageFormat::Jpeg];

    /// File extension, also used for the media part in the package
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

/// Bytes of a found image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub bytes: Arc<[u8]>,
    pub format: ImageFormat,
}

/// Find the image for `key` in `directory`
pub fn resolve_image(directory: &Path, key: &str) -> Option<ResolvedImage> {
    if !is_safe_key(key) {
        debug!(key, "image key rejected");
        return None;
    }

    for format in ImageFormat::ALL {
        let path = directory.join(format!("{key}.{}", format.extension()));
        match std::fs::read(&path) {
            Ok(bytes) => {
                debug!(path = %path.display(), "image resolved");
                return Some(ResolvedImage {
                    bytes: bytes.into(),
                    format,
                });
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "image unreadable, skipped");
            }
        }
    }
    None
}

/// Keys are plain file stems
fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\', '\0'])
}

/// Memoizing [`resolve_image`] over one directory
#[derive(Debug, Clone)]
pub struct ImageResolver {
    directory: PathBuf,
    cache: HashMap<String, Option<ResolvedImage>>,
}

impl ImageResolver {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            cache: HashMap::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn resolve(&mut self, key: &str) -> Option<ResolvedImage> {
        if let Some(cached) = self.cache.get(key) {
            return cached.clone();
        }
        let resolved = resolve_image(&self.directory, key);
        self.cache.insert(key.to_string(), resolved.clone());
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn images() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ABC123.png"), b"png bytes").unwrap();
        std::fs::write(dir.path().join("XYZ.jpg"), b"jpg bytes").unwrap();
        std::fs::write(dir.path().join("BOTH.png"), b"png wins").unwrap();
        std::fs::write(dir.path().join("BOTH.jpg"), b"jpg loses").unwrap();
        dir
    }

    #[test]
    fn test_png_then_jpg() {
        let dir = images();
        let png = resolve_image(dir.path(), "ABC123").unwrap();
        assert_eq!(png.format, ImageFormat::Png);
        assert_eq!(&*png.bytes, b"png bytes");

        let jpg = resolve_image(dir.path(), "XYZ").unwrap();
        assert_eq!(jpg.format, ImageFormat::Jpeg);

        let both = resolve_image(dir.path(), "BOTH").unwrap();
        assert_eq!(&*both.bytes, b"png wins");
    }

    #[test]
    fn test_missing_is_none() {
        let dir = images();
        assert!(resolve_image(dir.path(), "NOPE").is_none());
        assert!(resolve_image(&dir.path().join("absent"), "ABC123").is_none());
    }

    #[test]
    fn test_unsafe_keys() {
        let dir = images();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("inner.png"), b"x").unwrap();

        assert!(resolve_image(dir.path(), "").is_none());
        assert!(resolve_image(dir.path(), "sub/inner").is_none());
        assert!(resolve_image(&dir.path().join("sub"), "../ABC123").is_none());
        assert!(resolve_image(&dir.path().join("sub"), "..").is_none());
    }

    #[test]
    fn test_dotted_stem_resolves() {
        let dir = images();
        std::fs::write(dir.path().join("A..B.png"), b"dotted").unwrap();
        let image = resolve_image(dir.path(), "A..B").unwrap();
        assert_eq!(&*image.bytes, b"dotted");
    }

    #[test]
    fn test_resolver_memoizes() {
        let dir = images();
        let mut resolver = ImageResolver::new(dir.path());
        assert!(resolver.resolve("ABC123").is_some());

        std::fs::remove_file(dir.path().join("ABC123.png")).unwrap();
        assert!(resolver.resolve("ABC123").is_some());

        assert!(resolver.resolve("LATER").is_none());
        std::fs::write(dir.path().join("LATER.png"), b"x").unwrap();
        assert!(resolver.resolve("LATER").is_none());
    }
}
