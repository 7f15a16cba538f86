use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{ensure, Context, Result};
use chrono::NaiveDate;

/// Covers are partitioned by upload date below this directory
pub const COVER_UPLOAD_DIR: &str = "recipes/covers";
pub const MAX_COVER_BYTES: usize = 20_000_000;

lazy_static::lazy_static! {
    static ref UNSAFE_FILE_CHARS: regex::Regex = regex::Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex");
}

/// Uploaded files, kept on local disk below `root`
#[derive(Clone, Debug)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative directory for covers uploaded on `date`, e.g. `recipes/covers/2024/03/09`
    pub fn cover_dir(date: NaiveDate) -> String {
        format!("{}/{}", COVER_UPLOAD_DIR, date.format("%Y/%m/%d"))
    }

    /// Store a cover image and return its path relative to the media root.
    ///
    /// An existing file is never overwritten; the new one gets a numeric suffix instead.
    pub fn store_cover(&self, file_name: &str, content: &[u8], date: NaiveDate) -> Result<String> {
        ensure!(content.len() <= MAX_COVER_BYTES, "Cover image is too large");
        image::guess_format(content).context("Cover is not a recognized image format")?;

        let rel_dir = Self::cover_dir(date);
        let dir = self.root.join(&rel_dir);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Creating cover directory {}", dir.display()))?;

        let file_name = sanitize_file_name(file_name);
        let (stem, extension) = match file_name.rsplit_once('.') {
            Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
            _ => (file_name.as_str(), None),
        };
        let mut attempt = 0;
        loop {
            let candidate = match (attempt, extension) {
                (0, _) => file_name.clone(),
                (n, Some(extension)) => format!("{}_{}.{}", stem, n, extension),
                (n, None) => format!("{}_{}", stem, n),
            };
            let opened = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dir.join(&candidate));
            match opened {
                Ok(mut file) => {
                    file.write_all(content)?;
                    let rel_path = format!("{}/{}", rel_dir, candidate);
                    tracing::info!("Stored cover {}", rel_path);
                    return Ok(rel_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub fn remove(&self, rel_path: &str) -> Result<()> {
        let Some(path) = self.resolve(rel_path) else {
            anyhow::bail!("Refusing to remove media path {:?}", rel_path);
        };
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Removed media file {}", rel_path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Removing {}", path.display())),
        }
    }

    /// Map a relative media path to a file below the root, refusing anything that could
    /// escape it.
    pub fn resolve(&self, rel_path: &str) -> Option<PathBuf> {
        let rel = Path::new(rel_path);
        let is_plain = !rel_path.is_empty()
            && rel
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        is_plain.then(|| self.root.join(rel))
    }
}

/// Keep only characters that are safe in a file name on any platform
fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned = UNSAFE_FILE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "cover".into()
    } else {
        cleaned.into()
    }
}

/// Guess a content type from a file extension
pub fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next().map(|ext| ext.to_ascii_lowercase()).as_deref() {
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn covers_are_partitioned_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());
        let rel = storage.store_cover("bolo.png", PNG_MAGIC, day()).unwrap();
        assert_eq!(rel, "recipes/covers/2024/03/09/bolo.png");
        assert_eq!(std::fs::read(dir.path().join(&rel)).unwrap(), PNG_MAGIC);
    }

    #[test]
    fn existing_covers_are_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());
        let first = storage.store_cover("bolo.png", PNG_MAGIC, day()).unwrap();
        let second = storage.store_cover("bolo.png", PNG_MAGIC, day()).unwrap();
        assert_ne!(first, second);
        assert_eq!(second, "recipes/covers/2024/03/09/bolo_1.png");
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("bolo de fubá.png"), "bolo_de_fub_.png");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("..."), "cover");
    }

    #[test]
    fn non_images_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());
        assert!(storage.store_cover("notes.txt", b"hello", day()).is_err());
    }

    #[test]
    fn cover_size_limit_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());
        let mut content = PNG_MAGIC.to_vec();
        content.resize(MAX_COVER_BYTES, 0);
        assert!(storage.store_cover("big.png", &content, day()).is_ok());
        content.push(0);
        assert!(storage.store_cover("bigger.png", &content, day()).is_err());
    }

    #[test]
    fn removed_covers_are_gone() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());
        let rel = storage.store_cover("bolo.png", PNG_MAGIC, day()).unwrap();
        storage.remove(&rel).unwrap();
        assert!(!dir.path().join(&rel).exists());
        // Removing twice is fine, escaping the root is not
        storage.remove(&rel).unwrap();
        assert!(storage.remove("../bolo.png").is_err());
    }

    #[test]
    fn resolve_refuses_traversal() {
        let storage = MediaStorage::new("/srv/media");
        assert_eq!(
            storage.resolve("recipes/covers/2024/03/09/bolo.png"),
            Some(PathBuf::from("/srv/media/recipes/covers/2024/03/09/bolo.png"))
        );
        assert_eq!(storage.resolve("../secret"), None);
        assert_eq!(storage.resolve("recipes/../../secret"), None);
        assert_eq!(storage.resolve("/etc/passwd"), None);
        assert_eq!(storage.resolve(""), None);
    }

    #[test]
    fn content_types_follow_extensions() {
        assert_eq!(content_type_for("css/styles.css"), "text/css");
        assert_eq!(content_type_for("a/b/cover.JPG"), "image/jpeg");
        assert_eq!(content_type_for("unknown"), "application/octet-stream");
    }
}
