//! Filesystem storage for uploaded media.
//!
//! Files land under `<root>/<directory>/YYYY/MM/DD/<uuid>-<name>.<ext>`; the
//! path relative to the root is what gets persisted on the post.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
}

impl UploadStorageError {
    /// Whether the error means the file simply is not there.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::InvalidPath => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            Self::EmptyPayload => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub stored_path: String,
    pub checksum: String,
    pub size_bytes: u64,
}

#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Storage rooted at `root`, creating the directory if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Write `data` below `directory`, returning the stored relative path.
    pub async fn store(
        &self,
        directory: &str,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredUpload, UploadStorageError> {
        if data.is_empty() {
            return Err(UploadStorageError::EmptyPayload);
        }

        let stored_path = build_stored_path(directory, original_name);
        let absolute = self.resolve(&stored_path)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let partial = absolute.with_extension("part");
        let mut file = fs::File::create(&partial).await?;
        if let Err(err) = write_all(&mut file, &data).await {
            drop(file);
            let _ = fs::remove_file(&partial).await;
            return Err(err.into());
        }
        drop(file);
        fs::rename(&partial, &absolute).await?;

        let checksum = hex::encode(Sha256::digest(&data));
        debug!(
            target = "yatube::uploads",
            path = %stored_path,
            size = data.len(),
            checksum = %checksum,
            "upload stored"
        );

        Ok(StoredUpload {
            stored_path,
            checksum,
            size_bytes: data.len() as u64,
        })
    }

    pub async fn read(&self, stored_path: &str) -> Result<Bytes, UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Remove a stored file. Missing files are treated as success.
    pub async fn delete(&self, stored_path: &str) -> Result<(), UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(UploadStorageError::Io(err)),
        }
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(UploadStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

async fn write_all(file: &mut fs::File, data: &[u8]) -> Result<(), std::io::Error> {
    file.write_all(data).await?;
    file.flush().await?;
    file.sync_all().await
}

/// Column width of `posts.image`; the file component must also fit the
/// usual 255-byte filesystem name limit, which this bound implies.
const MAX_STORED_PATH_BYTES: usize = 255;
const MAX_EXTENSION_BYTES: usize = 16;

fn build_stored_path(directory: &str, original_name: &str) -> String {
    let (year, month, day) = time::OffsetDateTime::now_utc().to_calendar_date();
    let directory = directory.trim_matches('/');
    let identifier = Uuid::new_v4().simple();
    let prefix = format!("{directory}/{year}/{:02}/{:02}/{identifier}-", month as u8, day);
    let filename = sanitize_filename(
        original_name,
        MAX_STORED_PATH_BYTES.saturating_sub(prefix.len()),
    );
    format!("{prefix}{filename}")
}

/// Slugified file name of at most `max_len` bytes, extension included.
fn sanitize_filename(original: &str, max_len: usize) -> String {
    let path = Path::new(original);
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| {
            !value.is_empty()
                && value.len() <= MAX_EXTENSION_BYTES
                && value.chars().all(|ch| ch.is_ascii_alphanumeric())
        });

    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("upload");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "upload".to_string();
    }

    let reserved = extension.as_ref().map_or(0, |ext| ext.len() + 1);
    // slugify output is ASCII, so byte truncation stays on char boundaries
    base.truncate(max_len.saturating_sub(reserved).max(1));
    let base = base.trim_end_matches('-');
    let base = if base.is_empty() { "u" } else { base };

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_filename("My Photo.JPG", 200), "my-photo.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd", 200), "passwd");
        assert_eq!(sanitize_filename("???.gif", 200), "upload.gif");
        assert_eq!(sanitize_filename("", 200), "upload");
    }

    #[test]
    fn long_names_are_truncated_before_the_extension() {
        let name = format!("{}.gif", "a".repeat(240));
        let sanitized = sanitize_filename(&name, 100);
        assert_eq!(sanitized.len(), 100);
        assert!(sanitized.ends_with("a.gif"));

        assert_eq!(sanitize_filename("my photo.gif", 7), "my.gif");

        let path = build_stored_path("posts", &name);
        assert_eq!(path.len(), MAX_STORED_PATH_BYTES);
        assert!(path.ends_with(".gif"));
    }

    #[test]
    fn stored_path_is_dated_below_directory() {
        let path = build_stored_path("posts", "small.gif");
        let parts: Vec<&str> = path.split('/').collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], "posts");
        assert_eq!(parts[1].len(), 4);
        assert!(parts[4].ends_with("-small.gif"));
    }

    #[tokio::test]
    async fn store_read_delete_cycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");

        let stored = storage
            .store("posts", "hello.txt", Bytes::from_static(b"hello"))
            .await
            .expect("store");
        assert_eq!(stored.size_bytes, 5);
        assert_eq!(stored.checksum.len(), 64);

        let data = storage.read(&stored.stored_path).await.expect("read");
        assert_eq!(&data[..], b"hello");

        storage.delete(&stored.stored_path).await.expect("delete");
        let err = storage.read(&stored.stored_path).await.unwrap_err();
        assert!(err.is_missing());
        storage
            .delete(&stored.stored_path)
            .await
            .expect("missing file is fine");
    }

    #[tokio::test]
    async fn rejects_traversal_and_empty_payloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");

        assert!(matches!(
            storage.read("../secret").await,
            Err(UploadStorageError::InvalidPath)
        ));
        assert!(matches!(
            storage.read("/etc/passwd").await,
            Err(UploadStorageError::InvalidPath)
        ));
        assert!(matches!(
            storage.store("posts", "a.gif", Bytes::new()).await,
            Err(UploadStorageError::EmptyPayload)
        ));
    }
}
