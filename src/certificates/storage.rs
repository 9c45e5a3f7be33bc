use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader};
use uuid::Uuid;

const MAX_FILENAME_LEN: usize = 255;

#[derive(Debug, Error)]
pub enum CertificateStorageError {
    #[error("certificate file not found")]
    NotFound,
    #[error("invalid file name: {0}")]
    InvalidName(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CertificateStorageError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

const TEMP_DIR: &str = ".tmp";

/// Flat directory of certificate blobs, addressed by stored filename.
#[derive(Debug, Clone)]
pub struct CertificateStorage {
    base_path: PathBuf,
}

/// Previous bytes of a blob that `put` replaced, held aside until the caller
/// restores or discards them.
#[derive(Debug)]
pub struct ReplacedBlob {
    filename: String,
    backup_path: PathBuf,
}

impl CertificateStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn blob_path(&self, filename: &str) -> Result<PathBuf, CertificateStorageError> {
        validate_stored_name(filename)?;
        Ok(self.base_path.join(filename))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(TEMP_DIR)
            .join(Uuid::new_v4().to_string())
    }

    pub async fn get(
        &self,
        filename: &str,
    ) -> Result<(BufReader<File>, u64), CertificateStorageError> {
        let path = self.blob_path(filename)?;
        let file = File::open(&path)
            .await
            .map_err(CertificateStorageError::from_io)?;

        let size = file.metadata().await?.len();

        Ok((BufReader::new(file), size))
    }

    /// Writes `data` under `filename`, replacing any blob with that name.
    /// The bytes land in a temp file first so readers never see a partial blob.
    ///
    /// If a blob with that name already existed its bytes are returned as a
    /// `ReplacedBlob`, which must be passed to `restore` or `discard`.
    pub async fn put(
        &self,
        filename: &str,
        data: &[u8],
    ) -> Result<Option<ReplacedBlob>, CertificateStorageError> {
        let final_path = self.blob_path(filename)?;

        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // A future dropped before the rename leaves this file behind until
        // the next `remove_stale_temp`.
        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(data).await?;
        temp_file.sync_all().await?;
        drop(temp_file);

        let replaced = match self.keep_previous(filename, &final_path).await {
            Ok(replaced) => replaced,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            if let Some(replaced) = replaced {
                let _ = fs::remove_file(&replaced.backup_path).await;
            }
            return Err(e.into());
        }

        Ok(replaced)
    }

    /// Hard-links an existing blob into the temp directory so the rename in
    /// `put` swaps names atomically while the old bytes stay recoverable.
    async fn keep_previous(
        &self,
        filename: &str,
        final_path: &Path,
    ) -> Result<Option<ReplacedBlob>, CertificateStorageError> {
        let backup_path = self.temp_path();
        match fs::hard_link(final_path, &backup_path).await {
            Ok(()) => Ok(Some(ReplacedBlob {
                filename: filename.to_string(),
                backup_path,
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CertificateStorageError::Io(e)),
        }
    }

    /// Puts the replaced bytes back under their original name.
    pub async fn restore(&self, replaced: ReplacedBlob) -> Result<(), CertificateStorageError> {
        let path = self.blob_path(&replaced.filename)?;
        fs::rename(&replaced.backup_path, &path).await?;
        Ok(())
    }

    pub async fn discard(&self, replaced: ReplacedBlob) -> Result<(), CertificateStorageError> {
        match fs::remove_file(&replaced.backup_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CertificateStorageError::Io(e)),
        }
    }

    pub async fn delete(&self, filename: &str) -> Result<bool, CertificateStorageError> {
        let path = self.blob_path(filename)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CertificateStorageError::Io(e)),
        }
    }

    /// Clears temp and backup files left by writes that never finished.
    /// Must run before uploads are accepted. Returns the number removed.
    pub async fn remove_stale_temp(&self) -> Result<usize, CertificateStorageError> {
        let mut entries = match fs::read_dir(self.base_path.join(TEMP_DIR)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CertificateStorageError::Io(e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            fs::remove_file(entry.path()).await?;
            removed += 1;
        }

        Ok(removed)
    }
}

/// Builds the on-disk name `{regno}_{declared}` for an upload.
///
/// Only the last path component of the declared name is kept, since browsers
/// and scripted clients disagree on whether they send full paths.
pub fn stored_filename(regno: &str, declared: &str) -> Result<String, CertificateStorageError> {
    if regno.is_empty() || regno.contains(['/', '\\']) {
        return Err(CertificateStorageError::InvalidName(
            "register number cannot contain path separators".to_string(),
        ));
    }

    let base = declared
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base == "." || base == ".." {
        return Err(CertificateStorageError::InvalidName(
            "file name is empty".to_string(),
        ));
    }

    let name = format!("{regno}_{base}");
    validate_stored_name(&name)?;
    Ok(name)
}

fn validate_stored_name(name: &str) -> Result<(), CertificateStorageError> {
    if name.is_empty() || name == "." || name == ".." || name.starts_with('.') {
        return Err(CertificateStorageError::InvalidName(name.to_string()));
    }

    if name.len() > MAX_FILENAME_LEN {
        return Err(CertificateStorageError::InvalidName(format!(
            "file name cannot exceed {MAX_FILENAME_LEN} bytes"
        )));
    }

    const INVALID_CHARS: &[char] = &['/', '\\', '\0', '\n', '\r'];
    if name.chars().any(|c| INVALID_CHARS.contains(&c)) {
        return Err(CertificateStorageError::InvalidName(
            "file name contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    async fn read_blob(storage: &CertificateStorage, filename: &str) -> Vec<u8> {
        let (mut reader, _) = storage.get(filename).await.unwrap();
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.unwrap();
        content
    }

    fn temp_entries(temp_dir: &TempDir) -> usize {
        std::fs::read_dir(temp_dir.path().join(TEMP_DIR))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let storage = CertificateStorage::new(temp_dir.path());
        let data = b"%PDF-1.4 certificate".to_vec();

        assert!(storage.put("R1_cert.pdf", &data).await.unwrap().is_none());
        assert!(temp_dir.path().join("R1_cert.pdf").is_file());

        let (mut reader, size) = storage.get("R1_cert.pdf").await.unwrap();
        assert_eq!(size, data.len() as u64);

        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, data);
    }

    #[tokio::test]
    async fn test_put_overwrites_same_name() {
        let temp_dir = TempDir::new().unwrap();
        let storage = CertificateStorage::new(temp_dir.path());

        storage.put("R1_cert.pdf", b"old").await.unwrap();
        let replaced = storage.put("R1_cert.pdf", b"new").await.unwrap().unwrap();
        assert_eq!(read_blob(&storage, "R1_cert.pdf").await, b"new");

        storage.discard(replaced).await.unwrap();
        assert_eq!(read_blob(&storage, "R1_cert.pdf").await, b"new");
        assert_eq!(temp_entries(&temp_dir), 0);
    }

    #[tokio::test]
    async fn test_restore_brings_back_replaced_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let storage = CertificateStorage::new(temp_dir.path());

        storage.put("R1_cert.pdf", b"old").await.unwrap();
        let replaced = storage.put("R1_cert.pdf", b"new").await.unwrap().unwrap();

        storage.restore(replaced).await.unwrap();
        assert_eq!(read_blob(&storage, "R1_cert.pdf").await, b"old");
        assert_eq!(temp_entries(&temp_dir), 0);
    }

    #[tokio::test]
    async fn test_remove_stale_temp() {
        let temp_dir = TempDir::new().unwrap();
        let storage = CertificateStorage::new(temp_dir.path());
        assert_eq!(storage.remove_stale_temp().await.unwrap(), 0);

        storage.put("R1_cert.pdf", b"123").await.unwrap();
        std::fs::write(temp_dir.path().join(TEMP_DIR).join("interrupted"), b"12").unwrap();

        assert_eq!(storage.remove_stale_temp().await.unwrap(), 1);
        assert_eq!(temp_entries(&temp_dir), 0);
        assert_eq!(read_blob(&storage, "R1_cert.pdf").await, b"123");
    }

    #[tokio::test]
    async fn test_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let storage = CertificateStorage::new(temp_dir.path());

        assert!(matches!(
            storage.get("R1_missing.pdf").await,
            Err(CertificateStorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let storage = CertificateStorage::new(temp_dir.path());

        storage.put("R1_cert.pdf", b"123").await.unwrap();
        assert!(storage.delete("R1_cert.pdf").await.unwrap());
        assert!(!temp_dir.path().join("R1_cert.pdf").exists());
        assert!(!storage.delete("R1_cert.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_traversal_names() {
        let temp_dir = TempDir::new().unwrap();
        let storage = CertificateStorage::new(temp_dir.path());

        assert!(matches!(
            storage.put("../escape", b"x").await,
            Err(CertificateStorageError::InvalidName(_))
        ));
        assert!(matches!(
            storage.get("..").await,
            Err(CertificateStorageError::InvalidName(_))
        ));
    }

    #[test]
    fn test_stored_filename() {
        assert_eq!(stored_filename("R1", "cert.pdf").unwrap(), "R1_cert.pdf");
        assert_eq!(
            stored_filename("R1", "C:\\Users\\ada\\cert.pdf").unwrap(),
            "R1_cert.pdf"
        );
        assert_eq!(
            stored_filename("R1", "../../etc/passwd").unwrap(),
            "R1_passwd"
        );
        assert!(stored_filename("R1", "").is_err());
        assert!(stored_filename("R1", "dir/").is_err());
        assert!(stored_filename("R1", "..").is_err());
        assert!(stored_filename("../R1", "cert.pdf").is_err());
        assert!(stored_filename("", "cert.pdf").is_err());
    }
}
