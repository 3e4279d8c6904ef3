use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage key: '{0}'")]
    InvalidKey(String),
}

/// Minimal blob-store surface. Backends for cloud object stores implement
/// the same four operations; keys are `/`-separated paths relative to the
/// backend root.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Keys must be relative, with no empty or `..` segments.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key.split('/').all(|segment| !segment.is_empty() && segment != "..");

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Local filesystem backend rooted at a directory.
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageBackend for FilesystemStorage {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::read(&path).await?)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }
}

/// Wraps any backend and namespaces every key under a fixed prefix, so
/// several deployments can share one bucket or directory tree.
///
/// The prefix is normalized once at construction: surrounding slashes are
/// trimmed and an empty prefix passes keys through untouched.
pub struct PrefixedStorage<B> {
    prefix: String,
    inner: B,
}

impl<B> PrefixedStorage<B> {
    pub fn new(prefix: impl Into<String>, inner: B) -> Self {
        let prefix = prefix.into().trim_matches('/').to_string();
        Self { prefix, inner }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The key handed to the wrapped backend.
    pub fn full_key(&self, key: &str) -> Result<String, StorageError> {
        validate_key(key)?;
        if self.prefix.is_empty() {
            Ok(key.to_string())
        } else {
            Ok(format!("{}/{}", self.prefix, key))
        }
    }
}

#[async_trait]
impl<B: StorageBackend> StorageBackend for PrefixedStorage<B> {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.inner.put(&self.full_key(key)?, bytes).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.inner.get(&self.full_key(key)?).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.exists(&self.full_key(key)?).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(&self.full_key(key)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullBackend;

    #[async_trait]
    impl StorageBackend for NullBackend {
        async fn put(&self, _key: &str, _bytes: &[u8]) -> Result<(), StorageError> {
            Ok(())
        }

        async fn get(&self, _key: &str) -> Result<Vec<u8>, StorageError> {
            Ok(Vec::new())
        }

        async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
            Ok(false)
        }

        async fn delete(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn test_prefix_is_normalized() {
        let storage = PrefixedStorage::new("/media/uploads/", NullBackend);
        assert_eq!(storage.prefix(), "media/uploads");
        assert_eq!(storage.full_key("avatars/a.png").unwrap(), "media/uploads/avatars/a.png");
    }

    #[test]
    fn test_empty_prefix_passes_keys_through() {
        let storage = PrefixedStorage::new("", NullBackend);
        assert_eq!(storage.full_key("a.png").unwrap(), "a.png");
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let storage = PrefixedStorage::new("media", NullBackend);
        assert!(storage.full_key("").is_err());
        assert!(storage.full_key("/etc/passwd").is_err());
        assert!(storage.full_key("a/../../b").is_err());
        assert!(storage.full_key("a//b").is_err());
    }

    #[tokio::test]
    async fn test_filesystem_round_trip_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let storage = PrefixedStorage::new("tenant-a", FilesystemStorage::new(dir.path()));

        storage.put("docs/hello.txt", b"hi there").await.unwrap();

        assert!(storage.exists("docs/hello.txt").await.unwrap());
        assert_eq!(storage.get("docs/hello.txt").await.unwrap(), b"hi there");

        // The object landed under the prefix on disk
        assert!(dir.path().join("tenant-a/docs/hello.txt").exists());

        storage.delete("docs/hello.txt").await.unwrap();
        assert!(!storage.exists("docs/hello.txt").await.unwrap());
    }
}
