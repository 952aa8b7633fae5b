//! Document storage implementation using Apache OpenDAL.

use expensa_shared::config::StorageConfig;
use opendal::{ErrorKind, Operator, services};

use super::error::StorageError;

/// Stores rendered report documents by filename.
#[derive(Clone)]
pub struct DocumentStorage {
    operator: Operator,
    provider: &'static str,
}

impl DocumentStorage {
    /// Create storage from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let (operator, provider) = match config {
            StorageConfig::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);
                (Self::finish(builder)?, "s3")
            }
            StorageConfig::LocalFs { root } => {
                let root = root
                    .to_str()
                    .ok_or_else(|| StorageError::configuration("invalid path"))?;
                (Self::finish(services::Fs::default().root(root))?, "local_fs")
            }
            StorageConfig::Memory => (Self::finish(services::Memory::default())?, "memory"),
        };

        Ok(Self { operator, provider })
    }

    /// In-memory storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory backend cannot be initialized.
    pub fn memory() -> Result<Self, StorageError> {
        Self::from_config(&StorageConfig::Memory)
    }

    fn finish<B: opendal::Builder>(builder: B) -> Result<Operator, StorageError> {
        Ok(Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish())
    }

    /// Writes `bytes` under `key` and returns the stored key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unusable or the write fails.
    pub async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let key = sanitize_key(key)?;
        self.operator
            .write_with(&key, bytes)
            .content_type(content_type)
            .await?;
        Ok(key)
    }

    /// Reads the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if nothing is stored there.
    pub async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let key = sanitize_key(key)?;
        match self.operator.read(&key).await {
            Ok(buffer) => Ok(buffer.to_vec()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::not_found(key)),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a document exists in storage.
    pub async fn exists(&self, key: &str) -> bool {
        let Ok(key) = sanitize_key(key) else {
            return false;
        };
        self.operator.stat(&key).await.is_ok()
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider
    }
}

/// Validates a flat document key.
///
/// Only ASCII alphanumerics, dots, hyphens and underscores are kept;
/// anything else becomes `_`. Keys may not be empty or start with a dot.
///
/// # Errors
///
/// Returns `StorageError::InvalidKey` for empty or hidden keys.
pub fn sanitize_key(key: &str) -> Result<String, StorageError> {
    let sanitized: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.starts_with('.') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(sanitized)
}
