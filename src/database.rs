use serde::{de::DeserializeOwned, Serialize};
use std::{path::Path, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{fs, sync::RwLock, time};
use tracing::error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Codec(String),
    #[error("Database error: {0}")]
    Custom(String),
}

#[derive(Debug)]
struct DatabaseInner<T> {
    data: T,
    path: String,
}

/// File-backed document store. The whole dataset lives in memory and is
/// written out as a bincode snapshot after every successful transaction.
#[derive(Clone, Debug)]
pub struct Database<T: Serialize + DeserializeOwned + Default + Send + Sync + Clone + 'static> {
    inner: Arc<RwLock<DatabaseInner<T>>>,
}

impl<T: Serialize + DeserializeOwned + Default + Send + Sync + Clone + 'static> Database<T> {
    pub async fn new(path: impl Into<String>) -> Result<Self, DbError> {
        let path = path.into();

        if let Some(parent) = Path::new(&path).parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                error!("Failed to create database directory: {}", e);
                DbError::Io(e)
            })?;
        }

        let data = if Path::new(&path).exists() {
            let bytes = fs::read(&path).await.map_err(|e| {
                error!("Failed to read database {}: {}", path, e);
                DbError::Io(e)
            })?;
            bincode::deserialize(&bytes).map_err(|e| {
                error!("Failed to deserialize database {}: {}", path, e);
                DbError::Codec(e.to_string())
            })?
        } else {
            T::default()
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(DatabaseInner { data, path })),
        })
    }

    /// Writes the snapshot next to `path` and renames it into place, so a
    /// failed or interrupted save never leaves a partial file behind.
    async fn save(path: &str, data: &T) -> Result<(), DbError> {
        let bytes = bincode::serialize(data).map_err(|e| DbError::Codec(e.to_string()))?;
        let tmp = format!("{}.tmp", path);

        let write = async {
            fs::write(&tmp, bytes).await?;
            fs::rename(&tmp, path).await?;
            Ok::<_, std::io::Error>(())
        };

        match time::timeout(Duration::from_secs(5), write).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                error!("Database save operation timed out");
                Err(DbError::Custom("Save operation timed out".into()))
            }
        }
    }

    /// Runs `f` against a copy of the data and commits it only if both `f`
    /// and the snapshot write succeed. The write lock is held throughout, so
    /// transactions never interleave.
    pub async fn transaction<F, R>(&self, f: F) -> Result<R, DbError>
    where
        F: FnOnce(&mut T) -> Result<R, String>,
    {
        let mut guard = self.inner.write().await;
        let mut data = guard.data.clone();
        let result = f(&mut data).map_err(DbError::Custom)?;

        Self::save(&guard.path, &data).await?;
        guard.data = data;

        Ok(result)
    }

    pub async fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let guard = self.inner.read().await;
        f(&guard.data)
    }
}

#[cfg(test)]
pub(crate) fn temp_path(prefix: &str) -> String {
    std::env::temp_dir()
        .join(format!("voicetime-{}-{}.db", prefix, fastrand::u64(..)))
        .to_string_lossy()
        .into_owned()
}
