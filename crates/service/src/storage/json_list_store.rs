use std::{path::PathBuf, sync::Arc};
use tokio::{fs, sync::RwLock};
use tracing::debug;

use crate::errors::ServiceError;

/// Generic JSON file-backed ordered list store.
///
/// Persists a `Vec<T>` to a single pretty-printed JSON file and serializes
/// every read-modify-write cycle through one `RwLock`-guarded owner, with
/// the file rewritten while the lock is still held, so concurrent mutations
/// cannot observe or persist stale copies of the list.
/// Intended for lightweight state where a database is overkill.
#[derive(Clone)]
pub struct JsonListStore<T> {
    inner: Arc<RwLock<Vec<T>>>,
    file_path: PathBuf,
}

impl<T> JsonListStore<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    /// Initialize the store from a path. A missing file yields an empty list
    /// and the file is only written on the first mutation; a file that exists
    /// but is unreadable or not well-formed JSON is a hard error.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.ok();
            }
        }

        let list: Vec<T> = match fs::read(&file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ServiceError::Storage(format!("{}: {}", file_path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(ServiceError::Storage(format!("{}: {}", file_path.display(), e)))
            }
        };
        debug!(path = %file_path.display(), len = list.len(), "loaded list from disk");

        Ok(Arc::new(Self { inner: Arc::new(RwLock::new(list)), file_path }))
    }

    async fn save(&self, list: &[T]) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(list)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        fs::write(&self.file_path, data)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Snapshot of all elements in insertion order.
    pub async fn list(&self) -> Vec<T> {
        let list = self.inner.read().await;
        list.clone()
    }

    /// Apply a mutation and persist the whole list before the write lock is
    /// released, so file writes land in mutation order. An error from the
    /// closure short-circuits before any file write, and a failed write
    /// rolls the list back; a failed mutation changes neither memory nor
    /// the file.
    pub async fn update<R, F>(&self, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut Vec<T>) -> Result<R, ServiceError>,
    {
        let mut list = self.inner.write().await;
        let snapshot = list.clone();
        let result = match f(&mut list) {
            Ok(out) => self.save(&list).await.map(|_| out),
            Err(e) => Err(e),
        };
        if result.is_err() {
            *list = snapshot;
        }
        result
    }
}
