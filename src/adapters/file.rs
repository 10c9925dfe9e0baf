use crate::adapters::memory::{Dataset, MemoryStore};
use crate::ports::store::{
    AddressRegistry, CollectionSummary, DiagnosticStore, DueWindow, NotificationStore, StoreResult,
};
use crate::types::notification::{DeliveryRecord, Notification};
use crate::types::registration::Registration;

use futures::FutureExt;
use futures::future::BoxFuture;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::io::AsyncWriteExt;

/// JSON document file loaded into a [`MemoryStore`] and rewritten atomically
/// after every mutation.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    memory: MemoryStore,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl FileStore {
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let dataset = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Dataset::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Dataset::default(),
            Err(err) => return Err(err.into()),
        };
        let store = Self {
            path,
            memory: MemoryStore::new(dataset),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        };
        store.persist().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub async fn persist(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write(&self.memory.snapshot()).await
    }

    /// Applies `change` to a staged copy and makes it visible only after the
    /// copy is on disk, so a failed write leaves memory and disk unchanged.
    async fn commit<F>(&self, change: F) -> StoreResult<bool>
    where
        F: FnOnce(&MemoryStore) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let staged = MemoryStore::new(self.memory.snapshot());
        if !change(&staged) {
            return Ok(false);
        }
        let dataset = staged.snapshot();
        self.write(&dataset).await?;
        self.memory.replace(dataset);
        Ok(true)
    }

    async fn write(&self, dataset: &Dataset) -> StoreResult<()> {
        let contents = serde_json::to_vec_pretty(dataset)?;
        atomic_write(&self.path, &contents).await?;
        Ok(())
    }
}

async fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("dispatchd.json");
    let pid = std::process::id();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    for attempt in 0..10u32 {
        let temp_path = parent.join(format!(".{file_name}.tmp-{pid}-{nanos}-{attempt}"));
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .await
        {
            Ok(mut file) => {
                file.write_all(contents).await?;
                file.flush().await?;
                file.sync_all().await?;
                tokio::fs::rename(&temp_path, path).await?;
                return Ok(());
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::other("failed to create temp file"))
}

impl NotificationStore for FileStore {
    fn due_notifications(&self, window: DueWindow) -> BoxFuture<'_, StoreResult<Vec<Notification>>> {
        self.memory.due_notifications(window)
    }

    fn claim<'a>(
        &'a self,
        id: &'a str,
        at: OffsetDateTime,
        stale_before: OffsetDateTime,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        self.commit(move |staged| staged.claim_now(id, at, stale_before))
            .boxed()
    }

    fn finalize<'a>(
        &'a self,
        id: &'a str,
        record: &'a DeliveryRecord,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        self.commit(move |staged| staged.finalize_now(id, record))
            .boxed()
    }
}

impl AddressRegistry for FileStore {
    fn addresses_for<'a>(
        &'a self,
        recipient_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<Registration>>> {
        self.memory.addresses_for(recipient_id)
    }

    fn remove<'a>(
        &'a self,
        recipient_id: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        self.commit(move |staged| staged.remove_now(recipient_id, address))
            .boxed()
    }
}

impl DiagnosticStore for FileStore {
    fn recipients(&self) -> BoxFuture<'_, StoreResult<Vec<String>>> {
        self.memory.recipients()
    }

    fn notifications(&self) -> BoxFuture<'_, StoreResult<Vec<Notification>>> {
        self.memory.notifications()
    }

    fn registrations(&self) -> BoxFuture<'_, StoreResult<Vec<Registration>>> {
        self.memory.registrations()
    }

    fn collections(&self) -> BoxFuture<'_, StoreResult<Vec<CollectionSummary>>> {
        self.memory.collections()
    }
}
