use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::sync::Mutex;

use super::error::StoreError;
use super::types::FreshnessRecord;

/// Key-value store for freshness records, keyed by `(job_name, scope)`.
///
/// `upsert` is last-write-wins.
pub trait FreshnessStore: Send + Sync {
    /// Fetches the record for a unit, if any.
    fn get(
        &self,
        job_name: &str,
        scope: &str,
    ) -> impl Future<Output = Result<Option<FreshnessRecord>, StoreError>> + Send;

    /// Inserts or replaces the record for `(record.job_name, record.scope)`.
    fn upsert(&self, record: FreshnessRecord) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<S: FreshnessStore> FreshnessStore for Arc<S> {
    fn get(
        &self,
        job_name: &str,
        scope: &str,
    ) -> impl Future<Output = Result<Option<FreshnessRecord>, StoreError>> + Send {
        (**self).get(job_name, scope)
    }

    fn upsert(&self, record: FreshnessRecord) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).upsert(record)
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryFreshnessStore {
    records: RwLock<HashMap<(String, String), FreshnessRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryFreshnessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call return [`StoreError::Unavailable`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Snapshot of all records, sorted by key.
    pub fn records(&self) -> Vec<FreshnessRecord> {
        let mut records: Vec<_> = self.records.read().values().cloned().collect();
        records.sort_by_key(FreshnessRecord::key);
        records
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "in-memory store marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl FreshnessStore for InMemoryFreshnessStore {
    async fn get(&self, job_name: &str, scope: &str) -> Result<Option<FreshnessRecord>, StoreError> {
        self.check_available()?;
        let key = (job_name.to_string(), scope.to_string());
        Ok(self.records.read().get(&key).cloned())
    }

    async fn upsert(&self, record: FreshnessRecord) -> Result<(), StoreError> {
        self.check_available()?;
        self.records.write().insert(record.key(), record);
        Ok(())
    }
}

/// Store persisted as a single JSON array file.
///
/// The file is read once, on first access, into an in-process map; later reads are
/// served from that map. Every upsert rewrites the whole file through a sibling
/// temp file renamed over the target, so this store suits snapshot-scale runs
/// with one writer process.
/// A missing parent directory means the store was never provisioned and is
/// reported as [`StoreError::Unavailable`]; a missing file is an empty store.
#[derive(Debug)]
pub struct JsonFileFreshnessStore {
    path: PathBuf,
    records: Mutex<Option<RecordMap>>,
}

type RecordMap = HashMap<(String, String), FreshnessRecord>;

impl JsonFileFreshnessStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn ensure_provisioned(&self) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => return Ok(()),
        };
        match tokio::fs::metadata(parent).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StoreError::Unavailable {
                reason: format!("{} is not a directory", parent.display()),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::Unavailable {
                reason: format!("directory {} does not exist", parent.display()),
            }),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn read_file(&self) -> Result<RecordMap, StoreError> {
        self.ensure_provisioned().await?;
        let records: Vec<FreshnessRecord> = match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };
        Ok(records.into_iter().map(|r| (r.key(), r)).collect())
    }

    /// Returns the cached map, reading the file on first use. Failed reads are not cached.
    async fn loaded<'a>(
        &self,
        slot: &'a mut Option<RecordMap>,
    ) -> Result<&'a mut RecordMap, StoreError> {
        let records = match slot.take() {
            Some(records) => records,
            None => self.read_file().await?,
        };
        Ok(slot.insert(records))
    }
}

impl FreshnessStore for JsonFileFreshnessStore {
    async fn get(&self, job_name: &str, scope: &str) -> Result<Option<FreshnessRecord>, StoreError> {
        let mut slot = self.records.lock().await;
        let records = self.loaded(&mut *slot).await?;
        let key = (job_name.to_string(), scope.to_string());
        Ok(records.get(&key).cloned())
    }

    async fn upsert(&self, record: FreshnessRecord) -> Result<(), StoreError> {
        let mut slot = self.records.lock().await;
        let records = self.loaded(&mut *slot).await?;
        self.ensure_provisioned().await?;

        let previous = records.insert(record.key(), record.clone());
        let bytes = {
            let mut sorted: Vec<&FreshnessRecord> = records.values().collect();
            sorted.sort_by_key(|r| r.key());
            serde_json::to_vec_pretty(&sorted)
        };

        let written = match bytes {
            Ok(bytes) => write_atomic(&self.tmp_path(), &self.path, &bytes).await,
            Err(e) => Err(e.into()),
        };
        if written.is_err() {
            match previous {
                Some(previous) => records.insert(record.key(), previous),
                None => records.remove(&record.key()),
            };
        }
        written
    }
}

async fn write_atomic(tmp: &Path, target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    tokio::fs::write(tmp, bytes).await?;
    tokio::fs::rename(tmp, target).await?;
    Ok(())
}
