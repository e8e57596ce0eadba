//! Race-free access to the single sealed journal file.
//!
//! All mutations against the file pair are funneled through one fair
//! (FIFO-admission) `tokio::sync::RwLock` owned by the transactor instance:
//! updates take the write side and run strictly one at a time in submission
//! order; reads take the read side, so they wait out every previously
//! admitted update and may only overlap with other reads. Key derivation
//! and AEAD work is CPU-bound, so seal/unseal runs on the blocking pool.
//!
//! Failures are isolated per transaction. The guard is released on drop, so
//! a failed mutator or write-back never blocks or fails later, unrelated
//! transactions.

use tokio::sync::RwLock;
use tokio::task;
use tracing::debug;

use crate::error::StoreError;
use crate::journal::{self, Day, Entry, Journal};
use crate::sealed::{SealedStore, Unsealed};

pub struct JournalTransactor {
    store: SealedStore,
    lock: RwLock<()>,
}

impl JournalTransactor {
    pub fn new(store: SealedStore) -> Self {
        Self {
            store,
            lock: RwLock::new(()),
        }
    }

    pub fn store(&self) -> &SealedStore {
        &self.store
    }

    /// Open the journal, sealing a fresh empty document first if no file
    /// exists yet. Returns the full decrypted payload and private key.
    pub async fn unlock(&self, password: &str) -> Result<Unsealed<Journal>, StoreError> {
        let _guard = self.lock.write().await;
        if !self.store.exists() {
            let store = self.store.clone();
            let owned = password.to_string();
            run_blocking(move || store.seal(&owned, &Journal::new())).await?;
            debug!(
                path = %self.store.data_path().display(),
                "sealed new empty journal"
            );
        }
        let store = self.store.clone();
        let owned = password.to_string();
        run_blocking(move || store.unseal(&owned)).await
    }

    /// Decrypt and return the current document.
    pub async fn read(&self, password: &str) -> Result<Journal, StoreError> {
        let _guard = self.lock.read().await;
        let store = self.store.clone();
        let owned = password.to_string();
        let unsealed: Unsealed<Journal> = run_blocking(move || store.unseal(&owned)).await?;
        Ok(unsealed.payload)
    }

    /// One serialized read-modify-write cycle: unseal, hand the mutator
    /// exclusive access to the decoded document, seal back, return the
    /// mutator's value. The call returns only after the write-back is on
    /// disk. If the mutator fails, the file is left untouched.
    pub async fn update<F, R>(&self, password: &str, mutate: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Journal) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let _guard = self.lock.write().await;
        let store = self.store.clone();
        let owned = password.to_string();
        let unsealed: Unsealed<Journal> = run_blocking(move || store.unseal(&owned)).await?;
        let mut document = unsealed.payload;
        let value = mutate(&mut document)?;
        let store = self.store.clone();
        let owned = password.to_string();
        run_blocking(move || store.seal(&owned, &document)).await?;
        debug!("journal update committed");
        Ok(value)
    }

    /// Append a new entry to `date`. Input is validated before the
    /// transaction is admitted.
    pub async fn append_entry(
        &self,
        password: &str,
        date: &str,
        content: &str,
    ) -> Result<Entry, StoreError> {
        journal::validate_content(content)?;
        journal::validate_date(date)?;
        let date = date.to_string();
        let content = content.to_string();
        self.update(password, move |doc| doc.append_entry(&date, &content))
            .await
    }

    /// Edit the entry with `id` wherever it lives.
    pub async fn edit_entry(
        &self,
        password: &str,
        id: &str,
        content: &str,
        timestamp: Option<&str>,
    ) -> Result<Entry, StoreError> {
        journal::validate_content(content)?;
        if let Some(ts) = timestamp {
            journal::validate_timestamp(ts)?;
        }
        let id = id.to_string();
        let content = content.to_string();
        let timestamp = timestamp.map(str::to_string);
        self.update(password, move |doc| {
            doc.edit_entry(&id, &content, timestamp.as_deref())
        })
        .await
    }

    /// Replace the summary for `date`, creating the day if absent.
    pub async fn set_summary(
        &self,
        password: &str,
        date: &str,
        summary: &str,
    ) -> Result<Day, StoreError> {
        if summary.is_empty() {
            return Err(StoreError::Validation("summary must not be empty".into()));
        }
        journal::validate_date(date)?;
        let date = date.to_string();
        let summary = summary.to_string();
        self.update(password, move |doc| doc.set_summary(&date, &summary))
            .await
    }

    /// Read-only projection of one day; absent days read as empty.
    pub async fn day(&self, password: &str, date: &str) -> Result<Day, StoreError> {
        journal::validate_date(date)?;
        Ok(self.read(password).await?.day(date))
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Internal(format!("blocking task: {e}")))?
}
