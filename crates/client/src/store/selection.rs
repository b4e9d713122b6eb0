//! Observable product selections: the boutique list and the campaign list.
//!
//! A [`SelectionStore`] reads and writes one JSON array under a fixed key of
//! a [`StorageBackend`]. Every successful write is broadcast to subscribers,
//! then broadcast again after short delays so late subscribers catch up.
//! [`SelectionStore::spawn_sync`] polls the backend and reports changes made
//! by other processes sharing it.
//!
//! There is no cross-process locking. Two writers doing read-modify-write on
//! the same storage race, and the last write replaces the whole array.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use marketplace_core::{RawProduct, SelectedProduct, strip_inline_images};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::backend::StorageBackend;
use crate::error::{SelectionError, StorageError};

/// Serialized size above which inline images are stripped before writing.
pub const MAX_SELECTION_BYTES: usize = 5_000_000;
/// Default delays of the follow-up broadcasts.
pub const DEFAULT_REBROADCAST_DELAYS: [Duration; 2] =
    [Duration::from_millis(200), Duration::from_millis(500)];
/// Default polling interval of the sync task.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);

const EVENT_CAPACITY: usize = 64;

/// Which selection a store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionKind {
    Boutique,
    Campaign,
}

impl SelectionKind {
    /// Storage key of the selection.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Boutique => "boutique_produits",
            Self::Campaign => "campagne_produits",
        }
    }
}

/// What happened to a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Added,
    Removed,
    Cleared,
    /// Another process changed the stored list.
    ExternalChange,
}

/// Notification sent to subscribers after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionEvent {
    pub kind: SelectionKind,
    pub change: SelectionChange,
    /// Number of entries after the change.
    pub count: usize,
}

/// How an add went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// Stored, but inline images had to be dropped to fit.
    AddedWithoutImages,
}

/// Tunables of a [`SelectionStore`].
#[derive(Debug, Clone)]
pub struct SelectionOptions {
    pub rebroadcast_delays: Vec<Duration>,
    pub max_bytes: usize,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            rebroadcast_delays: DEFAULT_REBROADCAST_DELAYS.to_vec(),
            max_bytes: MAX_SELECTION_BYTES,
        }
    }
}

/// Observable list of selected products.
#[derive(Clone)]
pub struct SelectionStore {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn StorageBackend>,
    kind: SelectionKind,
    options: SelectionOptions,
    events: broadcast::Sender<SelectionEvent>,
    /// Serialized list as last written by this store, `None` after a clear.
    last_written: Mutex<Option<String>>,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SelectionStore {
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, kind: SelectionKind) -> Self {
        Self::with_options(backend, kind, SelectionOptions::default())
    }

    #[must_use]
    pub fn with_options(
        backend: Arc<dyn StorageBackend>,
        kind: SelectionKind,
        options: SelectionOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                backend,
                kind,
                options,
                events,
                last_written: Mutex::new(None),
                write_lock: Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn kind(&self) -> SelectionKind {
        self.inner.kind
    }

    /// Receive an event after every change.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SelectionEvent> {
        self.inner.events.subscribe()
    }

    /// The stored entries. Unreadable or unparseable content reads as empty.
    #[must_use]
    pub fn list(&self) -> Vec<SelectedProduct> {
        self.entries().unwrap_or_else(|e| {
            tracing::warn!(key = self.inner.kind.key(), error = %e, "Failed to read selection");
            Vec::new()
        })
    }

    /// The stored entries, for a read-modify-write cycle.
    ///
    /// Entries are read one by one: an object missing fields gets the same
    /// defaults as a freshly added product, and only elements that are not
    /// objects are dropped. Content that is not a JSON array is an error.
    fn entries(&self) -> Result<Vec<SelectedProduct>, StorageError> {
        let key = self.inner.kind.key();
        let Some(text) = self.inner.backend.get(key)? else {
            return Ok(Vec::new());
        };
        let values: Vec<Value> = serde_json::from_str(&text)?;

        let total = values.len();
        let entries: Vec<SelectedProduct> =
            values.iter().filter_map(entry_from_value).collect();
        if entries.len() < total {
            let dropped = total - entries.len();
            tracing::warn!(key, dropped, "Skipping malformed selection entries");
        }
        Ok(entries)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalize `product` and append it.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::AlreadyPresent`] when an entry with the same
    /// link (or, without links, the same name) exists,
    /// [`SelectionError::StorageFull`] when the list does not fit even
    /// without inline images, and a storage error when the stored list cannot
    /// be read. Nothing is written in any of these cases.
    pub fn add(&self, product: RawProduct) -> Result<AddOutcome, SelectionError> {
        let entry = SelectedProduct::from_raw(product);
        let _guard = lock(&self.inner.write_lock);

        let mut entries = self.entries()?;
        if entries.iter().any(|existing| existing.is_same_as(&entry)) {
            return Err(SelectionError::AlreadyPresent);
        }
        entries.push(entry);

        let outcome = self.write(&mut entries)?;
        if outcome == AddOutcome::AddedWithoutImages {
            tracing::warn!(
                key = self.inner.kind.key(),
                "Selection stored without inline images"
            );
        }
        self.broadcast(SelectionChange::Added, entries.len());
        Ok(outcome)
    }

    /// Remove the entry at `index`. Out-of-range indexes remove nothing.
    ///
    /// # Errors
    ///
    /// Returns error if the stored list cannot be read or the updated list
    /// cannot be written.
    pub fn remove(&self, index: usize) -> Result<Option<SelectedProduct>, SelectionError> {
        let _guard = lock(&self.inner.write_lock);

        let mut entries = self.entries()?;
        if index >= entries.len() {
            return Ok(None);
        }
        let removed = entries.remove(index);

        self.write(&mut entries)?;
        self.broadcast(SelectionChange::Removed, entries.len());
        Ok(Some(removed))
    }

    /// Remove every entry identified as `product`. Returns whether any was.
    ///
    /// # Errors
    ///
    /// Returns error if the updated list cannot be written.
    pub fn remove_by_identity(&self, product: &SelectedProduct) -> Result<bool, SelectionError> {
        let _guard = lock(&self.inner.write_lock);

        let mut entries = self.entries()?;
        let before = entries.len();
        entries.retain(|entry| !entry.is_same_as(product));
        if entries.len() == before {
            return Ok(false);
        }

        self.write(&mut entries)?;
        self.broadcast(SelectionChange::Removed, entries.len());
        Ok(true)
    }

    /// Remove the stored list altogether.
    ///
    /// # Errors
    ///
    /// Returns error if the key cannot be removed.
    pub fn clear(&self) -> Result<(), SelectionError> {
        let _guard = lock(&self.inner.write_lock);

        self.inner.backend.remove(self.inner.kind.key())?;
        *lock(&self.inner.last_written) = None;
        self.broadcast(SelectionChange::Cleared, 0);
        Ok(())
    }

    /// Persist `entries`, stripping inline images when the list is too big
    /// or the backend runs out of quota.
    fn write(&self, entries: &mut [SelectedProduct]) -> Result<AddOutcome, SelectionError> {
        let key = self.inner.kind.key();
        let mut stripped = false;
        let mut serialized = serde_json::to_string(&*entries).map_err(StorageError::from)?;

        if serialized.len() > self.inner.options.max_bytes {
            let count = strip_inline_images(entries);
            tracing::info!(key, bytes = serialized.len(), stripped = count, "Selection too large");
            serialized = serde_json::to_string(&*entries).map_err(StorageError::from)?;
            stripped = true;
        }

        match self.inner.backend.set(key, &serialized) {
            Ok(()) => {}
            Err(StorageError::QuotaExceeded { needed, available }) => {
                tracing::warn!(key, needed, available, "Storage quota exceeded");
                if stripped || strip_inline_images(entries) == 0 {
                    return Err(SelectionError::StorageFull);
                }
                stripped = true;
                serialized = serde_json::to_string(&*entries).map_err(StorageError::from)?;
                match self.inner.backend.set(key, &serialized) {
                    Ok(()) => {}
                    Err(StorageError::QuotaExceeded { .. }) => {
                        return Err(SelectionError::StorageFull);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }

        *lock(&self.inner.last_written) = Some(serialized);
        Ok(if stripped {
            AddOutcome::AddedWithoutImages
        } else {
            AddOutcome::Added
        })
    }

    /// Send the event now, then again after each configured delay.
    ///
    /// The follow-ups need a Tokio runtime; without one only the first
    /// event is sent.
    fn broadcast(&self, change: SelectionChange, count: usize) {
        let event = SelectionEvent {
            kind: self.inner.kind,
            change,
            count,
        };
        // No subscriber is not an error.
        let _ = self.inner.events.send(event);

        if self.inner.options.rebroadcast_delays.is_empty() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        for delay in self.inner.options.rebroadcast_delays.clone() {
            let events = self.inner.events.clone();
            runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = events.send(event);
            });
        }
    }

    /// Poll the backend every `interval` and broadcast
    /// [`SelectionChange::ExternalChange`] when the stored list changed
    /// without this store writing it. Polling stops when the handle drops.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn_sync(&self, interval: Duration) -> SyncHandle {
        let store = self.clone();
        let key = self.inner.kind.key();
        let handle = tokio::spawn(async move {
            let mut seen = store.inner.backend.get(key).ok().flatten();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let current = match store.inner.backend.get(key) {
                    Ok(current) => current,
                    Err(e) => {
                        tracing::warn!(key, error = %e, "Selection sync read failed");
                        continue;
                    }
                };
                if current == seen {
                    continue;
                }

                let own_write = *lock(&store.inner.last_written) == current;
                seen = current;
                if !own_write {
                    tracing::debug!(key, "Selection changed externally");
                    let count = store.len();
                    let _ = store.inner.events.send(SelectionEvent {
                        kind: store.inner.kind,
                        change: SelectionChange::ExternalChange,
                        count,
                    });
                }
            }
        });

        SyncHandle { handle }
    }
}

/// One stored element as an entry. Objects that do not have the stored shape
/// are normalized like a new product; anything else is `None`.
fn entry_from_value(value: &Value) -> Option<SelectedProduct> {
    if !value.is_object() {
        return None;
    }
    if let Ok(entry) = SelectedProduct::deserialize(value) {
        return Some(entry);
    }
    let raw = RawProduct::deserialize(value).unwrap_or_else(|_| salvage(value));
    Some(SelectedProduct::from_raw(raw))
}

/// The text fields of an object whose other fields have unexpected types.
fn salvage(value: &Value) -> RawProduct {
    let text = |field: &str| value.get(field).and_then(Value::as_str).map(str::to_owned);
    RawProduct {
        nom: text("nom"),
        prix: None,
        prix_texte: text("prix_texte"),
        lien: text("lien"),
        image: text("image"),
        marque: text("marque"),
        categorie: text("categorie"),
        note: text("note"),
        remise: text("remise"),
        source: text("source"),
    }
}

impl std::fmt::Debug for SelectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionStore")
            .field("kind", &self.inner.kind)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

/// Background sync task. Dropping the handle stops it.
#[derive(Debug)]
pub struct SyncHandle {
    handle: JoinHandle<()>,
}

impl SyncHandle {
    /// Stop polling.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
