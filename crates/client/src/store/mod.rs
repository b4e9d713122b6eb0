//! Client-side persisted state.
//!
//! - [`backend`] - `StorageBackend` trait with memory and file implementations
//! - [`selection`] - Observable boutique and campaign selections
//! - [`cache`] - Page caches, search cache and the session id

pub mod backend;
pub mod cache;
pub mod selection;

pub use backend::{FileStorage, MemoryStorage, StorageBackend};
pub use cache::{CacheNamespace, PageCache, SearchCache, session_id};
pub use selection::{
    AddOutcome, SelectionChange, SelectionEvent, SelectionKind, SelectionOptions, SelectionStore,
    SyncHandle,
};
