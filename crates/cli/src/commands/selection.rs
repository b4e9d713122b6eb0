//! Boutique and campaign selections kept in the local file storage.
//!
//! # Usage
//!
//! ```bash
//! mkt selection add boutique -n "Montre" -p 15000 -l https://jumia.sn/montre
//! mkt selection list boutique
//! mkt selection remove campagne 2
//! mkt selection publish boutique
//! mkt selection clear campagne
//! ```
//!
//! # Environment Variables
//!
//! - `MARKETPLACE_STORAGE_DIR` - Directory holding the selections (default: `.marketplace`)

use std::sync::Arc;

use clap::ValueEnum;
use marketplace_client::store::{AddOutcome, FileStorage, SelectionKind, SelectionStore};
use marketplace_client::{ApiClient, ClientConfig, ClientError, SelectionError, StorageError};
use marketplace_core::{PublishRequest, RawProduct};

/// Selection named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SelectionArg {
    Boutique,
    Campagne,
}

impl From<SelectionArg> for SelectionKind {
    fn from(arg: SelectionArg) -> Self {
        match arg {
            SelectionArg::Boutique => Self::Boutique,
            SelectionArg::Campagne => Self::Campaign,
        }
    }
}

/// Open the selection stored under the configured storage directory.
///
/// # Errors
///
/// Returns error if the storage directory cannot be created.
pub fn open(config: &ClientConfig, arg: SelectionArg) -> Result<SelectionStore, StorageError> {
    let storage = FileStorage::new(&config.storage_dir)?;
    Ok(SelectionStore::new(Arc::new(storage), arg.into()))
}

/// Add a product to the selection.
///
/// # Errors
///
/// Returns [`SelectionError::AlreadyPresent`] for a duplicate and
/// [`SelectionError::StorageFull`] when the list does not fit.
pub fn add(store: &SelectionStore, product: RawProduct) -> Result<(), SelectionError> {
    match store.add(product)? {
        AddOutcome::Added => tracing::info!(count = store.len(), "Product added"),
        AddOutcome::AddedWithoutImages => tracing::warn!(
            count = store.len(),
            "Product added; inline images were dropped to fit the storage"
        ),
    }
    Ok(())
}

/// Print the selection, one numbered entry per line.
pub fn list(store: &SelectionStore) {
    let entries = store.list();
    #[allow(clippy::print_stdout)]
    {
        for (index, entry) in entries.iter().enumerate() {
            println!(
                "{index}\t{}\t{}\t{}",
                entry.prix_texte, entry.source, entry.nom
            );
        }
        println!("{} produit(s)", entries.len());
    }
}

/// Remove the entry at `index`.
///
/// # Errors
///
/// Returns error if the updated list cannot be written.
pub fn remove(store: &SelectionStore, index: usize) -> Result<(), SelectionError> {
    match store.remove(index)? {
        Some(entry) => tracing::info!(nom = %entry.nom, "Product removed"),
        None => tracing::warn!(index, count = store.len(), "No product at this index"),
    }
    Ok(())
}

/// Empty the selection.
///
/// # Errors
///
/// Returns error if the stored list cannot be removed.
pub fn clear(store: &SelectionStore) -> Result<(), SelectionError> {
    store.clear()?;
    tracing::info!(key = store.kind().key(), "Selection cleared");
    Ok(())
}

/// Publish every selected product to the marketplace in one batch.
///
/// # Errors
///
/// Returns [`ClientError::Validation`] without sending anything when a
/// product is invalid, otherwise the API error.
pub async fn publish(store: &SelectionStore, client: &ApiClient) -> Result<(), ClientError> {
    let requests: Vec<PublishRequest> = store
        .list()
        .iter()
        .map(marketplace_core::SelectedProduct::to_publish_request)
        .collect();
    if requests.is_empty() {
        return Err(ClientError::Validation(
            "Aucun produit à publier".to_owned(),
        ));
    }

    let outcome = client.publish_products(&requests).await?;
    tracing::info!(
        count = outcome.count,
        images_downloaded = outcome.images_downloaded,
        "{}",
        outcome.message
    );
    Ok(())
}
