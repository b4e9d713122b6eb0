//! Two selection stores sharing one storage directory, as two processes
//! (or two windows) would.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use marketplace_client::SelectionError;
use marketplace_client::store::{
    FileStorage, SelectionChange, SelectionEvent, SelectionKind, SelectionOptions, SelectionStore,
    StorageBackend,
};
use marketplace_core::RawProduct;
use tokio::sync::broadcast::Receiver;
use tokio::time::timeout;

const POLL: Duration = Duration::from_millis(50);

fn store(dir: &tempfile::TempDir, kind: SelectionKind) -> SelectionStore {
    let options = SelectionOptions {
        rebroadcast_delays: Vec::new(),
        ..SelectionOptions::default()
    };
    SelectionStore::with_options(
        Arc::new(FileStorage::new(dir.path()).unwrap()),
        kind,
        options,
    )
}

fn product(nom: &str, lien: &str) -> RawProduct {
    RawProduct {
        nom: Some(nom.to_owned()),
        lien: Some(lien.to_owned()),
        ..RawProduct::default()
    }
}

async fn next_external(events: &mut Receiver<SelectionEvent>) -> SelectionEvent {
    timeout(Duration::from_secs(2), async {
        loop {
            let event = events.recv().await.unwrap();
            if event.change == SelectionChange::ExternalChange {
                return event;
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_other_writer_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let first = store(&dir, SelectionKind::Boutique);
    let second = store(&dir, SelectionKind::Boutique);

    let mut events = second.subscribe();
    let _sync = second.spawn_sync(POLL);
    // Let the sync task take its first snapshot.
    tokio::time::sleep(POLL).await;

    first
        .add(product("Montre", "https://jumia.sn/montre"))
        .unwrap();
    let event = next_external(&mut events).await;
    assert_eq!(event.kind, SelectionKind::Boutique);
    assert_eq!(event.count, 1);
    assert_eq!(second.list()[0].nom, "Montre");

    first.clear().unwrap();
    assert_eq!(next_external(&mut events).await.count, 0);
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_own_writes_are_not_external() {
    let dir = tempfile::tempdir().unwrap();
    let only = store(&dir, SelectionKind::Campaign);
    let mut events = only.subscribe();
    let _sync = only.spawn_sync(POLL);

    only.add(product("Sac", "https://jumia.sn/sac")).unwrap();
    assert_eq!(events.recv().await.unwrap().change, SelectionChange::Added);

    tokio::time::sleep(POLL * 4).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_writers_see_each_other_entries() {
    let dir = tempfile::tempdir().unwrap();
    let first = store(&dir, SelectionKind::Boutique);
    let second = store(&dir, SelectionKind::Boutique);

    first.add(product("Montre", "https://jumia.sn/montre")).unwrap();
    second.add(product("Sac", "https://jumia.sn/sac")).unwrap();

    let names: Vec<String> = first.list().into_iter().map(|p| p.nom).collect();
    assert_eq!(names, vec!["Montre".to_owned(), "Sac".to_owned()]);

    assert!(matches!(
        second.add(product("Montre (copie)", "https://jumia.sn/montre")),
        Err(SelectionError::AlreadyPresent)
    ));

    // Boutique and campaign lists are separate keys in the same directory.
    let campaign = store(&dir, SelectionKind::Campaign);
    assert!(campaign.is_empty());
}

#[tokio::test]
async fn test_stopped_sync_stays_quiet() {
    let dir = tempfile::tempdir().unwrap();
    let first = store(&dir, SelectionKind::Boutique);
    let second = store(&dir, SelectionKind::Boutique);

    let mut events = second.subscribe();
    second.spawn_sync(POLL).stop();

    first.add(product("Montre", "https://jumia.sn/montre")).unwrap();
    tokio::time::sleep(POLL * 4).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_last_writer_wins_on_the_whole_list() {
    let dir = tempfile::tempdir().unwrap();
    let first = store(&dir, SelectionKind::Boutique);
    let second = store(&dir, SelectionKind::Boutique);
    let raw = FileStorage::new(dir.path()).unwrap();
    let key = SelectionKind::Boutique.key();

    first.add(product("Montre", "https://jumia.sn/montre")).unwrap();
    // A slow writer read the list here...
    let stale = raw.get(key).unwrap().unwrap();
    second.add(product("Sac", "https://jumia.sn/sac")).unwrap();
    assert_eq!(first.len(), 2);

    // ...and writes back its own copy afterwards.
    raw.set(key, &stale).unwrap();
    let names: Vec<String> = second.list().into_iter().map(|p| p.nom).collect();
    assert_eq!(names, vec!["Montre".to_owned()]);
}
