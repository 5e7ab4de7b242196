// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use gitmirror::domain::models::repository::RepositoryDraft;
use gitmirror::domain::models::source::{ProviderKind, Source, SourceType};
use gitmirror::domain::repositories::repository_store::RepositoryStore;
use gitmirror::domain::services::reconcile_service::{ReconcileOutcome, ReconcileService};
use gitmirror::infrastructure::database::connection::{open_database, sqlite_url};
use gitmirror::infrastructure::repositories::repository_store_impl::RepositoryStoreImpl;
use std::sync::Arc;
use tempfile::TempDir;

async fn file_store(tmp: &TempDir) -> Arc<RepositoryStoreImpl> {
    let db = open_database(&sqlite_url(&tmp.path().join("svc.db")))
        .await
        .unwrap();
    Arc::new(RepositoryStoreImpl::new(Arc::new(db)))
}

fn draft(source: &str, source_type: SourceType, description: &str) -> RepositoryDraft {
    let source = Source::new(source, ProviderKind::GitHub).with_targets(["mirror-a"]);
    RepositoryDraft::from_source(&source, source_type)
        .with_name("tokio")
        .with_section("tokio-rs")
        .with_owner("tokio-rs")
        .with_description(description)
        .with_html_url("https://github.com/tokio-rs/tokio")
        .with_clone_urls(["https://github.com/tokio-rs/tokio.git"])
}

#[tokio::test]
async fn test_clone_url_identifies_one_record() {
    let tmp = tempfile::tempdir().unwrap();
    let store = file_store(&tmp).await;
    let reconciler = ReconcileService::new(store.clone());

    reconciler
        .reconcile(&draft("tokio-rs", SourceType::Index, "runtime"))
        .await
        .unwrap();
    reconciler
        .reconcile(&draft("tokio-rs", SourceType::Index, "runtime"))
        .await
        .unwrap();
    reconciler
        .reconcile(&draft("other", SourceType::Index, "fork listing"))
        .await
        .unwrap();

    let records = store.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].target_url, "mirror-a");
}

#[tokio::test]
async fn test_index_subsumes_repository_record_keeping_id() {
    let tmp = tempfile::tempdir().unwrap();
    let store = file_store(&tmp).await;
    let reconciler = ReconcileService::new(store.clone());

    let first = reconciler
        .reconcile(&draft("tokio-rs/tokio", SourceType::Repository, "old"))
        .await
        .unwrap();
    let ReconcileOutcome::Inserted(id) = first else {
        panic!("expected insert, got {:?}", first);
    };

    let second = reconciler
        .reconcile(&draft("tokio-rs", SourceType::Index, "A runtime"))
        .await
        .unwrap();

    assert_eq!(second, ReconcileOutcome::Merged(id));
    let record = store
        .find_by_clone_url("https://github.com/tokio-rs/tokio.git")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.id, id);
    assert_eq!(record.source, "tokio-rs");
    assert_eq!(record.source_type, SourceType::Index);
    assert_eq!(record.description, "A runtime");
}

#[tokio::test]
async fn test_unchanged_draft_refreshes_only_check_time() {
    let tmp = tempfile::tempdir().unwrap();
    let store = file_store(&tmp).await;
    let reconciler = ReconcileService::new(store.clone());
    let d = draft("tokio-rs", SourceType::Index, "runtime");

    reconciler.reconcile(&d).await.unwrap();
    let before = store.list_all().await.unwrap().remove(0);
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let outcome = reconciler.reconcile(&d).await.unwrap();
    let after = store.list_all().await.unwrap().remove(0);

    assert_eq!(outcome, ReconcileOutcome::Unchanged(before.id));
    assert_eq!(after.descriptor(), before.descriptor());
    assert!(after.last_check > before.last_check);
    assert_eq!(after.last_update, before.last_update);
}

#[tokio::test]
async fn test_conflict_leaves_record_byte_identical() {
    let tmp = tempfile::tempdir().unwrap();
    let store = file_store(&tmp).await;
    let reconciler = ReconcileService::new(store.clone());

    reconciler
        .reconcile(&draft("tokio-rs", SourceType::Index, "runtime"))
        .await
        .unwrap();
    let before = serde_json::to_string(&store.list_all().await.unwrap()).unwrap();

    let outcome = reconciler
        .reconcile(&draft("tokio-rs", SourceType::Index, "something else"))
        .await
        .unwrap();

    assert!(matches!(outcome, ReconcileOutcome::Conflict(_)));
    let after = serde_json::to_string(&store.list_all().await.unwrap()).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let store = file_store(&tmp).await;
        store
            .insert(&draft("tokio-rs", SourceType::Index, "runtime"))
            .await
            .unwrap();
    }

    let store = file_store(&tmp).await;
    let records = store.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "tokio");
}
