// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{github_page, test_env, TestEnv};
use gitmirror::infrastructure::storage::MirrorStorage;
use gitmirror::utils::url_utils::source_dir_name;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn crawled_env(server: &MockServer, names: &[&str], consistency: bool) -> TestEnv {
    Mock::given(method("GET"))
        .and(path("/users/octo/repos"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(github_page("octo", names)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/octo/repos"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    let env = test_env(&server.uri());
    env.add_service_with("hub", json!({"github": [{"source": "octo"}]}), consistency)
        .await;
    env.manager.parse("hub", false).await.unwrap();
    env
}

#[tokio::test]
async fn test_mirror_paths_are_content_addressed() {
    let server = MockServer::start().await;
    let env = crawled_env(&server, &["a", "b"], false).await;

    let report = env.manager.mirror("hub").await.unwrap();

    assert_eq!(report.summary.cloned, 2);
    let source_dir = env.path("data/hub").join(source_dir_name("octo"));
    assert!(source_dir.join("a.git/HEAD").is_file());
    assert!(source_dir.join("b.git/HEAD").is_file());
    assert_eq!(
        std::fs::read_to_string(source_dir.join("a.git/upstream")).unwrap(),
        "https://github.com/octo/a.git"
    );
    let storage = MirrorStorage::new(env.path("data/hub"), env.path("backup"));
    assert_eq!(
        storage.repository_path("octo", "a").unwrap(),
        source_dir.join("a.git")
    );
}

#[tokio::test]
async fn test_second_mirror_updates_and_keeps_export_marker() {
    let server = MockServer::start().await;
    let env = crawled_env(&server, &["a"], false).await;
    env.manager.mirror("hub").await.unwrap();
    let repo = env
        .path("data/hub")
        .join(source_dir_name("octo"))
        .join("a.git");
    let marker = repo.join("git-daemon-export-ok");
    assert!(marker.is_file());
    std::fs::write(&marker, "operator note").unwrap();

    let report = env.manager.mirror("hub").await.unwrap();

    assert_eq!(report.summary.updated, 1);
    assert_eq!(env.git.clone_count(), 1);
    assert_eq!(env.git.update_count(), 1);
    assert_eq!(std::fs::read_to_string(&marker).unwrap(), "operator note");
    assert_eq!(
        std::fs::read_to_string(repo.join("description")).unwrap(),
        "a by octo\n"
    );
    let records = env.repositories("hub").await;
    assert!(!records[0]["last_update"].is_null());
}

#[tokio::test]
async fn test_mirror_writes_cgitrc_with_cgit_clone_url() {
    let server = MockServer::start().await;
    let env = crawled_env(&server, &["a"], false).await;

    env.manager.mirror("hub").await.unwrap();

    let cgitrc = std::fs::read_to_string(env.path("cgitrc/hub.repo")).unwrap();
    assert!(cgitrc.starts_with("repo.url=a\nrepo.name=a\n"));
    assert!(cgitrc.contains(
        "repo.clone-url=https://mirror.example.com/hub/a https://github.com/octo/a.git\n"
    ));
    assert!(cgitrc.contains("repo.homepage=https://github.com/octo/a\n"));
    assert!(cgitrc.ends_with("\n\n"));
}

#[tokio::test]
async fn test_consistency_moves_orphans_to_backup_byte_identical() {
    let server = MockServer::start().await;
    let env = crawled_env(&server, &["a"], true).await;
    let source_dir = env.path("data/hub").join(source_dir_name("octo"));
    let orphan = source_dir.join("retired.git");
    std::fs::create_dir_all(orphan.join("objects/pack")).unwrap();
    std::fs::write(orphan.join("objects/pack/pack-1.pack"), [0u8, 1, 2, 254, 255]).unwrap();

    let report = env.manager.mirror("hub").await.unwrap();

    assert_eq!(report.summary.relocated, 1);
    assert!(!orphan.exists());
    assert!(source_dir.join("a.git").is_dir());
    let moved = env
        .path("backup/repositories")
        .join(source_dir_name("octo"))
        .join("retired.git");
    assert_eq!(
        std::fs::read(moved.join("objects/pack/pack-1.pack")).unwrap(),
        vec![0u8, 1, 2, 254, 255]
    );
}

#[tokio::test]
async fn test_mirror_without_data_root_fails_structurally() {
    let server = MockServer::start().await;
    let env = crawled_env(&server, &["a"], false).await;
    std::fs::remove_dir_all(env.path("data/hub")).unwrap();

    assert!(env.manager.mirror("hub").await.is_err());
    assert_eq!(env.git.clone_count(), 0);
}
