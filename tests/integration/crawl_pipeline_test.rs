// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{github_page, github_repo, test_env};
use gitmirror::domain::models::report::FailureReason;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CGIT_INDEX: &str = r#"<html><body>
<table class='tabs'><tr><td><a class='active' href='/'>index</a></td></tr></table>
<table summary='repository list' class='list nowrap'>
<tr class='nohover'><th class='left'>Name</th><th class='left'>Description</th><th class='left'>Owner</th><th class='left'>Idle</th></tr>
<tr class='nohover-highlight'><td colspan='4' class='reposection'>kernel</td></tr>
<tr><td class='sublevel-repo'><a title='linux' href='/linux/'>linux</a></td><td>Linux kernel</td><td>Linus</td><td>2 hours</td></tr>
<tr><td class='sublevel-repo'><a title='junk' href='/junk/'>junk</a></td><td>Old stuff</td><td></td><td>9 years</td></tr>
<tr><td class='sublevel-repo'><a title='tools' href='/tools/'>tools</a></td><td>Kernel tools</td><td></td><td>1 day</td></tr>
</table></body></html>"#;

const CGIT_EMPTY: &str = r#"<html><body>
<table summary='repository list' class='list nowrap'>
<tr class='nohover'><th class='left'>Name</th><th class='left'>Description</th><th class='left'>Owner</th><th class='left'>Idle</th></tr>
</table></body></html>"#;

fn cgit_repo_page(name: &str, host: &str) -> String {
    format!(
        r#"<html><body>
<table id='header'>
<tr><td class='main'><a href='/'>index</a> : <a title='{name}' href='/{name}/'>{name}</a></td></tr>
<tr><td class='sub'>{name} repository</td><td class='sub right'>Maintainer</td></tr>
</table>
<table class='tabs'><tr><td><a class='active' href='/{name}/'>summary</a></td></tr></table>
<table summary='repository info' class='list nowrap'>
<tr class='nohover'><th class='left' colspan='4'>Clone</th></tr>
<tr><td colspan='4'><a rel='vcs-git' href='git://{host}/{name}'>git://{host}/{name}</a></td></tr>
<tr><td colspan='4'><a rel='vcs-git' href='https://{host}/{name}'>https://{host}/{name}</a></td></tr>
</table></body></html>"#
    )
}

async fn mount_github_pages(server: &MockServer, owner: &str, pages: &[serde_json::Value]) {
    for (idx, body) in pages.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(format!("/users/{}/repos", owner)))
            .and(query_param("page", (idx + 1).to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_github_pagination_persists_every_repository() {
    let server = MockServer::start().await;
    mount_github_pages(
        &server,
        "octo",
        &[
            github_page("octo", &["a", "b", "c", "d", "e"]),
            github_page("octo", &["f", "g", "h"]),
            json!([]),
        ],
    )
    .await;
    let env = test_env(&server.uri());
    env.add_service("hub", json!({"github": [{"source": "octo"}]}))
        .await;

    let report = env.manager.parse("hub", false).await.unwrap();

    assert_eq!(report.summary.inserted, 8);
    assert!(!report.has_failures());
    let records = env.repositories("hub").await;
    assert_eq!(records.as_array().unwrap().len(), 8);
    assert_eq!(records[0]["clone_url"], "https://github.com/octo/a.git");
    assert_eq!(records[0]["section"], "octo");
    assert_eq!(records[0]["source_type"], "index");
}

#[tokio::test]
async fn test_dry_run_leaves_store_untouched() {
    let server = MockServer::start().await;
    mount_github_pages(
        &server,
        "octo",
        &[github_page("octo", &["a", "b"]), json!([])],
    )
    .await;
    let env = test_env(&server.uri());
    env.add_service("hub", json!({"github": [{"source": "octo"}]}))
        .await;

    let report = env.manager.parse("hub", true).await.unwrap();

    assert_eq!(report.drafts.len(), 2);
    assert_eq!(report.summary.inserted, 0);
    assert!(env.repositories("hub").await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_excluded_owner_is_reported_not_stored() {
    let server = MockServer::start().await;
    mount_github_pages(
        &server,
        "octo",
        &[
            json!([
                github_repo("octo", "keep"),
                github_repo("ownerX", "hidden"),
                github_repo("octo", "also-kept"),
            ]),
            json!([]),
        ],
    )
    .await;
    let env = test_env(&server.uri());
    env.add_service(
        "hub",
        json!({"github": [{"source": "octo", "excludes": ["ownerX"]}]}),
    )
    .await;

    let report = env.manager.parse("hub", false).await.unwrap();

    assert_eq!(report.summary.inserted, 2);
    let failures = report.failures_for("octo");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].reason, FailureReason::Exclude);
    assert_eq!(failures[0].url, "https://github.com/ownerX/hidden");

    let records = env.repositories("hub").await;
    assert!(records
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["owner"] != "ownerX"));

    // 存在失败时写出状态报告
    let reports: Vec<String> = std::fs::read_dir(env.path("log"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(reports.len(), 1);
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(env.path("log").join(&reports[0])).unwrap())
            .unwrap();
    assert_eq!(saved["status"]["octo"][0]["error"], "exclude");
    assert_eq!(saved["input"][0]["source"], "octo");
}

#[tokio::test]
async fn test_cgit_index_is_crawled_with_offsets() {
    let server = MockServer::start().await;
    let host = server.address().to_string();
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("ofs", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CGIT_INDEX))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("ofs", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CGIT_EMPTY))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CGIT_INDEX))
        .mount(&server)
        .await;
    for name in ["linux", "tools"] {
        Mock::given(method("GET"))
            .and(path(format!("/{}/", name)))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(cgit_repo_page(name, &host)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }
    let index = format!("{}/", server.uri());
    let env = test_env(&server.uri());
    env.add_service(
        "cg",
        json!({"cgit": [{"source": index, "excludes": [format!("{}/junk/", server.uri())]}]}),
    )
    .await;

    let report = env.manager.parse("cg", false).await.unwrap();

    assert_eq!(report.summary.inserted, 2);
    assert_eq!(report.failures_for(&index).len(), 1);
    assert_eq!(report.failures_for(&index)[0].reason, FailureReason::Exclude);

    let records = env.repositories("cg").await;
    let linux = &records[0];
    assert_eq!(linux["name"], "linux");
    assert_eq!(linux["section"], "kernel");
    assert_eq!(linux["owner"], "Linus");
    assert_eq!(
        linux["clone_url"],
        format!("https://{host}/linux,git://{host}/linux", host = host)
    );
    assert_eq!(records[1]["name"], "tools");
}

#[tokio::test]
async fn test_missing_github_user_aborts_only_that_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/ghost/repos"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;
    mount_github_pages(&server, "octo", &[github_page("octo", &["a"]), json!([])]).await;
    let env = test_env(&server.uri());
    env.add_service(
        "hub",
        json!({"github": [{"source": "ghost"}, {"source": "octo"}]}),
    )
    .await;

    let report = env.manager.parse("hub", false).await.unwrap();

    assert_eq!(report.summary.aborted, 1);
    assert_eq!(report.summary.inserted, 1);
    assert_eq!(report.failures_for("ghost")[0].reason, FailureReason::NotFound);
}
