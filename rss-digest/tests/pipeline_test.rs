mod common;

use common::*;
use rss_digest::{DigestPipeline, EmptyThemeModel, KeywordThemeModel};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Three sources with 5, 3 and 2 entries; four of them fall in the window.
async fn mount_scenario_a(server: &MockServer) {
    let uri = server.uri();
    let link = |name: &str| format!("{}/articles/{}", uri, name);

    let feed_a = rss_feed(
        "Alpha Blog",
        &[
            item("Alpha fresh scaling", link("a1"), Some(hours_before(1))),
            item("Alpha recent scaling", link("a2"), Some(hours_before(3))),
            item("Alpha yesterday", link("a3"), Some(hours_before(30))),
            item("Alpha older", link("a4"), Some(hours_before(48))),
            item("Alpha ancient", link("a5"), Some(hours_before(72))),
        ],
    );
    let feed_b = rss_feed(
        "Beta Notes",
        &[
            item("Beta morning scaling", link("b1"), Some(hours_before(5))),
            item("Beta undated", link("b2"), None),
            item("Beta stale", link("b3"), Some(hours_before(25))),
        ],
    );
    let feed_c = rss_feed(
        "Gamma Weekly",
        &[
            item("Gamma boundary", link("c1"), Some(hours_before(24))),
            item("Gamma scheduled", link("c2"), Some(hours_before(-2))),
        ],
    );

    let pack_xml = pack(&[
        ("Alpha Blog", format!("{}/feeds/a.xml", uri)),
        ("Beta Notes", format!("{}/feeds/b.xml", uri)),
        ("Gamma Weekly", format!("{}/feeds/c.xml", uri)),
    ]);

    Mock::given(method("GET"))
        .and(path("/pack"))
        .respond_with(ResponseTemplate::new(200).set_body_string(pack_xml))
        .mount(server)
        .await;
    for (feed_path, body) in [("/feeds/a.xml", feed_a), ("/feeds/b.xml", feed_b), ("/feeds/c.xml", feed_c)] {
        Mock::given(method("GET"))
            .and(path(feed_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path_regex(r"^/articles/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article_html("Readable article body text.")))
        .mount(server)
        .await;
}

async fn mount_feishu_success(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/v3/tenant_access_token/internal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "ok",
            "tenant_access_token": "t-test-token",
            "expire": 7200
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/docx/v1/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "success",
            "data": { "document": { "document_id": "doxcnDigest", "revision_id": 1 } }
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/docx/v1/documents/doxcnDigest/blocks/doxcnDigest/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "msg": "success", "data": {} })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn scenario_a_publishes_the_four_recent_entries() {
    init_tracing();
    let server = MockServer::start().await;
    mount_scenario_a(&server).await;
    mount_feishu_success(&server).await;

    let settings = settings(format!("{}/pack", server.uri()), Some(feishu_config(server.uri())));
    let pipeline = DigestPipeline::new(settings, Arc::new(KeywordThemeModel)).unwrap();
    let summary = pipeline.run(reference()).await.unwrap();

    assert_eq!(summary.sources, 3);
    assert_eq!(summary.sources_failed, 0);
    assert_eq!(summary.entries_fetched, 10);
    assert_eq!(summary.entries_in_window, 4);
    assert_eq!(summary.selected, 4);
    assert_eq!(summary.enriched, 4);
    assert_eq!(summary.document_id.as_deref(), Some("doxcnDigest"));

    let markdown = summary.markdown.unwrap();
    assert!(markdown.contains("共 4 条更新"));
    for title in ["Alpha fresh scaling", "Alpha recent scaling", "Beta morning scaling", "Gamma boundary"] {
        assert!(markdown.contains(title), "missing {}", title);
    }
    for title in ["Alpha yesterday", "Beta undated", "Beta stale", "Gamma scheduled"] {
        assert!(!markdown.contains(title), "unexpected {}", title);
    }
    assert!(markdown.contains("**scaling**"));

    let requests = server.received_requests().await.unwrap();
    let create = requests
        .iter()
        .find(|r| r.url.path() == "/docx/v1/documents")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&create.body).unwrap();
    assert_eq!(body["title"], "2026-10-18 - Karpathy 精选 RSS 日报");
    let auth = create.headers.get("authorization").unwrap().to_str().unwrap();
    assert_eq!(auth, "Bearer t-test-token");
}

#[tokio::test]
async fn dry_run_renders_without_publishing_and_saves_a_local_copy() {
    init_tracing();
    let server = MockServer::start().await;
    mount_scenario_a(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let output_dir = std::env::temp_dir().join(format!("rss-digest-test-{}", uuid::Uuid::new_v4()));
    let mut settings = settings(format!("{}/pack", server.uri()), None);
    settings.output_dir = Some(output_dir.clone());

    let pipeline = DigestPipeline::new(settings, Arc::new(EmptyThemeModel)).unwrap();
    let summary = pipeline.run(reference()).await.unwrap();

    assert!(summary.document_id.is_none());
    let path = summary.report_path.unwrap();
    assert_eq!(path, output_dir.join("rss_report_2026-10-18.md"));
    let saved = std::fs::read_to_string(&path).unwrap();
    assert_eq!(Some(saved), summary.markdown);
    assert!(summary.markdown.unwrap().contains("暂无明显主题"));

    std::fs::remove_dir_all(output_dir).ok();
}

#[tokio::test]
async fn no_recent_entries_means_nothing_to_publish() {
    init_tracing();
    let server = MockServer::start().await;
    let uri = server.uri();
    Mock::given(method("GET"))
        .and(path("/pack"))
        .respond_with(ResponseTemplate::new(200).set_body_string(pack(&[("Old", format!("{}/feeds/old.xml", uri))])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feeds/old.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_feed(
            "Old",
            &[item("Last week", format!("{}/articles/old", uri), Some(hours_before(24 * 7)))],
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let settings = settings(format!("{}/pack", uri), Some(feishu_config(uri.clone())));
    let pipeline = DigestPipeline::new(settings, Arc::new(KeywordThemeModel)).unwrap();
    let summary = pipeline.run(reference()).await.unwrap();

    assert_eq!(summary.entries_fetched, 1);
    assert_eq!(summary.entries_in_window, 0);
    assert!(summary.markdown.is_none());
    assert!(summary.document_id.is_none());
}

#[tokio::test]
async fn unreachable_pack_fails_the_run() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pack"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let settings = settings(format!("{}/pack", server.uri()), None);
    let pipeline = DigestPipeline::new(settings, Arc::new(KeywordThemeModel)).unwrap();
    let err = pipeline.run(reference()).await.unwrap_err();

    assert_eq!(err.exit_code(), 3);
}
