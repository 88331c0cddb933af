//! End-to-end pipeline tests against a mock HTTP server.

use evado_core::bypass::strategies::{BINGBOT_UA, GOOGLEBOT_UA};
use evado_core::bypass::{BypassConfig, BypassOrchestrator, StrategySource};
use evado_core::{ExtractError, FetchErrorKind, PipelineConfig, extract_article};
use wiremock::matchers::{header, header_exists, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Article body of roughly two thousand characters of prose.
fn article_prose() -> String {
    "Prose sentence with several words, and a comma in it as well. ".repeat(32)
}

fn article_page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <title>A Test Article | Mock Site</title>
    <meta property="og:title" content="A Test Article">
    <meta property="og:site_name" content="Mock Site">
    <meta name="author" content="Jane Writer">
</head>
<body>
    <div class="sidebar"><a href="/one">SIDEBAR LINK ONE</a><a href="/two">SIDEBAR LINK TWO</a></div>
    <article class="post-content">
        <h1>A Test Article</h1>
        <p>{body}</p>
    </article>
</body>
</html>"#
    )
}

fn preview_page() -> String {
    let intro = "Opening paragraph of the piece under test here. ".repeat(6);
    format!(
        r#"<!DOCTYPE html>
<html><head><title>Gated</title></head>
<body>
<article class="post-content">
    <p>{intro}</p>
    <p>Subscribe now to continue reading.</p>
</article>
</body></html>"#
    )
}

/// Pipeline config with bypass endpoints pointed at the given archive mock.
fn test_config(archive_uri: &str) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.bypass = BypassConfig {
        archive_mirrors: vec![format!("{archive_uri}/archive")],
        availability_endpoint: format!("{archive_uri}/wayback/available"),
        ..Default::default()
    };
    config
}

#[tokio::test]
async fn clean_fetch_extracts_article_without_boilerplate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(article_page(&article_prose()), "text/html"),
        )
        .mount(&server)
        .await;

    let config = PipelineConfig::default();
    let article = extract_article(&format!("{}/story", server.uri()), &config)
        .await
        .unwrap();

    assert_eq!(article.title, Some("A Test Article".to_string()));
    assert_eq!(article.author, Some("Jane Writer".to_string()));
    assert!(!article.text_content.contains("SIDEBAR LINK"));
    assert!(article.archive_source.is_none());

    // body is ~2000 characters; extraction keeps it within boilerplate noise
    assert!(article.length > 1500, "length was {}", article.length);
    assert!(article.length < 2600, "length was {}", article.length);
}

#[tokio::test]
async fn http_404_fails_without_bypass() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = PipelineConfig::default();
    let result = extract_article(&format!("{}/missing", server.uri()), &config).await;

    match result {
        Err(ExtractError::Fetch(err)) => {
            assert_eq!(err.kind, FetchErrorKind::Http);
            assert_eq!(err.status, Some(404));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }

    // not-found must not trigger the bypass chain
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn hard_block_recovered_by_crawler_identity() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("user-agent", GOOGLEBOT_UA))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(article_page(&article_prose()), "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let config = PipelineConfig::default();
    let article = extract_article(&format!("{}/story", server.uri()), &config)
        .await
        .unwrap();

    let source = article.archive_source.expect("bypass provenance expected");
    assert_eq!(source.service.as_str(), "googlebot-ua");
    assert!(article.length > 1500);
}

#[tokio::test]
async fn bypass_disabled_surfaces_blocked_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let config = PipelineConfig::builder().enable_bypass(false).build();
    let result = extract_article(&format!("{}/story", server.uri()), &config).await;

    match result {
        Err(ExtractError::Fetch(err)) => assert_eq!(err.kind, FetchErrorKind::Blocked),
        other => panic!("expected blocked fetch error, got {other:?}"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn orchestrator_stops_at_first_success_in_order() {
    let server = MockServer::start().await;
    let archive_server = MockServer::start().await;

    // crawler identities rejected, social referrer accepted
    Mock::given(method("GET"))
        .and(header("user-agent", GOOGLEBOT_UA))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("user-agent", BINGBOT_UA))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header_exists("referer"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(article_page(&article_prose()), "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let bypass_config = BypassConfig {
        archive_mirrors: vec![format!("{}/archive", archive_server.uri())],
        availability_endpoint: format!("{}/wayback/available", archive_server.uri()),
        ..Default::default()
    };
    let orchestrator = BypassOrchestrator::with_config(bypass_config);
    let result = orchestrator
        .try_bypass(&format!("{}/story", server.uri()))
        .await;

    assert!(result.success);
    assert_eq!(result.source, StrategySource::SocialReferrer);
    assert_eq!(result.attempts.len(), 2, "only the two crawler strategies should have failed");

    // strategies 4-6 never ran: one googlebot, one bingbot, one referrer request
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert!(archive_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn soft_paywall_rebypass_replaces_with_longer_text() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("user-agent", GOOGLEBOT_UA))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(article_page(&article_prose()), "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(preview_page(), "text/html"))
        .mount(&server)
        .await;

    let mut config = PipelineConfig::default();
    // the mock server host must count as a known-paywalled domain
    config.paywall.domains.push("127.0.0.1".to_string());

    let article = extract_article(&format!("{}/gated", server.uri()), &config)
        .await
        .unwrap();

    let source = article.archive_source.expect("re-bypass provenance expected");
    assert_eq!(source.service.as_str(), "googlebot-ua");
    assert!(
        article.length > 1000,
        "expected full text after re-bypass, got {} chars",
        article.length
    );
    assert!(!article.text_content.contains("Subscribe now to continue reading"));
}

#[tokio::test]
async fn soft_paywall_keeps_original_when_bypass_is_not_better() {
    let server = MockServer::start().await;

    // every identity gets the same preview page: the re-bypass cannot
    // improve on the original and must be silently absorbed
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(preview_page(), "text/html"))
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.paywall.domains.push("127.0.0.1".to_string());

    let article = extract_article(&format!("{}/gated", server.uri()), &config)
        .await
        .unwrap();

    assert!(article.archive_source.is_none());
    assert!(article.text_content.contains("Subscribe now to continue reading"));
}

#[tokio::test]
async fn total_failure_aggregates_all_strategy_reasons() {
    let server = MockServer::start().await;

    // archive endpoints answer but never usefully; they are mounted before
    // the catch-all so their paths keep matching
    Mock::given(method("GET"))
        .and(path_regex("^/archive/.*"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wayback/available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "archived_snapshots": {}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let result = extract_article(&format!("{}/story", server.uri()), &config).await;

    match result {
        Err(ExtractError::BypassExhausted { attempts }) => {
            assert_eq!(attempts.len(), 6);
            for name in [
                "googlebot-ua",
                "bingbot-ua",
                "social-referrer",
                "minimal-refetch",
                "archive-today",
                "wayback",
            ] {
                assert!(
                    attempts.iter().any(|a| a.starts_with(&format!("{name}:"))),
                    "missing reason for {name}: {attempts:?}"
                );
            }
        }
        other => panic!("expected exhausted bypass, got {other:?}"),
    }
}

#[tokio::test]
async fn wayback_snapshot_rewrites_proxy_urls() {
    let server = MockServer::start().await;

    let snapshot_body = format!(
        r#"<html><head><title>Snap</title></head><body>
        <article class="post-content">
        <img src="https://web.archive.org/web/20240115103000im_/https://example.com/photo.jpg">
        <p>{}</p>
        </article></body></html>"#,
        article_prose()
    );

    // live origin blocked for everyone, archive-today mirror down
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex("^/archive/.*"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wayback/available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "archived_snapshots": {
                "closest": {
                    "available": true,
                    "url": format!("{}/snapshot", server.uri()),
                    "timestamp": "20240115103000"
                }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/snapshot"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(snapshot_body, "text/html"))
        .mount(&server)
        .await;

    let bypass_config = BypassConfig {
        archive_mirrors: vec![format!("{}/archive", server.uri())],
        availability_endpoint: format!("{}/wayback/available", server.uri()),
        ..Default::default()
    };
    let orchestrator = BypassOrchestrator::with_config(bypass_config);
    let result = orchestrator
        .try_bypass(&format!("{}/story", server.uri()))
        .await;

    assert!(result.success, "wayback should have succeeded: {:?}", result.error);
    assert_eq!(result.source, StrategySource::Wayback);
    assert_eq!(result.snapshot_timestamp.as_deref(), Some("20240115103000"));

    let html = result.html.unwrap();
    assert!(html.contains(r#"src="https://example.com/photo.jpg""#));
    assert!(!html.contains("web.archive.org"));
}

#[tokio::test]
async fn archive_today_rate_limit_gets_one_followup_fetch() {
    let server = MockServer::start().await;

    // live origin blocked for every identity
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    // the newest endpoint redirects to the snapshot page
    Mock::given(method("GET"))
        .and(path_regex("^/archive/newest/.*"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/archive/AbCdE"))
        .mount(&server)
        .await;
    // first hit on the snapshot is rate limited, the follow-up succeeds
    Mock::given(method("GET"))
        .and(path("/archive/AbCdE"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/archive/AbCdE"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(article_page(&article_prose()), "text/html"),
        )
        .mount(&server)
        .await;

    let bypass_config = BypassConfig {
        archive_mirrors: vec![format!("{}/archive", server.uri())],
        availability_endpoint: format!("{}/wayback/available", server.uri()),
        ..Default::default()
    };
    let orchestrator = BypassOrchestrator::with_config(bypass_config);
    let result = orchestrator
        .try_bypass(&format!("{}/story", server.uri()))
        .await;

    assert!(result.success, "rate-limit follow-up should succeed: {:?}", result.error);
    assert_eq!(result.source, StrategySource::ArchiveToday);
    assert!(result.archive_url.unwrap().ends_with("/archive/AbCdE"));
}

#[tokio::test]
async fn timeout_classified_as_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(article_page(&article_prose()), "text/html")
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = PipelineConfig::builder().enable_bypass(false).build();
    config.fetch.timeout = 1;

    let result = extract_article(&format!("{}/slow", server.uri()), &config).await;
    match result {
        Err(ExtractError::Fetch(err)) => assert_eq!(err.kind, FetchErrorKind::Timeout),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn markdown_output_from_pipeline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(article_page(&article_prose()), "text/html"),
        )
        .mount(&server)
        .await;

    let config = PipelineConfig::default();
    let article = extract_article(&format!("{}/story", server.uri()), &config)
        .await
        .unwrap();

    let rendered = article.to_markdown().unwrap();
    assert!(rendered.markdown.starts_with("# A Test Article"));
    assert!(!rendered.markdown.contains("<script"));
    assert!(!rendered.markdown.contains("SIDEBAR"));
}
