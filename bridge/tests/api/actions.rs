//! `search_images` and `get_image` over HTTP

use bridge_common::Envelope;
use immich_bridge::immich::SearchResult;
use immich_bridge::import::ImportedAsset;
use immich_bridge::nonce::NonceScope;
use immich_bridge::settings::Settings;
use mockito::{Matcher, Server};
use reqwest::StatusCode;

use crate::harness::{is_empty_dir, settings_for, spawn};

#[tokio::test]
async fn test_search_beach_returns_two_results() {
    let mut upstream = Server::new_async().await;
    let mock = upstream
        .mock("GET", "/api/search")
        .match_query(Matcher::UrlEncoded("q".into(), "beach".into()))
        .match_header("x-api-key", "test-key")
        .with_status(200)
        .with_body(
            r#"{"assets":{"items":[
                {"id":"a1","originalFileName":"dunes.jpg"},
                {"id":"a2","originalFileName":"waves.jpg"}
            ]}}"#,
        )
        .create_async()
        .await;

    let bridge = spawn(settings_for(&upstream.url()), |_| {}).await;
    let nonce = bridge.nonce(NonceScope::Admin);

    let (status, envelope) = bridge
        .action::<Vec<SearchResult>>("search_images", &[("nonce", nonce.as_str()), ("query", "  beach ")])
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(envelope.success);
    let results = envelope.data.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "a1");
    assert_eq!(results[1].id, "a2");
    assert_eq!(results[0].filename, "dunes.jpg");
    assert_eq!(
        results[0].thumbnail_url,
        format!("{}/api/asset/thumbnail/a1", upstream.url())
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_search_wire_format_is_camel_case() {
    let mut upstream = Server::new_async().await;
    upstream
        .mock("GET", "/api/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"assets":[{"id":"a1","originalFileName":"x.jpg"}]}"#)
        .create_async()
        .await;

    let bridge = spawn(settings_for(&upstream.url()), |_| {}).await;
    let nonce = bridge.nonce(NonceScope::Public);

    let body: serde_json::Value = bridge
        .http
        .post(bridge.url("/api/search_images"))
        .form(&[("nonce", nonce.as_str()), ("query", "beach")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0]["thumbnailUrl"], format!("{}/api/asset/thumbnail/a1", upstream.url()));
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_zero_results_is_success() {
    let mut upstream = Server::new_async().await;
    upstream
        .mock("GET", "/api/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"assets":{"items":[]}}"#)
        .create_async()
        .await;

    let bridge = spawn(settings_for(&upstream.url()), |_| {}).await;
    let nonce = bridge.nonce(NonceScope::Admin);

    let (status, envelope) = bridge
        .action::<Vec<SearchResult>>("search_images", &[("nonce", nonce.as_str()), ("query", "zebra")])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope.data.unwrap(), Vec::<SearchResult>::new());
}

#[tokio::test]
async fn test_short_query_never_reaches_upstream() {
    let mut upstream = Server::new_async().await;
    let mock = upstream
        .mock("GET", "/api/search")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let bridge = spawn(settings_for(&upstream.url()), |_| {}).await;
    let nonce = bridge.nonce(NonceScope::Admin);

    for query in ["", "b", "  \t"] {
        let (status, envelope) = bridge
            .action::<Vec<SearchResult>>("search_images", &[("nonce", nonce.as_str()), ("query", query)])
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            envelope.error.as_deref(),
            Some("Please enter at least 2 characters to search")
        );
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_config_wins_regardless_of_query() {
    for settings in [
        Settings::default(),
        Settings {
            server_url: "http://photos.local".into(),
            api_key: String::new(),
        },
        Settings {
            server_url: String::new(),
            api_key: "k".into(),
        },
    ] {
        let bridge = spawn(settings, |_| {}).await;
        let nonce = bridge.nonce(NonceScope::Admin);

        for query in ["", "beach"] {
            let (status, envelope) = bridge
                .action::<Vec<SearchResult>>("search_images", &[("nonce", nonce.as_str()), ("query", query)])
                .await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert!(!envelope.success);
            assert_eq!(
                envelope.error.as_deref(),
                Some("Immich API configuration is missing")
            );
        }

        let (status, _) = bridge
            .action::<ImportedAsset>("get_image", &[("nonce", nonce.as_str()), ("image_id", "a1")])
            .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}

#[tokio::test]
async fn test_bad_nonce_is_forbidden() {
    let upstream = Server::new_async().await;
    let bridge = spawn(settings_for(&upstream.url()), |_| {}).await;

    for nonce in ["", "forged"] {
        let (status, envelope) = bridge
            .action::<Vec<SearchResult>>("search_images", &[("nonce", nonce), ("query", "beach")])
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(envelope.error.as_deref(), Some("Security check failed"));
    }

    // Missing field entirely
    let (status, _) = bridge
        .action::<ImportedAsset>("get_image", &[("image_id", "a1")])
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_form_body_gets_an_envelope() {
    let upstream = Server::new_async().await;
    let bridge = spawn(settings_for(&upstream.url()), |_| {}).await;

    let bare = bridge
        .http
        .post(bridge.url("/api/search_images"))
        .send()
        .await
        .unwrap();
    assert_eq!(bare.status(), StatusCode::FORBIDDEN);
    let envelope: Envelope<Vec<SearchResult>> = bare.json().await.unwrap();
    assert!(!envelope.success);
    assert_eq!(envelope.error.as_deref(), Some("Security check failed"));

    let json_body = bridge
        .http
        .post(bridge.url("/api/get_image"))
        .json(&serde_json::json!({"image_id": "a1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(json_body.status(), StatusCode::FORBIDDEN);
    let envelope: Envelope<ImportedAsset> = json_body.json().await.unwrap();
    assert!(!envelope.success);
}

#[tokio::test]
async fn test_public_nonce_cannot_import() {
    let upstream = Server::new_async().await;
    let bridge = spawn(settings_for(&upstream.url()), |_| {}).await;
    let public = bridge.nonce(NonceScope::Public);

    let (status, envelope) = bridge
        .action::<ImportedAsset>("get_image", &[("nonce", public.as_str()), ("image_id", "a1")])
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!envelope.success);
}

#[tokio::test]
async fn test_public_search_can_be_disabled() {
    let upstream = Server::new_async().await;
    let bridge = spawn(settings_for(&upstream.url()), |c| c.nonce.public_search = false).await;
    let public = bridge.nonce(NonceScope::Public);

    let (status, _) = bridge
        .action::<Vec<SearchResult>>("search_images", &[("nonce", public.as_str()), ("query", "beach")])
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_upstream_error_message_is_relayed() {
    let mut upstream = Server::new_async().await;
    upstream
        .mock("GET", "/api/search")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"message":"Invalid API key","statusCode":401}"#)
        .create_async()
        .await;

    let bridge = spawn(settings_for(&upstream.url()), |_| {}).await;
    let nonce = bridge.nonce(NonceScope::Admin);

    let (status, envelope) = bridge
        .action::<Vec<SearchResult>>("search_images", &[("nonce", nonce.as_str()), ("query", "beach")])
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(envelope.error.unwrap().contains("Invalid API key"));
}

#[tokio::test]
async fn test_import_a1() {
    let mut upstream = Server::new_async().await;
    upstream
        .mock("GET", "/api/asset/a1")
        .match_header("x-api-key", "test-key")
        .with_status(200)
        .with_body(r#"{"id":"a1","originalFileName":"img.jpg"}"#)
        .create_async()
        .await;
    upstream
        .mock("GET", "/api/asset/download/a1")
        .match_header("x-api-key", "test-key")
        .with_status(200)
        .with_header("content-type", "image/jpeg")
        .with_body(vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10])
        .create_async()
        .await;

    let bridge = spawn(settings_for(&upstream.url()), |_| {}).await;
    let nonce = bridge.nonce(NonceScope::Admin);

    let (status, envelope) = bridge
        .action::<ImportedAsset>("get_image", &[("nonce", nonce.as_str()), ("image_id", " a1 ")])
        .await;
    assert_eq!(status, StatusCode::OK);
    let asset = envelope.data.unwrap();

    assert!(!asset.id.is_empty());
    assert!(asset.url.starts_with(&format!("{}/media/", bridge.base)));
    assert!(asset.url.ends_with("/img.jpg"));
    assert!(asset.html.contains(&format!("src=\"{}\"", asset.url)));
    assert!(asset.html.contains("alt=\"img.jpg\""));

    // The stored file is served back
    let served = bridge.http.get(&asset.url).send().await.unwrap();
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(served.bytes().await.unwrap().as_ref(), &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10]);
    assert!(is_empty_dir(&bridge.scratch_dir()));

    let record: serde_json::Value = bridge
        .http
        .get(bridge.url(&format!("/api/media/{}", asset.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record["data"]["source_id"], "a1");
    assert_eq!(record["data"]["content_type"], "image/jpeg");
}

#[tokio::test]
async fn test_invalid_image_id() {
    let upstream = Server::new_async().await;
    let bridge = spawn(settings_for(&upstream.url()), |_| {}).await;
    let nonce = bridge.nonce(NonceScope::Admin);

    for id in ["", "../../etc/passwd", "a1 b2"] {
        let (status, _) = bridge
            .action::<ImportedAsset>("get_image", &[("nonce", nonce.as_str()), ("image_id", id)])
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "id {id:?}");
    }
}

#[tokio::test]
async fn test_failed_download_leaves_no_temp_file() {
    let mut upstream = Server::new_async().await;
    upstream
        .mock("GET", "/api/asset/a1")
        .with_status(200)
        .with_body(r#"{"id":"a1","originalFileName":"img.jpg"}"#)
        .create_async()
        .await;
    upstream
        .mock("GET", "/api/asset/download/a1")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let bridge = spawn(settings_for(&upstream.url()), |_| {}).await;
    let nonce = bridge.nonce(NonceScope::Admin);

    let (status, envelope) = bridge
        .action::<ImportedAsset>("get_image", &[("nonce", nonce.as_str()), ("image_id", "a1")])
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(envelope.error.unwrap().starts_with("Failed to download image"));
    assert!(is_empty_dir(&bridge.scratch_dir()));
}
