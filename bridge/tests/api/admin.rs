//! Settings, admin auth, nonces, pages and static assets

use bridge_common::Envelope;
use immich_bridge::config::ThumbnailMode;
use immich_bridge::nonce::{IssuedNonce, NonceGuard, NonceScope};
use immich_bridge::settings::{Settings, SettingsStore};
use mockito::Server;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::harness::{settings_for, spawn};

fn with_token(config: &mut immich_bridge::BridgeConfig) {
    config.server.admin_token = Some("s3cret".to_string());
}

#[tokio::test]
async fn test_settings_json_masks_key() {
    let bridge = spawn(
        Settings {
            server_url: "https://photos.example.com".into(),
            api_key: "abcdef123456".into(),
        },
        |_| {},
    )
    .await;

    let body: Value = bridge
        .http
        .get(bridge.url("/api/settings"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["server_url"], "https://photos.example.com");
    assert_eq!(body["data"]["api_key"], "********3456");
    assert_eq!(body["data"]["configured"], true);
}

#[tokio::test]
async fn test_put_settings_keeps_key_when_omitted() {
    let bridge = spawn(
        Settings {
            server_url: "https://old.example.com".into(),
            api_key: "keep-me".into(),
        },
        |_| {},
    )
    .await;

    let response = bridge
        .http
        .put(bridge.url("/api/settings"))
        .json(&json!({"server_url": "https://new.example.com/"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let saved = bridge.settings.load().await.unwrap();
    assert_eq!(saved.server_url, "https://new.example.com");
    assert_eq!(saved.api_key, "keep-me");
}

#[tokio::test]
async fn test_put_settings_rejects_bad_url() {
    let bridge = spawn(Settings::default(), |_| {}).await;

    let response = bridge
        .http
        .put(bridge.url("/api/settings"))
        .json(&json!({"server_url": "not a url", "api_key": "k"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let envelope: Envelope<Value> = response.json().await.unwrap();
    assert!(!envelope.success);
    assert_eq!(bridge.settings.load().await.unwrap(), Settings::default());
}

#[tokio::test]
async fn test_settings_form_saves() {
    let bridge = spawn(Settings::default(), |_| {}).await;

    let response = bridge
        .http
        .post(bridge.url("/admin/settings"))
        .form(&[("server_url", "http://10.0.0.5:2283"), ("api_key", "form-key")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = response.text().await.unwrap();
    assert!(page.contains("Settings saved."));
    assert!(!page.contains("form-key"));

    let saved = bridge.settings.load().await.unwrap();
    assert_eq!(saved.server_url, "http://10.0.0.5:2283");
    assert_eq!(saved.api_key, "form-key");
}

#[tokio::test]
async fn test_admin_routes_require_token_when_configured() {
    let bridge = spawn(Settings::default(), with_token).await;

    for path in ["/api/settings", "/admin", "/admin/settings"] {
        let denied = bridge.http.get(bridge.url(path)).send().await.unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED, "{path}");

        let allowed = bridge
            .http
            .get(bridge.url(path))
            .bearer_auth("s3cret")
            .send()
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK, "{path}");
    }

    // Public routes stay open
    let health = bridge.http.get(bridge.url("/api/health")).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_settings_form_reachable_from_a_browser_with_token() {
    let bridge = spawn(Settings::default(), with_token).await;

    // A browser's first visit gets a challenge it can answer
    let challenged = bridge.http.get(bridge.url("/admin/settings")).send().await.unwrap();
    assert_eq!(challenged.status(), StatusCode::UNAUTHORIZED);
    let challenge = challenged.headers()[reqwest::header::WWW_AUTHENTICATE]
        .to_str()
        .unwrap();
    assert!(challenge.starts_with("Basic "));

    let page = bridge
        .http
        .get(bridge.url("/admin/settings"))
        .basic_auth("admin", Some("s3cret"))
        .send()
        .await
        .unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    assert!(page.text().await.unwrap().contains("Immich Server URL"));

    let saved = bridge
        .http
        .post(bridge.url("/admin/settings"))
        .basic_auth("admin", Some("s3cret"))
        .form(&[("server_url", "https://photos.example.com"), ("api_key", "browser-key")])
        .send()
        .await
        .unwrap();
    assert_eq!(saved.status(), StatusCode::OK);
    assert!(saved.text().await.unwrap().contains("Settings saved."));
    assert_eq!(bridge.settings.load().await.unwrap().api_key, "browser-key");

    let wrong = bridge
        .http
        .get(bridge.url("/admin"))
        .basic_auth("admin", Some("guess"))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_nonce_endpoint_scopes() {
    let bridge = spawn(Settings::default(), with_token).await;

    let public: Envelope<IssuedNonce> = bridge
        .http
        .get(bridge.url("/api/nonce?scope=public"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let public = public.into_result().unwrap();
    assert_eq!(public.scope, NonceScope::Public);
    assert!(bridge
        .nonces
        .verify(&public.token, &[NonceScope::Public])
        .is_ok());

    let denied = bridge
        .http
        .get(bridge.url("/api/nonce?scope=admin"))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let admin: Envelope<IssuedNonce> = bridge
        .http
        .get(bridge.url("/api/nonce?scope=admin"))
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(admin.into_result().unwrap().scope, NonceScope::Admin);

    let unknown = bridge
        .http
        .get(bridge.url("/api/nonce?scope=root"))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_configuration() {
    let bridge = spawn(Settings::default(), |_| {}).await;
    let body: Value = bridge
        .http
        .get(bridge.url("/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["configured"], false);
    assert_eq!(body["thumbnails"], "direct");
}

#[tokio::test]
async fn test_editor_page_embeds_admin_nonce() {
    let bridge = spawn(Settings::default(), |_| {}).await;
    let page = bridge
        .http
        .get(bridge.url("/admin"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(page.contains("id=\"immich-modal\""));
    assert!(page.contains("not configured"));
    let token = page
        .split("data-nonce=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap();
    assert_eq!(
        bridge.nonces.verify(token, &[NonceScope::Admin]).unwrap(),
        NonceScope::Admin
    );
}

#[tokio::test]
async fn test_widget_and_render() {
    let bridge = spawn(Settings::default(), |_| {}).await;

    let widget = bridge
        .http
        .get(bridge.url("/widget?placeholder=Find%20photos"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(widget.contains("immich-search-container"));
    assert!(widget.contains("placeholder=\"Find photos\""));

    let rendered = bridge
        .http
        .post(bridge.url("/api/render"))
        .body("<p>Intro</p>[immich_search placeholder=\"Beaches\"]")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(rendered.starts_with("<p>Intro</p>"));
    assert!(rendered.contains("placeholder=\"Beaches\""));
    assert!(!rendered.contains("[immich_search"));
}

#[tokio::test]
async fn test_static_assets_are_embedded() {
    let bridge = spawn(Settings::default(), |_| {}).await;

    let js = bridge
        .http
        .get(bridge.url("/static/widget.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(js.status(), StatusCode::OK);
    let content_type = js.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.contains("javascript"));
    assert!(js.text().await.unwrap().contains("search_images"));

    let missing = bridge
        .http
        .get(bridge.url("/static/nope.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_thumbnail_proxy() {
    let mut upstream = Server::new_async().await;
    upstream
        .mock("GET", "/api/asset/thumbnail/a1")
        .match_header("x-api-key", "test-key")
        .with_status(200)
        .with_header("content-type", "image/webp")
        .with_body("thumb")
        .create_async()
        .await;

    let direct = spawn(settings_for(&upstream.url()), |_| {}).await;
    let response = direct.http.get(direct.url("/api/thumbnail/a1")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let proxied = spawn(settings_for(&upstream.url()), |c| {
        c.immich.thumbnails = ThumbnailMode::Proxy
    })
    .await;
    let response = proxied
        .http
        .get(proxied.url("/api/thumbnail/a1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/webp");
    assert_eq!(response.text().await.unwrap(), "thumb");
}
