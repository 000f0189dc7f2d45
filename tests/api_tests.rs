//! HTTP API tests against a server bound to an ephemeral port.

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use content_engine::api::{self, AppState};
use content_engine::config::Config;
use content_engine::i18n::Language;
use content_engine::ContentEngine;
use serde_json::{json, Value};

const API_KEY: &str = "test-api-key";

// ==================== Test Helpers ====================

fn write_doc(root: &Path, rel: &str, frontmatter: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).expect("create corpus dir");
    std::fs::write(path, format!("---\n{}\n---\n\nBody text here.\n", frontmatter)).expect("write document");
}

fn seed_corpus(root: &Path) {
    write_doc(
        root,
        "blog/en/english-only-post.md",
        "title: English only\ndescription: Never translated\ncategory: news\ntags: [rust]",
    );
    write_doc(
        root,
        "blog/en/translated-post.md",
        "title: Translated\ndescription: Has a French version\ncategory: news\ntags: [rust, web]",
    );
    write_doc(
        root,
        "blog/fr/translated-post.md",
        "title: Traduit\ndescription: A une version française\ncategory: news\ntags: [rust]",
    );
}

/// Start a server over a fresh corpus and return its base URL.
async fn spawn_server(dir: &TempDir) -> String {
    seed_corpus(dir.path());

    let config = Config {
        content_dir: dir.path().to_path_buf(),
        languages: vec![Language::En, Language::Fr],
        api_key: Some(API_KEY.to_string()),
        ..Config::default()
    };
    let engine = Arc::new(ContentEngine::from_config(&config).expect("build engine"));
    let app = api::router(AppState {
        engine,
        api_key: config.api_key.clone(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });

    format!("http://{}", addr)
}

// ==================== Content Route Tests ====================

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;

    let response = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_get_document() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;

    let response = reqwest::get(format!("{}/api/content/blog/fr/translated-post", base))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["language"], "fr");
    assert_eq!(body["frontmatter"]["title"], "Traduit");
    assert_eq!(body["derived"]["wordCount"], 3);
}

#[tokio::test]
async fn test_missing_translation_is_404() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;

    let response = reqwest::get(format!("{}/api/content/blog/fr/english-only-post", base))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["translationAvailable"], false);
    assert_eq!(body["canonicalSlug"], "english-only-post");
}

#[tokio::test]
async fn test_bad_language_and_type_are_400() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;

    let unknown_language = reqwest::get(format!("{}/api/content/blog/xx/translated-post", base))
        .await
        .unwrap();
    assert_eq!(unknown_language.status(), 400);

    // Known but not enabled for this deployment
    let disabled_language = reqwest::get(format!("{}/api/content/blog/de/translated-post", base))
        .await
        .unwrap();
    assert_eq!(disabled_language.status(), 400);

    let unknown_type = reqwest::get(format!("{}/api/content/news/en/translated-post", base))
        .await
        .unwrap();
    assert_eq!(unknown_type.status(), 400);
}

#[tokio::test]
async fn test_list_and_related() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;

    let list: Vec<Value> = reqwest::get(format!("{}/api/content/blog/en", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 2);

    let related: Vec<Value> = reqwest::get(format!(
        "{}/api/content/blog/en/translated-post/related?limit=5",
        base
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0]["slug"], "english-only-post");
}

#[tokio::test]
async fn test_available_languages() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;

    let body: Value = reqwest::get(format!("{}/api/content/blog/translated-post/languages", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["languages"], json!(["en", "fr"]));

    let body: Value = reqwest::get(format!("{}/api/content/blog/english-only-post/languages", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["languages"], json!(["en"]));
}

// ==================== Validation Route Tests ====================

#[tokio::test]
async fn test_validation_report_and_stats() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;

    let report: Value = reqwest::get(format!("{}/api/validation", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["totalItems"], 2);
    assert_eq!(report["itemsWithMissingTranslations"], 1);

    let stats: Value = reqwest::get(format!("{}/api/stats", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["totalDocuments"], 3);
    assert_eq!(stats["translationCompleteness"], 50);
}

#[tokio::test]
async fn test_check_single() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{}/api/validation/check", base))
        .json(&json!({ "contentType": "blog", "englishSlug": "translated-post", "language": "fr" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["isValid"], true);

    let body: Value = client
        .post(format!("{}/api/validation/check", base))
        .json(&json!({ "contentType": "blog", "englishSlug": "english-only-post", "language": "fr" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["isValid"], false);
    assert_eq!(body["issues"], json!(["fr: translation is missing"]));
}

// ==================== Alert & Cache Route Tests ====================

#[tokio::test]
async fn test_alert_actions() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/alerts", base);

    let body: Value = client
        .post(&url)
        .json(&json!({ "action": "run" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let alerts = body["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["severity"], "warning");

    let body: Value = client
        .post(&url)
        .json(&json!({ "action": "list" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["rules"].as_array().unwrap().len(), 4);

    // Mutations need the key
    let response = client
        .post(&url)
        .json(&json!({ "action": "disable", "ruleId": "translation-gaps" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .post(&url)
        .header("x-api-key", API_KEY)
        .json(&json!({ "action": "disable", "ruleId": "translation-gaps" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["rule"]["enabled"], false);

    let response = client
        .post(&url)
        .header("x-api-key", API_KEY)
        .json(&json!({ "action": "remove", "ruleId": "no-such-rule" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let add = json!({
        "action": "add",
        "ruleId": "french-gaps",
        "severity": "error",
        "template": { "kind": "missing-language", "language": "fr" }
    });
    let response = client
        .post(&url)
        .header("x-api-key", API_KEY)
        .json(&add)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .post(&url)
        .header("x-api-key", API_KEY)
        .json(&add)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let body: Value = client
        .post(&url)
        .json(&json!({ "action": "run" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let alerts = body["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["ruleId"], "french-gaps");
    assert_eq!(alerts[0]["severity"], "error");
}

#[tokio::test]
async fn test_cache_invalidation() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let list: Vec<Value> = client
        .get(format!("{}/api/content/blog/fr", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);

    write_doc(
        dir.path(),
        "blog/fr/english-only-post.md",
        "title: Plus seulement\ndescription: Traduit enfin\ncategory: news\ntags: [rust]",
    );

    let response = client
        .post(format!("{}/api/cache/invalidate", base))
        .json(&json!({ "contentType": "blog", "language": "fr" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .post(format!("{}/api/cache/invalidate", base))
        .header("x-api-key", API_KEY)
        .json(&json!({ "contentType": "blog", "language": "fr" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let list: Vec<Value> = client
        .get(format!("{}/api/content/blog/fr", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 2);
}
