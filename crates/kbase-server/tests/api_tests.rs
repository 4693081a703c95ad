//! Integration tests for the `kbase` HTTP API.
//!
//! Each test builds the real router over an in-memory store and drives it
//! with `tower::ServiceExt::oneshot`. No socket is opened.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use kbase_core::auth::AdminSecret;
use kbase_core::content::ContentStore;
use kbase_server::app::{AdminLimits, build_router, build_router_with_limits};
use kbase_server::state::AppState;
use kbase_storage::{MemoryBackend, StorageBackend, StorageError};

const PASSWORD: &str = "correct horse";

const ADMIN_PATHS: [&str; 6] = [
    "/api/admin/data",
    "/api/admin/articles",
    "/api/admin/categories",
    "/api/admin/tags",
    "/api/admin/export",
    "/api/admin/import",
];

/// Helper: router over `backend` with the test password.
fn app_over(backend: impl StorageBackend) -> Router {
    let content = ContentStore::new(Arc::new(backend));
    build_router(Arc::new(AppState::new(
        Some(content),
        AdminSecret::new(Some(PASSWORD)),
    )))
}

/// Helper: router over `backend` with explicit admin limits.
fn app_with_limits(backend: impl StorageBackend, limits: AdminLimits) -> Router {
    let content = ContentStore::new(Arc::new(backend));
    build_router_with_limits(
        Arc::new(AppState::new(
            Some(content),
            AdminSecret::new(Some(PASSWORD)),
        )),
        limits,
    )
}

/// Helper: the three collections as the public scenario seeds them.
fn seeded() -> MemoryBackend {
    MemoryBackend::with_documents([
        (
            "articles",
            r#"[{"id":"a1","title":"T","content":"C","published":true,"categoryId":"c1","tagIds":["t1"]},
                {"id":"a2","title":"Draft","content":"D","published":false,"categoryId":"c2","tagIds":[]}]"#,
        ),
        (
            "categories",
            r#"{"c1":{"id":"c1","name":"Rust"},"c2":{"id":"c2","name":"Go"},"c3":{"id":"c3","name":"Unused"}}"#,
        ),
        ("tags", r#"{"t1":{"id":"t1","name":"async"},"t9":{"id":"t9","name":"unused"}}"#),
    ])
}

/// Helper: send a request and return (status, headers, JSON body or `Null`).
async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, HeaderMap, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_owned())))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, json)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(app, Method::GET, uri, None).await;
    (status, body)
}

async fn post(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let (status, _, body) = send(app, Method::POST, uri, Some(&body.to_string())).await;
    (status, body)
}

fn assert_cors(headers: &HeaderMap) {
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(
        headers["access-control-allow-methods"],
        "GET, POST, OPTIONS"
    );
    assert!(
        headers["access-control-allow-headers"]
            .to_str()
            .unwrap()
            .contains("Content-Type")
    );
}

/// Blob store whose writes always fail.
struct ReadOnlyBackend(MemoryBackend);

#[async_trait::async_trait]
impl StorageBackend for ReadOnlyBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.0.get(key).await
    }

    async fn put(&self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Write {
            key: key.to_owned(),
            reason: "store is read-only".to_owned(),
        })
    }

    fn kind(&self) -> &'static str {
        "read-only"
    }
}

/// Blob store that accepts `articles` writes and rejects everything else.
struct ArticlesOnlyBackend(MemoryBackend);

#[async_trait::async_trait]
impl StorageBackend for ArticlesOnlyBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.0.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if key == "articles" {
            self.0.put(key, value).await
        } else {
            Err(StorageError::Write {
                key: key.to_owned(),
                reason: "quota exceeded".to_owned(),
            })
        }
    }

    fn kind(&self) -> &'static str {
        "articles-only"
    }
}

/// Blob store that panics on every read.
struct PanickingBackend;

#[async_trait::async_trait]
impl StorageBackend for PanickingBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        panic!("backend exploded");
    }

    async fn put(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "panicking"
    }
}

/// Reads park until the test opens the gate.
struct GatedBackend {
    inner: MemoryBackend,
    gate: Arc<tokio::sync::Semaphore>,
    entered: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl StorageBackend for GatedBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let _permit = self.gate.acquire().await.unwrap();
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.put(key, value).await
    }

    fn kind(&self) -> &'static str {
        "gated"
    }
}

// ── Health ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_reports_store_binding() {
    let app = app_over(MemoryBackend::new());
    let (status, headers, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_cors(&headers);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "API is working");
    assert_eq!(body["kv_configured"], true);
    assert_eq!(body["storage"], "memory");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_without_store_health_works_and_data_routes_fail() {
    let app = build_router(Arc::new(AppState::new(
        None,
        AdminSecret::new(Some(PASSWORD)),
    )));

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kv_configured"], false);
    assert_eq!(body["storage"], Value::Null);

    let (status, body) = get(&app, "/api/articles").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("storage"));
}

// ── Public feed ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_public_feed_single_published_article() {
    let app = app_over(MemoryBackend::with_documents([
        (
            "articles",
            r#"[{"id":"a1","title":"T","content":"C","published":true}]"#,
        ),
        ("categories", "{}"),
        ("tags", "{}"),
    ]));

    let (status, body) = get(&app, "/api/articles").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "data": {
                "articles": [{"id": "a1", "title": "T", "content": "C", "published": true}],
                "categories": {},
                "tags": {}
            }
        })
    );
}

#[tokio::test]
async fn test_public_feed_hides_drafts_but_keeps_all_categories_and_tags() {
    let app = app_over(seeded());
    let (status, body) = get(&app, "/api/articles").await;
    assert_eq!(status, StatusCode::OK);

    let articles = body["data"]["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert!(articles.iter().all(|a| a["published"] == true));

    // c3 and t9 are referenced by nothing and still returned.
    assert!(body["data"]["categories"].get("c3").is_some());
    assert!(body["data"]["categories"].get("c2").is_some());
    assert!(body["data"]["tags"].get("t9").is_some());
}

#[tokio::test]
async fn test_public_feed_truthy_published_values_are_drafts() {
    let app = app_over(MemoryBackend::with_documents([(
        "articles",
        r#"[{"id":"a","published":"true"},{"id":"b","published":1},{"id":"c"},{"id":"d","published":true}]"#,
    )]));
    let (_, body) = get(&app, "/api/articles").await;
    assert_eq!(body["data"]["articles"], json!([{"id": "d", "published": true}]));
}

#[tokio::test]
async fn test_malformed_articles_blob_yields_empty_list() {
    let app = app_over(MemoryBackend::with_documents([
        ("articles", "this is not json"),
        ("categories", r#"{"c1":{"id":"c1","name":"Rust"}}"#),
    ]));

    let (status, body) = get(&app, "/api/articles").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["articles"], json!([]));
    assert_eq!(body["data"]["categories"]["c1"]["name"], "Rust");
    assert_eq!(body["data"]["tags"], json!({}));
}

#[tokio::test]
async fn test_mapping_shaped_articles_are_listed_in_document_order() {
    let app = app_over(MemoryBackend::with_documents([(
        "articles",
        r#"{"z":{"id":"z","published":true},"a":{"id":"a","published":true}}"#,
    )]));
    let (_, body) = get(&app, "/api/articles").await;
    let ids: Vec<&str> = body["data"]["articles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["z", "a"]);
}

// ── Authorization ────────────────────────────────────────────────────

#[tokio::test]
async fn test_wrong_or_missing_password_is_401_and_store_untouched() {
    let backend = seeded();
    let before = backend.dump().await;
    let app = app_over(backend.clone());

    let attempts = [
        json!({}),
        json!({"password": "wrong"}),
        json!({"password": ""}),
        json!({"password": null}),
        json!({"password": 12345}),
        json!({"password": "correct horse "}),
    ];

    for path in ADMIN_PATHS {
        for attempt in &attempts {
            let mut body = attempt.clone();
            body["articles"] = json!([]);
            body["categories"] = json!({});
            body["tags"] = json!({});
            body["data"] = json!({"articles": [], "categories": {}, "tags": {}});

            let (status, resp) = post(&app, path, &body).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{path} with {attempt}");
            assert_eq!(resp, json!({"success": false, "error": "Unauthorized"}));
        }
    }

    assert_eq!(backend.dump().await, before);
}

#[tokio::test]
async fn test_unconfigured_secret_locks_admin_api() {
    let backend = seeded();
    let app = build_router(Arc::new(AppState::new(
        Some(ContentStore::new(Arc::new(backend.clone()))),
        AdminSecret::new(None),
    )));

    for body in [json!({}), json!({"password": ""}), json!({"password": "undefined"})] {
        let (status, _) = post(&app, "/api/admin/data", &body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // Public reads are unaffected.
    let (status, _) = get(&app, "/api/articles").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_auth_is_checked_before_required_fields() {
    let app = app_over(MemoryBackend::new());
    let (status, _) = post(&app, "/api/admin/articles", &json!({"password": "nope"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post(&app, "/api/admin/articles", &json!({"password": PASSWORD})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("articles"));
}

// ── Admin reads and writes ───────────────────────────────────────────

#[tokio::test]
async fn test_saved_draft_is_hidden_publicly_but_visible_to_admin() {
    let app = app_over(MemoryBackend::new());

    let (status, body) = post(
        &app,
        "/api/admin/articles",
        &json!({"password": PASSWORD, "articles": [{"id": "a1", "published": false}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, body) = get(&app, "/api/articles").await;
    assert_eq!(body["data"]["articles"], json!([]));

    let (status, body) = post(&app, "/api/admin/data", &json!({"password": PASSWORD})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        body["data"]["articles"],
        json!([{"id": "a1", "published": false}])
    );
}

#[tokio::test]
async fn test_collection_write_is_whole_document_overwrite() {
    let backend = seeded();
    let app = app_over(backend.clone());

    let (status, _) = post(
        &app,
        "/api/admin/tags",
        &json!({"password": PASSWORD, "tags": {"t1": {"id": "t1", "name": "renamed"}}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let stored: Value = serde_json::from_str(&backend.get("tags").await.unwrap().unwrap()).unwrap();
    assert_eq!(stored, json!({"t1": {"id": "t1", "name": "renamed"}}));
}

#[tokio::test]
async fn test_scalar_collection_is_rejected() {
    let backend = MemoryBackend::new();
    let app = app_over(backend.clone());
    let (status, body) = post(
        &app,
        "/api/admin/categories",
        &json!({"password": PASSWORD, "categories": "oops"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(backend.dump().await.is_empty());
}

#[tokio::test]
async fn test_removing_referenced_category_is_conflict() {
    let backend = seeded();
    let before = backend.dump().await;
    let app = app_over(backend.clone());

    // c2 is referenced by the draft a2; drafts count too.
    let (status, body) = post(
        &app,
        "/api/admin/categories",
        &json!({"password": PASSWORD, "categories": {"c1": {"id": "c1", "name": "Rust"}}}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["ids"], json!(["c2"]));
    assert_eq!(backend.dump().await, before);

    // Dropping only the unreferenced c3 is fine.
    let (status, _) = post(
        &app,
        "/api/admin/categories",
        &json!({"password": PASSWORD, "categories": {
            "c1": {"id": "c1", "name": "Rust"},
            "c2": {"id": "c2", "name": "Go"}
        }}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reference_guard_can_be_disabled() {
    let backend = seeded();
    let content = ContentStore::new(Arc::new(backend.clone())).with_reference_guard(false);
    let app = build_router(Arc::new(AppState::new(
        Some(content),
        AdminSecret::new(Some(PASSWORD)),
    )));

    let (status, _) = post(
        &app,
        "/api/admin/tags",
        &json!({"password": PASSWORD, "tags": {}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_store_write_failure_is_500_with_message() {
    let app = app_over(ReadOnlyBackend(MemoryBackend::new()));
    let (status, headers, body) = send(
        &app,
        Method::POST,
        "/api/admin/articles",
        Some(&json!({"password": PASSWORD, "articles": []}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&headers);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("read-only"));
}

// ── Export / import ──────────────────────────────────────────────────

#[tokio::test]
async fn test_export_includes_everything_and_a_timestamp() {
    let app = app_over(seeded());
    let (status, body) = post(&app, "/api/admin/export", &json!({"password": PASSWORD})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["articles"].as_array().unwrap().len(), 2);
    assert_eq!(data["categories"].as_object().unwrap().len(), 3);
    assert_eq!(data["tags"].as_object().unwrap().len(), 2);
    assert!(data["exportDate"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_import_of_categories_only_leaves_articles_and_tags() {
    let backend = seeded();
    let before: BTreeMap<String, String> = backend.dump().await;
    let app = app_over(backend.clone());

    let (status, body) = post(
        &app,
        "/api/admin/import",
        &json!({"password": PASSWORD, "data": {"categories": {"c9": {"id": "c9", "name": "New"}}}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "applied": ["categories"]}));

    let after = backend.dump().await;
    assert_eq!(after["articles"], before["articles"]);
    assert_eq!(after["tags"], before["tags"]);
    let categories: Value = serde_json::from_str(&after["categories"]).unwrap();
    assert_eq!(categories, json!({"c9": {"id": "c9", "name": "New"}}));
}

#[tokio::test]
async fn test_export_then_import_restores_state() {
    let source = seeded();
    let (_, exported) = post(
        &app_over(source.clone()),
        "/api/admin/export",
        &json!({"password": PASSWORD}),
    )
    .await;

    let target = MemoryBackend::new();
    let target_app = app_over(target.clone());
    let (status, body) = post(
        &target_app,
        "/api/admin/import",
        &json!({"password": PASSWORD, "data": exported["data"]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], json!(["articles", "categories", "tags"]));

    let (_, original) = post(&app_over(source), "/api/admin/data", &json!({"password": PASSWORD})).await;
    let (_, restored) = post(&target_app, "/api/admin/data", &json!({"password": PASSWORD})).await;
    assert_eq!(original["data"], restored["data"]);
}

#[tokio::test]
async fn test_import_requires_data() {
    let app = app_over(MemoryBackend::new());
    let (status, body) = post(&app, "/api/admin/import", &json!({"password": PASSWORD})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("data"));
}

#[tokio::test]
async fn test_import_partial_failure_reports_applied() {
    let inner = MemoryBackend::new();
    let app = app_over(ArticlesOnlyBackend(inner.clone()));

    let (status, body) = post(
        &app,
        "/api/admin/import",
        &json!({"password": PASSWORD, "data": {
            "articles": [{"id": "a1", "published": true}],
            "categories": {},
            "tags": {}
        }}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["applied"], json!(["articles"]));
    assert!(inner.dump().await.contains_key("articles"));
}

// ── Errors, routing and CORS ─────────────────────────────────────────

#[tokio::test]
async fn test_unknown_route_is_404_with_cors() {
    let app = app_over(MemoryBackend::new());
    let (status, headers, body) = send(&app, Method::GET, "/api/nothing", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_cors(&headers);
    assert_eq!(
        body,
        json!({"success": false, "error": "Route /api/nothing not found"})
    );
}

#[tokio::test]
async fn test_wrong_method_on_known_route_is_404() {
    let app = app_over(MemoryBackend::new());

    let (status, body) = get(&app, "/api/admin/data").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Route /api/admin/data not found");

    let (status, _) = post(&app, "/api/articles", &json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_options_short_circuits_with_empty_200() {
    let app = app_over(MemoryBackend::new());
    for path in ["/api/admin/articles", "/api/articles", "/no/such/route"] {
        let (status, headers, body) = send(&app, Method::OPTIONS, path, None).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_cors(&headers);
        assert_eq!(body, Value::Null);
    }
}

#[tokio::test]
async fn test_unparseable_body_is_500_with_envelope() {
    let backend = MemoryBackend::new();
    let app = app_over(backend.clone());
    let (status, headers, body) =
        send(&app, Method::POST, "/api/admin/articles", Some("{password:")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&headers);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
    assert!(backend.dump().await.is_empty());
}

#[tokio::test]
async fn test_wrongly_shaped_body_is_400() {
    let app = app_over(MemoryBackend::new());
    let (status, _, body) = send(&app, Method::POST, "/api/admin/data", Some("42")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_articles_document_over_two_mib_is_accepted() {
    let backend = MemoryBackend::new();
    let app = app_over(backend.clone());
    let article = json!({
        "id": "big",
        "title": "Large",
        "content": "x".repeat(3 * 1024 * 1024),
        "published": true,
    });

    let (status, body) = post(
        &app,
        "/api/admin/articles",
        &json!({"password": PASSWORD, "articles": [article]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let stored = backend.dump().await;
    assert!(stored["articles"].len() > 3 * 1024 * 1024);

    let (status, body) = get(&app, "/api/articles").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["articles"][0]["id"], "big");
}

#[tokio::test]
async fn test_body_over_configured_limit_is_413() {
    let backend = MemoryBackend::new();
    let app = app_with_limits(
        backend.clone(),
        AdminLimits {
            max_body_bytes: 1024,
            ..AdminLimits::default()
        },
    );
    let request = json!({
        "password": PASSWORD,
        "articles": [{"id": "a", "content": "y".repeat(4096)}],
    });

    let (status, headers, body) = send(
        &app,
        Method::POST,
        "/api/admin/articles",
        Some(&request.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_cors(&headers);
    assert_eq!(body["success"], false);
    assert!(backend.dump().await.is_empty());

    // The public feed has no body and is not limited.
    let (status, _) = get(&app, "/api/articles").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_concurrency_limit_is_shared_across_routes() {
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    let entered = Arc::new(AtomicUsize::new(0));
    let app = app_with_limits(
        GatedBackend {
            inner: seeded(),
            gate: Arc::clone(&gate),
            entered: Arc::clone(&entered),
        },
        AdminLimits {
            concurrency: 1,
            ..AdminLimits::default()
        },
    );

    // Park one request on /data inside the store.
    let parked = tokio::spawn({
        let app = app.clone();
        async move { post(&app, "/api/admin/data", &json!({"password": PASSWORD})).await }
    });
    while entered.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    // A different admin route waits for the same slot, even though it would
    // fail authorization without touching the store.
    let blocked = tokio::time::timeout(
        Duration::from_millis(200),
        post(&app, "/api/admin/export", &json!({"password": "wrong"})),
    )
    .await;
    assert!(blocked.is_err(), "second admin request was not limited");

    // Public routes are outside the limit.
    let (status, _) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    gate.add_permits(16);
    let (status, _) = parked.await.unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(&app, "/api/admin/export", &json!({"password": "wrong"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_handler_panic_becomes_500() {
    let app = app_over(PanickingBackend);
    let (status, headers, body) = send(&app, Method::GET, "/api/articles", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&headers);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("backend exploded"));

    // The router keeps serving after a panic.
    let (status, _) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}
