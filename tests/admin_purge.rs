mod support;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::AUTHORIZATION},
};
use fastly_cms::{
    application::{
        publish::PublishService,
        repos::{ContentRepo, UrlResolver},
    },
    config::AdminSettings,
    domain::{content::Property, types::ContentStatus},
    fastly::{
        CachePolicyWriter, FastlyHooks, MemorySettings, PublishCollector, PurgeClient,
        PurgeClientOptions, PurgeError, PurgeResponse, Purger, SettingsAccessor, keys,
    },
    infra::{
        content::InMemoryContentStore,
        http::{AdminState, build_admin_router},
    },
};
use http_body_util::BodyExt;
use serde_json::Value;
use support::{content, refused_addr};
use tower::ServiceExt;
use url::Url;

const TOKEN: &str = "admin-token";

/// Answers every purge with a fixed status and remembers the URL.
struct FixedPurger {
    status: StatusCode,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl Purger for FixedPurger {
    async fn purge(&self, url: &Url) -> Result<PurgeResponse, PurgeError> {
        self.calls.lock().expect("lock").push(url.to_string());
        Ok(PurgeResponse {
            url: url.clone(),
            status: self.status,
            receipt: None,
        })
    }
}

struct Harness {
    router: Router,
    purger: Arc<FixedPurger>,
}

fn harness(settings: MemorySettings, status: StatusCode) -> Harness {
    let purger = Arc::new(FixedPurger {
        status,
        calls: Mutex::new(Vec::new()),
    });
    let router = router(Arc::new(settings), purger.clone());
    Harness { router, purger }
}

/// Admin router over a real purge client reading the same settings.
fn client_router(settings: MemorySettings, api_base: Url) -> Router {
    let settings = Arc::new(settings);
    let client = PurgeClient::new(
        SettingsAccessor::new(settings.clone()),
        PurgeClientOptions {
            api_base,
            request_timeout: Duration::from_secs(5),
        },
    )
    .expect("client should build");
    router(settings, Arc::new(client))
}

fn router(settings: Arc<MemorySettings>, purger: Arc<dyn Purger>) -> Router {
    let store = InMemoryContentStore::new();
    store.insert(content(
        "42",
        "/news/launch/",
        ContentStatus::Published,
        Property::Missing,
        Property::Missing,
    ));
    store.insert(content(
        "43",
        "/news/draft/",
        ContentStatus::Draft,
        Property::Missing,
        Property::Missing,
    ));
    let store = Arc::new(store);

    let accessor = SettingsAccessor::new(settings);
    let resolver: Arc<dyn UrlResolver> = store.clone();
    let repo: Arc<dyn ContentRepo> = store;

    let collector = PublishCollector::new(accessor.clone(), resolver.clone(), purger.clone());
    let hooks = Arc::new(FastlyHooks::new(
        accessor.clone(),
        collector,
        CachePolicyWriter::new(accessor.clone()),
    ));

    build_admin_router(AdminState {
        content: repo.clone(),
        resolver,
        publish: PublishService::new(repo, hooks),
        purger,
        settings: accessor,
        admin: AdminSettings {
            token: Some(TOKEN.to_string()),
        },
    })
}

fn configured() -> MemorySettings {
    MemorySettings::new().with(keys::DOMAIN_NAME, "https://www.example.com")
}

async fn post(router: &Router, uri: &str, body: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = router
        .clone()
        .oneshot(
            builder
                .body(Body::from(body.to_string()))
                .expect("request should build"),
        )
        .await
        .expect("router should respond");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn purge_without_token_is_rejected() {
    let harness = harness(configured(), StatusCode::OK);
    let (status, _) = post(&harness.router, "/admin/fastly/purge", "42", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(harness.purger.calls.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn empty_body_is_a_bad_request() {
    let harness = harness(configured(), StatusCode::OK);
    let (status, _) = post(&harness.router, "/admin/fastly/purge", "  ", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(harness.purger.calls.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn blank_domain_is_a_server_error() {
    let harness = harness(
        MemorySettings::new().with(keys::DOMAIN_NAME, " "),
        StatusCode::OK,
    );
    let (status, _) = post(&harness.router, "/admin/fastly/purge", "42", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(harness.purger.calls.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn unknown_content_is_not_found() {
    let harness = harness(configured(), StatusCode::OK);
    let (status, _) = post(&harness.router, "/admin/fastly/purge", "999", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn valid_id_purges_once_and_passes_status_through() {
    let harness = harness(configured(), StatusCode::OK);
    let (status, body) = post(&harness.router, "/admin/fastly/purge", "42\n", Some(TOKEN)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "https://www.example.com/news/launch/");
    assert_eq!(body["status"], 200);
    assert_eq!(
        *harness.purger.calls.lock().expect("lock"),
        vec!["https://www.example.com/news/launch/".to_string()]
    );
}

#[tokio::test]
async fn cdn_rejection_status_is_passed_through() {
    let harness = harness(configured(), StatusCode::FORBIDDEN);
    let (status, body) = post(&harness.router, "/admin/fastly/purge", "42", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], 403);
}

#[tokio::test]
async fn unreachable_cdn_is_a_bad_gateway() {
    let addr = refused_addr().await;
    let router = client_router(
        MemorySettings::new()
            .with(keys::DOMAIN_NAME, format!("http://{addr}"))
            .with(keys::API_DELAY_MS, "0")
            .with(keys::API_KEY, "secret-key"),
        Url::parse(&format!("http://{addr}/")).expect("url"),
    );

    let (status, _) = post(&router, "/admin/fastly/purge", "42", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn purge_all_without_application_id_is_a_server_error() {
    let addr = refused_addr().await;
    let router = client_router(
        configured()
            .with(keys::APPLICATION_ID, keys::DEFAULT_APPLICATION_ID)
            .with(keys::API_KEY, "secret-key"),
        Url::parse(&format!("http://{addr}/")).expect("url"),
    );

    let (status, _) = post(&router, "/admin/fastly/purge-all", "", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn purge_all_is_unavailable_without_support() {
    let harness = harness(configured(), StatusCode::OK);
    let (status, _) = post(&harness.router, "/admin/fastly/purge-all", "", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn publish_endpoint_changes_status_and_dispatches_purge() {
    let harness = harness(configured(), StatusCode::OK);
    let (status, body) = post(
        &harness.router,
        "/admin/content/43/publish",
        "",
        Some(TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "published");
    assert_eq!(body["purges"], 1);

    // Purges run on detached tasks.
    for _ in 0..50 {
        if !harness.purger.calls.lock().expect("lock").is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        *harness.purger.calls.lock().expect("lock"),
        vec!["https://www.example.com/news/draft/".to_string()]
    );
}

#[tokio::test]
async fn health_reports_configuration() {
    let harness = harness(configured(), StatusCode::OK);
    let response = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/admin/health")
                .header(AUTHORIZATION, format!("Bearer {TOKEN}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}
