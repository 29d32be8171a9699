//! Helpers shared by the integration tests.
#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
};
use fastly_cms::domain::content::{ContentCacheFlags, ContentId, ContentItem, Property};
use fastly_cms::domain::types::ContentStatus;
use serde_json::json;
use tokio::{net::TcpListener, task::JoinHandle};
use url::Url;

pub const RECEIPT_ID: &str = "108-1391560174-974124";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
}

#[derive(Clone)]
struct RecorderState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    status: StatusCode,
}

/// A throwaway HTTP server on 127.0.0.1 that records every request it sees.
pub struct RecordingServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl RecordingServer {
    pub async fn start(status: StatusCode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("recording server should bind");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(record).with_state(RecorderState {
            requests: requests.clone(),
            status,
        });
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service()).await;
        });
        Self {
            addr,
            requests,
            handle,
        }
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).expect("base url")
    }

    pub fn url(&self, path: &str) -> Url {
        self.base_url().join(path).expect("url")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

impl Drop for RecordingServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn record(
    State(state): State<RecorderState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.requests.lock().expect("lock").push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        headers,
    });
    (state.status, Json(json!({ "status": "ok", "id": RECEIPT_ID })))
}

/// An address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    addr
}

pub fn content(
    id: &str,
    path: &str,
    status: ContentStatus,
    do_not_cache: Property<bool>,
    cache_for: Property<i64>,
) -> ContentItem {
    ContentItem {
        id: ContentId::parse(id).expect("id"),
        name: format!("Page {id}"),
        path: path.to_string(),
        status,
        flags: ContentCacheFlags {
            do_not_cache,
            cache_for_seconds: cache_for,
        },
        body: format!("Body of {id}"),
    }
}
