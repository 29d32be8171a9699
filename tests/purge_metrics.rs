mod support;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use fastly_cms::{
    domain::{content::Property, types::ContentStatus},
    fastly::{
        CachePolicyWriter, MemorySettings, PurgeClient, PurgeClientOptions, Purger,
        SettingsAccessor, keys,
    },
    infra::telemetry,
};
use metrics_util::debugging::DebuggingRecorder;
use support::{RecordingServer, content};

#[tokio::test]
async fn purge_and_policy_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let settings = SettingsAccessor::new(Arc::new(
        MemorySettings::new()
            .with(keys::API_DELAY_MS, "0")
            .with(keys::API_KEY, "secret-key")
            .with(keys::MAX_AGE, "3600"),
    ));

    let accepted = RecordingServer::start(StatusCode::OK).await;
    let rejected = RecordingServer::start(StatusCode::INTERNAL_SERVER_ERROR).await;
    for server in [&accepted, &rejected] {
        let client = PurgeClient::new(
            settings.clone(),
            PurgeClientOptions {
                api_base: server.base_url(),
                request_timeout: Duration::from_secs(5),
            },
        )
        .expect("client should build");
        client
            .purge(&server.url("/metrics/"))
            .await
            .expect("purge should reach the server");
    }

    let writer = CachePolicyWriter::new(settings);
    let mut headers = HeaderMap::new();
    writer.write(
        &content(
            "1",
            "/",
            ContentStatus::Published,
            Property::Value(false),
            Property::Missing,
        ),
        false,
        &mut headers,
    );

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "fastly_purge_requests_total",
        "fastly_purge_failures_total",
        "fastly_purge_ms",
        "fastly_cache_policy_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
