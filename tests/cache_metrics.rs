use std::collections::HashSet;

use bytes::Bytes;
use diagram_cache::{
    DiagramError,
    application::render::RenderError,
    cache::{CacheConfig, DiagramCache, build_key, codec, metric_names},
    domain::{artifact::SvgArtifact, options::DiagramOptions},
    infra::telemetry,
};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use tempfile::TempDir;

fn encoded(body: &str) -> Bytes {
    codec::encode(&SvgArtifact {
        body: body.to_string(),
        width: 1,
        height: 1,
        view_box: "0 0 1 1".to_string(),
        preserve_aspect_ratio: "xMinYMin meet".to_string(),
    })
    .expect("encode")
}

#[test]
fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let dir = TempDir::new().expect("temp dir");
    let options = DiagramOptions::default();

    // Budget fits one entry, so the second distinct key evicts the first.
    let config = CacheConfig {
        directory: dir.path().to_path_buf(),
        memory_budget_bytes: encoded("a").len() + 4,
    };
    let cache = DiagramCache::open(&config).expect("open cache");

    let a = build_key("a", &options);
    let b = build_key("b", &options);

    // render, then memory hit
    cache.get_or_create(&a, || Ok(encoded("a"))).expect("render a");
    cache.get_or_create(&a, || Ok(encoded("a"))).expect("memory hit a");
    // render b, evicting a
    cache.get_or_create(&b, || Ok(encoded("b"))).expect("render b");
    // a comes back from the persistent tier
    cache
        .get_or_create(&a, || panic!("a is persisted"))
        .expect("store hit a");
    // failures count separately
    let failed = build_key("broken", &options);
    let err = cache
        .get_or_create(&failed, || {
            Err(DiagramError::Render(RenderError::Svg {
                message: "no root".to_string(),
            }))
        })
        .expect_err("render error");
    assert!(matches!(err, DiagramError::Render(_)));

    let snapshot = snapshotter.snapshot().into_vec();
    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        metric_names::MEMORY_HIT,
        metric_names::STORE_HIT,
        metric_names::RENDER,
        metric_names::RENDER_ERROR,
        metric_names::MEMORY_EVICT,
        metric_names::RENDER_MS,
    ];
    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }

    let counter = |name: &str| {
        snapshot
            .iter()
            .find(|(key, _, _, _)| key.key().name() == name)
            .and_then(|(_, _, _, value)| match value {
                DebugValue::Counter(count) => Some(*count),
                _ => None,
            })
            .unwrap_or(0)
    };
    assert_eq!(counter(metric_names::RENDER), 3);
    assert_eq!(counter(metric_names::RENDER_ERROR), 1);
    assert_eq!(counter(metric_names::MEMORY_HIT), 1);
    assert_eq!(counter(metric_names::STORE_HIT), 1);
    assert!(counter(metric_names::MEMORY_EVICT) >= 1);
}
