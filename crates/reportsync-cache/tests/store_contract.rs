//! Both stores honour the same contract: a `get` after `put` returns an
//! equal result, a second `put` replaces the first, and folders are
//! invalidated independently.

use pretty_assertions::assert_eq;
use reportsync_artifact::{
    fingerprint_contents, fingerprint_path, AnalysisResult, Evaluation, MetricsDocument,
    VisualizationArtifact,
};
use reportsync_cache::{CacheKey, CacheStore, DiskCacheStore, MemoryCacheStore};
use serde_json::json;
use std::sync::Arc;

fn sample_result(report: &str) -> AnalysisResult {
    let metrics = MetricsDocument::new()
        .with_metric("Regression Issues", json!([{"version": "1.0", "value": 4}]))
        .with_metric(
            "Open Security Defects",
            json!({"ATLS": [{"version": "1.0", "value": 2}], "BTLS": [{"version": "1.0", "value": 1}]}),
        );
    AnalysisResult {
        metrics,
        report: report.into(),
        visualizations: vec![VisualizationArtifact::from_bytes("Regression Issues", b"<svg/>")],
        visualization_map: [("Regression Issues".to_string(), 0)].into_iter().collect(),
        evaluation: Evaluation::new(7.5, "solid"),
        hyperlinks: vec!["https://example.com/run/1".into()],
    }
}

async fn exercise(store: Arc<dyn CacheStore>) {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("a.pdf");
    std::fs::write(&doc, b"release notes").unwrap();
    let content = fingerprint_contents(&[doc]).unwrap();

    let a = CacheKey::new(fingerprint_path("/reports/a"), content);
    let b = CacheKey::new(fingerprint_path("/reports/b"), content);

    let first = sample_result("first");
    store.put(a, first.clone()).await.unwrap();
    assert_eq!(store.get(&a).await.unwrap(), Some(first));

    store.put(a, sample_result("second")).await.unwrap();
    assert_eq!(store.get(&a).await.unwrap().unwrap().report, "second");

    store.put(b, sample_result("other")).await.unwrap();
    assert_eq!(store.invalidate_folder(&a.folder).await.unwrap(), 1);
    assert!(store.get(&a).await.unwrap().is_none());
    assert_eq!(store.get(&b).await.unwrap().unwrap().report, "other");
}

#[tokio::test]
async fn memory_store_contract() {
    exercise(Arc::new(MemoryCacheStore::new(64))).await;
}

#[tokio::test]
async fn disk_store_contract() {
    let root = tempfile::tempdir().unwrap();
    exercise(Arc::new(DiskCacheStore::new(root.path()))).await;
}

#[tokio::test]
async fn disk_store_racing_puts_leave_one_complete_entry() {
    let root = tempfile::tempdir().unwrap();
    let store = Arc::new(DiskCacheStore::new(root.path()));
    let key = CacheKey::new(fingerprint_path("/reports/a"), fingerprint_contents(&[]).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.put(key, sample_result(&format!("writer {i}"))).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = store.get(&key).await.unwrap().unwrap();
    assert!(stored.report.starts_with("writer "));
    assert_eq!(stored.visualizations.len(), 1);
}
