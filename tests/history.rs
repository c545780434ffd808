use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use stylocheck_lib::models::AnalysisRecord;
use stylocheck_lib::services::calibration::CalibrationConfig;
use stylocheck_lib::services::{AnalysisStore, JsonHistoryStore, StoreError, UnconfiguredScorer};
use stylocheck_lib::{AnalysisEngine, EngineOptions};

const TEXT: &str = "Jesień przyszła wcześnie tego roku. Liście opadły, zanim ktokolwiek zdążył je policzyć. \
    W sadzie zostały tylko jabłka, czerwone i ciężkie od deszczu.";

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("stylocheck-it-history-{}", uuid::Uuid::new_v4()))
}

#[tokio::test]
async fn test_analysis_round_trips_through_store() {
    let engine = AnalysisEngine::new(
        CalibrationConfig::default(),
        Arc::new(UnconfiguredScorer),
        EngineOptions::default(),
    )
    .unwrap();
    let dir = temp_dir();
    let store = JsonHistoryStore::new(dir.clone());

    let mut ids = Vec::new();
    for _ in 0..3 {
        let report = engine.analyze(TEXT).await.unwrap();
        let record = AnalysisRecord::new(TEXT, report);
        store.save(&record).unwrap();
        ids.push(record.id);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let listed = store.list(0, 10).unwrap();
    assert_eq!(listed.len(), 3);
    // newest first
    assert_eq!(listed[0].id, ids[2]);
    assert_eq!(listed[2].id, ids[0]);
    assert_eq!(listed[0].text_length, TEXT.chars().count());

    let page = store.list(1, 1).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, ids[1]);

    let loaded = store.get(ids[1]).unwrap();
    assert!(loaded.report.ai_detection.degraded);
    assert_eq!(loaded.report.calibration_version, engine.calibration().version);

    store.delete(ids[1]).unwrap();
    assert_eq!(store.list(0, 10).unwrap().len(), 2);
    assert!(matches!(store.get(ids[1]), Err(StoreError::NotFound(_))));

    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_corrupt_records_are_skipped_when_listing() {
    let dir = temp_dir();
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("broken.json"), "{ not json").unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let store = JsonHistoryStore::new(dir.clone());
    assert!(store.list(0, 10).unwrap().is_empty());

    fs::remove_dir_all(dir).unwrap();
}
