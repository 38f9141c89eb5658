//! 履歴ファイルテスト
//!
//! JSONファイルへの保存・読み込みの動作を検証

use chrono::{TimeZone, Utc};
use plant_doctor::error::PlantDoctorError;
use plant_doctor::history::{HistoryStore, JsonHistoryStore};
use plant_doctor::orchestrator::{AnalysisOutcome, Orchestrator};
use plant_doctor_common::{
    AnalysisRecord, Language, PendingImage, PlantVerification, RawDiagnosis, SuggestedProduct, Treatment,
    TreatmentKind,
};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn record(id: &str, disease: &str) -> AnalysisRecord {
    AnalysisRecord {
        id: id.to_string(),
        image_url: "data:image/jpeg;base64,/9j/4AAQ".to_string(),
        timestamp: Utc.with_ymd_and_hms(2026, 4, 12, 7, 15, 0).unwrap(),
        language: Language::Ar,
        disease: disease.to_string(),
        disease_classification: "فطري".to_string(),
        description: "- بقع بنية".to_string(),
        treatments: vec![Treatment {
            kind: TreatmentKind::Chemical,
            description: "رش".to_string(),
            suggested_products: vec![SuggestedProduct {
                name: "Ridomil Gold".to_string(),
                scientific_name: "Metalaxyl-M".to_string(),
                active_ingredient: "Metalaxyl-M 4%".to_string(),
            }],
        }],
        severity_level: 7,
        severity_description: "متوسطة".to_string(),
        image_quality_score: 9,
        image_quality_description: "واضحة".to_string(),
        is_insect: Some(false),
    }
}

/// 退避された履歴ファイル
fn quarantined_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("history.json.corrupt-")
        })
        .collect()
}

/// ファイルがなければ空の履歴
#[test]
fn test_missing_file_is_empty() {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = JsonHistoryStore::new(dir.path().join("history.json"));

    let loaded = store.load().expect("履歴の読み込み失敗");
    assert!(loaded.is_empty());
}

/// 保存と読み込みで順序・内容が保たれる
#[test]
fn test_save_and_load_preserves_order() {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = JsonHistoryStore::new(dir.path().join("nested").join("history.json"));

    let history = vec![record("b", "اللفحة"), record("a", "البياض")];
    store.save(&history).expect("履歴の保存失敗");

    let loaded = store.load().expect("履歴の読み込み失敗");
    assert_eq!(loaded, history);
    assert!(!dir.path().join("nested").join("history.json.tmp").exists());
}

/// 保存形式はバージョン付きのcamelCase JSON
#[test]
fn test_file_format() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("history.json");
    let store = JsonHistoryStore::new(&path);
    store.save(&[record("a", "Blight")]).unwrap();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["version"], 1);
    let entry = &json["analyses"][0];
    assert_eq!(entry["id"], "a");
    assert_eq!(entry["imageUrl"], "data:image/jpeg;base64,/9j/4AAQ");
    assert_eq!(entry["severityLevel"], 7);
    assert_eq!(entry["treatments"][0]["type"], "Chemical");
    assert_eq!(entry["treatments"][0]["suggestedProducts"][0]["scientificName"], "Metalaxyl-M");
    assert!(entry.get("isPlant").is_none());
}

/// 壊れたファイルはエラー
#[test]
fn test_corrupt_file_is_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("history.json");
    std::fs::write(&path, "{ not json").unwrap();

    let result = JsonHistoryStore::new(&path).load();
    assert!(matches!(result, Err(PlantDoctorError::JsonParse(_))));

    // 元のファイルは退避される
    assert!(!path.exists());
    let moved = quarantined_files(dir.path());
    assert_eq!(moved.len(), 1);
    assert_eq!(std::fs::read_to_string(&moved[0]).unwrap(), "{ not json");
}

/// 未対応バージョン
#[test]
fn test_version_mismatch() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("history.json");
    std::fs::write(&path, r#"{"version": 99, "analyses": []}"#).unwrap();

    let result = JsonHistoryStore::new(&path).load();
    assert!(matches!(result, Err(PlantDoctorError::HistoryVersion(99))));
    assert_eq!(quarantined_files(dir.path()).len(), 1);
}

/// 読み込めない履歴は空として起動する
#[test]
fn test_orchestrator_starts_empty_on_corrupt_history() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("history.json");
    std::fs::write(&path, "[]garbage").unwrap();

    let orch = Orchestrator::new(JsonHistoryStore::new(&path), Language::En);
    assert!(orch.history().is_empty());
}

/// 読めない履歴は次の保存で上書きされずに残る
#[test]
fn test_unreadable_history_survives_next_save() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("history.json");

    // imageQualityScore が欠けた記録
    let mut entry = serde_json::to_value(record("keep-me", "Blight")).unwrap();
    entry.as_object_mut().unwrap().remove("imageQualityScore");
    let original = serde_json::json!({"version": 1, "analyses": [entry]}).to_string();
    std::fs::write(&path, &original).unwrap();

    let mut orch = Orchestrator::new(JsonHistoryStore::new(&path), Language::En);
    assert!(orch.history().is_empty());

    orch.select_image(PendingImage::new("AAAA", "image/png"));
    let ticket = orch.begin_analysis().unwrap();
    let verification = PlantVerification {
        is_plant: true,
        ..Default::default()
    };
    orch.verification_finished(&ticket, Ok(verification)).unwrap();
    let raw = RawDiagnosis {
        disease: "Leaf Spot".to_string(),
        ..Default::default()
    };
    assert!(matches!(orch.complete_analysis(ticket, Ok(raw)), AnalysisOutcome::Created(_)));

    let saved = JsonHistoryStore::new(&path).load().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].disease, "Leaf Spot");

    let moved = quarantined_files(dir.path());
    assert_eq!(moved.len(), 1);
    assert_eq!(std::fs::read_to_string(&moved[0]).unwrap(), original);
}

/// 削除が即座にファイルへ反映される
#[test]
fn test_delete_is_persisted() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("history.json");
    JsonHistoryStore::new(&path)
        .save(&[record("a", "x"), record("b", "y"), record("c", "z")])
        .unwrap();

    let mut orch = Orchestrator::new(JsonHistoryStore::new(&path), Language::Ar);
    assert_eq!(orch.delete(&["b".to_string()]), 1);

    let reloaded = JsonHistoryStore::new(&path).load().unwrap();
    let ids: Vec<&str> = reloaded.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}
