//! レポート出力テスト
//!
//! Markdownレポートの内容と一括出力の順序を検証

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use plant_doctor::error::{PlantDoctorError, Result};
use plant_doctor::export::{export_sequentially, render_markdown, MarkdownExporter, ReportExporter};
use plant_doctor_common::{AnalysisRecord, Language, SuggestedProduct, Treatment, TreatmentKind};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn record(id: &str, disease: &str) -> AnalysisRecord {
    AnalysisRecord {
        id: id.to_string(),
        image_url: "data:image/png;base64,AAAA".to_string(),
        timestamp: Utc.with_ymd_and_hms(2026, 6, 3, 14, 5, 0).unwrap(),
        language: Language::En,
        disease: disease.to_string(),
        disease_classification: "Fungal".to_string(),
        description: "Concentric rings on older leaves.".to_string(),
        treatments: vec![
            Treatment {
                kind: TreatmentKind::Chemical,
                description: "Apply a protectant fungicide.".to_string(),
                suggested_products: vec![SuggestedProduct {
                    name: "Dithane M-45".to_string(),
                    scientific_name: "Mancozeb".to_string(),
                    active_ingredient: "Mancozeb 80%".to_string(),
                }],
            },
            Treatment {
                kind: TreatmentKind::Biological,
                description: "Remove infected leaves.".to_string(),
                suggested_products: Vec::new(),
            },
        ],
        severity_level: 8,
        severity_description: "Spreading quickly.".to_string(),
        image_quality_score: 6,
        image_quality_description: "Slightly blurred.".to_string(),
        is_insect: None,
    }
}

/// 出力順と間隔を記録する
struct RecordingExporter {
    calls: Mutex<Vec<(String, Instant)>>,
    fail_on: Option<String>,
}

#[async_trait]
impl ReportExporter for RecordingExporter {
    async fn export(&self, record: &AnalysisRecord) -> Result<PathBuf> {
        self.calls.lock().unwrap().push((record.id.clone(), Instant::now()));
        if self.fail_on.as_deref() == Some(record.id.as_str()) {
            return Err(PlantDoctorError::Export("render failed".into()));
        }
        Ok(PathBuf::from(format!("{}.md", record.id)))
    }
}

#[test]
fn test_render_markdown() {
    let markdown = render_markdown(&record("a", "Early Blight"));

    assert!(markdown.starts_with("# Early Blight\n"));
    assert!(markdown.contains("2026-06-03 14:05 UTC"));
    assert!(markdown.contains("- Severity: 8/10 (high)"));
    assert!(markdown.contains("- Image quality: 6/10"));
    assert!(markdown.contains("### Chemical treatment"));
    assert!(markdown.contains("| Dithane M-45 | Mancozeb | Mancozeb 80% |"));
    assert!(markdown.contains("### Biological treatment"));
    assert!(!markdown.contains("base64"));
}

#[test]
fn test_file_name() {
    let name = MarkdownExporter::file_name(&record("2026-06-03T14:05:00.000Z", "Early Blight"));
    assert_eq!(name, "plant-analysis-Early-Blight-2026-06-03T14-05-00.000Z.md");
}

#[tokio::test]
async fn test_markdown_exporter_writes_files() {
    let dir = tempdir().expect("Failed to create temp dir");
    let exporter = MarkdownExporter::new(dir.path().join("reports"));
    let a = record("a", "Leaf Spot");
    let b = record("b", "Rust");

    let results = export_sequentially(&exporter, &[&a, &b], Duration::ZERO).await;

    assert_eq!(results.len(), 2);
    for (id, result) in &results {
        let path = result.as_ref().expect("export should succeed");
        let content = std::fs::read_to_string(path).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().ends_with(&format!("-{}.md", id)));
        assert!(content.starts_with("# "));
    }
}

#[tokio::test]
async fn test_sequential_export_pauses_between_items() {
    let exporter = RecordingExporter {
        calls: Mutex::new(Vec::new()),
        fail_on: Some("b".into()),
    };
    let records = [record("a", "x"), record("b", "y"), record("c", "z")];
    let refs: Vec<&AnalysisRecord> = records.iter().collect();
    let pause = Duration::from_millis(30);

    let results = export_sequentially(&exporter, &refs, pause).await;

    // 失敗しても残りは続ける
    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_err());
    assert!(results[2].1.is_ok());

    let calls = exporter.calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    for pair in calls.windows(2) {
        assert!(pair[1].1.duration_since(pair[0].1) >= pause);
    }
}
