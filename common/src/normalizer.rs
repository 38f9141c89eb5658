//! 診断結果の正規化
//!
//! 推論サービスの生出力(RawDiagnosis)を履歴に保存する形(AnalysisRecord)に変換する。
//! - ゲートフラグ(isPlant, isArtificialPlant)は保存しない
//! - 深刻度は0-10、画質スコアは1-10の整数に丸める
//! - 治療法の種別はここで一度だけ判定する

use crate::image::PendingImage;
use crate::types::{AnalysisRecord, Language, RawDiagnosis, RawTreatment, Treatment, TreatmentKind};
use chrono::{DateTime, Utc};

pub const SEVERITY_MIN: u8 = 0;
pub const SEVERITY_MAX: u8 = 10;
pub const QUALITY_MIN: u8 = 1;
pub const QUALITY_MAX: u8 = 10;

/// 新規の診断結果を作成
pub fn normalize_diagnosis(
    raw: RawDiagnosis,
    image: &PendingImage,
    id: String,
    timestamp: DateTime<Utc>,
    language: Language,
) -> AnalysisRecord {
    build_record(raw, id, image.data_url(), timestamp, language)
}

/// 再解析結果で既存の診断結果を置き換える
///
/// id, image_url, timestamp は元のまま、それ以外はすべて差し替える
pub fn apply_translation(record: &AnalysisRecord, raw: RawDiagnosis, language: Language) -> AnalysisRecord {
    build_record(
        raw,
        record.id.clone(),
        record.image_url.clone(),
        record.timestamp,
        language,
    )
}

fn build_record(
    raw: RawDiagnosis,
    id: String,
    image_url: String,
    timestamp: DateTime<Utc>,
    language: Language,
) -> AnalysisRecord {
    AnalysisRecord {
        id,
        image_url,
        timestamp,
        language,
        disease: raw.disease.trim().to_string(),
        disease_classification: raw.disease_classification.trim().to_string(),
        description: raw.description,
        treatments: normalize_treatments(raw.treatments.unwrap_or_default()),
        severity_level: clamp_score(raw.severity_level, SEVERITY_MIN, SEVERITY_MAX, SEVERITY_MIN),
        severity_description: raw.severity_description,
        image_quality_score: clamp_score(raw.image_quality_score, QUALITY_MIN, QUALITY_MAX, QUALITY_MIN),
        image_quality_description: raw.image_quality_description,
        is_insect: raw.is_insect,
    }
}

/// 順序・重複はそのまま保持
fn normalize_treatments(raw: Vec<RawTreatment>) -> Vec<Treatment> {
    raw.into_iter()
        .map(|t| {
            let kind = TreatmentKind::classify(&t.kind);
            let suggested_products = t.suggested_products.unwrap_or_default();
            if kind == TreatmentKind::Chemical && suggested_products.is_empty() {
                tracing::warn!("chemical treatment without suggested products");
            }
            Treatment {
                kind,
                description: t.description,
                suggested_products,
            }
        })
        .collect()
}

/// 数値スコアを範囲内の整数に丸める（欠損・NaNはdefault）
fn clamp_score(value: Option<f64>, min: u8, max: u8, default: u8) -> u8 {
    match value {
        Some(v) if v.is_finite() => v.round().clamp(min as f64, max as f64) as u8,
        _ => default,
    }
}
