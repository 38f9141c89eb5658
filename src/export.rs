//! 診断レポートの出力
//!
//! 選択した診断結果を1件ずつ順番に出力する。
//! レンダリングが重いため並列化せず、各件の間に一定の待ち時間を入れる。

use crate::error::{PlantDoctorError, Result};
use async_trait::async_trait;
use plant_doctor_common::{AnalysisRecord, TreatmentKind};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

#[async_trait]
pub trait ReportExporter: Send + Sync {
    /// 1件出力して出力先を返す
    async fn export(&self, record: &AnalysisRecord) -> Result<PathBuf>;
}

/// 1件ずつ順番に出力（失敗しても残りは続ける）
pub async fn export_sequentially<E>(
    exporter: &E,
    records: &[&AnalysisRecord],
    pause: Duration,
) -> Vec<(String, Result<PathBuf>)>
where
    E: ReportExporter + ?Sized,
{
    let mut results = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        if index > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        let result = exporter.export(record).await;
        match &result {
            Ok(path) => tracing::info!(id = %record.id, "exported {}", path.display()),
            Err(e) => tracing::warn!(id = %record.id, "export failed: {}", e),
        }
        results.push((record.id.clone(), result));
    }

    results
}

/// Markdownレポート出力
#[derive(Debug, Clone)]
pub struct MarkdownExporter {
    output_dir: PathBuf,
}

impl MarkdownExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// plant-analysis-{病名}-{ID}.md
    pub fn file_name(record: &AnalysisRecord) -> String {
        let disease = sanitize(&record.disease.split_whitespace().collect::<Vec<_>>().join("-"));
        let id = sanitize(&record.id);
        if disease.is_empty() {
            format!("plant-analysis-{}.md", id)
        } else {
            format!("plant-analysis-{}-{}.md", disease, id)
        }
    }
}

#[async_trait]
impl ReportExporter for MarkdownExporter {
    async fn export(&self, record: &AnalysisRecord) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(Self::file_name(record));
        tokio::fs::write(&path, render_markdown(record))
            .await
            .map_err(|e| PlantDoctorError::Export(format!("{}: {}", path.display(), e)))?;
        Ok(path)
    }
}

/// ファイル名に使えない文字を置き換える
fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect()
}

/// 診断レポートをMarkdownに整形（埋め込み画像は含めない）
pub fn render_markdown(record: &AnalysisRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", record.disease);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Analyzed on {} ({})",
        record.timestamp.format("%Y-%m-%d %H:%M UTC"),
        record.language
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "- Classification: {}", record.disease_classification);
    let _ = writeln!(
        out,
        "- Severity: {}/10 ({})",
        record.severity_level,
        record.severity_band().as_str()
    );
    let _ = writeln!(out, "- Image quality: {}/10", record.image_quality_score);
    if record.is_insect == Some(true) {
        let _ = writeln!(out, "- Subject: insect pest");
    }

    if !record.severity_description.is_empty() {
        let _ = writeln!(out, "\n{}", record.severity_description);
    }
    if !record.image_quality_description.is_empty() {
        let _ = writeln!(out, "\n{}", record.image_quality_description);
    }

    let _ = writeln!(out, "\n## Description\n\n{}", record.description);

    let _ = writeln!(out, "\n## Recommendations");
    for treatment in &record.treatments {
        let title = match treatment.kind {
            TreatmentKind::Chemical => "Chemical treatment",
            TreatmentKind::Biological => "Biological treatment",
        };
        let _ = writeln!(out, "\n### {}\n\n{}", title, treatment.description);

        if !treatment.suggested_products.is_empty() {
            let _ = writeln!(out, "\n| Commercial name | Scientific name | Active ingredient |");
            let _ = writeln!(out, "|---|---|---|");
            for p in &treatment.suggested_products {
                let _ = writeln!(out, "| {} | {} | {} |", p.name, p.scientific_name, p.active_ingredient);
            }
        }
    }

    out
}
