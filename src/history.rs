//! 診断履歴の永続化
//!
//! 新しい順の診断結果リストをJSONファイルに保存する。
//! 起動時に一度読み込み、履歴が変わるたびに全体を書き出す。

use crate::error::{PlantDoctorError, Result};
use chrono::Utc;
use plant_doctor_common::AnalysisRecord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub trait HistoryStore {
    /// 保存済みの履歴を読み込む（ファイルがなければ空）
    fn load(&self) -> Result<Vec<AnalysisRecord>>;

    /// 履歴全体を書き出す
    fn save(&self, analyses: &[AnalysisRecord]) -> Result<()>;
}

impl<T: HistoryStore + ?Sized> HistoryStore for Arc<T> {
    fn load(&self) -> Result<Vec<AnalysisRecord>> {
        (**self).load()
    }

    fn save(&self, analyses: &[AnalysisRecord]) -> Result<()> {
        (**self).save(analyses)
    }
}

impl<T: HistoryStore + ?Sized> HistoryStore for Box<T> {
    fn load(&self) -> Result<Vec<AnalysisRecord>> {
        (**self).load()
    }

    fn save(&self, analyses: &[AnalysisRecord]) -> Result<()> {
        (**self).save(analyses)
    }
}

/// 履歴ファイルの構造
#[derive(Debug, Serialize, Deserialize)]
struct HistoryFile {
    /// バージョン（互換性チェック用）
    version: u32,
    analyses: Vec<AnalysisRecord>,
}

/// JSONファイルによる履歴ストア
#[derive(Debug, Clone)]
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<Vec<AnalysisRecord>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let file: HistoryFile = serde_json::from_reader(reader)?;
        if file.version != Self::CURRENT_VERSION {
            return Err(PlantDoctorError::HistoryVersion(file.version));
        }
        Ok(file.analyses)
    }

    /// history.json → history.json.corrupt-{日時}
    fn quarantine(&self) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".corrupt-{}", stamp));
        let target = self.path.with_file_name(name);
        std::fs::rename(&self.path, &target)?;
        Ok(target)
    }
}

impl HistoryStore for JsonHistoryStore {
    /// 読めない履歴ファイルは退避してからエラーを返す（次の保存で上書きしない）
    fn load(&self) -> Result<Vec<AnalysisRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        match self.read_file() {
            Err(e @ (PlantDoctorError::JsonParse(_) | PlantDoctorError::HistoryVersion(_))) => {
                let moved = self.quarantine()?;
                tracing::warn!("unreadable history moved to {}: {}", moved.display(), e);
                Err(e)
            }
            result => result,
        }
    }

    fn save(&self, analyses: &[AnalysisRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // 書き込み途中で壊れないよう一時ファイル経由で置き換える
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let writer = BufWriter::new(File::create(&tmp_path)?);
            let file = HistoryFileRef {
                version: Self::CURRENT_VERSION,
                analyses,
            };
            serde_json::to_writer(writer, &file)?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct HistoryFileRef<'a> {
    version: u32,
    analyses: &'a [AnalysisRecord],
}

/// メモリ上の履歴ストア
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    analyses: Mutex<Vec<AnalysisRecord>>,
    saves: Mutex<usize>,
    fail_saves: bool,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analyses(analyses: Vec<AnalysisRecord>) -> Self {
        Self {
            analyses: Mutex::new(analyses),
            ..Self::default()
        }
    }

    /// 保存が常に失敗するストア
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Vec<AnalysisRecord> {
        self.analyses.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// save が呼ばれた回数
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or_default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<Vec<AnalysisRecord>> {
        Ok(self.snapshot())
    }

    fn save(&self, analyses: &[AnalysisRecord]) -> Result<()> {
        if let Ok(mut n) = self.saves.lock() {
            *n += 1;
        }
        if self.fail_saves {
            return Err(PlantDoctorError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "storage is read-only",
            )));
        }
        if let Ok(mut stored) = self.analyses.lock() {
            *stored = analyses.to_vec();
        }
        Ok(())
    }
}
