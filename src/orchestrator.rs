//! 解析ワークフローの状態管理
//!
//! 現在の画像・診断結果・読み込み状態・エラーと履歴を一元管理し、
//! ユーザー操作と言語変更に応じて状態を遷移させる。
//!
//! 非同期呼び出しは「開始（チケット発行）」と「完了（チケットと結果を渡す）」の
//! 2段階で扱う。チケットは発行時の世代を持ち、クリアや別画像の選択などで
//! 世代が進んだ後に届いた結果は反映せずに捨てる。

use crate::classifier::{classify, AnalysisFailure, MessageKey};
use crate::history::HistoryStore;
use crate::inference::InferenceError;
use crate::panels::{LocationPanel, PanelKind};
use chrono::{DateTime, SecondsFormat, Utc};
use plant_doctor_common::{
    apply_translation, normalize_diagnosis, AnalysisRecord, Language, PendingImage, PlantVerification,
    RawDiagnosis, TipsSnapshot, WeatherSnapshot,
};
use std::collections::BTreeSet;

/// 読み込み中の段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingStage {
    VerifyingImage,
    Analyzing,
    Translating,
}

impl LoadingStage {
    pub fn message_key(&self) -> MessageKey {
        match self {
            LoadingStage::VerifyingImage => MessageKey::VerifyingImage,
            LoadingStage::Analyzing => MessageKey::AnalyzingMessage,
            LoadingStage::Translating => MessageKey::TranslatingMessage,
        }
    }
}

/// メイン表示の状態
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Display<'a> {
    Idle,
    ImageSelected(&'a PendingImage),
    Loading(LoadingStage),
    Error(AnalysisFailure),
    Displaying(&'a AnalysisRecord),
}

#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    generation: u64,
    image: PendingImage,
    language: Language,
}

impl AnalysisTicket {
    pub fn image(&self) -> &PendingImage {
        &self.image
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

#[derive(Debug, Clone)]
pub struct TranslationTicket {
    generation: u64,
    record_id: String,
    image: PendingImage,
    language: Language,
}

impl TranslationTicket {
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn image(&self) -> &PendingImage {
        &self.image
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// 新規作成された診断結果のID
    Created(String),
    Rejected(AnalysisFailure),
    /// 発行後に状況が変わったため破棄
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    Translated(String),
    Failed(AnalysisFailure),
    Discarded,
}

pub struct Orchestrator<S: HistoryStore> {
    store: S,
    history: Vec<AnalysisRecord>,
    language: Language,
    pending: Option<PendingImage>,
    current: Option<AnalysisRecord>,
    /// 画像選択で表示から外した診断結果（解析失敗時に戻す）
    previous: Option<AnalysisRecord>,
    error: Option<AnalysisFailure>,
    loading: Option<LoadingStage>,
    generation: u64,
    /// Some の間は選択モード
    selection: Option<BTreeSet<String>>,
    weather: LocationPanel<WeatherSnapshot>,
    tips: LocationPanel<TipsSnapshot>,
}

impl<S: HistoryStore> Orchestrator<S> {
    /// 履歴を読み込んで初期化（読み込み失敗は空の履歴として続行）
    pub fn new(store: S, language: Language) -> Self {
        let history = match store.load() {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!("failed to load analysis history, starting empty: {}", e);
                Vec::new()
            }
        };
        tracing::debug!("loaded {} analyses", history.len());

        Self {
            store,
            history,
            language,
            pending: None,
            current: None,
            previous: None,
            error: None,
            loading: None,
            generation: 0,
            selection: None,
            weather: LocationPanel::new(PanelKind::Weather),
            tips: LocationPanel::new(PanelKind::Tips),
        }
    }

    // =============================================
    // 参照
    // =============================================

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 新しい順
    pub fn history(&self) -> &[AnalysisRecord] {
        &self.history
    }

    pub fn find(&self, id: &str) -> Option<&AnalysisRecord> {
        self.history.iter().find(|r| r.id == id)
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn pending(&self) -> Option<&PendingImage> {
        self.pending.as_ref()
    }

    pub fn current(&self) -> Option<&AnalysisRecord> {
        self.current.as_ref()
    }

    pub fn error(&self) -> Option<AnalysisFailure> {
        self.error
    }

    pub fn loading(&self) -> Option<LoadingStage> {
        self.loading
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn is_translating(&self) -> bool {
        self.loading == Some(LoadingStage::Translating)
    }

    /// プレビュー画像（未解析画像を優先）
    pub fn preview_url(&self) -> Option<String> {
        self.pending
            .as_ref()
            .map(|p| p.data_url())
            .or_else(|| self.current.as_ref().map(|r| r.image_url.clone()))
    }

    pub fn display(&self) -> Display<'_> {
        if let Some(stage) = self.loading {
            return Display::Loading(stage);
        }
        if let Some(error) = self.error {
            return Display::Error(error);
        }
        if let Some(record) = &self.current {
            return Display::Displaying(record);
        }
        if let Some(image) = &self.pending {
            return Display::ImageSelected(image);
        }
        Display::Idle
    }

    pub fn weather(&self) -> &LocationPanel<WeatherSnapshot> {
        &self.weather
    }

    pub fn weather_mut(&mut self) -> &mut LocationPanel<WeatherSnapshot> {
        &mut self.weather
    }

    pub fn tips(&self) -> &LocationPanel<TipsSnapshot> {
        &self.tips
    }

    pub fn tips_mut(&mut self) -> &mut LocationPanel<TipsSnapshot> {
        &mut self.tips
    }

    // =============================================
    // 画像選択・解析
    // =============================================

    /// 画像を選択（表示中の診断結果とエラーは外す）
    pub fn select_image(&mut self, image: PendingImage) {
        if let Some(record) = self.current.take() {
            self.previous = Some(record);
        }
        self.pending = Some(image);
        self.error = None;
        self.bump_generation();
    }

    /// 解析を開始（画像がない、または処理中なら None）
    pub fn begin_analysis(&mut self) -> Option<AnalysisTicket> {
        if self.loading.is_some() {
            tracing::debug!("analysis suppressed: busy");
            return None;
        }
        let image = self.pending.clone()?;
        self.loading = Some(LoadingStage::VerifyingImage);
        self.error = None;
        Some(AnalysisTicket {
            generation: self.generation,
            image,
            language: self.language,
        })
    }

    /// 画像検証の結果を反映
    ///
    /// 診断に進めるなら Ok、そこで終了するなら結果を Err で返す
    pub fn verification_finished(
        &mut self,
        ticket: &AnalysisTicket,
        result: Result<PlantVerification, InferenceError>,
    ) -> Result<(), AnalysisOutcome> {
        if ticket.generation != self.generation {
            tracing::warn!("discarding stale verification result");
            self.loading = None;
            return Err(AnalysisOutcome::Discarded);
        }

        let verification = match result {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("plant verification failed: {}", e);
                return Err(self.fail_analysis(classify(&e)));
            }
        };
        if let Some(rejection) = verification.rejection() {
            tracing::info!(?rejection, "image rejected by verification");
            return Err(self.fail_analysis(rejection.into()));
        }

        self.loading = Some(LoadingStage::Analyzing);
        Ok(())
    }

    /// 診断結果を反映（成功なら履歴の先頭に追加して保存）
    pub fn complete_analysis(
        &mut self,
        ticket: AnalysisTicket,
        result: Result<RawDiagnosis, InferenceError>,
    ) -> AnalysisOutcome {
        self.loading = None;
        if ticket.generation != self.generation {
            tracing::warn!("discarding stale analysis result");
            return AnalysisOutcome::Discarded;
        }

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("analysis failed: {}", e);
                return self.fail_analysis(classify(&e));
            }
        };
        if let Some(rejection) = raw.rejection() {
            tracing::info!(?rejection, "image rejected by analysis");
            return self.fail_analysis(rejection.into());
        }

        let now = Utc::now();
        let id = self.next_id(now);
        let record = normalize_diagnosis(raw, &ticket.image, id.clone(), now, ticket.language);
        tracing::info!(id = %record.id, disease = %record.disease, "analysis created");

        self.history.insert(0, record.clone());
        self.persist();
        self.pending = None;
        self.previous = None;
        self.current = Some(record);
        AnalysisOutcome::Created(id)
    }

    /// 解析失敗（未解析画像は破棄し、選択前の診断結果があれば戻す）
    fn fail_analysis(&mut self, failure: AnalysisFailure) -> AnalysisOutcome {
        self.loading = None;
        self.error = Some(failure);
        self.pending = None;
        if self.current.is_none() {
            self.current = self.previous.take();
        }
        AnalysisOutcome::Rejected(failure)
    }

    /// 表示をすべてクリア
    pub fn clear(&mut self) {
        self.pending = None;
        self.current = None;
        self.previous = None;
        self.error = None;
        self.bump_generation();
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    // =============================================
    // 言語変更・再翻訳
    // =============================================

    /// 表示言語を変更し、必要なら再翻訳を開始
    pub fn set_language(&mut self, language: Language) -> Option<TranslationTicket> {
        if self.language != language {
            tracing::debug!(from = %self.language, to = %language, "language changed");
        }
        self.language = language;
        self.translation_due()
    }

    /// 表示中の診断結果の言語が表示言語と異なれば再翻訳を開始
    ///
    /// 処理中・未解析画像あり・選択モード中・エラー表示中は開始しない
    pub fn translation_due(&mut self) -> Option<TranslationTicket> {
        if self.loading.is_some() || self.pending.is_some() || self.selection.is_some() || self.error.is_some() {
            return None;
        }
        let record = self.current.as_ref()?;
        if record.language == self.language {
            return None;
        }

        let image = match PendingImage::from_data_url(&record.image_url) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(id = %record.id, "cannot re-translate stored image: {}", e);
                self.error = Some(AnalysisFailure::Generic);
                return None;
            }
        };

        let ticket = TranslationTicket {
            generation: self.generation,
            record_id: record.id.clone(),
            image,
            language: self.language,
        };
        self.loading = Some(LoadingStage::Translating);
        Some(ticket)
    }

    /// 再翻訳の結果を反映（ID・画像・作成日時は保持、履歴の同じIDを置き換え）
    pub fn complete_translation(
        &mut self,
        ticket: TranslationTicket,
        result: Result<RawDiagnosis, InferenceError>,
    ) -> TranslationOutcome {
        self.loading = None;
        let is_current = self.current.as_ref().map(|r| r.id.as_str()) == Some(ticket.record_id.as_str());
        if ticket.generation != self.generation || !is_current {
            tracing::warn!(id = %ticket.record_id, "discarding stale translation result");
            return TranslationOutcome::Discarded;
        }

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(id = %ticket.record_id, "translation failed: {}", e);
                let failure = classify(&e);
                self.error = Some(failure);
                return TranslationOutcome::Failed(failure);
            }
        };
        if let Some(rejection) = raw.rejection() {
            let failure = AnalysisFailure::from(rejection);
            self.error = Some(failure);
            return TranslationOutcome::Failed(failure);
        }

        let Some(current) = self.current.as_ref() else {
            return TranslationOutcome::Discarded;
        };
        let updated = apply_translation(current, raw, ticket.language);
        for entry in self.history.iter_mut().filter(|r| r.id == updated.id) {
            *entry = updated.clone();
        }
        self.persist();
        tracing::info!(id = %updated.id, language = %updated.language, "analysis translated");

        let id = updated.id.clone();
        self.current = Some(updated);
        TranslationOutcome::Translated(id)
    }

    // =============================================
    // 履歴
    // =============================================

    /// 履歴の診断結果を表示（見つからなければ false）
    pub fn select_from_history(&mut self, id: &str) -> bool {
        let Some(record) = self.find(id).cloned() else {
            return false;
        };
        self.current = Some(record);
        self.pending = None;
        self.previous = None;
        self.error = None;
        self.bump_generation();
        true
    }

    /// 履歴項目のクリック（選択モード中は選択の切り替え）
    pub fn pick_from_history(&mut self, id: &str) -> bool {
        if self.selection.is_some() {
            self.toggle_selected(id)
        } else {
            self.select_from_history(id)
        }
    }

    /// 指定IDを削除して保存、削除件数を返す
    pub fn delete(&mut self, ids: &[String]) -> usize {
        let before = self.history.len();
        self.history.retain(|r| !ids.contains(&r.id));
        let removed = before - self.history.len();
        if removed > 0 {
            self.persist();
            tracing::info!("deleted {} analyses", removed);
        }

        if self.current.as_ref().is_some_and(|r| ids.contains(&r.id)) {
            self.current = None;
            self.bump_generation();
        }
        if self.previous.as_ref().is_some_and(|r| ids.contains(&r.id)) {
            self.previous = None;
        }
        if let Some(selected) = self.selection.as_mut() {
            selected.retain(|id| !ids.contains(id));
        }
        removed
    }

    // =============================================
    // 選択モード
    // =============================================

    pub fn selection_mode(&self) -> bool {
        self.selection.is_some()
    }

    pub fn enter_selection_mode(&mut self) {
        if self.selection.is_none() {
            self.selection = Some(BTreeSet::new());
        }
    }

    /// 選択モードを終了（選択は破棄）
    pub fn exit_selection_mode(&mut self) {
        self.selection = None;
    }

    /// 選択の切り替え（選択モード外、または履歴にないIDなら false）
    pub fn toggle_selected(&mut self, id: &str) -> bool {
        if self.find(id).is_none() {
            return false;
        }
        let Some(selected) = self.selection.as_mut() else {
            return false;
        };
        if !selected.remove(id) {
            selected.insert(id.to_string());
        }
        true
    }

    /// 選択に追加（既に選択済みでも外さない）
    pub fn select(&mut self, id: &str) -> bool {
        if self.find(id).is_none() {
            return false;
        }
        let Some(selected) = self.selection.as_mut() else {
            return false;
        };
        selected.insert(id.to_string());
        true
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.as_ref().is_some_and(|s| s.contains(id))
    }

    /// 選択中の診断結果（履歴の順）
    pub fn selected_records(&self) -> Vec<&AnalysisRecord> {
        match &self.selection {
            Some(selected) => self.history.iter().filter(|r| selected.contains(&r.id)).collect(),
            None => Vec::new(),
        }
    }

    /// 選択中の診断結果を一括削除して選択モードを終了
    pub fn delete_selected(&mut self) -> usize {
        let ids: Vec<String> = self
            .selection
            .as_ref()
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        let removed = self.delete(&ids);
        self.exit_selection_mode();
        removed
    }

    // =============================================
    // 内部処理
    // =============================================

    fn bump_generation(&mut self) {
        self.generation += 1;
    }

    /// 作成時刻からIDを生成（同一ミリ秒の衝突には連番を付ける）
    fn next_id(&self, now: DateTime<Utc>) -> String {
        let base = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        if self.find(&base).is_none() {
            return base;
        }
        (2..)
            .map(|n| format!("{}-{}", base, n))
            .find(|candidate| self.find(candidate).is_none())
            .unwrap_or(base)
    }

    /// 保存失敗はログのみ
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.history) {
            tracing::warn!("failed to save analysis history: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistoryStore;

    fn orchestrator() -> Orchestrator<MemoryHistoryStore> {
        Orchestrator::new(MemoryHistoryStore::new(), Language::En)
    }

    #[test]
    fn test_initial_state_is_idle() {
        let orch = orchestrator();
        assert_eq!(orch.display(), Display::Idle);
        assert!(orch.history().is_empty());
        assert!(!orch.is_loading());
    }

    #[test]
    fn test_begin_analysis_requires_image() {
        let mut orch = orchestrator();
        assert!(orch.begin_analysis().is_none());

        orch.select_image(PendingImage::new("AAAA", "image/png"));
        assert!(matches!(orch.display(), Display::ImageSelected(_)));
        let ticket = orch.begin_analysis().unwrap();
        assert_eq!(ticket.language(), Language::En);
        assert_eq!(orch.display(), Display::Loading(LoadingStage::VerifyingImage));

        // 処理中は二重に開始できない
        assert!(orch.begin_analysis().is_none());
    }

    #[test]
    fn test_next_id_avoids_collision() {
        let mut orch = orchestrator();
        orch.select_image(PendingImage::new("AAAA", "image/png"));
        let ticket = orch.begin_analysis().unwrap();
        orch.verification_finished(&ticket, Ok(PlantVerification { is_plant: true, ..Default::default() }))
            .unwrap();
        orch.complete_analysis(ticket, Ok(RawDiagnosis::default()));

        let existing = orch.history()[0].clone();
        let id = orch.next_id(existing.timestamp);
        assert_ne!(id, existing.id);
        assert!(id.starts_with(&existing.id));
    }

    #[test]
    fn test_preview_prefers_pending_image() {
        let mut orch = orchestrator();
        assert!(orch.preview_url().is_none());
        orch.select_image(PendingImage::new("BBBB", "image/jpeg"));
        assert_eq!(orch.preview_url().unwrap(), "data:image/jpeg;base64,BBBB");
    }
}
