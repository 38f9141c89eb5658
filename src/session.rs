//! 非同期セッション
//!
//! Orchestrator の状態遷移と推論サービス・位置情報の呼び出しを組み合わせる。
//! 呼び出しは1つずつ順番に行い、各操作の後に再翻訳が必要か確認する。

use crate::classifier::MessageKey;
use crate::history::HistoryStore;
use crate::inference::InferenceClient;
use crate::location::{acquire_location, LocationProvider, LOCATION_TIMEOUT};
use crate::orchestrator::{AnalysisOutcome, Orchestrator, TranslationOutcome, TranslationTicket};
use plant_doctor_common::{Language, PendingImage};
use std::time::Duration;

type ProgressFn = Box<dyn Fn(MessageKey) + Send + Sync>;

pub struct Session<C, L, S>
where
    C: InferenceClient,
    L: LocationProvider,
    S: HistoryStore,
{
    orchestrator: Orchestrator<S>,
    client: C,
    locator: L,
    location_timeout: Duration,
    on_progress: Option<ProgressFn>,
}

impl<C, L, S> Session<C, L, S>
where
    C: InferenceClient,
    L: LocationProvider,
    S: HistoryStore,
{
    pub fn new(orchestrator: Orchestrator<S>, client: C, locator: L) -> Self {
        Self {
            orchestrator,
            client,
            locator,
            location_timeout: LOCATION_TIMEOUT,
            on_progress: None,
        }
    }

    pub fn with_location_timeout(mut self, timeout: Duration) -> Self {
        self.location_timeout = timeout;
        self
    }

    /// 読み込み段階が変わるたびに呼ばれるコールバック
    pub fn with_progress(mut self, on_progress: impl Fn(MessageKey) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator<S> {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator<S> {
        &mut self.orchestrator
    }

    pub fn into_orchestrator(self) -> Orchestrator<S> {
        self.orchestrator
    }

    fn progress(&self, key: MessageKey) {
        if let Some(on_progress) = &self.on_progress {
            on_progress(key);
        }
    }

    // =============================================
    // 解析
    // =============================================

    pub fn select_image(&mut self, image: PendingImage) {
        self.orchestrator.select_image(image);
    }

    /// 画像検証 → 診断（開始できなければ None）
    pub async fn analyze(&mut self) -> Option<AnalysisOutcome> {
        let ticket = self.orchestrator.begin_analysis()?;

        self.progress(MessageKey::VerifyingImage);
        let verification = self.client.verify_plant(ticket.image()).await;
        if let Err(outcome) = self.orchestrator.verification_finished(&ticket, verification) {
            return Some(outcome);
        }

        self.progress(MessageKey::AnalyzingMessage);
        let result = self.client.analyze(ticket.image(), ticket.language()).await;
        let outcome = self.orchestrator.complete_analysis(ticket, result);

        self.sync_language().await;
        Some(outcome)
    }

    // =============================================
    // 言語・履歴
    // =============================================

    /// 表示言語を変更（表示中の診断結果は再解析で翻訳）
    pub async fn set_language(&mut self, language: Language) -> Option<TranslationOutcome> {
        let ticket = self.orchestrator.set_language(language);
        self.run_translation(ticket).await
    }

    /// 表示中の診断結果が表示言語と異なれば再翻訳
    pub async fn sync_language(&mut self) -> Option<TranslationOutcome> {
        let ticket = self.orchestrator.translation_due();
        self.run_translation(ticket).await
    }

    async fn run_translation(&mut self, ticket: Option<TranslationTicket>) -> Option<TranslationOutcome> {
        let ticket = ticket?;
        self.progress(MessageKey::TranslatingMessage);
        let result = self.client.analyze(ticket.image(), ticket.language()).await;
        Some(self.orchestrator.complete_translation(ticket, result))
    }

    /// 履歴項目を選ぶ（言語が異なればそのまま再翻訳）
    pub async fn pick_from_history(&mut self, id: &str) -> Option<TranslationOutcome> {
        if !self.orchestrator.pick_from_history(id) {
            return None;
        }
        self.sync_language().await
    }

    pub async fn dismiss_error(&mut self) -> Option<TranslationOutcome> {
        self.orchestrator.dismiss_error();
        self.sync_language().await
    }

    // =============================================
    // 気象・栽培アドバイス
    // =============================================

    /// 気象パネルを開く（現在地 → 気象情報）
    pub async fn open_weather(&mut self) {
        let Some(ticket) = self.orchestrator.weather_mut().open() else {
            return;
        };
        self.progress(MessageKey::GettingLocation);
        let located = acquire_location(&self.locator, self.location_timeout).await;
        let Some(location) = self.orchestrator.weather_mut().location_resolved(&ticket, located) else {
            return;
        };

        self.progress(MessageKey::FetchingMessage);
        let result = self.client.weather(&location, self.orchestrator.language()).await;
        self.orchestrator.weather_mut().complete(&ticket, result);
    }

    /// 地名を指定して気象情報を取得
    pub async fn search_weather(&mut self, place: &str) {
        let Some((ticket, location)) = self.orchestrator.weather_mut().manual_search(place) else {
            return;
        };
        self.progress(MessageKey::FetchingMessage);
        let result = self.client.weather(&location, self.orchestrator.language()).await;
        self.orchestrator.weather_mut().complete(&ticket, result);
    }

    /// 栽培アドバイスパネルを開く（現在地 → アドバイス）
    pub async fn open_tips(&mut self) {
        let Some(ticket) = self.orchestrator.tips_mut().open() else {
            return;
        };
        self.progress(MessageKey::GettingLocation);
        let located = acquire_location(&self.locator, self.location_timeout).await;
        let Some(location) = self.orchestrator.tips_mut().location_resolved(&ticket, located) else {
            return;
        };

        self.progress(MessageKey::FetchingMessage);
        let result = self.client.agricultural_tips(&location, self.orchestrator.language()).await;
        self.orchestrator.tips_mut().complete(&ticket, result);
    }

    /// 地名を指定して栽培アドバイスを取得
    pub async fn search_tips(&mut self, place: &str) {
        let Some((ticket, location)) = self.orchestrator.tips_mut().manual_search(place) else {
            return;
        };
        self.progress(MessageKey::FetchingMessage);
        let result = self.client.agricultural_tips(&location, self.orchestrator.language()).await;
        self.orchestrator.tips_mut().complete(&ticket, result);
    }
}
