//! 気象・栽培アドバイスのパネル状態
//!
//! 位置情報の取得 → 推論サービス呼び出し の2段階で、
//! 開いている間だけ結果を保持する。閉じると状態を破棄し、処理中の結果も捨てる。

use crate::classifier::MessageKey;
use crate::inference::InferenceError;
use crate::location::LocationError;
use plant_doctor_common::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Weather,
    Tips,
}

/// 読み込み中の段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelStage {
    Locating,
    Fetching,
}

impl PanelStage {
    pub fn message_key(&self) -> MessageKey {
        match self {
            PanelStage::Locating => MessageKey::GettingLocation,
            PanelStage::Fetching => MessageKey::FetchingMessage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelError {
    Location(LocationError),
    ServiceUnavailable,
    Failed,
}

impl PanelError {
    pub fn message_key(&self, kind: PanelKind) -> MessageKey {
        match (self, kind) {
            (PanelError::Location(e), _) => e.message_key(),
            (PanelError::ServiceUnavailable, _) => MessageKey::ErrorServiceUnavailable,
            (PanelError::Failed, PanelKind::Weather) => MessageKey::WeatherErrorBody,
            (PanelError::Failed, PanelKind::Tips) => MessageKey::TipsErrorBody,
        }
    }
}

impl From<&InferenceError> for PanelError {
    fn from(error: &InferenceError) -> Self {
        match error {
            InferenceError::ServiceUnavailable => PanelError::ServiceUnavailable,
            _ => PanelError::Failed,
        }
    }
}

/// 発行時点の世代を持つ呼び出しチケット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelTicket {
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct LocationPanel<T> {
    kind: PanelKind,
    open: bool,
    stage: Option<PanelStage>,
    error: Option<PanelError>,
    data: Option<T>,
    generation: u64,
}

impl<T> LocationPanel<T> {
    pub fn new(kind: PanelKind) -> Self {
        Self {
            kind,
            open: false,
            stage: None,
            error: None,
            data: None,
            generation: 0,
        }
    }

    pub fn kind(&self) -> PanelKind {
        self.kind
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn stage(&self) -> Option<PanelStage> {
        self.stage
    }

    pub fn is_loading(&self) -> bool {
        self.stage.is_some()
    }

    pub fn error(&self) -> Option<PanelError> {
        self.error
    }

    pub fn error_message(&self) -> Option<MessageKey> {
        self.error.map(|e| e.message_key(self.kind))
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// 失敗後は地名検索を提示する
    pub fn offers_manual_search(&self) -> bool {
        self.open && self.stage.is_none() && self.error.is_some()
    }

    /// パネルを開いて現在地の取得を始める（処理中なら None）
    pub fn open(&mut self) -> Option<PanelTicket> {
        if self.stage.is_some() {
            return None;
        }
        self.open = true;
        self.error = None;
        self.data = None;
        self.stage = Some(PanelStage::Locating);
        Some(self.next_ticket())
    }

    /// 地名を手入力して取得する
    pub fn manual_search(&mut self, place: &str) -> Option<(PanelTicket, Location)> {
        let place = place.trim();
        if self.stage.is_some() || place.is_empty() {
            return None;
        }
        self.open = true;
        self.error = None;
        self.data = None;
        self.stage = Some(PanelStage::Fetching);
        Some((self.next_ticket(), Location::Place(place.to_string())))
    }

    /// 現在地の取得結果を反映し、成功なら取得先を返す
    pub fn location_resolved(
        &mut self,
        ticket: &PanelTicket,
        result: Result<Location, LocationError>,
    ) -> Option<Location> {
        if !self.is_current(ticket) {
            return None;
        }
        match result {
            Ok(location) => {
                self.stage = Some(PanelStage::Fetching);
                Some(location)
            }
            Err(e) => {
                tracing::warn!(kind = ?self.kind, "location failed: {}", e);
                self.stage = None;
                self.error = Some(PanelError::Location(e));
                None
            }
        }
    }

    /// 推論サービスの結果を反映
    pub fn complete(&mut self, ticket: &PanelTicket, result: Result<T, InferenceError>) {
        if !self.is_current(ticket) {
            tracing::debug!(kind = ?self.kind, "discarding stale panel result");
            return;
        }
        self.stage = None;
        match result {
            Ok(data) => self.data = Some(data),
            Err(e) => {
                tracing::warn!(kind = ?self.kind, "panel request failed: {}", e);
                self.error = Some(PanelError::from(&e));
            }
        }
    }

    pub fn close(&mut self) {
        self.open = false;
        self.stage = None;
        self.error = None;
        self.data = None;
        self.generation += 1;
    }

    fn next_ticket(&mut self) -> PanelTicket {
        self.generation += 1;
        PanelTicket {
            generation: self.generation,
        }
    }

    fn is_current(&self, ticket: &PanelTicket) -> bool {
        self.open && ticket.generation == self.generation
    }
}
