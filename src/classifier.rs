//! 失敗の分類とユーザー向けメッセージ
//!
//! 推論クライアントの失敗・ゲート判定の拒否をすべて AnalysisFailure に畳み込み、
//! 各分類を固定のメッセージキーに対応付ける。生のエラーメッセージは表示層に渡さない。

use crate::inference::InferenceError;
use plant_doctor_common::GateRejection;

/// 表示層に渡すメッセージキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    ErrorServiceUnavailable,
    ErrorNotAPlant,
    ErrorArtificialPlant,
    AnalysisFailed,
    LocationPermissionDenied,
    LocationUnavailable,
    LocationTimeout,
    WeatherErrorBody,
    TipsErrorBody,
    VerifyingImage,
    AnalyzingMessage,
    TranslatingMessage,
    GettingLocation,
    FetchingMessage,
}

impl MessageKey {
    /// 翻訳リソースのキー
    pub fn key(&self) -> &'static str {
        match self {
            MessageKey::ErrorServiceUnavailable => "errorServiceUnavailable",
            MessageKey::ErrorNotAPlant => "errorNotAPlant",
            MessageKey::ErrorArtificialPlant => "errorArtificialPlant",
            MessageKey::AnalysisFailed => "analysisFailed",
            MessageKey::LocationPermissionDenied => "locationPermissionDenied",
            MessageKey::LocationUnavailable => "locationUnavailable",
            MessageKey::LocationTimeout => "locationTimeout",
            MessageKey::WeatherErrorBody => "weatherErrorBody",
            MessageKey::TipsErrorBody => "tipsErrorBody",
            MessageKey::VerifyingImage => "verifyingImage",
            MessageKey::AnalyzingMessage => "analyzingMessage",
            MessageKey::TranslatingMessage => "translatingMessage",
            MessageKey::GettingLocation => "gettingLocation",
            MessageKey::FetchingMessage => "fetchingMessage",
        }
    }

    /// 英語の既定文言
    pub fn default_text(&self) -> &'static str {
        match self {
            MessageKey::ErrorServiceUnavailable => {
                "The analysis service is busy right now. Please try again in a few minutes."
            }
            MessageKey::ErrorNotAPlant => {
                "The image does not appear to contain a plant. Please take a photo of a plant."
            }
            MessageKey::ErrorArtificialPlant => {
                "This looks like an artificial plant. Please photograph a real plant."
            }
            MessageKey::AnalysisFailed => "The analysis failed. Please try again.",
            MessageKey::LocationPermissionDenied => {
                "Location access was denied. Search for your city instead."
            }
            MessageKey::LocationUnavailable => {
                "Your location is unavailable. Search for your city instead."
            }
            MessageKey::LocationTimeout => {
                "Getting your location took too long. Search for your city instead."
            }
            MessageKey::WeatherErrorBody => "Could not fetch the weather forecast.",
            MessageKey::TipsErrorBody => "Could not fetch planting advice.",
            MessageKey::VerifyingImage => "Verifying image...",
            MessageKey::AnalyzingMessage => "Analyzing...",
            MessageKey::TranslatingMessage => "Translating...",
            MessageKey::GettingLocation => "Getting location...",
            MessageKey::FetchingMessage => "Fetching...",
        }
    }
}

impl std::fmt::Display for MessageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.default_text())
    }
}

/// 解析の失敗分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisFailure {
    /// クォータ超過・レート制限（自動リトライしない）
    ServiceUnavailable,
    NotAPlant,
    ArtificialPlant,
    Generic,
}

impl AnalysisFailure {
    pub fn message_key(&self) -> MessageKey {
        match self {
            AnalysisFailure::ServiceUnavailable => MessageKey::ErrorServiceUnavailable,
            AnalysisFailure::NotAPlant => MessageKey::ErrorNotAPlant,
            AnalysisFailure::ArtificialPlant => MessageKey::ErrorArtificialPlant,
            AnalysisFailure::Generic => MessageKey::AnalysisFailed,
        }
    }
}

impl From<GateRejection> for AnalysisFailure {
    fn from(rejection: GateRejection) -> Self {
        match rejection {
            GateRejection::NotAPlant => AnalysisFailure::NotAPlant,
            GateRejection::ArtificialPlant => AnalysisFailure::ArtificialPlant,
        }
    }
}

/// 推論クライアントの失敗を分類
pub fn classify(error: &InferenceError) -> AnalysisFailure {
    match error {
        InferenceError::ServiceUnavailable => AnalysisFailure::ServiceUnavailable,
        InferenceError::Transport(_) | InferenceError::InvalidResponse(_) => AnalysisFailure::Generic,
    }
}
