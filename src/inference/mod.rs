//! 推論サービス連携
//!
//! 画像検証・病害診断・気象・栽培アドバイスを外部の推論サービスに委譲する。
//! 失敗は閉じた列挙型 InferenceError で返し、プロバイダ固有のメッセージ判定は
//! 各アダプタの中だけで行う。

mod gemini;

pub use gemini::{classify_failure_message, GeminiClient};

use async_trait::async_trait;
use std::sync::Arc;
use plant_doctor_common::{
    Language, Location, PendingImage, PlantVerification, RawDiagnosis, TipsSnapshot, WeatherSnapshot,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// クォータ超過・レート制限
    #[error("推論サービスが利用できません（レート制限）")]
    ServiceUnavailable,

    #[error("推論リクエストに失敗: {0}")]
    Transport(String),

    #[error("推論レスポンスが不正: {0}")]
    InvalidResponse(String),
}

impl From<plant_doctor_common::Error> for InferenceError {
    fn from(err: plant_doctor_common::Error) -> Self {
        InferenceError::InvalidResponse(err.to_string())
    }
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// 画像の被写体を判定（植物か・造花か・害虫か）
    async fn verify_plant(&self, image: &PendingImage) -> Result<PlantVerification, InferenceError>;

    /// 病害診断（テキスト項目は language で出力）
    async fn analyze(&self, image: &PendingImage, language: Language) -> Result<RawDiagnosis, InferenceError>;

    async fn weather(&self, location: &Location, language: Language) -> Result<WeatherSnapshot, InferenceError>;

    async fn agricultural_tips(&self, location: &Location, language: Language) -> Result<TipsSnapshot, InferenceError>;
}

#[async_trait]
impl<T: InferenceClient + ?Sized> InferenceClient for Arc<T> {
    async fn verify_plant(&self, image: &PendingImage) -> Result<PlantVerification, InferenceError> {
        (**self).verify_plant(image).await
    }

    async fn analyze(&self, image: &PendingImage, language: Language) -> Result<RawDiagnosis, InferenceError> {
        (**self).analyze(image, language).await
    }

    async fn weather(&self, location: &Location, language: Language) -> Result<WeatherSnapshot, InferenceError> {
        (**self).weather(location, language).await
    }

    async fn agricultural_tips(&self, location: &Location, language: Language) -> Result<TipsSnapshot, InferenceError> {
        (**self).agricultural_tips(location, language).await
    }
}
