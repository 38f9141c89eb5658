//! Gemini API連携
//!
//! generateContent を呼び出し、レスポンスのテキストを共通パーサーでパースする。
//! レート制限の判定（"RESOURCE_EXHAUSTED" 等の文字列マッチ）はこのモジュールだけで行う。

use super::{InferenceClient, InferenceError};
use crate::error::{PlantDoctorError, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use plant_doctor_common::{
    build_diagnosis_prompt, build_tips_prompt, build_verification_prompt, build_weather_prompt,
    parse_diagnosis_response, parse_tips_response, parse_verification_response, parse_weather_response,
    Language, Location, PendingImage, PlantVerification, RawDiagnosis, TipsSnapshot, WeatherSnapshot,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

lazy_static! {
    static ref RATE_LIMIT_PATTERN: Regex =
        Regex::new(r"(?i)RESOURCE_EXHAUSTED|quota|rate[ _-]?limit|too many requests|\b429\b")
            .expect("valid rate limit pattern");
}

/// Gemini APIリクエスト
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Gemini APIレスポンス
#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// プロバイダのエラーメッセージを分類
///
/// レート制限・クォータ超過に当たる文字列を含めば ServiceUnavailable
pub fn classify_failure_message(message: &str) -> InferenceError {
    if RATE_LIMIT_PATTERN.is_match(message) {
        InferenceError::ServiceUnavailable
    } else {
        InferenceError::Transport(message.to_string())
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlantDoctorError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, self.model)
    }

    /// generateContent 呼び出し（共通処理）
    async fn generate(&self, parts: Vec<Part>) -> std::result::Result<String, InferenceError> {
        let request = GeminiRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_failure_message(&e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(%status, "gemini error body: {}", body);
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(InferenceError::ServiceUnavailable);
            }
            return Err(classify_failure_message(&format!("API error {}: {}", status, body)));
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.without_url().to_string()))?;

        let text = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| InferenceError::InvalidResponse("Empty response".into()))?;

        tracing::debug!("gemini response: {} chars", text.len());
        Ok(text)
    }

    fn image_parts(prompt: String, image: &PendingImage) -> Vec<Part> {
        vec![
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.base64.clone(),
                },
            },
            Part::Text { text: prompt },
        ]
    }
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn verify_plant(&self, image: &PendingImage) -> std::result::Result<PlantVerification, InferenceError> {
        tracing::debug!(mime = %image.mime_type, bytes = image.approx_size(), "verify plant");
        let text = self.generate(Self::image_parts(build_verification_prompt(), image)).await?;
        Ok(parse_verification_response(&text)?)
    }

    async fn analyze(&self, image: &PendingImage, language: Language) -> std::result::Result<RawDiagnosis, InferenceError> {
        tracing::debug!(mime = %image.mime_type, %language, "analyze plant");
        let text = self
            .generate(Self::image_parts(build_diagnosis_prompt(language), image))
            .await?;
        Ok(parse_diagnosis_response(&text)?)
    }

    async fn weather(&self, location: &Location, language: Language) -> std::result::Result<WeatherSnapshot, InferenceError> {
        let prompt = build_weather_prompt(location, language);
        let text = self.generate(vec![Part::Text { text: prompt }]).await?;
        Ok(parse_weather_response(&text)?)
    }

    async fn agricultural_tips(&self, location: &Location, language: Language) -> std::result::Result<TipsSnapshot, InferenceError> {
        let prompt = build_tips_prompt(location, language);
        let text = self.generate(vec![Part::Text { text: prompt }]).await?;
        Ok(parse_tips_response(&text)?)
    }
}
