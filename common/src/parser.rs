//! APIレスポンスパーサー
//!
//! 推論サービスのレスポンスからJSONオブジェクトを抽出し、
//! 検証・診断・気象・栽培アドバイスの各結果をパースする

use crate::error::{Error, Result};
use crate::types::{PlantVerification, RawDiagnosis, TipsSnapshot, WeatherSnapshot};
use serde::de::DeserializeOwned;

/// APIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. エラー
///
/// # Examples
/// ```
/// use plant_doctor_common::extract_json;
///
/// let response = "Result: {\"disease\": \"Rust\"}";
/// let json = extract_json(response).unwrap();
/// assert_eq!(json, "{\"disease\": \"Rust\"}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    // 生の {...} を探す
    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSON object not found".into()))
}

fn parse_object<T: DeserializeOwned>(response: &str, label: &str) -> Result<T> {
    let json_str = extract_json(response)?;
    serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("{} JSON parse error: {}", label, e)))
}

/// 画像検証レスポンスをパース
pub fn parse_verification_response(response: &str) -> Result<PlantVerification> {
    parse_object(response, "verification")
}

/// 診断レスポンスをパース
pub fn parse_diagnosis_response(response: &str) -> Result<RawDiagnosis> {
    parse_object(response, "diagnosis")
}

/// 気象レスポンスをパース
pub fn parse_weather_response(response: &str) -> Result<WeatherSnapshot> {
    parse_object(response, "weather")
}

/// 栽培アドバイスレスポンスをパース
pub fn parse_tips_response(response: &str) -> Result<TipsSnapshot> {
    parse_object(response, "tips")
}
