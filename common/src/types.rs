//! 診断結果・気象・栽培アドバイスの型定義
//!
//! CLIとライブラリで共有される型:
//! - RawDiagnosis: 推論サービスの生出力（ゲートフラグ付き）
//! - AnalysisRecord: 正規化済みで履歴に保存される診断結果
//! - WeatherSnapshot / TipsSnapshot: 位置情報ベースの補助機能の出力

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 表示言語
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    pub const SUPPORTED: [Language; 2] = [Language::En, Language::Ar];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
        }
    }

    /// プロンプトに埋め込む言語名
    pub fn english_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ar => "Arabic",
        }
    }

    /// 右から左に書く言語か
    pub fn is_rtl(&self) -> bool {
        matches!(self, Language::Ar)
    }

    /// 言語コードから変換（未対応はEnにフォールバック）
    ///
    /// "ar-JO" のような地域付きコードも受け付ける
    pub fn from_code(code: &str) -> Language {
        code.parse().unwrap_or_default()
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s
            .trim()
            .split(|c| c == '-' || c == '_')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        match primary.as_str() {
            "en" | "english" => Ok(Language::En),
            "ar" | "arabic" => Ok(Language::Ar),
            _ => Err(format!("Unsupported language: {}. Use en or ar", s)),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// 治療法の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreatmentKind {
    Chemical,
    Biological,
}

impl TreatmentKind {
    /// 推論サービスが返す自由記述のラベルから種別を判定
    ///
    /// "chem" を含むか、アラビア語の「كيميائي」を含めば化学的、それ以外は生物的
    pub fn classify(label: &str) -> TreatmentKind {
        if label.to_lowercase().contains("chem") || label.contains("كيميائي") {
            TreatmentKind::Chemical
        } else {
            TreatmentKind::Biological
        }
    }
}

/// 推奨製品
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuggestedProduct {
    pub name: String,
    pub scientific_name: String,
    pub active_ingredient: String,
}

/// 治療法（正規化済み）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Treatment {
    #[serde(rename = "type")]
    pub kind: TreatmentKind,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub suggested_products: Vec<SuggestedProduct>,
}

/// 治療法（推論サービスの生出力）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTreatment {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub suggested_products: Option<Vec<SuggestedProduct>>,
}

/// ゲート判定で画像が拒否された理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    NotAPlant,
    ArtificialPlant,
}

/// 画像検証ステップの出力
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlantVerification {
    pub is_plant: bool,
    pub is_artificial_plant: bool,
    pub is_insect: bool,
}

impl PlantVerification {
    /// ゲート判定
    ///
    /// 害虫の写真は植物でなくても診断対象として通す
    pub fn rejection(&self) -> Option<GateRejection> {
        gate(Some(self.is_plant), Some(self.is_artificial_plant), Some(self.is_insect))
    }
}

/// 診断ステップの出力（ゲートフラグ付き、未正規化）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDiagnosis {
    pub is_plant: Option<bool>,
    pub is_artificial_plant: Option<bool>,
    pub is_insect: Option<bool>,
    pub disease: String,
    pub disease_classification: String,
    pub description: String,
    pub treatments: Option<Vec<RawTreatment>>,
    pub severity_level: Option<f64>,
    pub severity_description: String,
    pub image_quality_score: Option<f64>,
    pub image_quality_description: String,
}

impl RawDiagnosis {
    /// ゲート判定（フラグが欠けている場合は拒否しない）
    pub fn rejection(&self) -> Option<GateRejection> {
        gate(self.is_plant, self.is_artificial_plant, self.is_insect)
    }
}

fn gate(is_plant: Option<bool>, is_artificial: Option<bool>, is_insect: Option<bool>) -> Option<GateRejection> {
    let insect = is_insect.unwrap_or(false);
    if is_plant == Some(false) && !insect {
        return Some(GateRejection::NotAPlant);
    }
    if is_artificial == Some(true) {
        return Some(GateRejection::ArtificialPlant);
    }
    None
}

/// 深刻度の区分（表示用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityBand {
    Low,
    Moderate,
    High,
}

impl SeverityBand {
    pub fn from_level(level: u8) -> SeverityBand {
        match level {
            0..=3 => SeverityBand::Low,
            4..=7 => SeverityBand::Moderate,
            _ => SeverityBand::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityBand::Low => "low",
            SeverityBand::Moderate => "moderate",
            SeverityBand::High => "high",
        }
    }
}

/// 診断結果（履歴に保存される形）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    /// 作成時刻から生成したID（変更不可）
    pub id: String,

    /// 埋め込み画像（data URL、そのまま保存）
    pub image_url: String,

    pub timestamp: DateTime<Utc>,

    /// テキスト項目が書かれている言語
    pub language: Language,

    pub disease: String,
    pub disease_classification: String,
    pub description: String,

    #[serde(default)]
    pub treatments: Vec<Treatment>,

    /// 0-10
    pub severity_level: u8,
    pub severity_description: String,

    /// 1-10
    pub image_quality_score: u8,
    pub image_quality_description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_insect: Option<bool>,
}

impl AnalysisRecord {
    pub fn severity_band(&self) -> SeverityBand {
        SeverityBand::from_level(self.severity_level)
    }
}

/// 緯度経度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// 気象・栽培アドバイスの対象地点
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Coordinates(Coordinates),
    /// 手入力の地名
    Place(String),
}

impl Location {
    /// プロンプト用の地点表現
    pub fn describe(&self) -> String {
        match self {
            Location::Coordinates(c) => {
                format!("latitude {:.4}, longitude {:.4}", c.latitude, c.longitude)
            }
            Location::Place(name) => name.clone(),
        }
    }
}

/// 日別予報
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastDay {
    pub day: String,
    pub min_temp: f64,
    pub max_temp: f64,
    pub condition: String,
}

/// 気象情報
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSnapshot {
    pub current_temp: f64,
    pub condition: String,
    pub humidity: f64,
    pub wind_speed: f64,
    pub agricultural_summary: String,
    pub forecast: Vec<ForecastDay>,
}

/// 栽培提案の区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlantCategory {
    #[serde(alias = "productive")]
    Productive,
    #[serde(alias = "ornamental")]
    Ornamental,
}

/// 栽培提案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantSuggestion {
    pub plant_name: String,
    #[serde(default)]
    pub planting_advice: String,
    #[serde(default)]
    pub productivity_outlook: String,
    pub category: PlantCategory,
}

/// 地域の栽培アドバイス
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TipsSnapshot {
    pub summary: String,
    pub suggestions: Vec<PlantSuggestion>,
}
