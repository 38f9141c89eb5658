//! Plant Doctor Common Library
//!
//! 推論サービスに依存しない型・プロンプト・パーサー・正規化処理

pub mod types;
pub mod error;
pub mod image;
pub mod parser;
pub mod prompts;
pub mod normalizer;

pub use types::{
    AnalysisRecord, Coordinates, ForecastDay, GateRejection, Language, Location, PlantCategory,
    PlantSuggestion, PlantVerification, RawDiagnosis, RawTreatment, SeverityBand, SuggestedProduct,
    TipsSnapshot, Treatment, TreatmentKind, WeatherSnapshot,
};
pub use error::{Error, Result};
pub use image::PendingImage;
pub use parser::{
    extract_json, parse_diagnosis_response, parse_tips_response, parse_verification_response,
    parse_weather_response,
};
pub use prompts::{
    build_diagnosis_prompt, build_tips_prompt, build_verification_prompt, build_weather_prompt,
    FORECAST_DAYS,
};
pub use normalizer::{apply_translation, normalize_diagnosis};
