//! プロンプト生成モジュール
//!
//! - build_verification_prompt: 画像検証（植物か・造花か・害虫か）
//! - build_diagnosis_prompt: 病害診断と治療計画
//! - build_weather_prompt: 気象情報と農業向け要約
//! - build_tips_prompt: 地域の栽培アドバイス

use crate::types::{Language, Location};

/// 気象予報の日数（固定）
pub const FORECAST_DAYS: usize = 3;

fn language_rule(language: Language) -> String {
    format!(
        "All text values in the JSON must be written in {} (language code \"{}\").",
        language.english_name(),
        language.code()
    )
}

/// 画像検証プロンプト
pub fn build_verification_prompt() -> String {
    r#"Look at the provided image and classify its subject. Output ONLY a JSON object, no markdown, no explanations.

{
  "isPlant": true/false (the main subject is a real plant or part of a plant),
  "isArtificialPlant": true/false (the plant is fake, plastic, silk, printed, or drawn),
  "isInsect": true/false (the main subject is an insect or pest that attacks plants)
}"#
    .to_string()
}

/// 病害診断プロンプト
///
/// # Arguments
/// * `language` - テキスト項目の出力言語
pub fn build_diagnosis_prompt(language: Language) -> String {
    format!(
        r#"You are an expert plant pathologist with specialized knowledge of agriculture in Jordan.
Analyze the provided image and return a diagnosis and treatment plan.
{rule}

## Output format (strictly this JSON object, nothing outside it)
{{
  "isPlant": true/false,
  "isArtificialPlant": true/false,
  "isInsect": true/false,
  "disease": "name of the disease; say the plant is healthy if it is, or that it cannot be determined",
  "diseaseClassification": "Fungal, Bacterial, Viral, Insect Pest, Nutrient Deficiency, Environmental Stress, ...",
  "description": "symptoms and causes as bullet points (\"- Symptom\n- Cause\")",
  "treatments": [
    {{
      "type": "Chemical" or "Biological",
      "description": "numbered steps (\"1. First\n2. Second\")",
      "suggestedProducts": [
        {{"name": "commercial product available in Jordan", "scientificName": "scientific name of the active ingredient", "activeIngredient": "main active ingredient"}}
      ]
    }}
  ],
  "severityLevel": integer 0-10 (0 healthy, 10 extremely high risk),
  "severityDescription": "short justification of the severity",
  "imageQualityScore": integer 1-10,
  "imageQualityDescription": "how image quality affected the diagnosis"
}}

## Rules
- Keep the "type" value in English ("Chemical" or "Biological") regardless of language.
- For "Chemical" treatments of an identified disease, "suggestedProducts" is mandatory with 2-3 products.
- For "Biological" treatments, describe natural or organic methods; "suggestedProducts" may be empty.
- If the subject is an insect, diagnose the pest and its damage instead of a disease."#,
        rule = language_rule(language),
    )
}

/// 気象プロンプト
pub fn build_weather_prompt(location: &Location, language: Language) -> String {
    format!(
        r#"Act as a weather service for farmers. Estimate the current weather and a {days}-day forecast for: {place}.
{rule}

## Output format (strictly this JSON object, nothing outside it)
{{
  "current_temp": number (Celsius),
  "condition": "short description",
  "humidity": number (percent),
  "wind_speed": number (km/h),
  "agricultural_summary": "one paragraph of advice for farmers given this weather",
  "forecast": [
    {{"day": "day name", "min_temp": number, "max_temp": number, "condition": "short description"}}
  ]
}}

The "forecast" array must contain exactly {days} entries starting tomorrow."#,
        days = FORECAST_DAYS,
        place = location.describe(),
        rule = language_rule(language),
    )
}

/// 栽培アドバイスプロンプト
pub fn build_tips_prompt(location: &Location, language: Language) -> String {
    format!(
        r#"You are an agricultural advisor. Considering the current season and the typical climate of: {place},
suggest what to plant now.
{rule}

## Output format (strictly this JSON object, nothing outside it)
{{
  "summary": "general overview of the growing conditions",
  "suggestions": [
    {{
      "plantName": "plant name",
      "plantingAdvice": "how and when to plant",
      "productivityOutlook": "expected yield or growth",
      "category": "Productive" or "Ornamental"
    }}
  ]
}}

Keep "category" in English. Give 4-6 suggestions mixing both categories."#,
        place = location.describe(),
        rule = language_rule(language),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinates;

    #[test]
    fn test_diagnosis_prompt_language() {
        let en = build_diagnosis_prompt(Language::En);
        assert!(en.contains("written in English"));
        assert!(en.contains("\"isArtificialPlant\""));
        assert!(en.contains("\"imageQualityScore\""));

        let ar = build_diagnosis_prompt(Language::Ar);
        assert!(ar.contains("written in Arabic"));
        assert!(ar.contains("\"ar\""));
    }

    #[test]
    fn test_verification_prompt_fields() {
        let prompt = build_verification_prompt();
        assert!(prompt.contains("\"isPlant\""));
        assert!(prompt.contains("\"isInsect\""));
    }

    #[test]
    fn test_weather_prompt_location() {
        let loc = Location::Coordinates(Coordinates { latitude: 32.0, longitude: 35.9 });
        let prompt = build_weather_prompt(&loc, Language::En);
        assert!(prompt.contains("latitude 32.0000"));
        assert!(prompt.contains("exactly 3 entries"));
    }

    #[test]
    fn test_tips_prompt_place() {
        let prompt = build_tips_prompt(&Location::Place("Madaba".into()), Language::Ar);
        assert!(prompt.contains("Madaba"));
        assert!(prompt.contains("Arabic"));
        assert!(prompt.contains("\"Ornamental\""));
    }
}
