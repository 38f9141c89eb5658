use crate::error::{PlantDoctorError, Result};
use plant_doctor_common::{Coordinates, Language};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub language: Language,
    pub timeout_seconds: u64,
    /// 一括出力の各件の間隔
    pub export_pause_ms: u64,
    pub history_path: Option<PathBuf>,
    /// CLIで「現在地」として使う地点
    pub home_location: Option<Coordinates>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            language: Language::En,
            timeout_seconds: 120,
            export_pause_ms: 500,
            history_path: None,
            home_location: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PlantDoctorError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("plant-doctor"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn history_path(&self) -> Result<PathBuf> {
        match &self.history_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("history.json")),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn export_pause(&self) -> Duration {
        Duration::from_millis(self.export_pause_ms)
    }

    pub fn get_api_key(&self) -> Result<String> {
        // 環境変数を優先
        for var in ["GEMINI_API_KEY", "API_KEY"] {
            if let Ok(key) = std::env::var(var) {
                if !key.trim().is_empty() {
                    return Ok(key);
                }
            }
        }

        self.api_key.clone().ok_or(PlantDoctorError::MissingApiKey)
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    pub fn set_language(&mut self, language: Language) -> Result<()> {
        self.language = language;
        self.save()
    }

    pub fn set_home_location(&mut self, coordinates: Coordinates) -> Result<()> {
        self.home_location = Some(coordinates);
        self.save()
    }
}

/// "31.95,35.91" 形式の座標をパース
pub fn parse_coordinates(value: &str) -> std::result::Result<Coordinates, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("Expected LAT,LON but got: {}", value))?;
    let latitude: f64 = lat.trim().parse().map_err(|_| format!("Invalid latitude: {}", lat))?;
    let longitude: f64 = lon.trim().parse().map_err(|_| format!("Invalid longitude: {}", lon))?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("Coordinates out of range: {}", value));
    }
    Ok(Coordinates { latitude, longitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.language, Language::En);
        assert_eq!(config.export_pause(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"language": "ar"}"#).unwrap();
        assert_eq!(config.language, Language::Ar);
        assert_eq!(config.timeout_seconds, 120);
        assert!(config.home_location.is_none());
    }

    #[test]
    fn test_history_path_override() {
        let config = Config {
            history_path: Some(PathBuf::from("/tmp/h.json")),
            ..Config::default()
        };
        assert_eq!(config.history_path().unwrap(), PathBuf::from("/tmp/h.json"));
    }

    #[test]
    fn test_parse_coordinates() {
        let c = parse_coordinates("31.95, 35.91").unwrap();
        assert_eq!(c.latitude, 31.95);
        assert_eq!(c.longitude, 35.91);
        assert!(parse_coordinates("31.95").is_err());
        assert!(parse_coordinates("abc,1").is_err());
        assert!(parse_coordinates("91,0").is_err());
    }
}
