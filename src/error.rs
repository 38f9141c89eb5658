use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlantDoctorError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`plant-doctor config --set-api-key YOUR_KEY` で設定するか、GEMINI_API_KEY を指定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("対応していない画像形式です: {0}")]
    UnsupportedImage(String),

    #[error("履歴に診断が見つかりません: {0}")]
    RecordNotFound(String),

    #[error("履歴ファイルのバージョンに対応していません: {0}")]
    HistoryVersion(u32),

    #[error("出力エラー: {0}")]
    Export(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] plant_doctor_common::Error),
}

pub type Result<T> = std::result::Result<T, PlantDoctorError>;
