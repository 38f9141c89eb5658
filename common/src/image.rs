//! 未解析画像とdata URLの相互変換

use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// 撮影・アップロード済みで未解析の画像
///
/// 解析またはクリアまでの間だけ存在し、単独では保存されない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub base64: String,
    pub mime_type: String,
}

impl PendingImage {
    pub fn new(base64: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
            mime_type: mime_type.into(),
        }
    }

    /// 生バイト列から作成
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        Self::new(STANDARD.encode(bytes), mime_type)
    }

    /// "data:image/jpeg;base64,/9j/..." 形式から復元
    ///
    /// 履歴に保存された画像を再解析（翻訳）するときに使う
    pub fn from_data_url(data_url: &str) -> Result<Self> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| Error::InvalidDataUrl("missing data: prefix".into()))?;
        let (mime_type, base64) = rest
            .split_once(";base64,")
            .ok_or_else(|| Error::InvalidDataUrl("missing ;base64, marker".into()))?;

        if !mime_type.starts_with("image/") {
            return Err(Error::InvalidDataUrl(format!("not an image: {}", mime_type)));
        }
        if base64.is_empty() {
            return Err(Error::InvalidDataUrl("empty payload".into()));
        }

        Ok(Self::new(base64, mime_type))
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }

    /// デコード後のおおよそのバイト数
    pub fn approx_size(&self) -> usize {
        self.base64.len() / 4 * 3
    }
}
