//! 位置情報の取得
//!
//! 端末の現在地を10秒のタイムアウト付きで取得する。
//! 取得できない場合は地名の手入力にフォールバックする（呼び出し側の責務）。

use crate::classifier::MessageKey;
use async_trait::async_trait;
use plant_doctor_common::{Coordinates, Location};
use std::time::Duration;
use thiserror::Error;

pub const LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationError {
    #[error("位置情報の利用が許可されていません")]
    PermissionDenied,

    #[error("現在地を取得できません")]
    PositionUnavailable,

    #[error("位置情報の取得がタイムアウトしました")]
    Timeout,
}

impl LocationError {
    pub fn message_key(&self) -> MessageKey {
        match self {
            LocationError::PermissionDenied => MessageKey::LocationPermissionDenied,
            LocationError::PositionUnavailable => MessageKey::LocationUnavailable,
            LocationError::Timeout => MessageKey::LocationTimeout,
        }
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// タイムアウト付きで現在地を取得
pub async fn acquire_location<L>(provider: &L, timeout: Duration) -> Result<Location, LocationError>
where
    L: LocationProvider + ?Sized,
{
    match tokio::time::timeout(timeout, provider.current_position()).await {
        Ok(Ok(coordinates)) => Ok(Location::Coordinates(coordinates)),
        Ok(Err(e)) => Err(e),
        Err(_) => {
            tracing::warn!("location request timed out after {:?}", timeout);
            Err(LocationError::Timeout)
        }
    }
}

/// 設定ファイルの既定地点を現在地として返す（CLI用）
#[derive(Debug, Clone, Default)]
pub struct ConfiguredLocation {
    coordinates: Option<Coordinates>,
}

impl ConfiguredLocation {
    pub fn new(coordinates: Option<Coordinates>) -> Self {
        Self { coordinates }
    }
}

#[async_trait]
impl LocationProvider for ConfiguredLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        self.coordinates.ok_or(LocationError::PositionUnavailable)
    }
}
