use thiserror::Error;

/// geokey 的统一错误类型
///
/// 编解码本身不会失败，错误只出现在边界：坐标校验、请求校验、订阅通道和配置加载。
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("invalid latitude {0}: must be a finite value within [-90, 90]")]
    InvalidLatitude(f64),

    #[error("invalid longitude {0}: must be a finite value within [-180, 180]")]
    InvalidLongitude(f64),

    #[error("invalid radius {0} km: must be a finite, non-negative value")]
    InvalidRadius(f64),

    #[error("change feed closed")]
    FeedClosed,

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GeoError>;
