use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{GeoError, Result};
use crate::geohash::precision_for_radius;

/// geokey 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoKeyConfig {
    /// 索引配置
    pub index: IndexConfig,

    /// 订阅配置
    pub feed: FeedConfig,

    /// 日志配置
    pub logging: LoggingConfig,
}

/// 索引配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// 实体写入索引时使用的 geohash 精度
    #[serde(default = "default_entity_precision")]
    pub entity_precision: usize,

    /// 允许的最大精度
    #[serde(default = "default_max_precision")]
    pub max_precision: usize,
}

/// 订阅配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// 订阅通道容量，消费者落后超过该值时订阅被丢弃
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// 观察半径（公里），决定订阅前缀长度
    #[serde(default = "default_watch_radius_km")]
    pub watch_radius_km: f64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别：trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 日志输出：stdout, stderr, file
    #[serde(default = "default_log_output")]
    pub output: String,

    /// 日志文件路径（当 output = file 时）
    pub log_file: Option<PathBuf>,
}

// ============================================================================
// 默认值函数
// ============================================================================

fn default_entity_precision() -> usize {
    10
}

fn default_max_precision() -> usize {
    12
}

fn default_channel_capacity() -> usize {
    256
}

fn default_watch_radius_km() -> f64 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_output() -> String {
    "stderr".to_string()
}

// ============================================================================
// 实现
// ============================================================================

impl Default for GeoKeyConfig {
    fn default() -> Self {
        Self {
            index: IndexConfig {
                entity_precision: default_entity_precision(),
                max_precision: default_max_precision(),
            },
            feed: FeedConfig {
                channel_capacity: default_channel_capacity(),
                watch_radius_km: default_watch_radius_km(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                output: default_log_output(),
                log_file: None,
            },
        }
    }
}

impl FeedConfig {
    /// 观察半径对应的订阅精度
    pub fn watch_precision(&self) -> usize {
        precision_for_radius(self.watch_radius_km)
    }
}

impl GeoKeyConfig {
    /// 从文件加载配置
    ///
    /// 配置加载顺序（优先级从低到高）：
    /// 1. 默认配置（内嵌的 default.toml）
    /// 2. 用户配置文件（可选）
    /// 3. 环境变量（GEOKEY__ 前缀，使用双下划线分隔嵌套）
    ///
    /// # 示例
    ///
    /// ```no_run
    /// use geokey::config::GeoKeyConfig;
    ///
    /// // 加载配置（如果文件不存在，使用默认配置）
    /// let config = GeoKeyConfig::from_file("geokey.toml").unwrap();
    /// ```
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            // 1. 加载默认配置（内嵌）
            .add_source(config::File::from_str(
                include_str!("default.toml"),
                config::FileFormat::Toml,
            ))
            // 2. 加载用户配置（可选，不存在不报错）
            .add_source(config::File::with_name(path).required(false))
            // 3. 加载环境变量
            .add_source(config::Environment::with_prefix("GEOKEY").separator("__"))
            .build()
            .map_err(|e| GeoError::Config(format!("Failed to load config: {}", e)))?;

        settings
            .try_deserialize()
            .map_err(|e| GeoError::Config(format!("Failed to parse config: {}", e)))
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| GeoError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// 验证配置
    ///
    /// 检查精度范围、通道容量、观察半径和日志配置。
    pub fn validate(&self) -> Result<()> {
        // f64 尾数只有 52 位，超过 22 个字符（110 位）没有意义
        if self.index.max_precision == 0 || self.index.max_precision > 22 {
            return Err(GeoError::Config(format!(
                "Invalid max_precision {}: must be within 1..=22",
                self.index.max_precision
            )));
        }

        if self.index.entity_precision == 0
            || self.index.entity_precision > self.index.max_precision
        {
            return Err(GeoError::Config(format!(
                "Invalid entity_precision {}: must be within 1..={}",
                self.index.entity_precision, self.index.max_precision
            )));
        }

        // 实体键必须比任何查询前缀都长，否则前缀范围扫描会漏掉实体
        if self.index.entity_precision < self.feed.watch_precision() {
            return Err(GeoError::Config(format!(
                "entity_precision {} is shorter than the watch prefix length {}",
                self.index.entity_precision,
                self.feed.watch_precision()
            )));
        }

        if self.feed.channel_capacity == 0 {
            return Err(GeoError::Config(
                "feed.channel_capacity must be greater than 0".to_string(),
            ));
        }

        if !self.feed.watch_radius_km.is_finite() || self.feed.watch_radius_km < 0.0 {
            return Err(GeoError::Config(format!(
                "Invalid watch_radius_km {}: must be a finite, non-negative value",
                self.feed.watch_radius_km
            )));
        }

        // 验证日志级别
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(GeoError::Config(format!(
                    "Invalid log level: '{}'. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        match self.logging.output.as_str() {
            "stdout" | "stderr" => {}
            "file" if self.logging.log_file.is_none() => {
                return Err(GeoError::Config(
                    "Log output is 'file' but log_file path is not specified".to_string(),
                ))
            }
            "file" => {}
            other => {
                return Err(GeoError::Config(format!(
                    "Invalid log output: '{}'. Must be one of: stdout, stderr, file",
                    other
                )))
            }
        }

        Ok(())
    }

    /// 打印配置摘要
    pub fn print_summary(&self) {
        println!("📋 geokey Configuration:");
        println!("   Entity Precision: {}", self.index.entity_precision);
        println!("   Max Precision:    {}", self.index.max_precision);
        println!();
        println!("   Channel Capacity: {}", self.feed.channel_capacity);
        println!(
            "   Watch Radius:     {} km (prefix length {})",
            self.feed.watch_radius_km,
            self.feed.watch_precision()
        );
        println!();
        println!("   Log Level:   {}", self.logging.level);
        println!("   Log Output:  {}", self.logging.output);
        if let Some(ref log_file) = self.logging.log_file {
            println!("   Log File:    {}", log_file.display());
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeoKeyConfig::default();
        assert_eq!(config.index.entity_precision, 10);
        assert_eq!(config.index.max_precision, 12);
        assert_eq!(config.feed.channel_capacity, 256);
        assert_eq!(config.feed.watch_precision(), 6);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_embedded_defaults_match() {
        let config = GeoKeyConfig::from_file("does-not-exist.toml").unwrap();
        let defaults = GeoKeyConfig::default();
        assert_eq!(config.index.entity_precision, defaults.index.entity_precision);
        assert_eq!(config.feed.watch_radius_km, defaults.feed.watch_radius_km);
        assert_eq!(config.logging.output, defaults.logging.output);
    }

    #[test]
    fn test_config_validation() {
        let mut config = GeoKeyConfig::default();

        // 有效配置
        assert!(config.validate().is_ok());

        // 精度超出上限
        config.index.entity_precision = 13;
        assert!(config.validate().is_err());
        config.index.entity_precision = 10;

        // 实体键短于订阅前缀
        config.feed.watch_radius_km = 0.01;
        config.index.entity_precision = 7;
        assert!(config.validate().is_err());
        config.feed.watch_radius_km = 1.0;
        config.index.entity_precision = 10;

        // 通道容量为 0
        config.feed.channel_capacity = 0;
        assert!(config.validate().is_err());
        config.feed.channel_capacity = 16;

        // 负半径
        config.feed.watch_radius_km = -1.0;
        assert!(config.validate().is_err());
        config.feed.watch_radius_km = 1.0;

        // 无效日志级别
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
        config.logging.level = "debug".to_string();

        // 文件输出缺少路径
        config.logging.output = "file".to_string();
        assert!(config.validate().is_err());
        config.logging.log_file = Some(PathBuf::from("geokey.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        use tempfile::Builder;

        let mut config = GeoKeyConfig::default();
        config.index.entity_precision = 9;
        config.feed.channel_capacity = 32;

        let temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
        let path = temp_file.path().to_str().unwrap();

        // 保存
        config.save_to_file(path).unwrap();

        // 加载
        let loaded = GeoKeyConfig::from_file(path).unwrap();
        assert_eq!(loaded.index.entity_precision, 9);
        assert_eq!(loaded.feed.channel_capacity, 32);
    }
}
