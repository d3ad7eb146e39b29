//! SDK 配置

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StorefrontSDKError};

/// 本地存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// 数据存储目录
    pub data_dir: PathBuf,
    /// SQLite 文件名（位于 data_dir 下）
    pub database_file: String,
    /// 对象缓存目录名（位于 data_dir 下）
    pub cache_dir: String,
    /// sled 页缓存大小（字节）
    pub cache_capacity_bytes: u64,
    /// sled 后台刷盘间隔（毫秒），None 表示只在显式 flush 时刷盘
    pub cache_flush_every_ms: Option<u64>,
    /// 列表观察默认条数，None 表示不限制
    pub default_page_size: Option<u32>,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./storefront_data"),
            database_file: "storefront.db".to_string(),
            cache_dir: "cache".to_string(),
            cache_capacity_bytes: 64 * 1024 * 1024,
            cache_flush_every_ms: Some(500),
            default_page_size: None,
        }
    }
}

impl StorefrontConfig {
    pub fn builder() -> StorefrontConfigBuilder {
        StorefrontConfigBuilder::new()
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join(&self.cache_dir)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_file.trim().is_empty() {
            return Err(StorefrontSDKError::Config("database_file 不能为空".to_string()));
        }
        if self.cache_dir.trim().is_empty() {
            return Err(StorefrontSDKError::Config("cache_dir 不能为空".to_string()));
        }
        if self.database_file == self.cache_dir {
            return Err(StorefrontSDKError::Config(
                "database_file 与 cache_dir 不能同名".to_string(),
            ));
        }
        if self.default_page_size == Some(0) {
            return Err(StorefrontSDKError::Config(
                "default_page_size 必须大于 0".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct StorefrontConfigBuilder {
    config: StorefrontConfig,
}

impl StorefrontConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: StorefrontConfig::default(),
        }
    }

    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.data_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn database_file<S: Into<String>>(mut self, name: S) -> Self {
        self.config.database_file = name.into();
        self
    }

    pub fn cache_dir<S: Into<String>>(mut self, name: S) -> Self {
        self.config.cache_dir = name.into();
        self
    }

    pub fn cache_capacity_bytes(mut self, bytes: u64) -> Self {
        self.config.cache_capacity_bytes = bytes;
        self
    }

    pub fn cache_flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.config.cache_flush_every_ms = ms;
        self
    }

    pub fn default_page_size(mut self, size: Option<u32>) -> Self {
        self.config.default_page_size = size;
        self
    }

    pub fn build(self) -> StorefrontConfig {
        self.config
    }
}

impl Default for StorefrontConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = StorefrontConfig::builder()
            .data_dir("/tmp/shop")
            .database_file("shop.db")
            .cache_dir("kv")
            .default_page_size(Some(20))
            .build();

        assert_eq!(config.database_path(), PathBuf::from("/tmp/shop/shop.db"));
        assert_eq!(config.cache_path(), PathBuf::from("/tmp/shop/kv"));
        assert_eq!(config.default_page_size, Some(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_layout() {
        let config = StorefrontConfig::builder().database_file("").build();
        assert!(matches!(config.validate(), Err(StorefrontSDKError::Config(_))));

        let config = StorefrontConfig::builder()
            .database_file("same")
            .cache_dir("same")
            .build();
        assert!(config.validate().is_err());

        let config = StorefrontConfig::builder().default_page_size(Some(0)).build();
        assert!(config.validate().is_err());
    }
}
