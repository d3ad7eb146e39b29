//! 存储模块 - 店铺 SDK 的数据持久化层
//!
//! 采用分层架构设计：
//! - StorageManager: 统一的存储管理器，按配置打开缓存与数据库
//! - ObjectCache: sled 键值缓存，保存单个对象（如当前用户）
//! - EntityStore: 每张表一个可观察集合，读写都经过 DbActor
//! - DAO Layer: 数据访问层，每张表一个专门的操作模块

use std::sync::Arc;

use tracing::info;

use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontSDKError};

pub mod codec;
pub mod dao;
pub mod db_actor;
pub mod entities;
pub mod entity_store;
pub mod kv;
pub mod migrate;

// 重新导出核心类型
pub use codec::{Codec, JsonCodec};
pub use dao::TransactionManager;
pub use db_actor::DbActorHandle;
pub use entities::*;
pub use entity_store::EntityStore;
pub use kv::ObjectCache;

/// 缓存键常量
pub mod cache_keys {
    /// 当前登录用户
    pub const AUTH_USER: &str = "auth_user";
}

/// 存储管理器（可克隆，内部共享）
///
/// 每个进程一个数据库文件，每张表只有一个 EntityStore 写入者。
#[derive(Clone, Debug)]
pub struct StorageManager {
    inner: Arc<StorageInner>,
}

#[derive(Debug)]
struct StorageInner {
    config: StorefrontConfig,
    cache: ObjectCache,
    actor: DbActorHandle,
    products: EntityStore<Product>,
    cart_items: EntityStore<CartItem>,
    addresses: EntityStore<Address>,
}

impl StorageManager {
    /// 按配置创建目录、打开对象缓存和数据库
    pub async fn open(config: &StorefrontConfig) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .map_err(|e| StorefrontSDKError::IO(format!("创建数据目录失败: {}", e)))?;

        let cache = ObjectCache::open(&config.cache_path(), config).await?;

        let actor = DbActorHandle::spawn()?;
        if let Err(e) = actor.open(config.database_path()).await {
            actor.shutdown();
            return Err(e);
        }

        info!(
            "[StorageManager] 存储已就绪: data_dir={}, sdk_db_version={}",
            config.data_dir.display(),
            crate::version::SDK_DB_VERSION
        );

        Ok(Self {
            inner: Arc::new(StorageInner {
                config: config.clone(),
                cache,
                products: EntityStore::new(actor.clone()),
                cart_items: EntityStore::new(actor.clone()),
                addresses: EntityStore::new(actor.clone()),
                actor,
            }),
        })
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> ObjectCache {
        self.inner.cache.clone()
    }

    pub fn product_store(&self) -> EntityStore<Product> {
        self.inner.products.clone()
    }

    pub fn cart_store(&self) -> EntityStore<CartItem> {
        self.inner.cart_items.clone()
    }

    pub fn address_store(&self) -> EntityStore<Address> {
        self.inner.addresses.clone()
    }

    /// 刷盘并关闭数据库；之后所有 EntityStore 操作都会失败
    pub async fn shutdown(&self) -> Result<()> {
        self.inner.cache.flush().await?;
        let closed = self.inner.actor.close().await;
        self.inner.actor.shutdown();
        info!("[StorageManager] 存储已关闭");
        closed
    }
}
