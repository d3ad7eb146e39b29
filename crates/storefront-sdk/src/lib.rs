//! Storefront SDK - 离线优先的店铺数据同步层
//!
//! 本 SDK 提供：
//! - 对象缓存：任意可序列化对象的持久化存取与按 key 观察
//! - 实体仓库：商品、购物车、地址的本地表，每次提交都推送最新快照
//! - 同步仓库：读取只走本地，刷新时原子替换本地快照，写操作可写穿透到远端
//! - 统一的 Resource 返回契约，错误文案稳定且可直接展示
//!
//! 远端传输由调用方实现 [`remote`] 中的 trait 提供，SDK 不内置网络层。
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use storefront_sdk::{CartRepository, NewCartItem, StorageManager, StorefrontConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StorefrontConfig::builder()
//!         .data_dir("/path/to/data")
//!         .build();
//!     let storage = StorageManager::open(&config).await?;
//!
//!     let cart = CartRepository::new(&storage);
//!     let mut count = Box::pin(cart.observe_cart_item_count());
//!
//!     cart.add_cart_item(NewCartItem {
//!         product_id: "p1".to_string(),
//!         name: "Desk Lamp".to_string(),
//!         price_cents: 2599,
//!         image_url: String::new(),
//!         quantity: 1,
//!     })
//!     .await?;
//!
//!     while let Some(resource) = count.next().await {
//!         println!("购物车件数: {:?}", resource.data_or_null());
//!     }
//!
//!     storage.shutdown().await?;
//!     Ok(())
//! }
//! ```

// 导出核心模块
pub mod config;
pub mod error;
pub mod remote;
pub mod resource;
pub mod storage;
pub mod sync;
pub mod version;

// 重新导出核心类型，方便使用
pub use config::{StorefrontConfig, StorefrontConfigBuilder};
pub use error::{classify, ErrorKind, Result, StorefrontSDKError};
pub use remote::{
    AddressRemote, NewAddress, ProductRemote, RemoteAddress, RemoteError, RemoteProduct,
    RemoteResult, UserRemote,
};
pub use resource::{cancellable, capture, Cancelled, Resource, SyncResult};
pub use storage::cache_keys;
pub use storage::{
    Address, CartItem, Codec, EntityStore, JsonCodec, NewCartItem, ObjectCache, Product,
    StorageManager, User,
};
pub use sync::{AddressRepository, CartRepository, ProductRepository, SyncRepository, UserRepository};
pub use version::{SDK_DB_VERSION, SDK_VERSION};
