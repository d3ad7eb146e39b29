//! 同步模块 - 本地优先的仓库层
//!
//! 职责：
//! - 读取只走本地存储，离线时照常可用
//! - 刷新时用远端完整集合原子替换本地快照
//! - 写操作按领域选择写穿透（先远端）或纯本地
//! - 把所有失败统一转换为 Resource

pub mod address;
pub mod cart;
pub mod product;
pub mod repository;
pub mod user;

pub use address::AddressRepository;
pub use cart::CartRepository;
pub use product::ProductRepository;
pub use repository::SyncRepository;
pub use user::UserRepository;
