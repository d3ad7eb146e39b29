//! 远端协作方接口 - 每个领域一个 trait
//!
//! SDK 不关心具体传输（Firebase、HTTP、gRPC 都可以），只要求：
//! - 操作是异步的、可失败的
//! - 调用方可以自行决定是否重试（SDK 内部不重试）

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::storage::entities::User;

/// 远端调用失败原因
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("远端不可达: {0}")]
    Unavailable(String),

    #[error("远端请求超时: {0}s")]
    Timeout(u64),

    #[error("远端拒绝请求: {0}")]
    Rejected(String),

    #[error("远端记录不存在: {0}")]
    NotFound(String),

    #[error("远端调用已取消")]
    Cancelled,
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// 远端商品记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteProduct {
    pub id: String,
    pub name: String,
    pub description: String,
    /// 价格（分）
    pub price_cents: i64,
    pub image_url: String,
    pub rating: f64,
    pub review_count: u32,
    /// 毫秒时间戳
    pub created_at: i64,
}

/// 远端地址记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAddress {
    pub id: String,
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: i64,
}

/// 新建地址请求（id 由远端生成）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAddress {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
}

#[async_trait]
pub trait ProductRemote: Send + Sync {
    /// 拉取完整的权威商品集合
    async fn fetch_all(&self) -> RemoteResult<Vec<RemoteProduct>>;

    /// 自由文本搜索（结果不落库）
    async fn search(&self, query: &str) -> RemoteResult<Vec<RemoteProduct>>;
}

#[async_trait]
pub trait AddressRemote: Send + Sync {
    async fn fetch_all(&self) -> RemoteResult<Vec<RemoteAddress>>;

    /// 创建地址，返回远端生成的 id
    async fn create(&self, request: &NewAddress) -> RemoteResult<String>;

    async fn delete(&self, id: &str) -> RemoteResult<()>;
}

#[async_trait]
pub trait UserRemote: Send + Sync {
    /// 当前登录用户的资料；未登录返回 None
    async fn fetch_current_user(&self) -> RemoteResult<Option<User>>;
}
