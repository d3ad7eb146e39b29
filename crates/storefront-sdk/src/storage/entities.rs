//! 数据实体定义 - 对应数据库表结构
//!
//! 这里定义了本地表对应的 Rust 结构体，以及从远端记录到本地记录的映射。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::remote::{RemoteAddress, RemoteProduct};

/// 一张本地表中的一行，带稳定主键
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Clone + PartialEq + fmt::Display + Send + Sync + 'static;

    /// 表名（用于日志）
    const TABLE: &'static str;

    fn id(&self) -> Self::Id;
}

/// 商品实体 - 对应 product 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    /// 价格（分）
    pub price_cents: i64,
    pub image_url: String,
    pub rating: f64,
    pub review_count: u32,
    /// 毫秒时间戳，列表按它倒序
    pub created_at: i64,
}

impl Entity for Product {
    type Id = String;
    const TABLE: &'static str = "product";

    fn id(&self) -> String {
        self.id.clone()
    }
}

impl From<RemoteProduct> for Product {
    fn from(remote: RemoteProduct) -> Self {
        Self {
            id: remote.id,
            name: remote.name,
            description: remote.description,
            price_cents: remote.price_cents,
            image_url: remote.image_url,
            rating: remote.rating,
            review_count: remote.review_count,
            created_at: remote.created_at,
        }
    }
}

/// 购物车条目 - 对应 cart_item 表，主键为商品 id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub price_cents: i64,
    pub image_url: String,
    pub quantity: u32,
    pub added_at: i64,
}

impl CartItem {
    /// 单价 × 数量，溢出时取边界值
    pub fn line_total_cents(&self) -> i64 {
        self.price_cents.saturating_mul(i64::from(self.quantity))
    }
}

impl Entity for CartItem {
    type Id = String;
    const TABLE: &'static str = "cart_item";

    fn id(&self) -> String {
        self.product_id.clone()
    }
}

/// 加入购物车请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub product_id: String,
    pub name: String,
    pub price_cents: i64,
    pub image_url: String,
    pub quantity: u32,
}

impl From<&Product> for NewCartItem {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price_cents: product.price_cents,
            image_url: product.image_url.clone(),
            quantity: 1,
        }
    }
}

/// 收货地址 - 对应 address 表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
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

impl Entity for Address {
    type Id = String;
    const TABLE: &'static str = "address";

    fn id(&self) -> String {
        self.id.clone()
    }
}

impl From<RemoteAddress> for Address {
    fn from(remote: RemoteAddress) -> Self {
        Self {
            id: remote.id,
            full_name: remote.full_name,
            phone: remote.phone,
            line1: remote.line1,
            line2: remote.line2,
            city: remote.city,
            state: remote.state,
            postal_code: remote.postal_code,
            country: remote.country,
            is_default: remote.is_default,
            created_at: remote.created_at,
        }
    }
}

/// 当前登录用户 - 存在对象缓存中，不入表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User({})", self.uid)
    }
}
