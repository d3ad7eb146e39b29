//! 购物车仓库 - 纯本地，一个商品一行

use futures::{Stream, StreamExt};

use crate::error::StorefrontSDKError;
use crate::resource::{Resource, SyncResult};
use crate::storage::{CartItem, NewCartItem, StorageManager};
use crate::sync::repository::SyncRepository;

#[derive(Clone)]
pub struct CartRepository {
    repo: SyncRepository<CartItem>,
}

impl CartRepository {
    pub fn new(storage: &StorageManager) -> Self {
        Self {
            repo: SyncRepository::new("cart", storage.cart_store()),
        }
    }

    /// 最近加入的在前
    pub fn observe_cart_items(&self) -> impl Stream<Item = Resource<Vec<CartItem>>> + Send + 'static {
        self.repo.observe(None)
    }

    /// 商品件数（各行数量之和）
    pub fn observe_cart_item_count(&self) -> impl Stream<Item = Resource<u32>> + Send + 'static {
        self.repo
            .observe(None)
            .map(|items| items.map(|items| items.iter().fold(0u32, |n, i| n.saturating_add(i.quantity))))
    }

    /// 合计金额（分）
    pub fn observe_cart_total(&self) -> impl Stream<Item = Resource<i64>> + Send + 'static {
        self.repo
            .observe(None)
            .map(|items| items.map(|items| total_cents(&items)))
    }

    /// 加入购物车；已有该商品时累加数量并刷新名称和价格
    pub async fn add_cart_item(&self, item: NewCartItem) -> SyncResult<CartItem> {
        if item.quantity == 0 {
            return self
                .repo
                .write_local("add", async {
                    Err(StorefrontSDKError::InvalidArgument(
                        "加入数量必须大于 0".to_string(),
                    ))
                })
                .await;
        }

        let store = self.repo.store().clone();
        let product_id = item.product_id.clone();
        let write = async move {
            let now = chrono::Utc::now().timestamp_millis();
            let merged = store
                .modify(&product_id, move |current| {
                    let (quantity, added_at) = match current {
                        Some(existing) => (existing.quantity.saturating_add(item.quantity), existing.added_at),
                        None => (item.quantity, now),
                    };
                    Ok(Some(CartItem {
                        product_id: item.product_id,
                        name: item.name,
                        price_cents: item.price_cents,
                        image_url: item.image_url,
                        quantity,
                        added_at,
                    }))
                })
                .await?;
            merged.ok_or_else(|| StorefrontSDKError::Other("购物车写入后记录缺失".to_string()))
        };
        self.repo.write_local("add", write).await
    }

    /// 修改数量；数量为 0 时删除该行，返回 None
    pub async fn update_quantity(&self, product_id: &str, quantity: u32) -> SyncResult<Option<CartItem>> {
        let store = self.repo.store().clone();
        let id = product_id.to_string();
        let write = async move {
            let missing = format!("cart_item {}", id);
            store
                .modify(&id, move |current| match current {
                    None => Err(StorefrontSDKError::NotFound(missing)),
                    Some(_) if quantity == 0 => Ok(None),
                    Some(mut existing) => {
                        existing.quantity = quantity;
                        Ok(Some(existing))
                    }
                })
                .await
        };
        self.repo.write_local("update_quantity", write).await
    }

    /// 删除一行，返回该行是否存在
    pub async fn remove_cart_item(&self, product_id: &str) -> SyncResult<bool> {
        let store = self.repo.store().clone();
        let id = product_id.to_string();
        self.repo
            .write_local("remove", async move { store.delete_by_id(&id).await })
            .await
    }

    /// 清空购物车，返回删除的行数
    pub async fn clear_cart(&self) -> SyncResult<usize> {
        let store = self.repo.store().clone();
        self.repo
            .write_local("clear", async move { store.delete_all().await })
            .await
    }
}

fn total_cents(items: &[CartItem]) -> i64 {
    items
        .iter()
        .fold(0i64, |total, item| total.saturating_add(item.line_total_cents()))
}
