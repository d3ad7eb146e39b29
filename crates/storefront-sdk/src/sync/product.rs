//! 商品仓库 - 远端为准，本地为只读副本

use std::sync::Arc;

use futures::Stream;
use tracing::debug;

use crate::remote::ProductRemote;
use crate::resource::{Resource, SyncResult};
use crate::storage::{Product, StorageManager};
use crate::sync::repository::SyncRepository;

#[derive(Clone)]
pub struct ProductRepository {
    repo: SyncRepository<Product>,
    remote: Arc<dyn ProductRemote>,
    default_page_size: Option<u32>,
}

impl ProductRepository {
    pub fn new(storage: &StorageManager, remote: Arc<dyn ProductRemote>) -> Self {
        Self {
            repo: SyncRepository::new("products", storage.product_store()),
            remote,
            default_page_size: storage.config().default_page_size,
        }
    }

    /// 最新的商品在前；`limit` 为 None 时使用配置的默认分页大小
    pub fn observe_products(
        &self,
        limit: Option<u32>,
    ) -> impl Stream<Item = Resource<Vec<Product>>> + Send + 'static {
        self.repo.observe(limit.or(self.default_page_size))
    }

    pub fn observe_product(&self, id: &str) -> impl Stream<Item = Resource<Option<Product>>> + Send + 'static {
        self.repo.observe_one(id.to_string())
    }

    pub async fn get_product(&self, id: &str) -> SyncResult<Product> {
        self.repo.get(&id.to_string()).await
    }

    /// 拉取完整商品集合替换本地，返回本地商品数
    pub async fn refresh_products(&self) -> SyncResult<usize> {
        self.repo
            .refresh(self.remote.fetch_all(), Product::from)
            .await
    }

    /// 远端搜索，结果不写入本地；空白查询直接返回空列表
    pub async fn search_products(&self, query: &str) -> SyncResult<Vec<Product>> {
        let query = query.trim();
        if query.is_empty() {
            debug!("[ProductRepository] 空查询，跳过远端搜索");
            return Ok(Resource::Success(Vec::new()));
        }
        self.repo
            .query_remote("search", self.remote.search(query), Product::from)
            .await
    }
}
