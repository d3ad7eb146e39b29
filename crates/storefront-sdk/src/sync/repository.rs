//! 通用同步仓库 - 本地优先读取 + 远端刷新 + 写穿透
//!
//! 约定：
//! - 读取永远只走本地 EntityStore，不等待网络
//! - 刷新先拉取完整远端集合，成功后才原子替换本地快照；远端失败时本地不动
//! - 写穿透先写远端，远端成功后才写本地
//! - 所有失败都经过 `classify` 变成稳定文案；取消以 `Err(Cancelled)` 传出
//!
//! 仓库不做重试，重试 / 退避策略由调用方决定。

use std::future::Future;

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::error::{classify, Result, StorefrontSDKError};
use crate::remote::RemoteResult;
use crate::resource::{into_resource, Resource, SyncResult};
use crate::storage::dao::EntityDao;
use crate::storage::EntityStore;

/// 把本地读结果包装成 Resource
pub(crate) fn to_resource<T>(result: Result<T>) -> Resource<T> {
    match result {
        Ok(data) => Resource::Success(data),
        Err(e) => {
            warn!("[SyncRepository] 本地读取失败: {}", e);
            Resource::Error(classify(&e))
        }
    }
}

/// 某一实体类型的同步仓库
pub struct SyncRepository<E: EntityDao> {
    name: &'static str,
    store: EntityStore<E>,
}

impl<E: EntityDao> Clone for SyncRepository<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            store: self.store.clone(),
        }
    }
}

impl<E: EntityDao> SyncRepository<E> {
    pub fn new(name: &'static str, store: EntityStore<E>) -> Self {
        Self { name, store }
    }

    pub fn store(&self) -> &EntityStore<E> {
        &self.store
    }

    /// 观察本地快照
    pub fn observe(&self, limit: Option<u32>) -> impl Stream<Item = Resource<Vec<E>>> + Send + 'static {
        self.store.observe_all(limit).map(to_resource)
    }

    pub fn observe_one(&self, id: E::Id) -> impl Stream<Item = Resource<Option<E>>> + Send + 'static {
        self.store.observe_by_id(id).map(to_resource)
    }

    /// 读取一条本地记录，不存在时返回 NotFound 对应的错误文案
    pub async fn get(&self, id: &E::Id) -> SyncResult<E> {
        let result = match self.store.get_by_id(id).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(StorefrontSDKError::NotFound(format!("{} {}", E::TABLE, id))),
            Err(e) => Err(e),
        };
        into_resource(result)
    }

    /// 从远端拉取完整集合并替换本地快照，返回写入条数
    pub async fn refresh<R, F, M>(&self, fetch: F, map: M) -> SyncResult<usize>
    where
        F: Future<Output = RemoteResult<Vec<R>>>,
        M: FnMut(R) -> E,
    {
        info!("[SyncRepository] {} 开始刷新", self.name);
        let records = match fetch.await {
            Ok(records) => records,
            Err(e) => {
                let error = StorefrontSDKError::from(e);
                if !error.is_cancelled() {
                    warn!("[SyncRepository] {} 远端拉取失败，保留本地快照: {}", self.name, error);
                }
                return into_resource(Err(error));
            }
        };

        let local: Vec<E> = records.into_iter().map(map).collect();
        let result = self.store.replace_all(local).await;
        match &result {
            Ok(written) => info!("[SyncRepository] {} 刷新完成: {} 条", self.name, written),
            Err(e) => warn!("[SyncRepository] {} 写入本地快照失败: {}", self.name, e),
        }
        into_resource(result)
    }

    /// 先写远端，成功后再把结果写入本地
    pub async fn write_through<R, T, F, L, LF>(&self, label: &str, remote: F, mirror: L) -> SyncResult<T>
    where
        F: Future<Output = RemoteResult<R>>,
        L: FnOnce(R) -> LF,
        LF: Future<Output = Result<T>>,
    {
        let remote_value = match remote.await {
            Ok(value) => value,
            Err(e) => {
                let error = StorefrontSDKError::from(e);
                if !error.is_cancelled() {
                    warn!("[SyncRepository] {} {} 远端失败，本地不写入: {}", self.name, label, error);
                }
                return into_resource(Err(error));
            }
        };

        let result = mirror(remote_value).await;
        if let Err(e) = &result {
            // 远端已生效，下一次 refresh 会把本地追平
            warn!("[SyncRepository] {} {} 本地镜像失败: {}", self.name, label, e);
        } else {
            debug!("[SyncRepository] {} {} 完成", self.name, label);
        }
        into_resource(result)
    }

    /// 只写本地
    pub async fn write_local<T, F>(&self, label: &str, write: F) -> SyncResult<T>
    where
        F: Future<Output = Result<T>>,
    {
        let result = write.await;
        if let Err(e) = &result {
            warn!("[SyncRepository] {} {} 失败: {}", self.name, label, e);
        }
        into_resource(result)
    }

    /// 一次性远端查询，结果不落库
    pub async fn query_remote<R, T, F, M>(&self, label: &str, query: F, map: M) -> SyncResult<Vec<T>>
    where
        F: Future<Output = RemoteResult<Vec<R>>>,
        M: FnMut(R) -> T,
    {
        let result = query
            .await
            .map(|records| records.into_iter().map(map).collect::<Vec<T>>())
            .map_err(StorefrontSDKError::from);
        if let Err(e) = &result {
            if !e.is_cancelled() {
                warn!("[SyncRepository] {} {} 远端查询失败: {}", self.name, label, e);
            }
        }
        into_resource(result)
    }
}
