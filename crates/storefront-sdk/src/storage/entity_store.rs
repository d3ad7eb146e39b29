//! 实体仓库 - 一张本地表的类型化、可观察集合
//!
//! 所有读写都作为 job 在 DbActor 线程上执行。每次写事务提交后递增该表的变更计数，
//! 观察者收到通知后在同一个线程上重新查询，因此只会看到已提交的完整快照。

use std::marker::PhantomData;
use std::sync::Arc;

use futures::Stream;
use rusqlite::Connection;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{Result, StorefrontSDKError};
use crate::storage::dao::{EntityDao, TransactionManager};
use crate::storage::db_actor::DbActorHandle;

/// 某一实体类型的本地集合（可克隆，克隆之间共享变更通知）
pub struct EntityStore<E: EntityDao> {
    actor: DbActorHandle,
    changes: Arc<watch::Sender<u64>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: EntityDao> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            actor: self.actor.clone(),
            changes: self.changes.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: EntityDao> std::fmt::Debug for EntityStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("table", &E::TABLE)
            .field("revision", &*self.changes.borrow())
            .finish()
    }
}

impl<E: EntityDao> EntityStore<E> {
    pub fn new(actor: DbActorHandle) -> Self {
        let (changes, _) = watch::channel(0u64);
        Self {
            actor,
            changes: Arc::new(changes),
            _entity: PhantomData,
        }
    }

    /// 观察有序快照：订阅时立即发出一次，之后每次提交的写入发出一次
    ///
    /// `limit` 只截断发出的序列。读失败以 `Err` 元素发出，流继续。
    pub fn observe_all(&self, limit: Option<u32>) -> impl Stream<Item = Result<Vec<E>>> + Send + 'static {
        self.observe_query("observe_all", move |conn| E::list(conn, limit))
    }

    pub fn observe_by_id(&self, id: E::Id) -> impl Stream<Item = Result<Option<E>>> + Send + 'static {
        self.observe_query("observe_by_id", move |conn| E::get_by_id(conn, &id))
    }

    pub fn observe_count(&self) -> impl Stream<Item = Result<u64>> + Send + 'static {
        self.observe_query("observe_count", |conn| E::count(conn))
    }

    /// 一次性读取当前快照
    pub async fn list(&self, limit: Option<u32>) -> Result<Vec<E>> {
        self.actor
            .call("list", move |conn| E::list(conn, limit))
            .await
    }

    pub async fn get_by_id(&self, id: &E::Id) -> Result<Option<E>> {
        let id = id.clone();
        self.actor
            .call("get_by_id", move |conn| E::get_by_id(conn, &id))
            .await
    }

    pub async fn count(&self) -> Result<u64> {
        self.actor.call("count", |conn| E::count(conn)).await
    }

    /// 按主键插入或替换
    pub async fn upsert(&self, record: E) -> Result<()> {
        self.run_write("upsert", move |conn| E::upsert(conn, &record))
            .await
    }

    /// 批量插入或替换，整体成功或整体失败
    pub async fn upsert_all(&self, records: Vec<E>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let written = self
            .run_write("upsert_all", move |conn| {
                for record in &records {
                    E::upsert(conn, record)?;
                }
                Ok(records.len())
            })
            .await?;
        debug!("[EntityStore] {} 批量写入 {} 条", E::TABLE, written);
        Ok(written)
    }

    /// 删除一条，返回是否存在
    pub async fn delete_by_id(&self, id: &E::Id) -> Result<bool> {
        let id = id.clone();
        let removed = self
            .run_write("delete_by_id", move |conn| E::delete_by_id(conn, &id))
            .await?;
        Ok(removed > 0)
    }

    pub async fn delete_all(&self) -> Result<usize> {
        self.run_write("delete_all", |conn| E::delete_all(conn)).await
    }

    /// 在一个事务里清空并写入新集合，读者只会看到旧集合或新集合
    ///
    /// 返回替换后的行数；输入中重复的主键只保留最后一条。
    pub async fn replace_all(&self, records: Vec<E>) -> Result<usize> {
        let received = records.len();
        let (removed, stored) = self
            .run_write("replace_all", move |conn| {
                let removed = E::delete_all(conn)?;
                for record in &records {
                    E::upsert(conn, record)?;
                }
                Ok((removed, E::count(conn)?))
            })
            .await?;
        let stored = stored as usize;
        if stored != received {
            debug!(
                "[EntityStore] {} 输入含重复主键: 收到 {} 条, 保存 {} 条",
                E::TABLE,
                received,
                stored
            );
        }
        info!(
            "[EntityStore] {} 快照替换完成: 删除 {} 条, 写入 {} 条",
            E::TABLE,
            removed,
            stored
        );
        Ok(stored)
    }

    /// 读-改-写：在同一个事务里读取当前记录并交给 `f` 决定写入结果
    ///
    /// `f` 返回 `Some` 时 upsert，返回 `None` 时删除该主键。
    /// 返回记录的主键必须与 `id` 相同，否则回滚。
    pub async fn modify<F>(&self, id: &E::Id, f: F) -> Result<Option<E>>
    where
        F: FnOnce(Option<E>) -> Result<Option<E>> + Send + 'static,
    {
        let id = id.clone();
        self.run_write("modify", move |conn| {
            let current = E::get_by_id(conn, &id)?;
            let next = f(current)?;
            match &next {
                Some(record) if record.id() != id => {
                    return Err(StorefrontSDKError::InvalidArgument(format!(
                        "{} 主键不可修改: {} -> {}",
                        E::TABLE,
                        id,
                        record.id()
                    )));
                }
                Some(record) => E::upsert(conn, record)?,
                None => {
                    E::delete_by_id(conn, &id)?;
                }
            }
            Ok(next)
        })
        .await
    }

    /// 在一个事务里执行任意写操作并通知观察者
    ///
    /// 事务失败时整体回滚，观察者不会收到通知。
    pub(crate) async fn run_write<R, F>(&self, label: &'static str, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let changes = self.changes.clone();
        self.actor
            .call(label, move |conn| {
                let result = TransactionManager::new(conn).execute(f)?;
                // 仍在 actor 线程上通知，下一条 job 之前观察者就能看到新的版本号
                changes.send_modify(|revision| *revision = revision.wrapping_add(1));
                Ok(result)
            })
            .await
    }

    fn observe_query<R, Q>(&self, label: &'static str, query: Q) -> impl Stream<Item = Result<R>> + Send + 'static
    where
        R: Send + 'static,
        Q: Fn(&Connection) -> Result<R> + Send + Sync + 'static,
    {
        let state = ObserveState {
            actor: self.actor.clone(),
            rx: self.changes.subscribe(),
            query: Arc::new(query),
            primed: false,
        };
        futures::stream::unfold(state, move |mut state| async move {
            if state.primed {
                // 所有 store 克隆都释放后结束
                state.rx.changed().await.ok()?;
            }
            state.primed = true;
            state.rx.borrow_and_update();
            let query = state.query.clone();
            let result = state.actor.call(label, move |conn| query(&*conn)).await;
            Some((result, state))
        })
    }
}

struct ObserveState<Q> {
    actor: DbActorHandle,
    rx: watch::Receiver<u64>,
    query: Arc<Q>,
    primed: bool,
}
