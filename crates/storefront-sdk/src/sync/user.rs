//! 用户仓库 - 当前登录用户保存在对象缓存的 `auth_user` 键下

use std::sync::Arc;

use futures::Stream;
use tracing::info;

use crate::error::Result;
use crate::remote::UserRemote;
use crate::resource::{into_resource, SyncResult};
use crate::storage::cache_keys::AUTH_USER;
use crate::storage::{JsonCodec, ObjectCache, StorageManager, User};

const CODEC: JsonCodec<User> = JsonCodec::new();

#[derive(Clone)]
pub struct UserRepository {
    cache: ObjectCache,
    remote: Arc<dyn UserRemote>,
}

impl UserRepository {
    pub fn new(storage: &StorageManager, remote: Arc<dyn UserRemote>) -> Self {
        Self {
            cache: storage.cache(),
            remote,
        }
    }

    /// 订阅时立即发出当前用户，之后每次登录 / 刷新 / 退出发出一次
    pub fn observe_user(&self) -> impl Stream<Item = Option<User>> + Send + 'static {
        self.cache.observe(AUTH_USER, CODEC)
    }

    pub async fn current_user(&self) -> SyncResult<Option<User>> {
        into_resource(self.cache.get(AUTH_USER, &CODEC).await)
    }

    pub async fn save_user(&self, user: &User) -> SyncResult<()> {
        into_resource(self.cache.save(AUTH_USER, user, &CODEC).await)
    }

    /// 从远端拉取当前用户；远端返回未登录时清除本地缓存
    pub async fn refresh_user(&self) -> SyncResult<Option<User>> {
        into_resource(self.refresh_inner().await)
    }

    async fn refresh_inner(&self) -> Result<Option<User>> {
        let user = self.remote.fetch_current_user().await?;
        match &user {
            Some(user) => self.cache.save(AUTH_USER, user, &CODEC).await?,
            None => {
                info!("[UserRepository] 远端无登录用户，清除本地缓存");
                self.cache.remove(AUTH_USER).await?
            }
        }
        Ok(user)
    }

    pub async fn sign_out(&self) -> SyncResult<()> {
        info!("[UserRepository] 退出登录");
        into_resource(self.cache.remove(AUTH_USER).await)
    }
}
