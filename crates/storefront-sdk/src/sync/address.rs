//! 地址仓库 - 远端为准，写操作先写远端再镜像到本地

use std::sync::Arc;

use futures::Stream;

use crate::remote::{AddressRemote, NewAddress};
use crate::resource::{Resource, SyncResult};
use crate::storage::dao::{AddressDao, EntityDao};
use crate::storage::{Address, StorageManager};
use crate::sync::repository::SyncRepository;

#[derive(Clone)]
pub struct AddressRepository {
    repo: SyncRepository<Address>,
    remote: Arc<dyn AddressRemote>,
}

impl AddressRepository {
    pub fn new(storage: &StorageManager, remote: Arc<dyn AddressRemote>) -> Self {
        Self {
            repo: SyncRepository::new("addresses", storage.address_store()),
            remote,
        }
    }

    /// 默认地址在前
    pub fn observe_addresses(&self) -> impl Stream<Item = Resource<Vec<Address>>> + Send + 'static {
        self.repo.observe(None)
    }

    pub async fn get_address(&self, id: &str) -> SyncResult<Address> {
        self.repo.get(&id.to_string()).await
    }

    pub async fn refresh_addresses(&self) -> SyncResult<usize> {
        self.repo
            .refresh(self.remote.fetch_all(), Address::from)
            .await
    }

    /// 远端创建成功后用远端生成的 id 写入本地
    ///
    /// 新地址为默认地址时，同一事务内取消其它地址的默认标记。
    pub async fn add_address(&self, request: NewAddress) -> SyncResult<Address> {
        let store = self.repo.store().clone();
        let outgoing = request.clone();
        self.repo
            .write_through("add", self.remote.create(&outgoing), move |id| async move {
                let address = Address {
                    id,
                    full_name: request.full_name,
                    phone: request.phone,
                    line1: request.line1,
                    line2: request.line2,
                    city: request.city,
                    state: request.state,
                    postal_code: request.postal_code,
                    country: request.country,
                    is_default: request.is_default,
                    created_at: chrono::Utc::now().timestamp_millis(),
                };
                let stored = address.clone();
                store
                    .run_write("add_address", move |conn| {
                        if stored.is_default {
                            AddressDao::new(conn).clear_default_except(&stored.id)?;
                        }
                        Address::upsert(conn, &stored)
                    })
                    .await?;
                Ok(address)
            })
            .await
    }

    /// 远端删除成功后再删除本地，返回本地是否存在该地址
    pub async fn delete_address(&self, id: &str) -> SyncResult<bool> {
        let store = self.repo.store().clone();
        let local_id = id.to_string();
        self.repo
            .write_through("delete", self.remote.delete(id), move |()| async move {
                store.delete_by_id(&local_id).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorefrontConfig;
    use crate::error::ErrorKind;
    use crate::remote::{RemoteAddress, RemoteError, RemoteResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeAddresses {
        rows: Mutex<Vec<RemoteAddress>>,
        reject: Mutex<bool>,
    }

    #[async_trait]
    impl AddressRemote for FakeAddresses {
        async fn fetch_all(&self) -> RemoteResult<Vec<RemoteAddress>> {
            Ok(self.rows.lock().clone())
        }

        async fn create(&self, request: &NewAddress) -> RemoteResult<String> {
            if *self.reject.lock() {
                return Err(RemoteError::Rejected("postal code".to_string()));
            }
            let id = uuid::Uuid::new_v4().to_string();
            self.rows.lock().push(RemoteAddress {
                id: id.clone(),
                full_name: request.full_name.clone(),
                phone: request.phone.clone(),
                line1: request.line1.clone(),
                line2: request.line2.clone(),
                city: request.city.clone(),
                state: request.state.clone(),
                postal_code: request.postal_code.clone(),
                country: request.country.clone(),
                is_default: request.is_default,
                created_at: 0,
            });
            Ok(id)
        }

        async fn delete(&self, id: &str) -> RemoteResult<()> {
            let mut rows = self.rows.lock();
            let before = rows.len();
            rows.retain(|r| r.id != id);
            if rows.len() == before {
                return Err(RemoteError::NotFound(id.to_string()));
            }
            Ok(())
        }
    }

    fn request(name: &str, is_default: bool) -> NewAddress {
        NewAddress {
            full_name: name.to_string(),
            phone: "555-0100".to_string(),
            line1: "1 Main St".to_string(),
            line2: Some("Apt 2".to_string()),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            postal_code: "62701".to_string(),
            country: "US".to_string(),
            is_default,
        }
    }

    async fn setup(dir: &TempDir) -> (AddressRepository, Arc<FakeAddresses>) {
        let config = StorefrontConfig::builder().data_dir(dir.path()).build();
        let storage = StorageManager::open(&config).await.unwrap();
        let remote = Arc::new(FakeAddresses::default());
        (AddressRepository::new(&storage, remote.clone()), remote)
    }

    #[tokio::test]
    async fn test_add_uses_remote_id() {
        let temp_dir = TempDir::new().unwrap();
        let (repo, remote) = setup(&temp_dir).await;

        let added = repo.add_address(request("Ada", false)).await.unwrap().into_data().unwrap();
        assert_eq!(remote.rows.lock()[0].id, added.id);
        assert_eq!(repo.get_address(&added.id).await.unwrap(), Resource::Success(added));
    }

    #[tokio::test]
    async fn test_new_default_clears_previous_default() {
        let temp_dir = TempDir::new().unwrap();
        let (repo, _remote) = setup(&temp_dir).await;

        let home = repo.add_address(request("Home", true)).await.unwrap().into_data().unwrap();
        let work = repo.add_address(request("Work", true)).await.unwrap().into_data().unwrap();

        let home = repo.get_address(&home.id).await.unwrap().into_data().unwrap();
        let work = repo.get_address(&work.id).await.unwrap().into_data().unwrap();
        assert!(!home.is_default);
        assert!(work.is_default);
    }

    #[tokio::test]
    async fn test_rejected_add_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let (repo, remote) = setup(&temp_dir).await;
        *remote.reject.lock() = true;

        let result = repo.add_address(request("Ada", false)).await.unwrap();
        assert_eq!(result.error_or_null(), Some(ErrorKind::RemoteRejected.user_message()));
        assert_eq!(repo.repo.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_is_remote_first() {
        let temp_dir = TempDir::new().unwrap();
        let (repo, remote) = setup(&temp_dir).await;
        let added = repo.add_address(request("Ada", false)).await.unwrap().into_data().unwrap();

        // 远端已不存在时本地保留
        remote.rows.lock().clear();
        let result = repo.delete_address(&added.id).await.unwrap();
        assert!(result.is_error());
        assert!(repo.get_address(&added.id).await.unwrap().is_success());

        assert_eq!(repo.refresh_addresses().await, Ok(Resource::Success(0)));
        assert!(repo.get_address(&added.id).await.unwrap().is_error());
    }
}
