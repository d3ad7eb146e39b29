//! 对象缓存 - 基于 sled 的持久化键值存储 + 按 key 的实时观察
//!
//! 本模块提供：
//! - 任意可序列化对象的持久化存取（codec 由调用方显式传入）
//! - 宽容读取：反序列化失败视为不存在
//! - 按 key 观察：订阅时立即重放当前值，之后每次写入 / 删除 / 清空都会推送
//! - 每个 key 记录最后一次写入版本号

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use futures::Stream;
use parking_lot::{Mutex, RwLock};
use sled::transaction::TransactionResult;
use sled::{Db, Transactional, Tree};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontSDKError};
use crate::storage::codec::Codec;

const VALUES_TREE: &str = "object_cache";
const VERSIONS_TREE: &str = "object_cache_meta";

/// 被观察的 key 才有 watch 通道，保存该 key 当前的持久化文本
type Slot = Arc<watch::Sender<Option<String>>>;

/// 对象缓存组件（可克隆，内部共享）
#[derive(Clone)]
pub struct ObjectCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    db: Db,
    values: Tree,
    versions: Tree,
    /// 写入与订阅共用这把锁
    slots: Mutex<HashMap<String, Slot>>,
    /// 普通读写持读锁，clear 持写锁
    clear_gate: RwLock<()>,
}

impl std::fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectCache")
            .field("keys", &self.inner.values.len())
            .field("observed_keys", &self.inner.slots.lock().len())
            .finish()
    }
}

impl ObjectCache {
    /// 打开（或创建）对象缓存
    pub async fn open(path: &Path, config: &StorefrontConfig) -> Result<Self> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| StorefrontSDKError::IO(format!("创建缓存目录失败: {}", e)))?;

        // 上一个实例可能刚释放文件锁，重试多次带退避
        const MAX_OPEN_RETRIES: u32 = 8;
        const RETRY_DELAY_MS: u64 = 50;
        let sled_config = sled::Config::new()
            .path(path)
            .cache_capacity(config.cache_capacity_bytes)
            .flush_every_ms(config.cache_flush_every_ms);

        let mut last_err: Option<sled::Error> = None;
        let mut db_opt: Option<Db> = None;
        for attempt in 0..MAX_OPEN_RETRIES {
            match sled_config.open() {
                Ok(d) => {
                    db_opt = Some(d);
                    break;
                }
                Err(e) => {
                    let msg = format!("{}", e);
                    last_err = Some(e);
                    let is_lock = msg.contains("could not acquire lock")
                        || msg.contains("Resource temporarily unavailable")
                        || msg.contains("WouldBlock");
                    if is_lock && attempt + 1 < MAX_OPEN_RETRIES {
                        let delay_ms = RETRY_DELAY_MS * (1 << attempt);
                        tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                    } else {
                        break;
                    }
                }
            }
        }
        let db = db_opt.ok_or_else(|| {
            StorefrontSDKError::KvStore(
                last_err
                    .map(|e| format!("打开 sled 数据库失败: {}", e))
                    .unwrap_or_else(|| "打开 sled 数据库失败".to_string()),
            )
        })?;

        let values = db
            .open_tree(VALUES_TREE)
            .map_err(|e| StorefrontSDKError::KvStore(format!("打开缓存 Tree 失败: {}", e)))?;
        let versions = db
            .open_tree(VERSIONS_TREE)
            .map_err(|e| StorefrontSDKError::KvStore(format!("打开版本 Tree 失败: {}", e)))?;

        info!(
            "[ObjectCache] 已打开: path={}, keys={}",
            path.display(),
            values.len()
        );

        Ok(Self {
            inner: Arc::new(CacheInner {
                db,
                values,
                versions,
                slots: Mutex::new(HashMap::new()),
                clear_gate: RwLock::new(()),
            }),
        })
    }

    /// 序列化并持久化 `value`，刷盘后返回，并推送给该 key 的观察者
    ///
    /// 序列化失败时不写入，直接返回错误。
    pub async fn save<T, C>(&self, key: &str, value: &T, codec: &C) -> Result<()>
    where
        C: Codec<T> + ?Sized,
    {
        validate_key(key)?;
        let text = codec.encode(value)?;
        self.inner.save_text(key, text)?;
        self.flush().await
    }

    /// 读取并反序列化；不存在或反序列化失败都返回 None
    pub async fn get<T, C>(&self, key: &str, codec: &C) -> Result<Option<T>>
    where
        C: Codec<T> + ?Sized,
    {
        validate_key(key)?;
        let text = self.inner.read_text(key)?;
        Ok(decode_tolerant(codec, key, text.as_deref()))
    }

    /// 观察某个 key：立即发出当前值，之后每次变更发出一次
    ///
    /// 多个订阅者各自收到相同的序列。反序列化失败发出 None，流不会因此结束。
    /// 空 key 只发出一次 None。
    pub fn observe<T, C>(&self, key: &str, codec: C) -> impl Stream<Item = Option<T>> + Send + 'static
    where
        T: Send + 'static,
        C: Codec<T> + 'static,
    {
        let rx = match validate_key(key) {
            Ok(()) => self.inner.subscribe(key),
            Err(e) => {
                warn!("[ObjectCache] 拒绝观察: {}", e);
                watch::channel(None).1
            }
        };
        observe_stream(key.to_string(), rx, codec)
    }

    /// 删除 key，观察者收到 None
    pub async fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.inner.remove_key(key)?;
        self.flush().await
    }

    /// 删除所有 key，所有观察者收到 None
    pub async fn clear(&self) -> Result<()> {
        self.inner.clear_all()?;
        self.flush().await
    }

    pub async fn contains(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        self.inner
            .values
            .contains_key(key)
            .map_err(|e| StorefrontSDKError::KvStore(format!("检查键存在失败: {}", e)))
    }

    /// 该 key 最后一次写入的版本号（单调递增）
    pub async fn entry_version(&self, key: &str) -> Result<Option<u64>> {
        validate_key(key)?;
        let raw = self
            .inner
            .versions
            .get(key)
            .map_err(|e| StorefrontSDKError::KvStore(format!("读取版本失败: {}", e)))?;
        match raw {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    StorefrontSDKError::KvStore(format!("版本号格式错误: key={}", key))
                })?;
                Ok(Some(u64::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.values.is_empty()
    }

    /// 等待 sled 把脏页刷到磁盘
    pub async fn flush(&self) -> Result<()> {
        self.inner
            .db
            .flush_async()
            .await
            .map_err(|e| StorefrontSDKError::KvStore(format!("刷盘失败: {}", e)))?;
        Ok(())
    }
}

impl CacheInner {
    /// 订阅某个 key；还没有通道时从磁盘加载当前值并创建
    ///
    /// 持有 `slots` 锁读取磁盘，与写入互斥，新订阅者不会拿到过期值。
    fn subscribe(&self, key: &str) -> watch::Receiver<Option<String>> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(key) {
            return slot.subscribe();
        }
        let current = self.read_text(key).unwrap_or_else(|e| {
            // 无法读取初始值时从空值开始，后续写入照常推送
            warn!("[ObjectCache] 读取初始值失败，按空值订阅: key={}, error={}", key, e);
            None
        });
        let (tx, rx) = watch::channel(current);
        slots.insert(key.to_string(), Arc::new(tx));
        rx
    }

    fn read_text(&self, key: &str) -> Result<Option<String>> {
        let raw = self
            .values
            .get(key)
            .map_err(|e| StorefrontSDKError::KvStore(format!("获取键值对失败: {}", e)))?;
        Ok(raw.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// 把新值推给已有的观察者；没有接收端的通道直接丢弃
    ///
    /// 调用方必须持有 `slots` 锁。
    fn publish(slots: &mut HashMap<String, Slot>, key: &str, value: Option<String>) {
        let Some(slot) = slots.get(key) else {
            return;
        };
        if slot.receiver_count() == 0 {
            slots.remove(key);
            return;
        }
        slot.send_replace(value);
    }

    fn save_text(&self, key: &str, text: String) -> Result<()> {
        let _gate = self.clear_gate.read();
        // 写盘和推送在同一把锁内，推送顺序与落盘顺序一致
        let mut slots = self.slots.lock();
        self.write_entry(key, &text)?;
        debug!("[ObjectCache] 写入成功: key={}, bytes={}", key, text.len());
        Self::publish(&mut slots, key, Some(text));
        Ok(())
    }

    fn write_entry(&self, key: &str, text: &str) -> Result<()> {
        let version = self
            .db
            .generate_id()
            .map_err(|e| StorefrontSDKError::KvStore(format!("生成版本号失败: {}", e)))?;
        let version_bytes = version.to_be_bytes();
        let result: TransactionResult<(), ()> =
            (&self.values, &self.versions).transaction(|(values, versions)| {
                values.insert(key.as_bytes(), text.as_bytes())?;
                versions.insert(key.as_bytes(), &version_bytes[..])?;
                Ok(())
            });
        result.map_err(|e| StorefrontSDKError::KvStore(format!("设置键值对失败: {:?}", e)))
    }

    fn remove_key(&self, key: &str) -> Result<()> {
        let _gate = self.clear_gate.read();
        let mut slots = self.slots.lock();
        let result: TransactionResult<(), ()> =
            (&self.values, &self.versions).transaction(|(values, versions)| {
                values.remove(key.as_bytes())?;
                versions.remove(key.as_bytes())?;
                Ok(())
            });
        result.map_err(|e| StorefrontSDKError::KvStore(format!("删除键值对失败: {:?}", e)))?;
        Self::publish(&mut slots, key, None);
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        let _gate = self.clear_gate.write();
        self.values
            .clear()
            .map_err(|e| StorefrontSDKError::KvStore(format!("清空缓存失败: {}", e)))?;
        self.versions
            .clear()
            .map_err(|e| StorefrontSDKError::KvStore(format!("清空版本失败: {}", e)))?;

        let mut slots = self.slots.lock();
        slots.retain(|_, slot| slot.receiver_count() > 0);
        for slot in slots.values() {
            slot.send_replace(None);
        }
        info!("[ObjectCache] 已清空, 仍在观察的 key 数量={}", slots.len());
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StorefrontSDKError::InvalidArgument(
            "缓存 key 不能为空".to_string(),
        ));
    }
    Ok(())
}

fn decode_tolerant<T, C>(codec: &C, key: &str, text: Option<&str>) -> Option<T>
where
    C: Codec<T> + ?Sized,
{
    let text = text?;
    match codec.decode(text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("[ObjectCache] 反序列化失败，按不存在处理: key={}, error={}", key, e);
            None
        }
    }
}

struct ObserveState<C> {
    key: String,
    rx: watch::Receiver<Option<String>>,
    codec: C,
    primed: bool,
}

fn observe_stream<T, C>(
    key: String,
    rx: watch::Receiver<Option<String>>,
    codec: C,
) -> impl Stream<Item = Option<T>> + Send + 'static
where
    T: Send + 'static,
    C: Codec<T> + 'static,
{
    let state = ObserveState {
        key,
        rx,
        codec,
        primed: false,
    };
    futures::stream::unfold(state, |mut state| async move {
        if state.primed {
            // 发送端随缓存一起释放时结束
            state.rx.changed().await.ok()?;
        }
        state.primed = true;
        let text = state.rx.borrow_and_update().clone();
        let value = decode_tolerant(&state.codec, &state.key, text.as_deref());
        Some((value, state))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::codec::JsonCodec;
    use futures::StreamExt;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Session {
        uid: String,
        email: String,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        count: u32,
    }

    struct FailingCodec;

    impl Codec<Session> for FailingCodec {
        fn encode(&self, _value: &Session) -> Result<String> {
            Err(StorefrontSDKError::Serialization("不支持的值".to_string()))
        }

        fn decode(&self, _text: &str) -> Result<Session> {
            Err(StorefrontSDKError::Serialization("不支持的值".to_string()))
        }
    }

    async fn open_cache(dir: &TempDir) -> ObjectCache {
        ObjectCache::open(dir.path(), &StorefrontConfig::default())
            .await
            .unwrap()
    }

    fn session(uid: &str) -> Session {
        Session {
            uid: uid.to_string(),
            email: format!("{}@example.com", uid),
        }
    }

    async fn next_within<S: Stream + Unpin>(stream: &mut S) -> S::Item {
        tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("等待推送超时")
            .expect("流提前结束")
    }

    #[tokio::test]
    async fn test_save_then_get_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir).await;
        let codec = JsonCodec::<Session>::new();

        cache.save("user", &session("u1"), &codec).await.unwrap();
        let loaded = cache.get("user", &codec).await.unwrap();
        assert_eq!(loaded, Some(session("u1")));
        assert!(cache.contains("user").await.unwrap());
        assert!(!cache.contains("missing").await.unwrap());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_get_with_mismatched_codec_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir).await;

        cache
            .save("user", &session("u1"), &JsonCodec::<Session>::new())
            .await
            .unwrap();
        let drifted = cache.get("user", &JsonCodec::<Counter>::new()).await.unwrap();
        assert!(drifted.is_none());
    }

    #[tokio::test]
    async fn test_serialization_failure_does_not_write() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir).await;
        let codec = JsonCodec::<Session>::new();

        cache.save("user", &session("u1"), &codec).await.unwrap();
        let err = cache
            .save("user", &session("u2"), &FailingCodec)
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontSDKError::Serialization(_)));
        assert_eq!(cache.get("user", &codec).await.unwrap(), Some(session("u1")));
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir).await;
        let err = cache
            .save("", &session("u1"), &JsonCodec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontSDKError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_entry_version_increases_per_write() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir).await;
        let codec = JsonCodec::<Session>::new();

        assert_eq!(cache.entry_version("user").await.unwrap(), None);
        cache.save("user", &session("u1"), &codec).await.unwrap();
        let v1 = cache.entry_version("user").await.unwrap().unwrap();
        cache.save("user", &session("u2"), &codec).await.unwrap();
        let v2 = cache.entry_version("user").await.unwrap().unwrap();
        assert!(v2 > v1);

        cache.remove("user").await.unwrap();
        assert_eq!(cache.entry_version("user").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_observe_replays_latest_value() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir).await;
        let codec = JsonCodec::<Session>::new();

        cache.save("user", &session("u1"), &codec).await.unwrap();
        let mut stream = Box::pin(cache.observe("user", codec));
        assert_eq!(next_within(&mut stream).await, Some(session("u1")));

        cache.save("user", &session("u2"), &codec).await.unwrap();
        assert_eq!(next_within(&mut stream).await, Some(session("u2")));
    }

    #[tokio::test]
    async fn test_observers_are_broadcast() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir).await;
        let codec = JsonCodec::<Session>::new();

        let mut first = Box::pin(cache.observe("user", codec));
        let mut second = Box::pin(cache.observe("user", codec));
        assert_eq!(next_within(&mut first).await, None);
        assert_eq!(next_within(&mut second).await, None);

        cache.save("user", &session("u1"), &codec).await.unwrap();
        assert_eq!(next_within(&mut first).await, Some(session("u1")));
        assert_eq!(next_within(&mut second).await, Some(session("u1")));
    }

    #[tokio::test]
    async fn test_remove_and_clear_notify_observers() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir).await;
        let codec = JsonCodec::<Session>::new();

        cache.save("a", &session("a"), &codec).await.unwrap();
        cache.save("b", &session("b"), &codec).await.unwrap();
        let mut a = Box::pin(cache.observe("a", codec));
        let mut b = Box::pin(cache.observe("b", codec));
        assert!(next_within(&mut a).await.is_some());
        assert!(next_within(&mut b).await.is_some());

        cache.remove("a").await.unwrap();
        assert_eq!(next_within(&mut a).await, None);
        assert!(cache.get("a", &codec).await.unwrap().is_none());

        cache.clear().await.unwrap();
        assert_eq!(next_within(&mut b).await, None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_observe_emits_none_on_schema_drift() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir).await;

        let mut stream = Box::pin(cache.observe("counter", JsonCodec::<Counter>::new()));
        assert_eq!(next_within(&mut stream).await, None);

        cache
            .save("counter", &session("u1"), &JsonCodec::<Session>::new())
            .await
            .unwrap();
        assert_eq!(next_within(&mut stream).await, None);

        cache
            .save("counter", &Counter { count: 2 }, &JsonCodec::<Counter>::new())
            .await
            .unwrap();
        assert_eq!(next_within(&mut stream).await, Some(Counter { count: 2 }));
    }

    #[tokio::test]
    async fn test_unobserved_keys_hold_no_channel() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir).await;
        let codec = JsonCodec::<Session>::new();

        for i in 0..100 {
            let key = format!("k{}", i);
            cache.save(&key, &session("u1"), &codec).await.unwrap();
            cache.remove(&key).await.unwrap();
        }
        cache.save("kept", &session("u1"), &codec).await.unwrap();
        assert_eq!(cache.inner.slots.lock().len(), 0);

        // 订阅者离开后，下一次写入回收通道
        let stream = cache.observe("watched", codec);
        assert_eq!(cache.inner.slots.lock().len(), 1);
        drop(stream);
        cache.save("watched", &session("u2"), &codec).await.unwrap();
        assert_eq!(cache.inner.slots.lock().len(), 0);

        let mut stream = Box::pin(cache.observe("watched", codec));
        assert_eq!(next_within(&mut stream).await, Some(session("u2")));
    }

    #[tokio::test]
    async fn test_observe_empty_key_yields_single_none() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir).await;

        let values: Vec<Option<Session>> = cache
            .observe("", JsonCodec::<Session>::new())
            .collect()
            .await;
        assert_eq!(values, vec![None]);
        assert_eq!(cache.inner.slots.lock().len(), 0);
    }

    #[tokio::test]
    async fn test_save_is_durable_without_background_flush() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorefrontConfig::builder()
            .data_dir(temp_dir.path())
            .cache_flush_every_ms(None)
            .build();
        let codec = JsonCodec::<Session>::new();
        {
            let cache = ObjectCache::open(temp_dir.path(), &config).await.unwrap();
            cache.save("user", &session("u1"), &codec).await.unwrap();
        }
        let cache = ObjectCache::open(temp_dir.path(), &config).await.unwrap();
        assert_eq!(cache.get("user", &codec).await.unwrap(), Some(session("u1")));
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let codec = JsonCodec::<Session>::new();
        {
            let cache = open_cache(&temp_dir).await;
            cache.save("user", &session("u1"), &codec).await.unwrap();
        }
        let cache = open_cache(&temp_dir).await;
        assert_eq!(cache.get("user", &codec).await.unwrap(), Some(session("u1")));
    }
}
