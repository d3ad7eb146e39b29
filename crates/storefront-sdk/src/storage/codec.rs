//! 编解码器 - 每个类型显式提供一对 encode / decode
//!
//! ObjectCache 只存文本，不做任何运行时类型发现；调用方在每个调用点传入 codec。

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StorefrontSDKError};

/// 一个类型的文本编解码器
pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<String>;

    fn decode(&self, text: &str) -> Result<T>;
}

/// 基于 serde_json 的编解码器
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Copy for JsonCodec<T> {}

impl<T> std::fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonCodec")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Codec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<String> {
        serde_json::to_string(value)
            .map_err(|e| StorefrontSDKError::Serialization(format!("序列化值失败: {}", e)))
    }

    fn decode(&self, text: &str) -> Result<T> {
        serde_json::from_str(text)
            .map_err(|e| StorefrontSDKError::Serialization(format!("反序列化值失败: {}", e)))
    }
}
