use std::fmt;

use crate::remote::RemoteError;

#[derive(Debug)]
pub enum StorefrontSDKError {
    SqliteError(rusqlite::Error),
    JsonError(String),
    InvalidArgument(String),
    NotFound(String),
    Other(String),
    KvStore(String),
    Serialization(String),
    IO(String),
    Database(String),
    Migration(String),
    Config(String),
    // 远端协作方错误（网络 / 服务端）
    Remote(RemoteError),
    // 协作式取消，永远不转换为 Resource::Error
    Cancelled,
}

impl fmt::Display for StorefrontSDKError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorefrontSDKError::SqliteError(e) => write!(f, "SQLite error: {}", e),
            StorefrontSDKError::JsonError(e) => write!(f, "JSON error: {}", e),
            StorefrontSDKError::InvalidArgument(e) => write!(f, "Invalid argument: {}", e),
            StorefrontSDKError::NotFound(e) => write!(f, "Not found: {}", e),
            StorefrontSDKError::Other(e) => write!(f, "Other error: {}", e),
            StorefrontSDKError::KvStore(e) => write!(f, "KV store error: {}", e),
            StorefrontSDKError::Serialization(e) => write!(f, "Serialization error: {}", e),
            StorefrontSDKError::IO(e) => write!(f, "IO error: {}", e),
            StorefrontSDKError::Database(e) => write!(f, "Database error: {}", e),
            StorefrontSDKError::Migration(e) => write!(f, "Migration error: {}", e),
            StorefrontSDKError::Config(e) => write!(f, "Config error: {}", e),
            StorefrontSDKError::Remote(e) => write!(f, "Remote error: {}", e),
            StorefrontSDKError::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::error::Error for StorefrontSDKError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorefrontSDKError::SqliteError(e) => Some(e),
            StorefrontSDKError::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StorefrontSDKError {
    fn from(error: rusqlite::Error) -> Self {
        StorefrontSDKError::SqliteError(error)
    }
}

impl From<serde_json::Error> for StorefrontSDKError {
    fn from(error: serde_json::Error) -> Self {
        StorefrontSDKError::JsonError(error.to_string())
    }
}

impl From<sled::Error> for StorefrontSDKError {
    fn from(error: sled::Error) -> Self {
        StorefrontSDKError::KvStore(error.to_string())
    }
}

impl From<std::io::Error> for StorefrontSDKError {
    fn from(error: std::io::Error) -> Self {
        StorefrontSDKError::IO(error.to_string())
    }
}

impl From<RemoteError> for StorefrontSDKError {
    fn from(error: RemoteError) -> Self {
        match error {
            RemoteError::Cancelled => StorefrontSDKError::Cancelled,
            other => StorefrontSDKError::Remote(other),
        }
    }
}

/// 错误分类（面向 UI 的稳定分类，而非具体错误类型）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 本地或远端均不存在请求的 id
    NotFound,
    /// 网络 / 后端不可达或超时
    RemoteUnavailable,
    /// 后端校验或权限失败
    RemoteRejected,
    /// 本地持久化 I/O 失败
    LocalStorageFailure,
    /// 写入时编解码失败
    SerializationFailure,
    /// 协作式取消
    Cancelled,
}

impl ErrorKind {
    /// 每种分类对应一条固定的、可直接展示给用户的文案
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "The requested item could not be found.",
            ErrorKind::RemoteUnavailable => {
                "Unable to reach the store right now. Please check your connection and try again."
            }
            ErrorKind::RemoteRejected => "The store could not complete this request.",
            ErrorKind::LocalStorageFailure => {
                "Something went wrong while saving data on this device."
            }
            ErrorKind::SerializationFailure => "The data could not be processed.",
            ErrorKind::Cancelled => "The operation was cancelled.",
        }
    }
}

impl StorefrontSDKError {
    /// 把具体错误归入分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorefrontSDKError::NotFound(_) => ErrorKind::NotFound,
            StorefrontSDKError::Remote(e) => match e {
                RemoteError::NotFound(_) => ErrorKind::NotFound,
                RemoteError::Rejected(_) => ErrorKind::RemoteRejected,
                RemoteError::Unavailable(_) | RemoteError::Timeout(_) => {
                    ErrorKind::RemoteUnavailable
                }
                RemoteError::Cancelled => ErrorKind::Cancelled,
            },
            StorefrontSDKError::JsonError(_) | StorefrontSDKError::Serialization(_) => {
                ErrorKind::SerializationFailure
            }
            StorefrontSDKError::Cancelled => ErrorKind::Cancelled,
            StorefrontSDKError::InvalidArgument(_) => ErrorKind::RemoteRejected,
            StorefrontSDKError::SqliteError(_)
            | StorefrontSDKError::KvStore(_)
            | StorefrontSDKError::IO(_)
            | StorefrontSDKError::Database(_)
            | StorefrontSDKError::Migration(_)
            | StorefrontSDKError::Config(_)
            | StorefrontSDKError::Other(_) => ErrorKind::LocalStorageFailure,
        }
    }

    /// 判断是否是取消
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StorefrontSDKError::Cancelled)
    }
}

/// 统一的错误文案出口，仓库层所有失败都经过这里
pub fn classify(error: &StorefrontSDKError) -> String {
    error.kind().user_message().to_string()
}

pub type Result<T> = std::result::Result<T, StorefrontSDKError>;
