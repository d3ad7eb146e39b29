//! Resource - 仓库层统一的返回契约
//!
//! 仓库的每个可失败操作都返回 `Resource<T>`，UI 层只需要区分 Success / Error，
//! 不需要处理具体错误类型。唯一的例外是取消：取消永远以 `Err(Cancelled)` 向上传播。

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{classify, Result, StorefrontSDKError};

/// 两种结果之一：成功值，或者可展示给用户的错误文案
#[derive(Debug, Clone, PartialEq)]
pub enum Resource<T> {
    Success(T),
    Error(String),
}

impl<T> Resource<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Resource::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Resource::Error(_))
    }

    pub fn data_or_null(&self) -> Option<&T> {
        match self {
            Resource::Success(data) => Some(data),
            Resource::Error(_) => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Resource::Success(data) => Some(data),
            Resource::Error(_) => None,
        }
    }

    pub fn error_or_null(&self) -> Option<&str> {
        match self {
            Resource::Success(_) => None,
            Resource::Error(message) => Some(message.as_str()),
        }
    }

    /// 成功时调用 `f`，原样返回自身便于链式调用
    pub fn on_success<F: FnOnce(&T)>(self, f: F) -> Self {
        if let Resource::Success(data) = &self {
            f(data);
        }
        self
    }

    /// 失败时调用 `f`
    pub fn on_error<F: FnOnce(&str)>(self, f: F) -> Self {
        if let Resource::Error(message) = &self {
            f(message);
        }
        self
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Resource<U> {
        match self {
            Resource::Success(data) => Resource::Success(f(data)),
            Resource::Error(message) => Resource::Error(message),
        }
    }
}

/// 协作式取消标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("操作已取消")]
pub struct Cancelled;

/// 仓库方法的返回类型：取消走 Err，其余一切都在 Resource 里
pub type SyncResult<T> = std::result::Result<Resource<T>, Cancelled>;

/// 把内部 `Result` 转换为仓库契约
pub fn into_resource<T>(result: Result<T>) -> SyncResult<T> {
    match result {
        Ok(data) => Ok(Resource::Success(data)),
        Err(StorefrontSDKError::Cancelled) => Err(Cancelled),
        Err(e) => {
            debug!("[Resource] 操作失败: {}", e);
            Ok(Resource::Error(classify(&e)))
        }
    }
}

/// 执行 future 并把结果转换为仓库契约
pub async fn capture<T, F>(fut: F) -> SyncResult<T>
where
    F: Future<Output = Result<T>>,
{
    into_resource(fut.await)
}

/// 在 token 被取消时提前结束 `fut`
///
/// `fut` 被丢弃时停留在最后一次完成的事务上，不会留下半个批次。
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> SyncResult<T>
where
    F: Future<Output = SyncResult<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteError;
    use std::cell::Cell;

    #[test]
    fn test_combinators() {
        let ok: Resource<u32> = Resource::Success(3);
        assert!(ok.is_success());
        assert_eq!(ok.data_or_null(), Some(&3));
        assert_eq!(ok.error_or_null(), None);

        let err: Resource<u32> = Resource::Error("boom".to_string());
        assert!(err.is_error());
        assert_eq!(err.data_or_null(), None);
        assert_eq!(err.error_or_null(), Some("boom"));
        assert_eq!(err.clone().map(|v| v * 2), Resource::Error("boom".to_string()));
        assert_eq!(ok.clone().map(|v| v * 2), Resource::Success(6));
    }

    #[test]
    fn test_callbacks_only_fire_on_matching_variant() {
        let hits = Cell::new(0);
        Resource::Success(1)
            .on_success(|_| hits.set(hits.get() + 1))
            .on_error(|_| hits.set(hits.get() + 100));
        assert_eq!(hits.get(), 1);

        Resource::<u8>::Error("x".to_string())
            .on_success(|_| hits.set(hits.get() + 100))
            .on_error(|_| hits.set(hits.get() + 1));
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_cancellation_is_never_wrapped() {
        let result: SyncResult<()> = into_resource(Err(RemoteError::Cancelled.into()));
        assert_eq!(result, Err(Cancelled));

        let result: SyncResult<()> =
            into_resource(Err(RemoteError::Unavailable("offline".to_string()).into()));
        assert!(matches!(result, Ok(Resource::Error(_))));
    }

    #[tokio::test]
    async fn test_cancellable_stops_pending_work() {
        let token = CancellationToken::new();
        token.cancel();
        let result: SyncResult<u32> = cancellable(&token, async {
            futures::future::pending::<()>().await;
            Ok(Resource::Success(1))
        })
        .await;
        assert_eq!(result, Err(Cancelled));

        let live = CancellationToken::new();
        let result = cancellable(&live, capture(async { Ok::<_, StorefrontSDKError>(7) })).await;
        assert_eq!(result, Ok(Resource::Success(7)));
    }
}
