//! 数据库 Actor - 单线程数据库访问模型
//!
//! 核心设计：
//! - SQLite Connection 永远只在一个专用线程中
//! - 所有数据库操作以 job 的形式通过 channel 发送，按提交顺序逐个执行
//! - 调用方通过 oneshot 等待结果；调用方放弃等待时 job 仍会完整执行，事务不会被截断

use crossbeam_channel::{unbounded, Receiver, Sender};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::error::{Result, StorefrontSDKError};

/// 在 Actor 线程上执行的任务；未打开数据库时收到 Err
type DbJob = Box<dyn FnOnce(Result<&mut Connection>) + Send>;

/// 数据库命令
enum DbCommand {
    /// 打开数据库并执行迁移
    Open {
        db_path: PathBuf,
        respond_to: oneshot::Sender<Result<()>>,
    },

    /// 在连接上执行一个任务
    Run { label: &'static str, job: DbJob },

    /// 关闭数据库连接
    Close {
        respond_to: oneshot::Sender<Result<()>>,
    },

    /// 停止 Actor
    Shutdown,
}

/// 数据库 Actor（运行在独立线程）
struct DbActor {
    connection: Option<Connection>,
    receiver: Receiver<DbCommand>,
    thread_id: thread::ThreadId,
}

impl DbActor {
    fn new(receiver: Receiver<DbCommand>) -> Self {
        let thread_id = thread::current().id();
        info!("[DbActor Thread {:?}] 已启动", thread_id);
        Self {
            connection: None,
            receiver,
            thread_id,
        }
    }

    /// 运行 Actor 主循环
    fn run(mut self) {
        while let Ok(command) = self.receiver.recv() {
            match command {
                DbCommand::Shutdown => {
                    info!("[DbActor Thread {:?}] 收到停止信号", self.thread_id);
                    break;
                }

                DbCommand::Open {
                    db_path,
                    respond_to,
                } => {
                    let result = self.handle_open(&db_path);
                    let _ = respond_to.send(result);
                }

                DbCommand::Run { label, job } => {
                    debug!("[DbActor Thread {:?}] 执行: {}", self.thread_id, label);
                    match self.connection.as_mut() {
                        Some(conn) => job(Ok(conn)),
                        None => {
                            warn!("[DbActor] 数据库未打开，拒绝执行: {}", label);
                            job(Err(StorefrontSDKError::Database(
                                "数据库未打开".to_string(),
                            )))
                        }
                    }
                }

                DbCommand::Close { respond_to } => {
                    let result = self.handle_close();
                    let _ = respond_to.send(result);
                }
            }
        }

        if let Some(conn) = self.connection.take() {
            if let Err((_, e)) = conn.close() {
                error!("[DbActor] 关闭连接失败: {}", e);
            }
        }
        info!("[DbActor Thread {:?}] 已停止", self.thread_id);
    }

    /// 处理：打开数据库（幂等）
    fn handle_open(&mut self, db_path: &Path) -> Result<()> {
        if self.connection.is_some() {
            info!("[DbActor] 数据库已打开，跳过: {}", db_path.display());
            return Ok(());
        }

        let mut conn = Connection::open(db_path).map_err(|e| {
            error!(
                "[DbActor Thread {:?}] 打开数据库失败: path={}, error={}",
                self.thread_id,
                db_path.display(),
                e
            );
            StorefrontSDKError::Database(format!("打开数据库失败: {}", e))
        })?;

        crate::storage::migrate::init_db(&mut conn)?;

        info!(
            "[DbActor Thread {:?}] 数据库初始化完成: {}",
            self.thread_id,
            db_path.display()
        );
        self.connection = Some(conn);
        Ok(())
    }

    fn handle_close(&mut self) -> Result<()> {
        match self.connection.take() {
            Some(conn) => conn
                .close()
                .map_err(|(_, e)| StorefrontSDKError::Database(format!("关闭数据库失败: {}", e))),
            None => Ok(()),
        }
    }
}

/// 数据库 Actor 句柄（用于异步调用）
#[derive(Clone)]
pub struct DbActorHandle {
    sender: Sender<DbCommand>,
}

impl std::fmt::Debug for DbActorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbActorHandle")
            .field("sender", &"<channel>")
            .finish()
    }
}

impl DbActorHandle {
    /// 启动 DB Actor 线程
    pub fn spawn() -> Result<Self> {
        let (sender, receiver) = unbounded();

        thread::Builder::new()
            .name("storefront-db".to_string())
            .spawn(move || {
                let actor = DbActor::new(receiver);
                actor.run();
            })
            .map_err(|e| StorefrontSDKError::IO(format!("无法启动 DB Actor 线程: {}", e)))?;

        Ok(Self { sender })
    }

    /// 打开数据库并执行迁移
    pub async fn open(&self, db_path: PathBuf) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(DbCommand::Open {
                db_path,
                respond_to: tx,
            })
            .map_err(|_| StorefrontSDKError::Other("DB Actor 已停止".to_string()))?;
        rx.await
            .map_err(|_| StorefrontSDKError::Other("DB Actor 响应失败".to_string()))?
    }

    /// 在 Actor 线程上执行 `f` 并等待结果
    pub async fn call<R, F>(&self, label: &'static str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: DbJob = Box::new(move |conn| {
            let result = conn.and_then(f);
            let _ = tx.send(result);
        });

        self.sender
            .send(DbCommand::Run { label, job })
            .map_err(|_| {
                error!("[DbActorHandle] 发送命令失败: {}", label);
                StorefrontSDKError::Other("DB Actor 已停止".to_string())
            })?;

        rx.await
            .map_err(|_| StorefrontSDKError::Other("DB Actor 响应失败".to_string()))?
    }

    /// 关闭数据库连接（Actor 线程继续运行）
    pub async fn close(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(DbCommand::Close { respond_to: tx })
            .map_err(|_| StorefrontSDKError::Other("DB Actor 已停止".to_string()))?;
        rx.await
            .map_err(|_| StorefrontSDKError::Other("DB Actor 响应失败".to_string()))?
    }

    /// 停止 DB Actor
    pub fn shutdown(&self) {
        let _ = self.sender.send(DbCommand::Shutdown);
    }
}
