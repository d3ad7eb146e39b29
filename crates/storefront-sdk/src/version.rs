//! SDK 版本与运行时元信息
//!
//! - **SDK Version** → Cargo.toml（唯一权威源）
//! - **Migration Version** → migrations 文件（文件即版本，由 refinery 自动管理）

/// SDK semver，来自 Cargo.toml
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// git commit（由 vergen 在 build.rs 中生成，不在 git 仓库中构建时为 unknown）
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// build time（由 vergen 在 build.rs 中生成）
pub const BUILD_TIME: &str = match option_env!("VERGEN_BUILD_TIMESTAMP") {
    Some(ts) => ts,
    None => "unknown",
};

/// 当前 SDK 支持的最高数据库 migration 版本
///
/// 由 build.rs 扫描 migrations/ 下 V{version}__*.sql 取最大值生成。
/// 打开数据库时若 DB 版本 > 此值则拒绝（防降级导致 schema 不兼容）。
pub const SDK_DB_VERSION: i64 = parse_db_version(env!("SDK_DB_VERSION"));

/// 编译期解析版本号字符串（build.rs 只会输出纯数字）
const fn parse_db_version(s: &str) -> i64 {
    let b = s.as_bytes();
    let mut v = 0i64;
    let mut i = 0usize;
    while i < b.len() {
        if b[i] >= b'0' && b[i] <= b'9' {
            v = v * 10 + (b[i] - b'0') as i64;
        }
        i += 1;
    }
    v
}
