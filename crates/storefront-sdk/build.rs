//! 编译期元信息：
//! - vergen 生成 VERGEN_GIT_SHA / VERGEN_BUILD_TIMESTAMP（供 version.rs 使用）
//! - SDK_DB_VERSION：migrations/ 下 V{version}__{name}.sql 的最大版本号

use std::fs;
use std::path::Path;

use vergen::EmitBuilder;

fn main() {
    // 不在 git 仓库中构建时 git 信息缺失，version.rs 会回退为 unknown
    let _ = EmitBuilder::builder()
        .build_timestamp()
        .git_sha(true)
        .emit();

    let migrations = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
    println!(
        "cargo:rustc-env=SDK_DB_VERSION={}",
        max_migration_version(&migrations)
    );
    println!("cargo:rerun-if-changed=migrations");
}

fn max_migration_version(dir: &Path) -> i64 {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| migration_version(&name))
        .max()
        .unwrap_or(0)
}

fn migration_version(file_name: &str) -> Option<i64> {
    let stem = file_name.strip_prefix('V')?.strip_suffix(".sql")?;
    let (version, _) = stem.split_once("__")?;
    version.parse().ok()
}
