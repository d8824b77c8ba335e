//! 单测公共工具：日志初始化与临时 SQLite 数据库

use crate::hub::db::create_sqlite_pool_with_migration;
use crate::hub::types::{new_id, Actor};
use crate::hub::user::{User, UserDao};
use sqlx::{Pool, Sqlite};
use std::sync::Once;
use tempfile::TempDir;

static INIT_LOGGER: Once = Once::new();

pub(crate) fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::EnvFilter;

        // 测试中默认打开当前 crate 的 debug，sqlx 只保留 warn
        let filter_layer = EnvFilter::new("info,sharelist_core_rust=debug,sqlx=warn");

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_test_writer();

        let _ = tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .try_init();
    });
}

/// 临时数据库（目录随值一起释放）
pub(crate) struct TestDb {
    _dir: TempDir,
    pub pool: Pool<Sqlite>,
    pub url: String,
}

pub(crate) async fn test_db() -> TestDb {
    init_test_logger();
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    let pool = create_sqlite_pool_with_migration(&url, 5)
        .await
        .expect("初始化测试数据库失败");
    TestDb {
        _dir: dir,
        pool,
        url,
    }
}

/// 直接写入一个用户并返回对应的请求方
pub(crate) async fn seed_user(pool: &Pool<Sqlite>, name: &str) -> Actor {
    let user = User {
        id: new_id(),
        name: name.to_string(),
        icon: "placeholder".to_string(),
        username: Some(name.to_lowercase()),
    };
    let mail = format!("{}@test.com", name.to_lowercase());
    UserDao::new(pool.clone())
        .insert_user_with_mail(&user, &mail)
        .await
        .expect("写入测试用户失败");
    Actor {
        user_id: user.id,
        name: user.name,
        icon: user.icon,
    }
}
