//! 服务配置
//!
//! 签名密钥等进程级配置在启动时构造并注入，不使用全局变量。

/// 默认 token 有效期（秒）
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 60 * 60;

/// 清单服务配置
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// SQLite 数据库 URL
    ///
    /// 例如：`sqlite://sharelist.db?mode=rwc`
    pub db_url: String,
    /// token 签名密钥
    pub token_key: String,
    /// token 有效期（秒）
    pub token_ttl_secs: u64,
    /// 连接池最大连接数
    pub max_connections: u32,
}

impl ServiceConfig {
    /// 创建默认配置
    pub fn new(db_url: impl Into<String>, token_key: impl Into<String>) -> Self {
        Self {
            db_url: db_url.into(),
            token_key: token_key.into(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            max_connections: 5,
        }
    }
}
