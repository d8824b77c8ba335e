//! 邀请模块
//!
//! 按用户 ID、`@用户名` 或邮箱邀请用户加入清单，经过目标用户的隐私策略后
//! 分流为：直接加入、直接拒绝、或生成待处理邀请与通知。

pub mod dao;
pub mod listener;
pub mod models;
pub mod service;

use regex::Regex;
use std::sync::LazyLock;

pub use dao::InviteDao;
pub use listener::{EmptyInviteListener, InviteListener};
pub use models::{InviteTarget, ListInvite, UserNotification};
pub use service::InviteService;

#[allow(clippy::expect_used)]
static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]+@[^@]+$").expect("static regex should not panic"));

/// 宽松的邮箱判断：恰好一个 `@`，两侧均非空
pub fn is_email(s: &str) -> bool {
    EMAIL_REGEX.is_match(s)
}

/// 解析 `@用户名`，返回去掉前缀后的用户名
pub fn parse_handle(s: &str) -> Option<&str> {
    s.strip_prefix('@')
        .filter(|h| !h.is_empty() && !h.contains('@'))
}
