//! 用户模型定义

use serde::{Deserialize, Serialize};

/// 用户
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// 邮箱登录记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailLogin {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub mail: String,
}

/// 注册结果（用户 + 已签发的 token）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}
