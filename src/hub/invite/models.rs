//! 邀请与通知模型

use crate::hub::invite::{is_email, parse_handle};
use crate::hub::types::{is_valid_id, UserId};
use crate::hub::user::models::User;
use serde::{Deserialize, Serialize};

/// 通知关联的实体类型
pub const ENTITY_LIST_INVITE: &str = "ListInvite";
/// 通知动作
pub const ACTION_INVITE: &str = "invite";

/// 邀请目标：用户 ID、`@用户名` 或邮箱
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum InviteTarget {
    Id(UserId),
    Handle(String),
    Email(String),
}

impl InviteTarget {
    /// 从原始字符串识别邀请目标，无法识别时返回 None
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if is_valid_id(raw) {
            Some(Self::Id(raw.to_string()))
        } else if let Some(handle) = parse_handle(raw) {
            Some(Self::Handle(handle.to_string()))
        } else if is_email(raw) {
            Some(Self::Email(raw.to_string()))
        } else {
            None
        }
    }
}

/// 待处理的清单邀请
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListInvite {
    #[serde(rename = "_id")]
    pub id: String,
    pub list_id: String,
    /// 邀请时的清单名称快照
    pub list_name: String,
    /// 邀请人快照
    pub inviting: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invited_id: Option<UserId>,
    /// 未注册用户的邮箱
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invited_mail: Option<String>,
    pub created: i64,
}

/// 用户通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNotification {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: UserId,
    pub read: bool,
    pub entity: String,
    pub action: String,
    /// 关联实体的 ID（例如 ListInvite）
    pub notification: String,
    pub created: i64,
}
