//! 清单本地模型定义

use crate::hub::error::{ListError, ListResult};
use crate::hub::types::UserId;
use crate::hub::user::models::User;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// 清单条目状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Checked,
    Deleted,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Checked => "checked",
            Self::Deleted => "deleted",
        }
    }
}

impl FromStr for ItemStatus {
    type Err = ListError;

    fn from_str(s: &str) -> ListResult<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "checked" => Ok(Self::Checked),
            "deleted" => Ok(Self::Deleted),
            other => Err(ListError::validation(format!("非法条目状态: {}", other))),
        }
    }
}

/// 清单统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMeta {
    /// 未删除的条目数
    pub total: i64,
    /// 已勾选的条目数
    pub checked: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDetails {
    #[serde(rename = "createdBy")]
    pub created_by: UserId,
}

/// `invited` 字段中的邀请记录
///
/// 只记录邀请经过，不授予访问权限
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InvitedMarker {
    /// 等待对方处理的邀请
    Pending {
        #[serde(rename = "userID")]
        user_id: UserId,
    },
    /// 被对方隐私设置拒绝的邀请
    Denied {
        #[serde(rename = "userID")]
        user_id: UserId,
        date: i64,
    },
    /// 一次批量邀请的历史记录
    History {
        date: i64,
        #[serde(rename = "invitedBy")]
        invited_by: UserId,
        invites: Vec<UserId>,
    },
}

impl InvitedMarker {
    /// 记录所指向的用户（历史记录为 None）
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Pending { user_id } | Self::Denied { user_id, .. } => Some(user_id),
            Self::History { .. } => None,
        }
    }
}

/// 清单（待办/购物清单统一模型）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// 有访问权限的成员（有序、不重复）
    pub shared: Vec<UserId>,
    #[serde(default)]
    pub invited: Vec<InvitedMarker>,
    pub details: ListDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ListMeta>,
}

impl TodoList {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.shared.iter().any(|u| u == user_id)
    }
}

/// 成员已展开为用户信息的清单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulatedList {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub shared: Vec<User>,
    #[serde(default)]
    pub invited: Vec<InvitedMarker>,
    pub details: ListDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ListMeta>,
}

impl PopulatedList {
    pub fn new(list: TodoList, members: Vec<User>) -> Self {
        Self {
            id: list.id,
            name: list.name,
            shared: members,
            invited: list.invited,
            details: list.details,
            meta: list.meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    /// 创建时间（毫秒）
    pub created: i64,
    #[serde(rename = "createdBy")]
    pub created_by: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
    #[serde(rename = "updatedBy", default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<UserId>,
}

/// 清单条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub list_id: String,
    pub name: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Value>,
    pub details: ItemDetails,
}

/// 归档中的条目快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedItem {
    pub name: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Value>,
    pub details: ItemDetails,
}

impl From<&ListItem> for FinishedItem {
    fn from(item: &ListItem) -> Self {
        Self {
            name: item.name.clone(),
            status: item.status,
            notes: item.notes.clone(),
            details: item.details.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedDetails {
    #[serde(rename = "finishedOn")]
    pub finished_on: i64,
    #[serde(rename = "finishedBy")]
    pub finished_by: UserId,
}

/// 已完成清单的归档（创建后不再修改）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedList {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub users: Vec<User>,
    pub details: FinishedDetails,
    pub items: Vec<FinishedItem>,
}

/// 完成清单时的统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedSummary {
    pub archive: String,
    pub checked: usize,
    pub pending: usize,
}

/// 结转结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryOver {
    /// 新清单 ID
    pub list: String,
    /// 转移的条目数
    pub items: u64,
}

/// 完成清单的返回结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishReport {
    pub finished: FinishedSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carryover: Option<CarryOver>,
}

/// 完成清单选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishOptions {
    #[serde(default)]
    pub carryover: bool,
}

/// 删除清单选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveOptions {
    #[serde(default)]
    pub force: bool,
}
