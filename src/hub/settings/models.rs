//! 隐私设置模型定义

use crate::hub::error::{ListError, ListResult};
use crate::hub::types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// 隐私模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyMode {
    #[default]
    Public,
    Private,
}

impl PrivacyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl FromStr for PrivacyMode {
    type Err = ListError;

    fn from_str(s: &str) -> ListResult<Self> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(ListError::validation(format!("非法隐私模式: {}", other))),
        }
    }
}

/// 隐私名单类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrivacyList {
    /// 黑名单：邀请自动拒绝
    Blacklisted,
    /// 白名单：邀请自动接受
    Whitelisted,
    /// 私密模式下仍允许邀请的用户
    Allowed,
}

impl PrivacyList {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blacklisted => "blacklisted",
            Self::Whitelisted => "whitelisted",
            Self::Allowed => "allowed",
        }
    }
}

impl FromStr for PrivacyList {
    type Err = ListError;

    fn from_str(s: &str) -> ListResult<Self> {
        match s {
            "blacklisted" => Ok(Self::Blacklisted),
            "whitelisted" => Ok(Self::Whitelisted),
            "allowed" => Ok(Self::Allowed),
            other => Err(ListError::validation(format!("非法隐私名单: {}", other))),
        }
    }
}

impl fmt::Display for PrivacyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 隐私配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privacy {
    #[serde(default)]
    pub mode: PrivacyMode,
    #[serde(default)]
    pub blacklisted: BTreeSet<UserId>,
    #[serde(default)]
    pub whitelisted: BTreeSet<UserId>,
    #[serde(default)]
    pub allowed: BTreeSet<UserId>,
}

impl Privacy {
    pub fn list_mut(&mut self, list: PrivacyList) -> &mut BTreeSet<UserId> {
        match list {
            PrivacyList::Blacklisted => &mut self.blacklisted,
            PrivacyList::Whitelisted => &mut self.whitelisted,
            PrivacyList::Allowed => &mut self.allowed,
        }
    }
}

/// 用户设置（ID 与用户 ID 相同）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub privacy: Privacy,
}

impl UserSettings {
    /// 未记录过设置的用户使用的默认值
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            id: user_id.to_string(),
            privacy: Privacy::default(),
        }
    }
}
