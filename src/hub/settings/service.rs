//! 隐私设置服务层

use crate::hub::error::{ListError, ListResult};
use crate::hub::settings::dao::SettingsDao;
use crate::hub::settings::models::{PrivacyList, PrivacyMode, UserSettings};
use crate::hub::types::{is_valid_id, Actor};
use serde_json::Value;
use std::str::FromStr;
use tracing::info;

/// 隐私设置服务
#[derive(Clone)]
pub struct SettingsService {
    dao: SettingsDao,
}

/// 从 `{add: [...], remove: [...]}` 中取出合法 ID，两者都必须是数组
fn parse_list_updates(updates: &Value) -> ListResult<(Vec<String>, Vec<String>)> {
    let (Some(add), Some(remove)) = (
        updates.get("add").and_then(Value::as_array),
        updates.get("remove").and_then(Value::as_array),
    ) else {
        return Err(ListError::validation("add/remove 必须为数组"));
    };
    let valid_ids = |values: &Vec<Value>| -> Vec<String> {
        values
            .iter()
            .filter_map(Value::as_str)
            .filter(|id| is_valid_id(id))
            .map(str::to_string)
            .collect()
    };
    Ok((valid_ids(add), valid_ids(remove)))
}

impl SettingsService {
    pub fn new(dao: SettingsDao) -> Self {
        Self { dao }
    }

    /// 获取请求方的设置，未记录时返回默认值
    pub async fn get_settings(&self, actor: &Actor) -> ListResult<UserSettings> {
        Ok(self
            .dao
            .find(&actor.user_id)
            .await?
            .unwrap_or_else(|| UserSettings::defaults_for(&actor.user_id)))
    }

    /// 设置隐私模式（`public` / `private`）
    pub async fn set_privacy(&self, actor: &Actor, mode: &str) -> ListResult<UserSettings> {
        let mode = PrivacyMode::from_str(mode)?;
        self.dao.upsert_mode(&actor.user_id, mode).await?;
        info!("[Settings] 用户 {} 隐私模式设置为 {}", actor.user_id, mode.as_str());
        self.get_settings(actor).await
    }

    /// 批量更新隐私名单
    pub async fn update_privacy_list(
        &self,
        actor: &Actor,
        list: &str,
        updates: &Value,
    ) -> ListResult<UserSettings> {
        let list = PrivacyList::from_str(list)?;
        let (add, remove) = parse_list_updates(updates)?;
        self.dao
            .update_list(&actor.user_id, list, &add, &remove)
            .await?;
        info!(
            "[Settings] 用户 {} 更新 {}：添加 {} 个，移除 {} 个",
            actor.user_id,
            list,
            add.len(),
            remove.len()
        );
        self.get_settings(actor).await
    }

    pub fn dao(&self) -> &SettingsDao {
        &self.dao
    }
}
