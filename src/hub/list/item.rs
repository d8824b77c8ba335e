//! 清单条目：新增、状态流转与属性修改

use crate::hub::error::{ListError, ListResult};
use crate::hub::list::dao;
use crate::hub::list::models::{ItemDetails, ItemStatus, ListItem};
use crate::hub::list::service::ListService;
use crate::hub::types::{new_id, now_millis, validate_id, Actor};
use anyhow::Context;
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::{debug, info};

const NAME_KEY: &str = "name";
const NOTES_KEY: &str = "notes";

/// 经过白名单过滤后的属性修改
#[derive(Debug, Default, PartialEq)]
pub struct AttributeUpdates {
    pub name: Option<String>,
    /// `notes` 下的路径与新值
    pub set_notes: Vec<(Vec<String>, Value)>,
    /// 要删除的 `notes` 路径，空路径表示清空整个 `notes`
    pub unset_notes: Vec<Vec<String>>,
}

impl AttributeUpdates {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.set_notes.is_empty() && self.unset_notes.is_empty()
    }

    /// 解析 `{changes: [{key, value}], deletions: [{key}]}`
    ///
    /// 两者必须都是数组；不认识的 key 被静默丢弃
    pub fn parse(updates: &Value) -> ListResult<Self> {
        let (Some(changes), Some(deletions)) = (
            updates.get("changes").and_then(Value::as_array),
            updates.get("deletions").and_then(Value::as_array),
        ) else {
            return Err(ListError::validation("changes/deletions 必须为数组"));
        };

        let mut parsed = Self::default();
        for change in changes {
            let Some(key) = change.get("key").and_then(Value::as_str) else {
                continue;
            };
            let value = match change.get("value") {
                None | Some(Value::Null) => continue,
                Some(v) => v,
            };
            if key == NAME_KEY {
                if let Some(name) = value.as_str().map(str::trim).filter(|n| !n.is_empty()) {
                    parsed.name = Some(name.to_string());
                }
            } else if let Some(path) = key.strip_prefix("notes.").and_then(split_path) {
                parsed.set_notes.push((path, value.clone()));
            } else {
                debug!("[ListItem] 忽略无法识别的修改 key: {}", key);
            }
        }

        for deletion in deletions {
            let Some(key) = deletion.get("key").and_then(Value::as_str) else {
                continue;
            };
            if key == NOTES_KEY {
                parsed.unset_notes.push(Vec::new());
            } else if let Some(path) = key.strip_prefix("notes.").and_then(split_path) {
                parsed.unset_notes.push(path);
            } else {
                debug!("[ListItem] 忽略无法识别的删除 key: {}", key);
            }
        }
        Ok(parsed)
    }

    /// 把修改应用到条目上（先设置后删除）
    pub fn apply(&self, item: &mut ListItem) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        for (path, value) in &self.set_notes {
            let notes = item
                .notes
                .get_or_insert_with(|| Value::Object(Map::new()));
            set_path(notes, path, value.clone());
        }
        for path in &self.unset_notes {
            if path.is_empty() {
                item.notes = None;
            } else if let Some(notes) = item.notes.as_mut() {
                unset_path(notes, path);
            }
        }
    }
}

fn split_path(path: &str) -> Option<Vec<String>> {
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    if segments.iter().any(String::is_empty) {
        None
    } else {
        Some(segments)
    }
}

/// 设置嵌套字段，缺失或非对象的中间节点会被替换为空对象
fn set_path(target: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut node = target;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        node = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(last.clone(), value);
    }
}

fn unset_path(target: &mut Value, path: &[String]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut node = target;
    for segment in parents {
        match node.get_mut(segment.as_str()) {
            Some(next) => node = next,
            None => return,
        }
    }
    if let Value::Object(map) = node {
        map.remove(last);
    }
}

impl ListService {
    /// 向清单添加条目，初始状态为 pending
    pub async fn add_item(
        &self,
        actor: &Actor,
        list_id: &str,
        payload: &Value,
    ) -> ListResult<ListItem> {
        let name = payload
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ListError::validation("缺少条目名称"))?;
        let notes = payload.get("notes").filter(|n| !n.is_null()).cloned();

        let list = self.resolve_list(actor, list_id).await?;
        let item = ListItem {
            id: new_id(),
            list_id: list.id.clone(),
            name: name.to_string(),
            status: ItemStatus::Pending,
            notes,
            details: ItemDetails {
                created: now_millis(),
                created_by: actor.user_id.clone(),
                updated: None,
                updated_by: None,
            },
        };
        self.dao.insert_item(&item).await?;
        self.dao.refresh_meta(&list.id).await?;
        info!(
            "[ListItem] 用户 {} 向清单 {} 添加条目 {} ({})",
            actor.user_id, list.id, item.id, item.name
        );
        Ok(item)
    }

    /// 修改条目状态，非法状态在任何写入之前被拒绝
    pub async fn update_status(
        &self,
        actor: &Actor,
        item_id: &str,
        status: &str,
    ) -> ListResult<ListItem> {
        let status = ItemStatus::from_str(status)?;
        let item_id = validate_id(item_id)?;
        let (list, _) = self.resolve_item(actor, item_id).await?;

        let item = self
            .dao
            .update_status(item_id, status, now_millis(), &actor.user_id)
            .await?
            .ok_or_else(|| ListError::not_found(format!("ListItem:{}", item_id)))?;
        self.dao.refresh_meta(&list.id).await?;
        info!(
            "[ListItem] 用户 {} 将条目 {} 状态改为 {}",
            actor.user_id,
            item.id,
            status.as_str()
        );
        Ok(item)
    }

    /// 修改条目的名称与 `notes` 嵌套字段（同一事务内完成）
    pub async fn update_attributes(
        &self,
        actor: &Actor,
        item_id: &str,
        updates: &Value,
    ) -> ListResult<ListItem> {
        let updates = AttributeUpdates::parse(updates)?;
        let item_id = validate_id(item_id)?;
        self.resolve_item(actor, item_id).await?;

        let mut tx = self.dao.begin().await?;
        let mut item = dao::load_item(&mut *tx, item_id)
            .await?
            .ok_or_else(|| ListError::not_found(format!("ListItem:{}", item_id)))?;
        updates.apply(&mut item);
        item.details.updated = Some(now_millis());
        item.details.updated_by = Some(actor.user_id.clone());
        dao::write_item_attributes(&mut *tx, &item).await?;
        tx.commit().await.context("提交事务失败")?;

        info!(
            "[ListItem] 用户 {} 修改条目 {} 属性：设置 {} 项，删除 {} 项",
            actor.user_id,
            item.id,
            updates.set_notes.len() + usize::from(updates.name.is_some()),
            updates.unset_notes.len()
        );
        Ok(item)
    }
}
