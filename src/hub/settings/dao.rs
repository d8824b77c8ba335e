//! 隐私设置数据访问层（DAO）

use crate::hub::db::placeholders;
use crate::hub::settings::models::{PrivacyList, PrivacyMode, UserSettings};
use anyhow::{Context, Result};
use sqlx::{Pool, Row, Sqlite, SqliteConnection};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, warn};

/// 隐私设置 DAO（基于 sqlx）
#[derive(Clone)]
pub struct SettingsDao {
    db: Pool<Sqlite>,
}

impl SettingsDao {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// 查询单个用户的设置，未记录时返回 None
    pub async fn find(&self, user_id: &str) -> Result<Option<UserSettings>> {
        Ok(self.find_many(&[user_id.to_string()]).await?.pop())
    }

    /// 批量查询设置，只返回有记录的用户
    pub async fn find_many(&self, user_ids: &[String]) -> Result<Vec<UserSettings>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let marks = placeholders(user_ids.len());

        let sql = format!(
            "SELECT user_id, privacy_mode FROM user_settings WHERE user_id IN ({})",
            marks
        );
        let mut query = sqlx::query(&sql);
        for id in user_ids {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(&self.db)
            .await
            .context("查询用户设置失败")?;

        let mut by_user: HashMap<String, UserSettings> = HashMap::new();
        for row in rows {
            let user_id: String = row.get("user_id");
            let mode: String = row.get("privacy_mode");
            let mut settings = UserSettings::defaults_for(&user_id);
            settings.privacy.mode = PrivacyMode::from_str(&mode).unwrap_or_else(|_| {
                warn!("[SettingsDAO] 用户 {} 的隐私模式无法识别: {}", user_id, mode);
                PrivacyMode::Public
            });
            by_user.insert(user_id, settings);
        }
        if by_user.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT user_id, list_kind, target_id FROM user_privacy_entries WHERE user_id IN ({})",
            marks
        );
        let mut query = sqlx::query(&sql);
        for id in user_ids {
            query = query.bind(id);
        }
        let entries = query
            .fetch_all(&self.db)
            .await
            .context("查询隐私名单失败")?;
        for row in entries {
            let user_id: String = row.get("user_id");
            let kind: String = row.get("list_kind");
            let Some(settings) = by_user.get_mut(&user_id) else {
                continue;
            };
            if let Ok(list) = PrivacyList::from_str(&kind) {
                settings.privacy.list_mut(list).insert(row.get("target_id"));
            }
        }

        let found: Vec<UserSettings> = user_ids
            .iter()
            .filter_map(|id| by_user.remove(id))
            .collect();
        debug!(
            "[SettingsDAO] 批量查询设置 {} 个，命中 {} 个",
            user_ids.len(),
            found.len()
        );
        Ok(found)
    }

    /// 更新隐私模式（不存在时创建）
    pub async fn upsert_mode(&self, user_id: &str, mode: PrivacyMode) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_settings (user_id, privacy_mode) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET privacy_mode = excluded.privacy_mode
            "#,
        )
        .bind(user_id)
        .bind(mode.as_str())
        .execute(&self.db)
        .await
        .context("更新隐私模式失败")?;
        Ok(())
    }

    /// 在同一事务内向隐私名单添加/移除用户（设置不存在时创建）
    pub async fn update_list(
        &self,
        user_id: &str,
        list: PrivacyList,
        add: &[String],
        remove: &[String],
    ) -> Result<()> {
        let mut tx = self.db.begin().await.context("开启事务失败")?;
        ensure_settings(&mut *tx, user_id).await?;
        for target in add {
            sqlx::query(
                "INSERT OR IGNORE INTO user_privacy_entries (user_id, list_kind, target_id) VALUES (?, ?, ?)",
            )
            .bind(user_id)
            .bind(list.as_str())
            .bind(target)
            .execute(&mut *tx)
            .await
            .context("添加隐私名单失败")?;
        }
        for target in remove {
            sqlx::query(
                "DELETE FROM user_privacy_entries WHERE user_id = ? AND list_kind = ? AND target_id = ?",
            )
            .bind(user_id)
            .bind(list.as_str())
            .bind(target)
            .execute(&mut *tx)
            .await
            .context("移除隐私名单失败")?;
        }
        tx.commit().await.context("提交事务失败")?;
        Ok(())
    }
}

async fn ensure_settings(conn: &mut SqliteConnection, user_id: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO user_settings (user_id, privacy_mode) VALUES (?, 'public')")
        .bind(user_id)
        .execute(conn)
        .await
        .context("创建用户设置失败")?;
    Ok(())
}
