//! 用户数据访问层（DAO）

use crate::hub::db::placeholders;
use crate::hub::user::models::{MailLogin, User};
use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;
use tracing::debug;

/// 用户 DAO（基于 sqlx）
#[derive(Clone)]
pub struct UserDao {
    db: Pool<Sqlite>,
}

fn row_to_user(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        icon: row.get("icon"),
        username: row.get("username"),
    }
}

impl UserDao {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// 创建用户及其邮箱登录记录（同一事务）
    pub async fn insert_user_with_mail(&self, user: &User, mail: &str) -> Result<()> {
        let mut tx = self.db.begin().await.context("开启事务失败")?;
        sqlx::query("INSERT INTO users (id, name, icon, username) VALUES (?, ?, ?, ?)")
            .bind(&user.id)
            .bind(&user.name)
            .bind(&user.icon)
            .bind(&user.username)
            .execute(&mut *tx)
            .await
            .context("插入用户失败")?;
        sqlx::query("INSERT INTO mail_logins (mail, user_id) VALUES (?, ?)")
            .bind(mail)
            .bind(&user.id)
            .execute(&mut *tx)
            .await
            .context("插入邮箱登录失败")?;
        tx.commit().await.context("提交事务失败")?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, icon, username FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("查询用户失败")?;
        Ok(row.as_ref().map(row_to_user))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, icon, username FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.db)
            .await
            .context("按用户名查询用户失败")?;
        Ok(row.as_ref().map(row_to_user))
    }

    /// 批量查询用户，结果顺序与 `ids` 一致，不存在的 ID 被跳过
    pub async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id, name, icon, username FROM users WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(&self.db)
            .await
            .context("批量查询用户失败")?;

        let mut by_id: HashMap<String, User> = rows
            .iter()
            .map(row_to_user)
            .map(|u| (u.id.clone(), u))
            .collect();
        let users: Vec<User> = ids.iter().filter_map(|id| by_id.remove(id)).collect();
        debug!("[UserDAO] 批量查询用户 {} 个，命中 {} 个", ids.len(), users.len());
        Ok(users)
    }

    pub async fn find_login_by_mail(&self, mail: &str) -> Result<Option<MailLogin>> {
        let row = sqlx::query("SELECT mail, user_id FROM mail_logins WHERE mail = ?")
            .bind(mail)
            .fetch_optional(&self.db)
            .await
            .context("查询邮箱登录失败")?;
        Ok(row.map(|r| MailLogin {
            user_id: r.get("user_id"),
            mail: r.get("mail"),
        }))
    }

    /// 批量按邮箱查询登录记录
    pub async fn find_logins_by_mails(&self, mails: &[String]) -> Result<Vec<MailLogin>> {
        if mails.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT mail, user_id FROM mail_logins WHERE mail IN ({})",
            placeholders(mails.len())
        );
        let mut query = sqlx::query(&sql);
        for mail in mails {
            query = query.bind(mail);
        }
        let rows = query
            .fetch_all(&self.db)
            .await
            .context("批量查询邮箱登录失败")?;
        Ok(rows
            .into_iter()
            .map(|r| MailLogin {
                user_id: r.get("user_id"),
                mail: r.get("mail"),
            })
            .collect())
    }
}
