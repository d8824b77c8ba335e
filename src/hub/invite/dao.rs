//! 邀请与通知数据访问层（DAO）

use crate::hub::invite::models::{ListInvite, UserNotification};
use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite, SqliteConnection, Transaction};

/// 邀请 DAO（基于 sqlx）
#[derive(Clone)]
pub struct InviteDao {
    db: Pool<Sqlite>,
}

fn row_to_invite(row: &SqliteRow) -> Result<ListInvite> {
    let inviting: String = row.get("inviting");
    Ok(ListInvite {
        id: row.get("id"),
        list_id: row.get("list_id"),
        list_name: row.get("list_name"),
        inviting: serde_json::from_str(&inviting).context("解析邀请人快照失败")?,
        invited_id: row.get("invited_id"),
        invited_mail: row.get("invited_mail"),
        created: row.get("created"),
    })
}

fn row_to_notification(row: &SqliteRow) -> UserNotification {
    let read: i64 = row.get("read");
    UserNotification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        read: read != 0,
        entity: row.get("entity"),
        action: row.get("action"),
        notification: row.get("notification_ref"),
        created: row.get("created"),
    }
}

const INVITE_COLUMNS: &str = "id, list_id, list_name, inviting, invited_id, invited_mail, created";
const NOTIFICATION_COLUMNS: &str =
    "id, user_id, read, entity, action, notification_ref, created";

impl InviteDao {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.db.begin().await.context("开启事务失败")
    }

    pub async fn find_invite(&self, id: &str) -> Result<Option<ListInvite>> {
        let sql = format!("SELECT {} FROM list_invites WHERE id = ?", INVITE_COLUMNS);
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("查询邀请失败")?
            .as_ref()
            .map(row_to_invite)
            .transpose()
    }

    /// 发给某用户的全部邀请（按创建时间）
    pub async fn find_invites_for_user(&self, user_id: &str) -> Result<Vec<ListInvite>> {
        let sql = format!(
            "SELECT {} FROM list_invites WHERE invited_id = ? ORDER BY created, rowid",
            INVITE_COLUMNS
        );
        sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await
            .context("查询用户邀请失败")?
            .iter()
            .map(row_to_invite)
            .collect()
    }

    /// 发给某邮箱的邀请
    pub async fn find_invites_for_mail(&self, mail: &str) -> Result<Vec<ListInvite>> {
        let sql = format!(
            "SELECT {} FROM list_invites WHERE invited_mail = ? ORDER BY created, rowid",
            INVITE_COLUMNS
        );
        sqlx::query(&sql)
            .bind(mail)
            .fetch_all(&self.db)
            .await
            .context("查询邮箱邀请失败")?
            .iter()
            .map(row_to_invite)
            .collect()
    }

    /// 某清单上仍未处理的邀请
    pub async fn find_invites_for_list(&self, list_id: &str) -> Result<Vec<ListInvite>> {
        let sql = format!(
            "SELECT {} FROM list_invites WHERE list_id = ? ORDER BY created, rowid",
            INVITE_COLUMNS
        );
        sqlx::query(&sql)
            .bind(list_id)
            .fetch_all(&self.db)
            .await
            .context("查询清单邀请失败")?
            .iter()
            .map(row_to_invite)
            .collect()
    }

    pub async fn find_notification(&self, id: &str) -> Result<Option<UserNotification>> {
        let sql = format!(
            "SELECT {} FROM user_notifications WHERE id = ?",
            NOTIFICATION_COLUMNS
        );
        Ok(sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("查询通知失败")?
            .as_ref()
            .map(row_to_notification))
    }

    pub async fn find_notifications(&self, user_id: &str) -> Result<Vec<UserNotification>> {
        let sql = format!(
            "SELECT {} FROM user_notifications WHERE user_id = ? ORDER BY created, rowid",
            NOTIFICATION_COLUMNS
        );
        Ok(sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await
            .context("查询用户通知失败")?
            .iter()
            .map(row_to_notification)
            .collect())
    }

    pub async fn mark_read(&self, id: &str) -> Result<u64> {
        Ok(sqlx::query("UPDATE user_notifications SET read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await
            .context("更新通知状态失败")?
            .rows_affected())
    }
}

pub async fn insert_invite(conn: &mut SqliteConnection, invite: &ListInvite) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO list_invites (
            id, list_id, list_name, inviting, invited_id, invited_mail, created
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&invite.id)
    .bind(&invite.list_id)
    .bind(&invite.list_name)
    .bind(serde_json::to_string(&invite.inviting).context("序列化邀请人快照失败")?)
    .bind(&invite.invited_id)
    .bind(&invite.invited_mail)
    .bind(invite.created)
    .execute(&mut *conn)
    .await
    .context("插入邀请失败")?;
    Ok(())
}

pub async fn insert_notification(
    conn: &mut SqliteConnection,
    notification: &UserNotification,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_notifications (
            id, user_id, read, entity, action, notification_ref, created
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&notification.id)
    .bind(&notification.user_id)
    .bind(notification.read)
    .bind(&notification.entity)
    .bind(&notification.action)
    .bind(&notification.notification)
    .bind(notification.created)
    .execute(&mut *conn)
    .await
    .context("插入通知失败")?;
    Ok(())
}

pub async fn delete_invite(conn: &mut SqliteConnection, id: &str) -> Result<u64> {
    Ok(sqlx::query("DELETE FROM list_invites WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("删除邀请失败")?
        .rows_affected())
}

/// 将引用某实体的通知标记为已读
pub async fn mark_read_by_ref(
    conn: &mut SqliteConnection,
    user_id: &str,
    notification_ref: &str,
) -> Result<u64> {
    Ok(sqlx::query(
        "UPDATE user_notifications SET read = 1 WHERE user_id = ? AND notification_ref = ?",
    )
    .bind(user_id)
    .bind(notification_ref)
    .execute(&mut *conn)
    .await
    .context("更新通知状态失败")?
    .rows_affected())
}

/// 清单被删除时丢弃它的全部邀请，相关通知标记为已读，返回删除的邀请数
pub async fn discard_list_invites(conn: &mut SqliteConnection, list_id: &str) -> Result<u64> {
    sqlx::query(
        "UPDATE user_notifications SET read = 1 WHERE notification_ref IN (SELECT id FROM list_invites WHERE list_id = ?)",
    )
    .bind(list_id)
    .execute(&mut *conn)
    .await
    .context("更新通知状态失败")?;
    Ok(sqlx::query("DELETE FROM list_invites WHERE list_id = ?")
        .bind(list_id)
        .execute(&mut *conn)
        .await
        .context("删除清单邀请失败")?
        .rows_affected())
}
