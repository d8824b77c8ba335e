//! 清单数据访问层（DAO）
//!
//! 负责清单、成员、条目与归档的数据库操作。多步写操作以 `&mut SqliteConnection`
//! 为参数的函数形式提供，调用方可以在同一事务中组合使用。

use crate::hub::list::models::{
    FinishedDetails, FinishedList, InvitedMarker, ItemDetails, ItemStatus, ListDetails, ListItem,
    ListMeta, TodoList,
};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite, SqliteConnection, Transaction};
use std::str::FromStr;
use tracing::debug;

/// 清单 DAO（基于 sqlx）
#[derive(Clone)]
pub struct ListDao {
    db: Pool<Sqlite>,
}

fn row_to_item(row: &SqliteRow) -> Result<ListItem> {
    let status: String = row.get("status");
    let notes: Option<String> = row.get("notes");
    let notes = notes
        .map(|n| serde_json::from_str::<Value>(&n))
        .transpose()
        .context("解析条目 notes 失败")?;
    Ok(ListItem {
        id: row.get("id"),
        list_id: row.get("list_id"),
        name: row.get("name"),
        status: ItemStatus::from_str(&status)
            .map_err(|_| anyhow!("无法识别的条目状态: {}", status))?,
        notes,
        details: ItemDetails {
            created: row.get("created"),
            created_by: row.get("created_by"),
            updated: row.get("updated"),
            updated_by: row.get("updated_by"),
        },
    })
}

const ITEM_COLUMNS: &str =
    "id, list_id, name, status, notes, created, created_by, updated, updated_by";

impl ListDao {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// 开启事务
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.db.begin().await.context("开启事务失败")
    }

    pub async fn find_list(&self, id: &str) -> Result<Option<TodoList>> {
        let mut conn = self.db.acquire().await.context("获取数据库连接失败")?;
        load_list(&mut conn, id).await
    }

    /// 查询用户作为成员的所有清单
    pub async fn find_lists_for_user(&self, user_id: &str) -> Result<Vec<TodoList>> {
        let mut conn = self.db.acquire().await.context("获取数据库连接失败")?;
        let ids: Vec<String> = sqlx::query(
            "SELECT list_id FROM list_members WHERE user_id = ? ORDER BY seq",
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await
        .context("查询用户清单失败")?
        .into_iter()
        .map(|r| r.get("list_id"))
        .collect();

        let mut lists = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(list) = load_list(&mut conn, id).await? {
                lists.push(list);
            }
        }
        debug!("[ListDAO] 用户 {} 共有 {} 个清单", user_id, lists.len());
        Ok(lists)
    }

    /// 创建清单及其成员
    pub async fn insert_list(&self, list: &TodoList) -> Result<()> {
        let mut tx = self.begin().await?;
        insert_list(&mut *tx, list).await?;
        tx.commit().await.context("提交事务失败")?;
        Ok(())
    }

    pub async fn update_name(&self, id: &str, name: &str) -> Result<()> {
        sqlx::query("UPDATE todo_lists SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.db)
            .await
            .context("更新清单名称失败")?;
        Ok(())
    }

    /// 重新计算清单统计（未删除总数 / 已勾选数）
    pub async fn refresh_meta(&self, list_id: &str) -> Result<ListMeta> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status != 'deleted' THEN 1 ELSE 0 END), 0) AS total,
                COALESCE(SUM(CASE WHEN status = 'checked' THEN 1 ELSE 0 END), 0) AS checked
            FROM list_items
            WHERE list_id = ?
            "#,
        )
        .bind(list_id)
        .fetch_one(&self.db)
        .await
        .context("统计清单条目失败")?;
        let meta = ListMeta {
            total: row.get("total"),
            checked: row.get("checked"),
        };

        sqlx::query("UPDATE todo_lists SET meta_total = ?, meta_checked = ? WHERE id = ?")
            .bind(meta.total)
            .bind(meta.checked)
            .bind(list_id)
            .execute(&self.db)
            .await
            .context("更新清单统计失败")?;
        debug!(
            "[ListDAO] 清单 {} 统计更新: total={}, checked={}",
            list_id, meta.total, meta.checked
        );
        Ok(meta)
    }

    pub async fn find_items(&self, list_id: &str) -> Result<Vec<ListItem>> {
        let mut conn = self.db.acquire().await.context("获取数据库连接失败")?;
        load_items(&mut conn, list_id).await
    }

    pub async fn find_item(&self, id: &str) -> Result<Option<ListItem>> {
        let mut conn = self.db.acquire().await.context("获取数据库连接失败")?;
        load_item(&mut conn, id).await
    }

    pub async fn insert_item(&self, item: &ListItem) -> Result<()> {
        let notes = item
            .notes
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("序列化条目 notes 失败")?;
        sqlx::query(
            r#"
            INSERT INTO list_items (
                id, list_id, name, status, notes, created, created_by, updated, updated_by
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.list_id)
        .bind(&item.name)
        .bind(item.status.as_str())
        .bind(notes)
        .bind(item.details.created)
        .bind(&item.details.created_by)
        .bind(item.details.updated)
        .bind(&item.details.updated_by)
        .execute(&self.db)
        .await
        .context("插入清单条目失败")?;
        Ok(())
    }

    /// 更新条目状态并记录更新人，返回更新后的条目
    pub async fn update_status(
        &self,
        id: &str,
        status: ItemStatus,
        updated: i64,
        updated_by: &str,
    ) -> Result<Option<ListItem>> {
        let mut conn = self.db.acquire().await.context("获取数据库连接失败")?;
        sqlx::query(
            "UPDATE list_items SET status = ?, updated = ?, updated_by = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(updated)
        .bind(updated_by)
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("更新条目状态失败")?;
        load_item(&mut conn, id).await
    }

    pub async fn find_finished(&self, id: &str) -> Result<Option<FinishedList>> {
        let row = sqlx::query(
            "SELECT id, name, users, finished_on, finished_by, items FROM finished_lists WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("查询归档失败")?;
        let Some(row) = row else {
            return Ok(None);
        };
        let users: String = row.get("users");
        let items: String = row.get("items");
        Ok(Some(FinishedList {
            id: row.get("id"),
            name: row.get("name"),
            users: serde_json::from_str(&users).context("解析归档用户失败")?,
            details: FinishedDetails {
                finished_on: row.get("finished_on"),
                finished_by: row.get("finished_by"),
            },
            items: serde_json::from_str(&items).context("解析归档条目失败")?,
        }))
    }
}

/// 读取清单（含成员与邀请记录）
pub async fn load_list(conn: &mut SqliteConnection, id: &str) -> Result<Option<TodoList>> {
    let row = sqlx::query(
        "SELECT id, name, created_by, meta_total, meta_checked FROM todo_lists WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .context("查询清单失败")?;
    let Some(row) = row else {
        return Ok(None);
    };

    let shared: Vec<String> =
        sqlx::query("SELECT user_id FROM list_members WHERE list_id = ? ORDER BY seq")
            .bind(id)
            .fetch_all(&mut *conn)
            .await
            .context("查询清单成员失败")?
            .into_iter()
            .map(|r| r.get("user_id"))
            .collect();

    let invited = sqlx::query("SELECT marker FROM list_invited WHERE list_id = ? ORDER BY seq")
        .bind(id)
        .fetch_all(&mut *conn)
        .await
        .context("查询邀请记录失败")?
        .into_iter()
        .map(|r| {
            let marker: String = r.get("marker");
            serde_json::from_str::<InvitedMarker>(&marker).context("解析邀请记录失败")
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(TodoList {
        id: row.get("id"),
        name: row.get("name"),
        shared,
        invited,
        details: ListDetails {
            created_by: row.get("created_by"),
        },
        meta: Some(ListMeta {
            total: row.get("meta_total"),
            checked: row.get("meta_checked"),
        }),
    }))
}

pub async fn insert_list(conn: &mut SqliteConnection, list: &TodoList) -> Result<()> {
    let meta = list.meta.unwrap_or_default();
    sqlx::query(
        "INSERT INTO todo_lists (id, name, created_by, meta_total, meta_checked) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&list.id)
    .bind(&list.name)
    .bind(&list.details.created_by)
    .bind(meta.total)
    .bind(meta.checked)
    .execute(&mut *conn)
    .await
    .context("插入清单失败")?;
    add_members(&mut *conn, &list.id, &list.shared).await?;
    push_invited(&mut *conn, &list.id, &list.invited).await?;
    Ok(())
}

/// 以集合语义添加成员，返回实际新增的数量
pub async fn add_members(
    conn: &mut SqliteConnection,
    list_id: &str,
    user_ids: &[String],
) -> Result<u64> {
    let mut added = 0;
    for user_id in user_ids {
        added += sqlx::query("INSERT OR IGNORE INTO list_members (list_id, user_id) VALUES (?, ?)")
            .bind(list_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .context("添加清单成员失败")?
            .rows_affected();
    }
    Ok(added)
}

pub async fn remove_member(conn: &mut SqliteConnection, list_id: &str, user_id: &str) -> Result<u64> {
    Ok(
        sqlx::query("DELETE FROM list_members WHERE list_id = ? AND user_id = ?")
            .bind(list_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .context("移除清单成员失败")?
            .rows_affected(),
    )
}

pub async fn count_members(conn: &mut SqliteConnection, list_id: &str) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM list_members WHERE list_id = ?")
        .bind(list_id)
        .fetch_one(&mut *conn)
        .await
        .context("统计清单成员失败")?;
    Ok(row.get("n"))
}

/// 追加邀请记录
pub async fn push_invited(
    conn: &mut SqliteConnection,
    list_id: &str,
    markers: &[InvitedMarker],
) -> Result<()> {
    for marker in markers {
        let json = serde_json::to_string(marker).context("序列化邀请记录失败")?;
        sqlx::query("INSERT INTO list_invited (list_id, user_id, marker) VALUES (?, ?, ?)")
            .bind(list_id)
            .bind(marker.user_id())
            .bind(json)
            .execute(&mut *conn)
            .await
            .context("追加邀请记录失败")?;
    }
    Ok(())
}

/// 移除某用户的待处理邀请记录
pub async fn pull_pending(conn: &mut SqliteConnection, list_id: &str, user_id: &str) -> Result<u64> {
    Ok(sqlx::query(
        "DELETE FROM list_invited WHERE list_id = ? AND user_id = ? AND json_extract(marker, '$.type') = 'pending'",
    )
    .bind(list_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await
    .context("移除待处理邀请记录失败")?
    .rows_affected())
}

/// 删除清单（含成员与邀请记录），返回删除的清单行数
pub async fn delete_list(conn: &mut SqliteConnection, id: &str) -> Result<u64> {
    sqlx::query("DELETE FROM list_members WHERE list_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("删除清单成员失败")?;
    sqlx::query("DELETE FROM list_invited WHERE list_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("删除邀请记录失败")?;
    Ok(sqlx::query("DELETE FROM todo_lists WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("删除清单失败")?
        .rows_affected())
}

pub async fn load_items(conn: &mut SqliteConnection, list_id: &str) -> Result<Vec<ListItem>> {
    let sql = format!(
        "SELECT {} FROM list_items WHERE list_id = ? ORDER BY created, rowid",
        ITEM_COLUMNS
    );
    sqlx::query(&sql)
        .bind(list_id)
        .fetch_all(&mut *conn)
        .await
        .context("查询清单条目失败")?
        .iter()
        .map(row_to_item)
        .collect()
}

pub async fn load_item(conn: &mut SqliteConnection, id: &str) -> Result<Option<ListItem>> {
    let sql = format!("SELECT {} FROM list_items WHERE id = ?", ITEM_COLUMNS);
    sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("查询清单条目失败")?
        .as_ref()
        .map(row_to_item)
        .transpose()
}

/// 写回条目的名称与 notes，并记录更新人
pub async fn write_item_attributes(
    conn: &mut SqliteConnection,
    item: &ListItem,
) -> Result<()> {
    let notes = item
        .notes
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("序列化条目 notes 失败")?;
    sqlx::query(
        "UPDATE list_items SET name = ?, notes = ?, updated = ?, updated_by = ? WHERE id = ?",
    )
    .bind(&item.name)
    .bind(notes)
    .bind(item.details.updated)
    .bind(&item.details.updated_by)
    .bind(&item.id)
    .execute(&mut *conn)
    .await
    .context("更新条目属性失败")?;
    Ok(())
}

/// 把仍处于 pending 的条目转移到新清单，返回转移数量
pub async fn reassign_pending(conn: &mut SqliteConnection, from: &str, to: &str) -> Result<u64> {
    Ok(
        sqlx::query("UPDATE list_items SET list_id = ? WHERE list_id = ? AND status = 'pending'")
            .bind(to)
            .bind(from)
            .execute(&mut *conn)
            .await
            .context("转移待办条目失败")?
            .rows_affected(),
    )
}

pub async fn delete_items(conn: &mut SqliteConnection, list_id: &str) -> Result<u64> {
    Ok(sqlx::query("DELETE FROM list_items WHERE list_id = ?")
        .bind(list_id)
        .execute(&mut *conn)
        .await
        .context("删除清单条目失败")?
        .rows_affected())
}

pub async fn insert_finished(conn: &mut SqliteConnection, finished: &FinishedList) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO finished_lists (id, name, users, finished_on, finished_by, items)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&finished.id)
    .bind(&finished.name)
    .bind(serde_json::to_string(&finished.users).context("序列化归档用户失败")?)
    .bind(finished.details.finished_on)
    .bind(&finished.details.finished_by)
    .bind(serde_json::to_string(&finished.items).context("序列化归档条目失败")?)
    .execute(&mut *conn)
    .await
    .context("插入归档失败")?;
    Ok(())
}
