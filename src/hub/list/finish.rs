//! 清单完成、结转与删除
//!
//! 完成清单时在同一事务内：写入归档 → （可选）创建后续清单并转移 pending 条目 →
//! 删除原清单条目与未处理邀请 → 删除原清单。

use crate::hub::error::{ListError, ListResult};
use crate::hub::invite::dao as invite_dao;
use crate::hub::list::dao;
use crate::hub::list::models::{
    CarryOver, FinishOptions, FinishReport, FinishedDetails, FinishedItem, FinishedList,
    FinishedSummary, ItemStatus, ListDetails, ListMeta, RemoveOptions, TodoList,
};
use crate::hub::list::service::ListService;
use crate::hub::types::{new_id, now_millis, validate_id, Actor};
use anyhow::Context;
use regex::Regex;
use sqlx::SqliteConnection;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

#[allow(clippy::expect_used)]
static RERUN_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\)$").expect("static regex should not panic"));

/// 结转清单的命名：`名称 (n)` → `名称 (n+1)`，否则追加 ` (2)`
pub fn up_name(name: &str) -> String {
    if let Some(caps) = RERUN_SUFFIX.captures(name) {
        if let (Some(whole), Some(n)) = (caps.get(0), caps.get(1)) {
            if let Ok(n) = n.as_str().parse::<u64>() {
                return format!("{}({})", &name[..whole.start()], n.saturating_add(1));
            }
        }
    }
    format!("{} (2)", name)
}

/// 在事务内写入归档、（可选）建立后续清单并转移 pending 条目，然后删除原清单
///
/// 原清单已被并发删除时只记录警告，归档照常写入
async fn archive_list(
    conn: &mut SqliteConnection,
    list_id: &str,
    archive: &FinishedList,
    successor: Option<&TodoList>,
) -> anyhow::Result<Option<CarryOver>> {
    dao::insert_finished(&mut *conn, archive).await?;

    let mut carryover = None;
    if let Some(next) = successor {
        dao::insert_list(&mut *conn, next).await?;
        let moved = dao::reassign_pending(&mut *conn, list_id, &next.id).await?;
        info!(
            "[ListFinish] 清单 {} 结转 {} 个条目到 {} ({})",
            list_id, moved, next.id, next.name
        );
        carryover = Some(CarryOver {
            list: next.id.clone(),
            items: moved,
        });
    }

    dao::delete_items(&mut *conn, list_id).await?;
    let dropped = invite_dao::discard_list_invites(&mut *conn, list_id).await?;
    if dropped > 0 {
        debug!("[ListFinish] 清单 {} 丢弃 {} 个未处理邀请", list_id, dropped);
    }
    if dao::delete_list(&mut *conn, list_id).await? == 0 {
        warn!("[ListFinish] 清单 {} 已被并发删除，忽略", list_id);
    }
    Ok(carryover)
}

impl ListService {
    /// 完成清单：归档全部条目，可选把 pending 条目结转到新清单
    pub async fn finish(
        &self,
        actor: &Actor,
        list_id: &str,
        opts: FinishOptions,
    ) -> ListResult<FinishReport> {
        let list = self.resolve_list(actor, list_id).await?;
        let items = self.dao.find_items(&list.id).await?;
        let pending = items
            .iter()
            .filter(|i| i.status == ItemStatus::Pending)
            .count();
        let checked = items
            .iter()
            .filter(|i| i.status == ItemStatus::Checked)
            .count();
        debug!(
            "[ListFinish] 清单 {} 共 {} 个条目，pending={}, checked={}",
            list.id,
            items.len(),
            pending,
            checked
        );

        let archive = FinishedList {
            id: new_id(),
            name: list.name.clone(),
            users: self.users.find_by_ids(&list.shared).await?,
            details: FinishedDetails {
                finished_on: now_millis(),
                finished_by: actor.user_id.clone(),
            },
            items: items.iter().map(FinishedItem::from).collect(),
        };

        let successor = (opts.carryover && pending > 0).then(|| TodoList {
            id: new_id(),
            name: up_name(&list.name),
            shared: list.shared.clone(),
            invited: Vec::new(),
            details: ListDetails {
                created_by: actor.user_id.clone(),
            },
            meta: Some(ListMeta::default()),
        });

        let mut tx = self.dao.begin().await?;
        let carryover = archive_list(&mut *tx, &list.id, &archive, successor.as_ref()).await?;
        tx.commit().await.context("提交事务失败")?;

        if let Some(c) = &carryover {
            self.dao.refresh_meta(&c.list).await?;
        }
        info!(
            "[ListFinish] 用户 {} 完成清单 {}，归档 {}",
            actor.user_id, list.id, archive.id
        );
        Ok(FinishReport {
            finished: FinishedSummary {
                archive: archive.id,
                checked,
                pending,
            },
            carryover,
        })
    }

    /// 离开或删除清单
    ///
    /// 最后一个成员离开或 `force` 时删除清单及其条目，否则只移除请求方
    pub async fn remove(
        &self,
        actor: &Actor,
        list_id: &str,
        opts: RemoveOptions,
    ) -> ListResult<bool> {
        let list = self.resolve_list(actor, list_id).await?;

        let mut tx = self.dao.begin().await?;
        let delete_all = if list.shared.len() == 1 || opts.force {
            true
        } else {
            dao::remove_member(&mut *tx, &list.id, &actor.user_id).await?;
            dao::count_members(&mut *tx, &list.id).await? == 0
        };
        if delete_all {
            let items = dao::delete_items(&mut *tx, &list.id).await?;
            invite_dao::discard_list_invites(&mut *tx, &list.id).await?;
            dao::delete_list(&mut *tx, &list.id).await?;
            info!(
                "[ListFinish] 用户 {} 删除清单 {}（含 {} 个条目）",
                actor.user_id, list.id, items
            );
        } else {
            info!("[ListFinish] 用户 {} 离开清单 {}", actor.user_id, list.id);
        }
        tx.commit().await.context("提交事务失败")?;
        Ok(true)
    }

    /// 读取归档，只有归档中记录的用户可以查看
    pub async fn get_archive(&self, actor: &Actor, archive_id: &str) -> ListResult<FinishedList> {
        let archive_id = validate_id(archive_id)?;
        let archive = self
            .dao
            .find_finished(archive_id)
            .await?
            .ok_or_else(|| ListError::not_found(format!("FinishedList:{}", archive_id)))?;
        if !archive.users.iter().any(|u| u.id == actor.user_id) {
            return Err(ListError::user_access(format!("FinishedList:{}", archive_id)));
        }
        Ok(archive)
    }
}
