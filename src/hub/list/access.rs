//! 清单访问控制
//!
//! 所有针对清单或条目的操作都必须先经过 `resolve_list`：只有 `shared` 中的成员可以读写。

use crate::hub::error::{ListError, ListResult};
use crate::hub::list::models::{ListItem, PopulatedList, TodoList};
use crate::hub::list::service::ListService;
use crate::hub::types::{validate_id, Actor};
use std::collections::HashMap;
use tracing::{debug, warn};

impl ListService {
    /// 校验 ID、加载清单并检查成员身份
    pub async fn resolve_list(&self, actor: &Actor, list_id: &str) -> ListResult<TodoList> {
        let list_id = validate_id(list_id)?;
        let list = self
            .dao
            .find_list(list_id)
            .await?
            .ok_or_else(|| ListError::not_found(format!("List:{}", list_id)))?;
        if !list.is_member(&actor.user_id) {
            warn!(
                "[ListAccess] 用户 {} 不是清单 {} 的成员",
                actor.user_id, list.id
            );
            return Err(ListError::user_access(format!("List:{}", list.id)));
        }
        debug!("[ListAccess] 用户 {} 访问清单 {}", actor.user_id, list.id);
        Ok(list)
    }

    /// 加载条目并通过其所属清单做访问检查
    pub async fn resolve_item(
        &self,
        actor: &Actor,
        item_id: &str,
    ) -> ListResult<(TodoList, ListItem)> {
        let item_id = validate_id(item_id)?;
        let item = self
            .dao
            .find_item(item_id)
            .await?
            .ok_or_else(|| ListError::not_found(format!("ListItem:{}", item_id)))?;
        let list = self.resolve_list(actor, &item.list_id).await?;
        Ok((list, item))
    }

    /// 请求方参与的全部清单（成员信息已展开）
    pub async fn list_all_for(&self, actor: &Actor) -> ListResult<Vec<PopulatedList>> {
        let lists = self.dao.find_lists_for_user(&actor.user_id).await?;

        let mut member_ids: Vec<String> = Vec::new();
        for list in &lists {
            for id in &list.shared {
                if !member_ids.contains(id) {
                    member_ids.push(id.clone());
                }
            }
        }
        let users: HashMap<_, _> = self
            .users
            .find_by_ids(&member_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(lists
            .into_iter()
            .map(|list| {
                let members = list
                    .shared
                    .iter()
                    .filter_map(|id| users.get(id).cloned())
                    .collect();
                PopulatedList::new(list, members)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::hub::error::ListError;
    use crate::hub::list::dao::ListDao;
    use crate::hub::list::models::FinishOptions;
    use crate::hub::list::service::ListService;
    use crate::hub::test_support::{seed_user, test_db};
    use crate::hub::types::new_id;
    use crate::hub::user::UserDao;
    use serde_json::json;

    #[tokio::test]
    async fn resolve_list_checks_id_existence_and_membership() {
        let db = test_db().await;
        let svc = ListService::new(ListDao::new(db.pool.clone()), UserDao::new(db.pool.clone()));
        let alice = seed_user(&db.pool, "Alice").await;
        let charlie = seed_user(&db.pool, "Charlie").await;
        let list = svc.new_list(&alice, "Chores", &[]).await.unwrap();

        assert!(svc.resolve_list(&alice, &list.id).await.is_ok());
        assert!(matches!(
            svc.resolve_list(&alice, "nope").await,
            Err(ListError::Validation(_))
        ));
        assert!(matches!(
            svc.resolve_list(&alice, &new_id()).await,
            Err(ListError::ElementNotFound(_))
        ));
        assert!(matches!(
            svc.resolve_list(&charlie, &list.id).await,
            Err(ListError::UserAccess(_))
        ));
    }

    #[tokio::test]
    async fn non_members_are_rejected_by_every_operation() {
        let db = test_db().await;
        let svc = ListService::new(ListDao::new(db.pool.clone()), UserDao::new(db.pool.clone()));
        let alice = seed_user(&db.pool, "Alice").await;
        let charlie = seed_user(&db.pool, "Charlie").await;
        let list = svc.new_list(&alice, "Chores", &[]).await.unwrap();
        let item = svc
            .add_item(&alice, &list.id, &json!({"name": "Dishes"}))
            .await
            .unwrap();

        let denied = |r: Result<(), ListError>| matches!(r, Err(ListError::UserAccess(_)));
        assert!(denied(svc.get_list(&charlie, &list.id).await.map(|_| ())));
        assert!(denied(
            svc.update_list(&charlie, &list.id, Some(&json!({"name": "x"})))
                .await
                .map(|_| ())
        ));
        assert!(denied(svc.get_list_items(&charlie, &list.id).await.map(|_| ())));
        assert!(denied(
            svc.add_item(&charlie, &list.id, &json!({"name": "x"}))
                .await
                .map(|_| ())
        ));
        assert!(denied(
            svc.update_status(&charlie, &item.id, "checked").await.map(|_| ())
        ));
        assert!(denied(
            svc.update_attributes(&charlie, &item.id, &json!({"changes": [], "deletions": []}))
                .await
                .map(|_| ())
        ));
        assert!(denied(
            svc.finish(&charlie, &list.id, FinishOptions::default())
                .await
                .map(|_| ())
        ));
        assert!(denied(
            svc.remove(&charlie, &list.id, Default::default()).await.map(|_| ())
        ));

        // 失败的调用不会改动任何数据
        let items = svc.get_list_items(&alice, &list.id).await.unwrap();
        assert_eq!(items, vec![item]);
    }

    #[tokio::test]
    async fn list_all_for_returns_only_memberships() {
        let db = test_db().await;
        let svc = ListService::new(ListDao::new(db.pool.clone()), UserDao::new(db.pool.clone()));
        let alice = seed_user(&db.pool, "Alice").await;
        let bob = seed_user(&db.pool, "Bob").await;

        svc.new_list(&alice, "Chores", &[bob.user_id.clone()]).await.unwrap();
        svc.new_list(&alice, "Private", &[]).await.unwrap();
        svc.new_list(&bob, "Bob only", &[]).await.unwrap();

        let lists = svc.list_all_for(&alice).await.unwrap();
        let names: Vec<_> = lists.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Chores", "Private"]);
        assert_eq!(lists[0].shared.len(), 2);
        assert_eq!(lists[0].shared[1].id, bob.user_id);

        assert_eq!(svc.list_all_for(&bob).await.unwrap().len(), 2);
    }
}
