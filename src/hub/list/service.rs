//! 清单服务层：创建、读取与重命名
//!
//! 访问控制、条目操作与完成/结转分别在 `access`、`item`、`finish` 中扩展 `ListService`。

use crate::hub::error::{ListError, ListResult};
use crate::hub::list::dao::ListDao;
use crate::hub::list::models::{ListDetails, ListItem, ListMeta, PopulatedList, TodoList};
use crate::hub::types::{new_id, validate_id, Actor};
use crate::hub::user::UserDao;
use serde_json::Value;
use tracing::info;

/// 清单服务
#[derive(Clone)]
pub struct ListService {
    pub(super) dao: ListDao,
    pub(super) users: UserDao,
}

impl ListService {
    pub fn new(dao: ListDao, users: UserDao) -> Self {
        Self { dao, users }
    }

    /// 创建清单，请求方总是排在成员首位
    pub async fn new_list(
        &self,
        actor: &Actor,
        name: &str,
        shared_with: &[String],
    ) -> ListResult<TodoList> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ListError::validation("缺少清单名称"));
        }
        for id in shared_with {
            validate_id(id)?;
        }

        let mut shared = vec![actor.user_id.clone()];
        for id in shared_with {
            if !shared.contains(id) {
                shared.push(id.clone());
            }
        }

        let list = TodoList {
            id: new_id(),
            name: name.to_string(),
            shared,
            invited: Vec::new(),
            details: ListDetails {
                created_by: actor.user_id.clone(),
            },
            meta: Some(ListMeta::default()),
        };
        self.dao.insert_list(&list).await?;
        info!(
            "[ListService] 用户 {} 创建清单 {} ({})，成员 {} 个",
            actor.user_id,
            list.id,
            list.name,
            list.shared.len()
        );
        Ok(list)
    }

    /// 读取清单并展开成员信息
    pub async fn get_list(&self, actor: &Actor, list_id: &str) -> ListResult<PopulatedList> {
        let list = self.resolve_list(actor, list_id).await?;
        self.populate(list).await
    }

    /// 更新清单，目前只接受 `name`
    pub async fn update_list(
        &self,
        actor: &Actor,
        list_id: &str,
        updates: Option<&Value>,
    ) -> ListResult<PopulatedList> {
        let Some(updates) = updates.filter(|u| u.is_object()) else {
            return Err(ListError::validation("缺少 updates"));
        };
        let name = match updates.get("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(_) => return Err(ListError::validation("清单名称不能为空")),
        };

        let mut list = self.resolve_list(actor, list_id).await?;
        if let Some(name) = name {
            self.dao.update_name(&list.id, &name).await?;
            info!(
                "[ListService] 清单 {} 重命名: {} -> {}",
                list.id, list.name, name
            );
            list.name = name;
        }
        self.populate(list).await
    }

    pub async fn get_list_items(&self, actor: &Actor, list_id: &str) -> ListResult<Vec<ListItem>> {
        let list = self.resolve_list(actor, list_id).await?;
        Ok(self.dao.find_items(&list.id).await?)
    }

    pub(super) async fn populate(&self, list: TodoList) -> ListResult<PopulatedList> {
        let members = self.users.find_by_ids(&list.shared).await?;
        Ok(PopulatedList::new(list, members))
    }

    pub fn dao(&self) -> &ListDao {
        &self.dao
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::test_support::{seed_user, test_db};
    use serde_json::json;

    fn service(pool: &sqlx::Pool<sqlx::Sqlite>) -> ListService {
        ListService::new(ListDao::new(pool.clone()), UserDao::new(pool.clone()))
    }

    #[tokio::test]
    async fn new_list_puts_actor_first_without_duplicates() {
        let db = test_db().await;
        let svc = service(&db.pool);
        let alice = seed_user(&db.pool, "Alice").await;
        let bob = seed_user(&db.pool, "Bob").await;

        let list = svc
            .new_list(
                &alice,
                "Chores",
                &[bob.user_id.clone(), alice.user_id.clone(), bob.user_id.clone()],
            )
            .await
            .unwrap();
        assert_eq!(list.shared, vec![alice.user_id.clone(), bob.user_id.clone()]);
        assert_eq!(list.details.created_by, alice.user_id);

        let populated = svc.get_list(&bob, &list.id).await.unwrap();
        let names: Vec<_> = populated.shared.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
        assert_eq!(populated.meta, Some(ListMeta::default()));
    }

    #[tokio::test]
    async fn new_list_rejects_bad_input() {
        let db = test_db().await;
        let svc = service(&db.pool);
        let alice = seed_user(&db.pool, "Alice").await;

        assert!(matches!(
            svc.new_list(&alice, "  ", &[]).await,
            Err(ListError::Validation(_))
        ));
        assert!(matches!(
            svc.new_list(&alice, "Chores", &["bob".to_string()]).await,
            Err(ListError::Validation(_))
        ));
        assert!(svc.list_all_for(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_list_renames_and_validates() {
        let db = test_db().await;
        let svc = service(&db.pool);
        let alice = seed_user(&db.pool, "Alice").await;
        let list = svc.new_list(&alice, "Chores", &[]).await.unwrap();

        assert!(matches!(
            svc.update_list(&alice, &list.id, None).await,
            Err(ListError::Validation(_))
        ));
        assert!(matches!(
            svc.update_list(&alice, &list.id, Some(&json!({"name": ""}))).await,
            Err(ListError::Validation(_))
        ));

        let updated = svc
            .update_list(&alice, &list.id, Some(&json!({"name": "Weekend", "color": "red"})))
            .await
            .unwrap();
        assert_eq!(updated.name, "Weekend");
        assert_eq!(svc.dao().find_list(&list.id).await.unwrap().unwrap().name, "Weekend");
    }
}
