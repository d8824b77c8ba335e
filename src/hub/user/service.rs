//! 用户服务：注册与查找

use crate::hub::auth::TokenService;
use crate::hub::error::{ListError, ListResult};
use crate::hub::invite::is_email;
use crate::hub::types::new_id;
use crate::hub::user::dao::UserDao;
use crate::hub::user::models::{RegisteredUser, User};
use tracing::{info, warn};

const DEFAULT_ICON: &str = "placeholder";

/// 用户服务
#[derive(Clone)]
pub struct UserService {
    dao: UserDao,
    tokens: TokenService,
}

impl UserService {
    pub fn new(dao: UserDao, tokens: TokenService) -> Self {
        Self { dao, tokens }
    }

    /// 通过邮箱注册用户并签发 token
    pub async fn register_user_by_mail(
        &self,
        name: &str,
        mail: &str,
        username: Option<&str>,
    ) -> ListResult<RegisteredUser> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ListError::validation("缺少用户名称"));
        }
        if !is_email(mail) {
            return Err(ListError::validation(format!("非法邮箱: {}", mail)));
        }
        let username = match username.map(str::trim) {
            Some("") | None => None,
            Some(u) if u.contains('@') => {
                return Err(ListError::validation(format!("非法用户名: {}", u)));
            }
            Some(u) => Some(u.to_string()),
        };

        if self.dao.find_login_by_mail(mail).await?.is_some() {
            return Err(ListError::DuplicateElement("Email".to_string()));
        }
        if let Some(u) = &username {
            if self.dao.find_by_username(u).await?.is_some() {
                return Err(ListError::DuplicateElement("Username".to_string()));
            }
        }

        let user = User {
            id: new_id(),
            name: name.to_string(),
            icon: DEFAULT_ICON.to_string(),
            username,
        };
        self.dao
            .insert_user_with_mail(&user, mail)
            .await
            .map_err(duplicate_or_internal)?;
        info!("[User] 新用户注册: {} ({})", user.id, mail);

        let token = self.tokens.issue(&user)?;
        Ok(RegisteredUser { user, token })
    }

    pub async fn find_user(&self, id: &str) -> ListResult<User> {
        self.dao
            .find_by_id(id)
            .await?
            .ok_or_else(|| ListError::not_found(format!("User:{}", id)))
    }

    pub fn dao(&self) -> &UserDao {
        &self.dao
    }
}

/// 并发注册时唯一约束冲突映射为 `DuplicateElement`，其余仍为存储错误
fn duplicate_or_internal(e: anyhow::Error) -> ListError {
    let field = e
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .filter(|db| db.is_unique_violation())
        .map(|db| {
            if db.message().contains("users.username") {
                "Username"
            } else {
                "Email"
            }
        });
    match field {
        Some(field) => {
            warn!("[User] 注册时唯一约束冲突: {}", field);
            ListError::DuplicateElement(field.to_string())
        }
        None => ListError::Internal(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::test_support::test_db;

    #[tokio::test]
    async fn register_and_lookup() {
        let db = test_db().await;
        let users = UserService::new(UserDao::new(db.pool.clone()), TokenService::new("k", 60));

        let alice = users
            .register_user_by_mail("Alice", "alice@test.com", Some("alice"))
            .await
            .unwrap();
        assert!(!alice.token.is_empty());
        assert_eq!(alice.user.icon, DEFAULT_ICON);

        let found = users.dao().find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, alice.user.id);
        let login = users
            .dao()
            .find_login_by_mail("alice@test.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(login.user_id, alice.user.id);
        assert_eq!(users.find_user(&alice.user.id).await.unwrap().name, "Alice");
    }

    #[tokio::test]
    async fn constraint_violation_maps_to_duplicate() {
        let db = test_db().await;
        let dao = UserDao::new(db.pool.clone());
        let user = |username: Option<&str>| User {
            id: new_id(),
            name: "Alice".to_string(),
            icon: DEFAULT_ICON.to_string(),
            username: username.map(str::to_string),
        };
        dao.insert_user_with_mail(&user(Some("alice")), "alice@test.com")
            .await
            .unwrap();

        // 绕过前置检查直接写库，模拟并发注册
        let err = dao
            .insert_user_with_mail(&user(None), "alice@test.com")
            .await
            .unwrap_err();
        assert!(matches!(
            duplicate_or_internal(err),
            ListError::DuplicateElement(f) if f == "Email"
        ));
        let err = dao
            .insert_user_with_mail(&user(Some("alice")), "other@test.com")
            .await
            .unwrap_err();
        assert!(matches!(
            duplicate_or_internal(err),
            ListError::DuplicateElement(f) if f == "Username"
        ));
        assert_eq!(
            duplicate_or_internal(anyhow::anyhow!("db down")).status_code(),
            500
        );
    }

    #[tokio::test]
    async fn concurrent_registrations_with_same_mail() {
        let db = test_db().await;
        let users = UserService::new(UserDao::new(db.pool.clone()), TokenService::new("k", 60));

        let (a, b) = tokio::join!(
            users.register_user_by_mail("Alice", "same@test.com", None),
            users.register_user_by_mail("Alicia", "same@test.com", None)
        );
        let codes: Vec<u16> = [a, b]
            .iter()
            .map(|r| match r {
                Ok(_) => 200,
                Err(e) => e.status_code(),
            })
            .collect();
        assert_eq!(codes.iter().filter(|c| **c == 200).count(), 1);
        assert_eq!(codes.iter().filter(|c| **c == 409).count(), 1);
    }

    #[tokio::test]
    async fn duplicate_mail_and_bad_input_are_rejected() {
        let db = test_db().await;
        let users = UserService::new(UserDao::new(db.pool.clone()), TokenService::new("k", 60));
        users
            .register_user_by_mail("Alice", "alice@test.com", None)
            .await
            .unwrap();

        let dup = users
            .register_user_by_mail("Other", "alice@test.com", None)
            .await
            .unwrap_err();
        assert_eq!(dup.status_code(), 409);

        assert!(matches!(
            users.register_user_by_mail("", "x@test.com", None).await,
            Err(ListError::Validation(_))
        ));
        assert!(matches!(
            users.register_user_by_mail("Bob", "not-an-email", None).await,
            Err(ListError::Validation(_))
        ));
        assert!(matches!(
            users.find_user(&new_id()).await,
            Err(ListError::ElementNotFound(_))
        ));
    }
}
