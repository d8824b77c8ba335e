//! 邀请服务层
//!
//! 邀请流程：
//! 1. 解析目标（ID / 用户名 / 邮箱），未注册邮箱只记录邮件邀请
//! 2. 批量读取目标用户的隐私设置并判定（拒绝 / 直接加入 / 待处理）
//! 3. 在同一事务中写入成员、邀请记录、邀请与通知
//! 4. 提交后通知监听器

use crate::hub::error::{ListError, ListResult};
use crate::hub::invite::dao::{self, InviteDao};
use crate::hub::invite::listener::{EmptyInviteListener, InviteListener};
use crate::hub::invite::models::{
    InviteTarget, ListInvite, UserNotification, ACTION_INVITE, ENTITY_LIST_INVITE,
};
use crate::hub::list::dao as list_dao;
use crate::hub::list::models::{InvitedMarker, TodoList};
use crate::hub::list::ListService;
use crate::hub::settings::{evaluate, Decision, SettingsDao};
use crate::hub::types::{is_valid_id, new_id, now_millis, validate_id, Actor};
use crate::hub::user::{User, UserDao};
use anyhow::Context;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 目标解析结果
enum Resolved {
    User(User),
    /// 未注册的邮箱
    Mail(String),
}

/// 邀请服务
#[derive(Clone)]
pub struct InviteService {
    dao: InviteDao,
    lists: ListService,
    users: UserDao,
    settings: SettingsDao,
    listener: Arc<dyn InviteListener>,
}

impl InviteService {
    /// 使用默认空监听器创建
    pub fn new(dao: InviteDao, lists: ListService, users: UserDao, settings: SettingsDao) -> Self {
        Self::with_listener(dao, lists, users, settings, Arc::new(EmptyInviteListener))
    }

    pub fn with_listener(
        dao: InviteDao,
        lists: ListService,
        users: UserDao,
        settings: SettingsDao,
        listener: Arc<dyn InviteListener>,
    ) -> Self {
        Self {
            dao,
            lists,
            users,
            settings,
            listener,
        }
    }

    /// 邀请单个目标，未知的 ID 或用户名返回 `ElementNotFound`
    pub async fn invite(
        &self,
        actor: &Actor,
        list_id: &str,
        target: &InviteTarget,
    ) -> ListResult<TodoList> {
        let list = self.lists.resolve_list(actor, list_id).await?;
        let resolved = self
            .resolve_target(target)
            .await?
            .ok_or_else(|| ListError::not_found(format!("User:{}", target_label(target))))?;
        let (users, mails) = match resolved {
            Resolved::User(u) => (vec![u], Vec::new()),
            Resolved::Mail(m) => (Vec::new(), vec![m]),
        };
        self.route(actor, list, users, mails, false).await
    }

    /// 批量邀请，无法解析的目标被跳过
    ///
    /// ID 与邮箱各用一次批量查询解析，用户名逐个查询
    pub async fn invite_many(
        &self,
        actor: &Actor,
        list_id: &str,
        targets: &[InviteTarget],
    ) -> ListResult<TodoList> {
        let list = self.lists.resolve_list(actor, list_id).await?;

        let mut ids: Vec<String> = Vec::new();
        let mut handles: Vec<&str> = Vec::new();
        let mut mails: Vec<String> = Vec::new();
        for target in targets {
            match target {
                InviteTarget::Id(id) if is_valid_id(id) => ids.push(id.clone()),
                InviteTarget::Id(id) => warn!("[Invite] 非法用户 ID，跳过: {}", id),
                InviteTarget::Handle(h) => handles.push(h),
                InviteTarget::Email(m) => mails.push(m.clone()),
            }
        }

        let registered: HashMap<String, String> = self
            .users
            .find_logins_by_mails(&mails)
            .await?
            .into_iter()
            .map(|l| (l.mail, l.user_id))
            .collect();
        let mut unregistered: Vec<String> = Vec::new();
        for mail in mails {
            match registered.get(&mail) {
                Some(user_id) => ids.push(user_id.clone()),
                None if !unregistered.contains(&mail) => unregistered.push(mail),
                None => {}
            }
        }

        let mut seen_ids = HashSet::new();
        ids.retain(|id| seen_ids.insert(id.clone()));
        let mut users = self.users.find_by_ids(&ids).await?;
        if users.len() < ids.len() {
            warn!(
                "[Invite] {} 个邀请目标不存在，跳过",
                ids.len() - users.len()
            );
        }
        for handle in handles {
            match self.users.find_by_username(handle).await? {
                Some(u) => users.push(u),
                None => warn!("[Invite] 用户名不存在，跳过: @{}", handle),
            }
        }

        let mut seen = HashSet::new();
        users.retain(|u| seen.insert(u.id.clone()));
        self.route(actor, list, users, unregistered, true).await
    }

    /// 处理 `{invites: [...]}` 请求体，无法识别的字符串被丢弃
    pub async fn invite_users(
        &self,
        actor: &Actor,
        list_id: &str,
        payload: &Value,
    ) -> ListResult<TodoList> {
        let Some(raw) = payload.get("invites").and_then(Value::as_array) else {
            return Err(ListError::validation("invites 必须为数组"));
        };
        let targets: Vec<InviteTarget> = raw
            .iter()
            .filter_map(Value::as_str)
            .filter_map(InviteTarget::parse)
            .collect();
        debug!(
            "[Invite] 请求 {} 个目标，识别 {} 个",
            raw.len(),
            targets.len()
        );
        self.invite_many(actor, list_id, &targets).await
    }

    /// 接受邀请：加入清单成员并消费邀请
    pub async fn accept_invite(&self, actor: &Actor, invite_id: &str) -> ListResult<TodoList> {
        let invite = self.owned_invite(actor, invite_id).await?;

        let mut tx = self.dao.begin().await?;
        if list_dao::load_list(&mut *tx, &invite.list_id).await?.is_none() {
            // 清单已不存在，邀请随之作废
            dao::delete_invite(&mut *tx, &invite.id).await?;
            dao::mark_read_by_ref(&mut *tx, &actor.user_id, &invite.id).await?;
            tx.commit().await.context("提交事务失败")?;
            warn!(
                "[Invite] 邀请 {} 指向的清单 {} 已不存在，丢弃",
                invite.id, invite.list_id
            );
            return Err(ListError::not_found(format!("List:{}", invite.list_id)));
        }
        list_dao::add_members(&mut *tx, &invite.list_id, &[actor.user_id.clone()]).await?;
        list_dao::pull_pending(&mut *tx, &invite.list_id, &actor.user_id).await?;
        dao::delete_invite(&mut *tx, &invite.id).await?;
        dao::mark_read_by_ref(&mut *tx, &actor.user_id, &invite.id).await?;
        let list = list_dao::load_list(&mut *tx, &invite.list_id)
            .await?
            .ok_or_else(|| ListError::not_found(format!("List:{}", invite.list_id)))?;
        tx.commit().await.context("提交事务失败")?;

        info!(
            "[Invite] 用户 {} 接受邀请 {}，加入清单 {}",
            actor.user_id, invite.id, list.id
        );
        Ok(list)
    }

    /// 拒绝邀请：丢弃邀请，不修改清单
    pub async fn deny_invite(&self, actor: &Actor, invite_id: &str) -> ListResult<bool> {
        let invite = self.owned_invite(actor, invite_id).await?;

        let mut tx = self.dao.begin().await?;
        dao::delete_invite(&mut *tx, &invite.id).await?;
        dao::mark_read_by_ref(&mut *tx, &actor.user_id, &invite.id).await?;
        tx.commit().await.context("提交事务失败")?;

        info!("[Invite] 用户 {} 拒绝邀请 {}", actor.user_id, invite.id);
        Ok(true)
    }

    /// 发给请求方的待处理邀请
    pub async fn pending_invites(&self, actor: &Actor) -> ListResult<Vec<ListInvite>> {
        Ok(self.dao.find_invites_for_user(&actor.user_id).await?)
    }

    pub async fn notifications(&self, actor: &Actor) -> ListResult<Vec<UserNotification>> {
        Ok(self.dao.find_notifications(&actor.user_id).await?)
    }

    /// 标记通知已读（只能操作自己的通知）
    pub async fn mark_notification_read(
        &self,
        actor: &Actor,
        notification_id: &str,
    ) -> ListResult<UserNotification> {
        let notification_id = validate_id(notification_id)?;
        let mut notification = self
            .dao
            .find_notification(notification_id)
            .await?
            .ok_or_else(|| {
                ListError::not_found(format!("UserNotification:{}", notification_id))
            })?;
        if notification.user_id != actor.user_id {
            return Err(ListError::user_access(format!(
                "UserNotification:{}",
                notification_id
            )));
        }
        self.dao.mark_read(notification_id).await?;
        notification.read = true;
        Ok(notification)
    }

    pub fn dao(&self) -> &InviteDao {
        &self.dao
    }

    async fn owned_invite(&self, actor: &Actor, invite_id: &str) -> ListResult<ListInvite> {
        let invite_id = validate_id(invite_id)?;
        let invite = self
            .dao
            .find_invite(invite_id)
            .await?
            .ok_or_else(|| ListError::not_found(format!("ListInvite:{}", invite_id)))?;
        if invite.invited_id.as_deref() != Some(actor.user_id.as_str()) {
            warn!(
                "[Invite] 用户 {} 试图处理不属于自己的邀请 {}",
                actor.user_id, invite.id
            );
            return Err(ListError::user_access(format!("ListInvite:{}", invite.id)));
        }
        Ok(invite)
    }

    /// 解析目标；未知 ID / 用户名返回 None，未注册邮箱返回 `Mail`
    async fn resolve_target(&self, target: &InviteTarget) -> ListResult<Option<Resolved>> {
        let resolved = match target {
            InviteTarget::Id(id) => {
                validate_id(id)?;
                self.users.find_by_id(id).await?.map(Resolved::User)
            }
            InviteTarget::Handle(handle) => {
                self.users.find_by_username(handle).await?.map(Resolved::User)
            }
            InviteTarget::Email(mail) => match self.users.find_login_by_mail(mail).await? {
                Some(login) => self.users.find_by_id(&login.user_id).await?.map(Resolved::User),
                None => Some(Resolved::Mail(mail.clone())),
            },
        };
        Ok(resolved)
    }

    /// 按隐私判定分流并在一个事务中落库
    async fn route(
        &self,
        actor: &Actor,
        list: TodoList,
        users: Vec<User>,
        mails: Vec<String>,
        with_history: bool,
    ) -> ListResult<TodoList> {
        let open = self.dao.find_invites_for_list(&list.id).await?;
        let open_ids: HashSet<&str> = open.iter().filter_map(|i| i.invited_id.as_deref()).collect();
        let open_mails: HashSet<&str> =
            open.iter().filter_map(|i| i.invited_mail.as_deref()).collect();
        let targets: Vec<User> = users
            .into_iter()
            .filter(|u| {
                let skip = list.is_member(&u.id) || open_ids.contains(u.id.as_str());
                if skip {
                    debug!("[Invite] 用户 {} 已是成员或已有待处理邀请，跳过", u.id);
                }
                !skip
            })
            .collect();
        let mails: Vec<String> = mails
            .into_iter()
            .filter(|m| {
                let skip = open_mails.contains(m.as_str());
                if skip {
                    debug!("[Invite] 邮箱 {} 已有待处理邀请，跳过", m);
                }
                !skip
            })
            .collect();

        let ids: Vec<String> = targets.iter().map(|u| u.id.clone()).collect();
        let settings: HashMap<_, _> = self
            .settings
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();

        let mut accepted: Vec<String> = Vec::new();
        let mut denied: Vec<String> = Vec::new();
        let mut pending: Vec<User> = Vec::new();
        for user in targets {
            match evaluate(settings.get(&user.id), &actor.user_id) {
                Decision::Deny => denied.push(user.id),
                Decision::AutoAccept => accepted.push(user.id),
                Decision::Pending => pending.push(user),
            }
        }

        let inviting = self
            .users
            .find_by_id(&actor.user_id)
            .await?
            .unwrap_or_else(|| User {
                id: actor.user_id.clone(),
                name: actor.name.clone(),
                icon: actor.icon.clone(),
                username: None,
            });
        let now = now_millis();
        let new_invite = |invited_id: Option<String>, invited_mail: Option<String>| ListInvite {
            id: new_id(),
            list_id: list.id.clone(),
            list_name: list.name.clone(),
            inviting: inviting.clone(),
            invited_id,
            invited_mail,
            created: now,
        };
        let user_invites: Vec<ListInvite> = pending
            .iter()
            .map(|u| new_invite(Some(u.id.clone()), None))
            .collect();
        let mail_invites: Vec<ListInvite> = mails
            .into_iter()
            .map(|m| new_invite(None, Some(m)))
            .collect();

        let mut markers = Vec::new();
        if with_history && (!accepted.is_empty() || !denied.is_empty() || !pending.is_empty()) {
            markers.push(InvitedMarker::History {
                date: now,
                invited_by: actor.user_id.clone(),
                invites: accepted
                    .iter()
                    .chain(denied.iter())
                    .cloned()
                    .chain(pending.iter().map(|u| u.id.clone()))
                    .collect(),
            });
        }
        markers.extend(denied.iter().map(|id| InvitedMarker::Denied {
            user_id: id.clone(),
            date: now,
        }));
        markers.extend(pending.iter().map(|u| InvitedMarker::Pending {
            user_id: u.id.clone(),
        }));

        let mut tx = self.dao.begin().await?;
        list_dao::add_members(&mut *tx, &list.id, &accepted).await?;
        list_dao::push_invited(&mut *tx, &list.id, &markers).await?;
        for invite in user_invites.iter().chain(mail_invites.iter()) {
            dao::insert_invite(&mut *tx, invite).await?;
        }
        for invite in &user_invites {
            let notification = UserNotification {
                id: new_id(),
                user_id: invite.invited_id.clone().unwrap_or_default(),
                read: false,
                entity: ENTITY_LIST_INVITE.to_string(),
                action: ACTION_INVITE.to_string(),
                notification: invite.id.clone(),
                created: now,
            };
            dao::insert_notification(&mut *tx, &notification).await?;
        }
        let updated = list_dao::load_list(&mut *tx, &list.id)
            .await?
            .ok_or_else(|| ListError::not_found(format!("List:{}", list.id)))?;
        tx.commit().await.context("提交事务失败")?;

        info!(
            "[Invite] 用户 {} 邀请清单 {}：加入 {}，拒绝 {}，待处理 {}，邮件 {}",
            actor.user_id,
            list.id,
            accepted.len(),
            denied.len(),
            user_invites.len(),
            mail_invites.len()
        );

        if !user_invites.is_empty() {
            self.listener.on_invites_created(user_invites).await;
        }
        for invite in mail_invites {
            self.listener.on_mail_invite(invite).await;
        }
        Ok(updated)
    }
}

fn target_label(target: &InviteTarget) -> String {
    match target {
        InviteTarget::Id(id) => id.clone(),
        InviteTarget::Handle(h) => format!("@{}", h),
        InviteTarget::Email(m) => m.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::list::{FinishOptions, ListDao, RemoveOptions};
    use crate::hub::settings::SettingsService;
    use crate::hub::test_support::{seed_user, test_db};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingListener {
        invites: Mutex<Vec<ListInvite>>,
        mails: Mutex<Vec<ListInvite>>,
    }

    #[async_trait]
    impl InviteListener for RecordingListener {
        async fn on_invites_created(&self, invites: Vec<ListInvite>) {
            self.invites.lock().unwrap().extend(invites);
        }

        async fn on_mail_invite(&self, invite: ListInvite) {
            self.mails.lock().unwrap().push(invite);
        }
    }

    struct Fixture {
        invites: InviteService,
        lists: ListService,
        settings: SettingsService,
        listener: Arc<RecordingListener>,
        _db: crate::hub::test_support::TestDb,
        pool: sqlx::Pool<sqlx::Sqlite>,
    }

    async fn fixture() -> Fixture {
        let db = test_db().await;
        let pool = db.pool.clone();
        let lists = ListService::new(ListDao::new(pool.clone()), UserDao::new(pool.clone()));
        let listener = Arc::new(RecordingListener::default());
        let invites = InviteService::with_listener(
            InviteDao::new(pool.clone()),
            lists.clone(),
            UserDao::new(pool.clone()),
            SettingsDao::new(pool.clone()),
            listener.clone(),
        );
        let settings = SettingsService::new(SettingsDao::new(pool.clone()));
        Fixture {
            invites,
            lists,
            settings,
            listener,
            _db: db,
            pool,
        }
    }

    #[tokio::test]
    async fn pending_invite_then_accept() {
        let f = fixture().await;
        let alice = seed_user(&f.pool, "Alice").await;
        let bob = seed_user(&f.pool, "Bob").await;
        let list = f.lists.new_list(&alice, "Chores", &[]).await.unwrap();

        let updated = f
            .invites
            .invite(&alice, &list.id, &InviteTarget::Handle("bob".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.shared, vec![alice.user_id.clone()]);
        assert_eq!(
            updated.invited,
            vec![InvitedMarker::Pending {
                user_id: bob.user_id.clone()
            }]
        );

        let pending = f.invites.pending_invites(&bob).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].list_name, "Chores");
        assert_eq!(pending[0].inviting.id, alice.user_id);
        let notes = f.invites.notifications(&bob).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert!(!notes[0].read);
        assert_eq!(notes[0].notification, pending[0].id);
        assert_eq!(f.listener.invites.lock().unwrap().len(), 1);

        // 只有被邀请人可以处理邀请
        assert!(matches!(
            f.invites.accept_invite(&alice, &pending[0].id).await,
            Err(ListError::UserAccess(_))
        ));

        let joined = f.invites.accept_invite(&bob, &pending[0].id).await.unwrap();
        assert_eq!(joined.shared, vec![alice.user_id.clone(), bob.user_id.clone()]);
        assert!(joined.invited.is_empty());
        assert!(f.invites.pending_invites(&bob).await.unwrap().is_empty());
        assert!(f.invites.notifications(&bob).await.unwrap()[0].read);
        assert!(f.lists.get_list(&bob, &list.id).await.is_ok());

        assert!(matches!(
            f.invites.accept_invite(&bob, &pending[0].id).await,
            Err(ListError::ElementNotFound(_))
        ));
    }

    #[tokio::test]
    async fn deny_discards_invite_without_touching_list() {
        let f = fixture().await;
        let alice = seed_user(&f.pool, "Alice").await;
        let bob = seed_user(&f.pool, "Bob").await;
        let list = f.lists.new_list(&alice, "Chores", &[]).await.unwrap();
        f.invites
            .invite(&alice, &list.id, &InviteTarget::Id(bob.user_id.clone()))
            .await
            .unwrap();
        let invite = f.invites.pending_invites(&bob).await.unwrap().remove(0);

        assert!(f.invites.deny_invite(&bob, &invite.id).await.unwrap());
        assert!(f.invites.pending_invites(&bob).await.unwrap().is_empty());
        let stored = f.lists.dao().find_list(&list.id).await.unwrap().unwrap();
        assert_eq!(stored.shared, vec![alice.user_id.clone()]);
        assert!(f.invites.notifications(&bob).await.unwrap()[0].read);
    }

    #[tokio::test]
    async fn denied_user_can_be_invited_again() {
        let f = fixture().await;
        let alice = seed_user(&f.pool, "Alice").await;
        let bob = seed_user(&f.pool, "Bob").await;
        let list = f.lists.new_list(&alice, "Chores", &[]).await.unwrap();
        let target = InviteTarget::Id(bob.user_id.clone());

        f.invites.invite(&alice, &list.id, &target).await.unwrap();
        // 未处理前重复邀请不产生新邀请
        f.invites.invite(&alice, &list.id, &target).await.unwrap();
        let first = f.invites.pending_invites(&bob).await.unwrap();
        assert_eq!(first.len(), 1);
        f.invites.deny_invite(&bob, &first[0].id).await.unwrap();

        f.invites.invite(&alice, &list.id, &target).await.unwrap();
        let second = f.invites.pending_invites(&bob).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_ne!(second[0].id, first[0].id);
        let notes = f.invites.notifications(&bob).await.unwrap();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().any(|n| !n.read && n.notification == second[0].id));
        assert_eq!(f.listener.invites.lock().unwrap().len(), 2);

        let joined = f.invites.accept_invite(&bob, &second[0].id).await.unwrap();
        assert!(joined.is_member(&bob.user_id));
        assert!(joined.invited.is_empty());
    }

    #[tokio::test]
    async fn finishing_or_deleting_a_list_discards_its_invites() {
        let f = fixture().await;
        let alice = seed_user(&f.pool, "Alice").await;
        let bob = seed_user(&f.pool, "Bob").await;
        let target = InviteTarget::Id(bob.user_id.clone());

        let chores = f.lists.new_list(&alice, "Chores", &[]).await.unwrap();
        f.invites.invite(&alice, &chores.id, &target).await.unwrap();
        f.invites
            .invite(&alice, &chores.id, &InviteTarget::Email("zoe@test.com".to_string()))
            .await
            .unwrap();
        let invite = f.invites.pending_invites(&bob).await.unwrap().remove(0);

        f.lists
            .finish(&alice, &chores.id, FinishOptions { carryover: false })
            .await
            .unwrap();
        assert!(f.invites.pending_invites(&bob).await.unwrap().is_empty());
        assert!(f.invites.dao().find_invites_for_list(&chores.id).await.unwrap().is_empty());
        assert!(f.invites.notifications(&bob).await.unwrap().iter().all(|n| n.read));
        assert!(matches!(
            f.invites.accept_invite(&bob, &invite.id).await,
            Err(ListError::ElementNotFound(_))
        ));

        let trip = f.lists.new_list(&alice, "Trip", &[]).await.unwrap();
        f.invites.invite(&alice, &trip.id, &target).await.unwrap();
        f.lists
            .remove(&alice, &trip.id, RemoveOptions::default())
            .await
            .unwrap();
        assert!(f.invites.pending_invites(&bob).await.unwrap().is_empty());
        assert!(f.invites.notifications(&bob).await.unwrap().iter().all(|n| n.read));
    }

    #[tokio::test]
    async fn repeated_mail_invite_is_recorded_once() {
        let f = fixture().await;
        let alice = seed_user(&f.pool, "Alice").await;
        let list = f.lists.new_list(&alice, "Chores", &[]).await.unwrap();
        let zoe = InviteTarget::Email("zoe@test.com".to_string());

        f.invites.invite(&alice, &list.id, &zoe).await.unwrap();
        f.invites.invite(&alice, &list.id, &zoe).await.unwrap();
        f.invites
            .invite_users(&alice, &list.id, &json!({"invites": ["zoe@test.com"]}))
            .await
            .unwrap();

        let stubs = f.invites.dao().find_invites_for_mail("zoe@test.com").await.unwrap();
        assert_eq!(stubs.len(), 1);
        assert_eq!(f.listener.mails.lock().unwrap().len(), 1);

        // 其他清单的邮件邀请互不影响
        let other = f.lists.new_list(&alice, "Trip", &[]).await.unwrap();
        f.invites.invite(&alice, &other.id, &zoe).await.unwrap();
        assert_eq!(
            f.invites.dao().find_invites_for_mail("zoe@test.com").await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn privacy_settings_route_invites() {
        let f = fixture().await;
        let alice = seed_user(&f.pool, "Alice").await;
        let bob = seed_user(&f.pool, "Bob").await;
        let carol = seed_user(&f.pool, "Carol").await;
        let dave = seed_user(&f.pool, "Dave").await;
        let list = f.lists.new_list(&alice, "Chores", &[]).await.unwrap();

        // Bob 把 Alice 拉黑（同时在白名单中，黑名单优先）
        for kind in ["blacklisted", "whitelisted"] {
            f.settings
                .update_privacy_list(&bob, kind, &json!({"add": [alice.user_id], "remove": []}))
                .await
                .unwrap();
        }
        // Carol 私密但允许 Alice
        f.settings.set_privacy(&carol, "private").await.unwrap();
        f.settings
            .update_privacy_list(&carol, "allowed", &json!({"add": [alice.user_id], "remove": []}))
            .await
            .unwrap();
        // Dave 私密且未允许
        f.settings.set_privacy(&dave, "private").await.unwrap();

        let updated = f
            .invites
            .invite_users(
                &alice,
                &list.id,
                &json!({"invites": [bob.user_id, carol.user_id, dave.user_id]}),
            )
            .await
            .unwrap();

        assert_eq!(updated.shared, vec![alice.user_id.clone(), carol.user_id.clone()]);
        assert!(matches!(
            &updated.invited[0],
            InvitedMarker::History { invites, .. } if invites.len() == 3
        ));
        let denied: Vec<_> = updated
            .invited
            .iter()
            .filter(|m| matches!(m, InvitedMarker::Denied { .. }))
            .filter_map(|m| m.user_id())
            .collect();
        assert_eq!(denied, vec![bob.user_id.as_str(), dave.user_id.as_str()]);
        assert!(f.invites.pending_invites(&bob).await.unwrap().is_empty());
        assert!(f.invites.pending_invites(&dave).await.unwrap().is_empty());
        assert!(f.listener.invites.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn auto_accept_is_idempotent() {
        let f = fixture().await;
        let alice = seed_user(&f.pool, "Alice").await;
        let bob = seed_user(&f.pool, "Bob").await;
        f.settings
            .update_privacy_list(&bob, "whitelisted", &json!({"add": [alice.user_id], "remove": []}))
            .await
            .unwrap();
        let list = f.lists.new_list(&alice, "Chores", &[]).await.unwrap();

        let target = InviteTarget::Id(bob.user_id.clone());
        f.invites.invite(&alice, &list.id, &target).await.unwrap();
        let again = f
            .invites
            .invite_many(&alice, &list.id, &[target.clone(), target])
            .await
            .unwrap();
        assert_eq!(again.shared, vec![alice.user_id.clone(), bob.user_id.clone()]);
        assert!(f.invites.pending_invites(&bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mail_and_unknown_targets() {
        let f = fixture().await;
        let alice = seed_user(&f.pool, "Alice").await;
        let bob = seed_user(&f.pool, "Bob").await;
        let list = f.lists.new_list(&alice, "Chores", &[]).await.unwrap();

        // 已注册邮箱解析到用户
        f.invites
            .invite(&alice, &list.id, &InviteTarget::Email("bob@test.com".to_string()))
            .await
            .unwrap();
        assert_eq!(f.invites.pending_invites(&bob).await.unwrap().len(), 1);

        // 未注册邮箱只记录邮件邀请
        let updated = f
            .invites
            .invite(&alice, &list.id, &InviteTarget::Email("zoe@test.com".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.shared.len(), 1);
        let stubs = f.invites.dao().find_invites_for_mail("zoe@test.com").await.unwrap();
        assert_eq!(stubs.len(), 1);
        assert!(stubs[0].invited_id.is_none());
        assert_eq!(f.listener.mails.lock().unwrap().len(), 1);

        assert!(matches!(
            f.invites
                .invite(&alice, &list.id, &InviteTarget::Handle("nobody".to_string()))
                .await,
            Err(ListError::ElementNotFound(_))
        ));
        assert!(matches!(
            f.invites
                .invite(&alice, &list.id, &InviteTarget::Id(new_id()))
                .await,
            Err(ListError::ElementNotFound(_))
        ));

        // 批量中未知目标被跳过
        let batch = f
            .invites
            .invite_users(
                &alice,
                &list.id,
                &json!({"invites": ["@nobody", "garbage", new_id()]}),
            )
            .await
            .unwrap();
        assert_eq!(batch.shared.len(), 1);

        assert!(matches!(
            f.invites
                .invite_users(&alice, &list.id, &json!({"invites": "bob"}))
                .await,
            Err(ListError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn non_member_cannot_invite() {
        let f = fixture().await;
        let alice = seed_user(&f.pool, "Alice").await;
        let charlie = seed_user(&f.pool, "Charlie").await;
        let list = f.lists.new_list(&alice, "Chores", &[]).await.unwrap();

        assert!(matches!(
            f.invites
                .invite(&charlie, &list.id, &InviteTarget::Id(charlie.user_id.clone()))
                .await,
            Err(ListError::UserAccess(_))
        ));
    }

    #[tokio::test]
    async fn notifications_are_owner_only() {
        let f = fixture().await;
        let alice = seed_user(&f.pool, "Alice").await;
        let bob = seed_user(&f.pool, "Bob").await;
        let list = f.lists.new_list(&alice, "Chores", &[]).await.unwrap();
        f.invites
            .invite(&alice, &list.id, &InviteTarget::Id(bob.user_id.clone()))
            .await
            .unwrap();
        let note = f.invites.notifications(&bob).await.unwrap().remove(0);

        assert!(matches!(
            f.invites.mark_notification_read(&alice, &note.id).await,
            Err(ListError::UserAccess(_))
        ));
        let read = f.invites.mark_notification_read(&bob, &note.id).await.unwrap();
        assert!(read.read);
        assert!(f.invites.notifications(&bob).await.unwrap()[0].read);
    }
}
