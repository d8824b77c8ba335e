//! 共享清单服务入口
//!
//! 统一创建连接池、执行迁移，并装配用户、隐私设置、清单与邀请各子服务。

use crate::hub::auth::TokenService;
use crate::hub::config::ServiceConfig;
use crate::hub::db::create_sqlite_pool_with_migration;
use crate::hub::error::ListResult;
use crate::hub::invite::{EmptyInviteListener, InviteDao, InviteListener, InviteService};
use crate::hub::list::{ListDao, ListService};
use crate::hub::settings::{SettingsDao, SettingsService};
use crate::hub::types::Actor;
use crate::hub::user::{UserDao, UserService};
use anyhow::Result;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::info;

/// 共享清单服务
#[derive(Clone)]
pub struct SharedListService {
    db: Pool<Sqlite>,
    tokens: TokenService,
    users: UserService,
    settings: SettingsService,
    lists: ListService,
    invites: InviteService,
}

impl SharedListService {
    /// 连接数据库并创建服务（使用默认空监听器）
    pub async fn connect(config: ServiceConfig) -> Result<Self> {
        Self::connect_with_listener(config, Arc::new(EmptyInviteListener)).await
    }

    /// 连接数据库并创建服务（带自定义邀请监听器）
    pub async fn connect_with_listener(
        config: ServiceConfig,
        listener: Arc<dyn InviteListener>,
    ) -> Result<Self> {
        info!("[SharedList] 创建服务，数据库: {}", config.db_url);
        let db = create_sqlite_pool_with_migration(&config.db_url, config.max_connections).await?;
        Ok(Self::from_pool(db, &config, listener))
    }

    /// 使用已有连接池创建服务（迁移需已执行）
    pub fn from_pool(
        db: Pool<Sqlite>,
        config: &ServiceConfig,
        listener: Arc<dyn InviteListener>,
    ) -> Self {
        let tokens = TokenService::from_config(config);
        let user_dao = UserDao::new(db.clone());
        let settings_dao = SettingsDao::new(db.clone());
        let lists = ListService::new(ListDao::new(db.clone()), user_dao.clone());
        let invites = InviteService::with_listener(
            InviteDao::new(db.clone()),
            lists.clone(),
            user_dao.clone(),
            settings_dao.clone(),
            listener,
        );
        Self {
            users: UserService::new(user_dao, tokens.clone()),
            settings: SettingsService::new(settings_dao),
            lists,
            invites,
            tokens,
            db,
        }
    }

    /// 校验 bearer token，得到请求方
    pub fn authenticate(&self, token: Option<&str>) -> ListResult<Actor> {
        self.tokens.verify(token)
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn settings(&self) -> &SettingsService {
        &self.settings
    }

    pub fn lists(&self) -> &ListService {
        &self.lists
    }

    pub fn invites(&self) -> &InviteService {
        &self.invites
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.db
    }
}
