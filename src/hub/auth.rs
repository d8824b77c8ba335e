//! 认证：签发与校验 bearer token（HS256 JWT）
//!
//! 只负责把凭证换成已认证的 [`Actor`]，密码等登录细节不在此处理。

use crate::hub::config::ServiceConfig;
use crate::hub::error::{ListError, ListResult};
use crate::hub::types::Actor;
use crate::hub::user::models::User;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// token 载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub name: String,
    pub icon: String,
    /// 签发时间（秒）
    pub iat: u64,
    /// 过期时间（秒）
    pub exp: u64,
}

/// token 签发/校验服务
#[derive(Clone)]
pub struct TokenService {
    key: String,
    ttl_secs: u64,
}

impl TokenService {
    pub fn new(key: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            key: key.into(),
            ttl_secs,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.token_key.clone(), config.token_ttl_secs)
    }

    /// 为用户签发 token
    pub fn issue(&self, user: &User) -> ListResult<String> {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        self.issue_at(user, now)
    }

    fn issue_at(&self, user: &User, iat: u64) -> ListResult<String> {
        let claims = Claims {
            user_id: user.id.clone(),
            name: user.name.clone(),
            icon: user.icon.clone(),
            iat,
            exp: iat + self.ttl_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.key.as_bytes()),
        )
        .map_err(|e| ListError::Internal(anyhow::anyhow!("签发 token 失败: {}", e)))
    }

    /// 校验 token 并返回请求方
    pub fn verify(&self, token: Option<&str>) -> ListResult<Actor> {
        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(ListError::Unauthenticated("Token required".to_string())),
        };

        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.key.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            let msg = match e.kind() {
                ErrorKind::ExpiredSignature => "Expired token",
                _ => "Invalid token",
            };
            debug!("[Auth] token 校验失败: {:?}", e);
            ListError::InvalidCredentials(msg.to_string())
        })?;

        Ok(Actor {
            user_id: data.claims.user_id,
            name: data.claims.name,
            icon: data.claims.icon,
        })
    }
}
