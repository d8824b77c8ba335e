//! 清单服务错误类型
//!
//! 业务层主动产生的错误（校验失败、无权限、不存在等）原样向上传递，
//! 存储层的错误统一收敛为 `Internal`，不向调用方暴露 sqlx 细节。

use thiserror::Error;

/// 清单服务统一错误
#[derive(Debug, Error)]
pub enum ListError {
    /// 输入格式错误（非法 ID、缺少必填字段、非法枚举值、类型不是数组等）
    #[error("Validation Error: {0}")]
    Validation(String),

    /// 凭证存在但无效（签名错误、格式错误、已过期）
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// 缺少凭证
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// 已认证但不是目标资源的成员/拥有者
    #[error("User Access: {0}")]
    UserAccess(String),

    /// 引用的实体不存在
    #[error("Not found: {0}")]
    ElementNotFound(String),

    /// 唯一性冲突
    #[error("Duplicate element: {0}")]
    DuplicateElement(String),

    /// 存储层异常
    #[error("Internal Error")]
    Internal(#[from] anyhow::Error),
}

impl ListError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn user_access(msg: impl Into<String>) -> Self {
        Self::UserAccess(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::ElementNotFound(msg.into())
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::InvalidCredentials(_) | Self::Unauthenticated(_) => 401,
            Self::UserAccess(_) => 403,
            Self::ElementNotFound(_) => 404,
            Self::DuplicateElement(_) => 409,
            Self::Internal(_) => 500,
        }
    }
}

impl From<sqlx::Error> for ListError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(anyhow::Error::new(e))
    }
}

pub type ListResult<T> = std::result::Result<T, ListError>;
