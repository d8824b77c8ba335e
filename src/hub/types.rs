use crate::hub::error::{ListError, ListResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 用户 ID
pub type UserId = String;

/// 已认证的请求方（由认证服务校验凭证后得到）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub name: String,
    pub icon: String,
}

/// 生成新的实体 ID
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// 是否为合法的实体 ID
pub fn is_valid_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// 校验实体 ID，非法时返回 `Validation`
pub fn validate_id(id: &str) -> ListResult<&str> {
    if is_valid_id(id) {
        Ok(id)
    } else {
        Err(ListError::validation(format!("非法 ID: {}", id)))
    }
}

/// 当前时间（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 统一的 API 响应包装结构体（包含 errCode、errMsg、data）
///
/// 路由层直接序列化此结构；errCode 为 0 表示成功，否则为对应的 HTTP 状态码
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(rename = "errCode")]
    pub err_code: i32,
    #[serde(rename = "errMsg")]
    pub err_msg: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            err_code: 0,
            err_msg: String::new(),
            data: Some(data),
        }
    }

    pub fn from_error(e: &ListError) -> Self {
        if let ListError::Internal(inner) = e {
            tracing::error!("[API] 内部错误: {:?}", inner);
        }
        Self {
            err_code: i32::from(e.status_code()),
            err_msg: e.to_string(),
            data: None,
        }
    }

    /// HTTP 状态码（成功为 200）
    pub fn http_status(&self) -> u16 {
        if self.err_code == 0 {
            200
        } else {
            u16::try_from(self.err_code).unwrap_or(500)
        }
    }
}

impl<T> From<ListResult<T>> for ApiResponse<T> {
    fn from(result: ListResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::from_error(&e),
        }
    }
}
