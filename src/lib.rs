pub mod hub;

// 重新导出常用类型，方便外部使用
pub use hub::{
    auth::TokenService,
    config::ServiceConfig,
    error::{ListError, ListResult},
    invite::{InviteListener, InviteTarget},
    list::{FinishOptions, RemoveOptions},
    service::SharedListService,
    types::{Actor, ApiResponse},
};
