//! 用户模块
//!
//! 用户注册与按 ID / 用户名 / 邮箱查找用户

pub mod dao;
pub mod models;
pub mod service;

pub use dao::UserDao;
pub use models::{RegisteredUser, User};
pub use service::UserService;
