//! 共享清单核心模块
//!
//! 用户、隐私设置、清单（访问控制 / 条目 / 完成与结转）与邀请流程。

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod invite;
pub mod list;
pub mod service;
pub mod settings;
pub mod types;
pub mod user;

#[cfg(test)]
pub(crate) mod test_support;

pub use service::SharedListService;
