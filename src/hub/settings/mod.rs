//! 用户隐私设置模块
//!
//! 隐私设置决定其他用户邀请本人加入清单时的处理方式（自动接受、拒绝或待处理）。

pub mod dao;
pub mod models;
pub mod policy;
pub mod service;

pub use dao::SettingsDao;
pub use models::{Privacy, PrivacyList, PrivacyMode, UserSettings};
pub use policy::{evaluate, Decision};
pub use service::SettingsService;
