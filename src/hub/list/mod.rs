//! 清单模块：模型、数据访问、访问控制、条目操作与完成/结转

pub mod access;
pub mod dao;
pub mod finish;
pub mod item;
pub mod models;
pub mod service;

pub use dao::ListDao;
pub use finish::up_name;
pub use item::AttributeUpdates;
pub use models::{
    FinishOptions, FinishReport, FinishedList, InvitedMarker, ItemStatus, ListItem, ListMeta,
    PopulatedList, RemoveOptions, TodoList,
};
pub use service::ListService;
