//! 聊天室事件总线的核心领域模型
//!
//! 包含房间活动事件、值对象，以及事件归档的抽象接口。

pub mod errors;
pub mod events;
pub mod repositories;
pub mod value_objects;

// 重新导出常用类型
pub use errors::*;
pub use events::*;
pub use repositories::*;
pub use value_objects::*;
