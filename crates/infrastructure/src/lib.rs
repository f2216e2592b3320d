//! 基础设施层实现。
//!
//! 提供基于 PostgreSQL 的事件归档、连接池和数据库迁移，实现领域层定义的归档接口。

pub mod event_archive;
pub mod migrations;
pub mod repository;

pub use event_archive::PgEventArchive;
pub use migrations::MIGRATOR;
pub use repository::create_pg_pool;
