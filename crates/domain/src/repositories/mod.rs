//! Repository接口定义
//!
//! 定义持久化层的抽象接口，内层定义接口，外层实现接口。

pub mod event_archive;

pub use event_archive::EventArchive;
