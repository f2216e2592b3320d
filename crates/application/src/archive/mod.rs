//! 事件归档的进程内实现

pub mod memory;

pub use memory::MemoryEventArchive;
