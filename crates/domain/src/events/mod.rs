//! 领域事件定义

pub mod chat_event;

pub use chat_event::*;
