//! 应用层实现。
//!
//! 事件总线的核心：事件路由、内存投影、负责持久化和分发的事件桥，
//! 以及启动时从归档重建投影的状态重建器。

pub mod archive;
pub mod bridge;
pub mod clock;
pub mod error;
pub mod notifier;
pub mod projections;
pub mod router;
pub mod services;
pub mod state_builder;

pub use archive::MemoryEventArchive;
pub use bridge::{
    Bridge, BridgeConfig, BridgeDependencies, BridgeError, RejectReason, SubmitReceipt,
};
pub use clock::{Clock, SystemClock};
pub use error::ApplicationError;
pub use notifier::EventNotifier;
pub use projections::{LastMessages, OnlineUser, OnlineUsers, Projections, RecentMessage};
pub use router::{hook_fn, DispatchError, EventHook, EventRouter, HookError};
pub use services::{ChatService, ChatServiceDependencies};
pub use state_builder::{RebuildError, RebuildReport, StateBuilder};
