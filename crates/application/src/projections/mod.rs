//! 内存投影
//!
//! 由事件钩子维护的派生视图：在线用户和最近消息。实时分发和启动重放共用同一套
//! 投影注册规则（见 [`Projections::register`]），但各自使用独立的路由实例。

pub mod last_messages;
pub mod online_users;

use std::sync::Arc;

use domain::EventKind;

use crate::router::EventRouter;

pub use last_messages::{LastMessages, RecentMessage};
pub use online_users::{OnlineUser, OnlineUsers};

/// 进程内唯一的一组投影实例
#[derive(Debug, Clone)]
pub struct Projections {
    pub online_users: Arc<OnlineUsers>,
    pub last_messages: Arc<LastMessages>,
}

impl Projections {
    pub fn new(last_messages_capacity: usize) -> Self {
        Self {
            online_users: Arc::new(OnlineUsers::new()),
            last_messages: Arc::new(LastMessages::new(last_messages_capacity)),
        }
    }

    /// 把投影钩子注册到路由上
    pub fn register(&self, router: &mut EventRouter) {
        router
            .hook(EventKind::UserJoin, self.online_users.clone())
            .hook(EventKind::UserLeft, self.online_users.clone())
            .hook(EventKind::MessageSent, self.last_messages.clone());
    }

    /// 只包含投影钩子的新路由，供启动重放使用
    pub fn replay_router(&self) -> EventRouter {
        let mut router = EventRouter::new();
        self.register(&mut router);
        router
    }
}
