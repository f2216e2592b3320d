use std::sync::Arc;

use domain::{ChatEvent, ChatUser, EventId, MessageContent};
use tokio::sync::broadcast;

use crate::{
    bridge::{Bridge, SubmitReceipt},
    clock::Clock,
    error::ApplicationError,
    notifier::EventNotifier,
    projections::{OnlineUser, Projections, RecentMessage},
};

pub struct ChatServiceDependencies {
    pub bridge: Bridge,
    pub projections: Projections,
    pub notifier: EventNotifier,
    pub clock: Arc<dyn Clock>,
}

/// 聊天室用例：写操作提交给事件桥，读操作直接查询投影
pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    pub fn join(&self, user: ChatUser) -> Result<SubmitReceipt, ApplicationError> {
        let event = ChatEvent::user_join(EventId::generate(), user, self.deps.clock.now());
        Ok(self.deps.bridge.submit(event)?)
    }

    pub fn leave(&self, user: ChatUser) -> Result<SubmitReceipt, ApplicationError> {
        let event = ChatEvent::user_left(EventId::generate(), user, self.deps.clock.now());
        Ok(self.deps.bridge.submit(event)?)
    }

    pub fn send_message(
        &self,
        user: ChatUser,
        content: &str,
    ) -> Result<SubmitReceipt, ApplicationError> {
        let content = MessageContent::new(content)?;
        let event = ChatEvent::message_sent(
            EventId::generate(),
            user,
            content,
            self.deps.clock.now(),
        );
        Ok(self.deps.bridge.submit(event)?)
    }

    pub fn online_users(&self) -> Vec<OnlineUser> {
        self.deps.projections.online_users.snapshot()
    }

    pub fn recent_messages(&self) -> Vec<RecentMessage> {
        self.deps.projections.last_messages.snapshot()
    }

    /// 订阅实时事件
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.deps.notifier.subscribe()
    }

    pub fn bridge(&self) -> &Bridge {
        &self.deps.bridge
    }
}
