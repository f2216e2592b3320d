use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use domain::{ChatEvent, ChatUser, EventId, EventPayload, MessageContent, Timestamp};
use serde::Serialize;

use crate::router::{EventHook, HookError};

/// 缓冲区中的一条消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentMessage {
    pub id: EventId,
    pub author: ChatUser,
    pub content: MessageContent,
    pub sent_at: Timestamp,
}

/// 最近消息缓冲区
///
/// 保存最近 `capacity` 条 MessageSent 事件，顺序与事件分发顺序一致。
/// 缓冲区满时插入新消息会淘汰最旧的一条。容量为 0 时不保存任何消息。
#[derive(Debug)]
pub struct LastMessages {
    capacity: usize,
    buffer: RwLock<VecDeque<RecentMessage>>,
}

impl LastMessages {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 从旧到新的消息列表
    pub fn snapshot(&self) -> Vec<RecentMessage> {
        let buffer = self.buffer.read().unwrap_or_else(PoisonError::into_inner);
        buffer.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let buffer = self.buffer.read().unwrap_or_else(PoisonError::into_inner);
        buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, message: RecentMessage) {
        if self.capacity == 0 {
            return;
        }
        let mut buffer = self.buffer.write().unwrap_or_else(PoisonError::into_inner);
        while buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(message);
    }
}

impl EventHook for LastMessages {
    fn handle(&self, event: &ChatEvent) -> Result<(), HookError> {
        match event.payload() {
            EventPayload::MessageSent { content } => {
                self.push(RecentMessage {
                    id: event.id(),
                    author: event.actor().clone(),
                    content: content.clone(),
                    sent_at: event.occurred_at(),
                });
                tracing::debug!(event_id = %event.id(), "message buffered");
                Ok(())
            }
            EventPayload::UserJoin | EventPayload::UserLeft => {
                Err(HookError::unexpected(self.name(), event.kind()))
            }
        }
    }

    fn name(&self) -> &str {
        "last_messages"
    }
}
