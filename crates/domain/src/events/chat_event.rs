//! 聊天室的领域事件
//!
//! 房间内的所有活动（加入、离开、发言）都以不可变事件的形式记录。
//! 归档中的事件顺序是重建状态的唯一依据。

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{ChatUser, EventId, MessageContent, Timestamp};

/// 事件类型。封闭枚举，路由按类型穷举匹配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserJoin,
    UserLeft,
    MessageSent,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::UserJoin,
        EventKind::UserLeft,
        EventKind::MessageSent,
    ];

    /// 归档中使用的稳定名称
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::UserJoin => "user_join",
            EventKind::UserLeft => "user_left",
            EventKind::MessageSent => "message_sent",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user_join" => Ok(EventKind::UserJoin),
            "user_left" => Ok(EventKind::UserLeft),
            "message_sent" => Ok(EventKind::MessageSent),
            other => Err(DomainError::UnknownEventKind(other.to_owned())),
        }
    }
}

/// 事件负载，决定事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    UserJoin,
    UserLeft,
    MessageSent { content: MessageContent },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::UserJoin => EventKind::UserJoin,
            EventPayload::UserLeft => EventKind::UserLeft,
            EventPayload::MessageSent { .. } => EventKind::MessageSent,
        }
    }
}

/// 房间活动事件
///
/// 创建后不可修改：字段私有，只提供读取方法。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    id: EventId,
    actor: ChatUser,
    occurred_at: Timestamp,
    payload: EventPayload,
}

impl ChatEvent {
    /// 创建用户加入事件
    pub fn user_join(id: EventId, actor: ChatUser, occurred_at: Timestamp) -> Self {
        Self::restore(id, actor, occurred_at, EventPayload::UserJoin)
    }

    /// 创建用户离开事件
    pub fn user_left(id: EventId, actor: ChatUser, occurred_at: Timestamp) -> Self {
        Self::restore(id, actor, occurred_at, EventPayload::UserLeft)
    }

    /// 创建消息发送事件
    pub fn message_sent(
        id: EventId,
        actor: ChatUser,
        content: MessageContent,
        occurred_at: Timestamp,
    ) -> Self {
        Self::restore(id, actor, occurred_at, EventPayload::MessageSent { content })
    }

    /// 从归档记录还原事件
    pub fn restore(
        id: EventId,
        actor: ChatUser,
        occurred_at: Timestamp,
        payload: EventPayload,
    ) -> Self {
        Self {
            id,
            actor,
            occurred_at,
            payload,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn actor(&self) -> &ChatUser {
        &self.actor
    }

    pub fn occurred_at(&self) -> Timestamp {
        self.occurred_at
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// 消息正文，仅 MessageSent 事件存在
    pub fn content(&self) -> Option<&MessageContent> {
        match &self.payload {
            EventPayload::MessageSent { content } => Some(content),
            EventPayload::UserJoin | EventPayload::UserLeft => None,
        }
    }
}
