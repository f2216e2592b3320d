#![allow(dead_code)]

use std::sync::Arc;

use application::{
    Bridge, BridgeConfig, BridgeDependencies, EventRouter, MemoryEventArchive, Projections,
};
use async_trait::async_trait;
use chrono::Utc;
use domain::{
    ArchiveError, ChatEvent, ChatUser, EventArchive, EventId, MessageContent, Nickname, UserId,
};
use tokio::sync::{Notify, Semaphore};
use uuid::Uuid;

pub fn user(n: u128, nickname: &str) -> ChatUser {
    ChatUser::new(
        UserId::from(Uuid::from_u128(n)),
        Nickname::parse(nickname).expect("nickname"),
    )
}

pub fn join(user: &ChatUser) -> ChatEvent {
    ChatEvent::user_join(EventId::generate(), user.clone(), Utc::now())
}

pub fn leave(user: &ChatUser) -> ChatEvent {
    ChatEvent::user_left(EventId::generate(), user.clone(), Utc::now())
}

pub fn message(user: &ChatUser, text: &str) -> ChatEvent {
    ChatEvent::message_sent(
        EventId::generate(),
        user.clone(),
        MessageContent::new(text).expect("content"),
        Utc::now(),
    )
}

/// 启动一个只接了投影钩子的事件桥
pub fn start_bridge(
    archive: Arc<dyn EventArchive>,
    projections: &Projections,
    queue_capacity: usize,
) -> Bridge {
    let mut router = EventRouter::new();
    projections.register(&mut router);
    Bridge::start(
        BridgeDependencies { archive, router },
        BridgeConfig { queue_capacity },
    )
}

/// 写入前需要放行的归档，用于控制 worker 的进度
pub struct GatedArchive {
    pub inner: MemoryEventArchive,
    gate: Semaphore,
    pub append_started: Notify,
}

impl GatedArchive {
    pub fn new() -> Self {
        Self {
            inner: MemoryEventArchive::new(),
            gate: Semaphore::new(0),
            append_started: Notify::new(),
        }
    }

    /// 允许 n 次写入
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait]
impl EventArchive for GatedArchive {
    async fn append(&self, event: &ChatEvent) -> Result<(), ArchiveError> {
        self.append_started.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| ArchiveError::Unavailable)?;
        permit.forget();
        self.inner.append(event).await
    }

    async fn read_all(&self) -> Result<Vec<ChatEvent>, ArchiveError> {
        self.inner.read_all().await
    }

    async fn count(&self) -> Result<u64, ArchiveError> {
        self.inner.count().await
    }
}

/// 拒绝写入内容为 "boom" 的消息
#[derive(Default)]
pub struct FailingArchive {
    pub inner: MemoryEventArchive,
}

#[async_trait]
impl EventArchive for FailingArchive {
    async fn append(&self, event: &ChatEvent) -> Result<(), ArchiveError> {
        if event.content().map(|c| c.as_str()) == Some("boom") {
            return Err(ArchiveError::storage("disk full"));
        }
        self.inner.append(event).await
    }

    async fn read_all(&self) -> Result<Vec<ChatEvent>, ArchiveError> {
        self.inner.read_all().await
    }

    async fn count(&self) -> Result<u64, ArchiveError> {
        self.inner.count().await
    }
}
