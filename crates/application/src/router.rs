//! 事件路由
//!
//! 按事件类型维护有序的钩子列表，将一个事件同步地分发给该类型下注册的全部钩子。
//! 路由本身不做任何 I/O，只负责扇出。实时流量和启动重放各自构建独立的路由实例，
//! 两者永远不共享注册状态。

use std::{fmt, sync::Arc};

use domain::{ChatEvent, EventId, EventKind};
use thiserror::Error;

/// 钩子处理失败
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    /// 钩子收到了它不处理的事件类型，说明路由注册有误
    #[error("hook {hook} cannot handle {kind} events")]
    UnexpectedEvent { hook: String, kind: EventKind },

    #[error("hook failed: {0}")]
    Failed(String),
}

impl HookError {
    pub fn unexpected(hook: impl Into<String>, kind: EventKind) -> Self {
        Self::UnexpectedEvent {
            hook: hook.into(),
            kind,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// 一次分发中第一个失败的钩子
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("dispatch of {kind} event {event_id} failed at hook #{position} ({hook}): {source}")]
pub struct DispatchError {
    pub kind: EventKind,
    pub event_id: EventId,
    pub hook: String,
    /// 失败钩子在该类型注册列表中的下标
    pub position: usize,
    #[source]
    pub source: HookError,
}

/// 事件消费者
///
/// 钩子由注册方持有，路由只保存 `Arc` 引用。
pub trait EventHook: Send + Sync {
    fn handle(&self, event: &ChatEvent) -> Result<(), HookError>;

    /// 日志中使用的名称
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// 用闭包实现的钩子
pub struct HookFn<F> {
    name: String,
    handler: F,
}

impl<F> EventHook for HookFn<F>
where
    F: Fn(&ChatEvent) -> Result<(), HookError> + Send + Sync,
{
    fn handle(&self, event: &ChatEvent) -> Result<(), HookError> {
        (self.handler)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 把闭包包装成带名称的钩子
pub fn hook_fn<F>(name: impl Into<String>, handler: F) -> Arc<HookFn<F>>
where
    F: Fn(&ChatEvent) -> Result<(), HookError> + Send + Sync,
{
    Arc::new(HookFn {
        name: name.into(),
        handler,
    })
}

/// 事件路由：事件类型 → 有序钩子列表
#[derive(Default)]
pub struct EventRouter {
    user_join: Vec<Arc<dyn EventHook>>,
    user_left: Vec<Arc<dyn EventHook>>,
    message_sent: Vec<Arc<dyn EventHook>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为指定类型注册钩子，注册顺序即分发顺序
    pub fn hook(&mut self, kind: EventKind, hook: Arc<dyn EventHook>) -> &mut Self {
        self.hooks_mut(kind).push(hook);
        self
    }

    pub fn hooks(&self, kind: EventKind) -> &[Arc<dyn EventHook>] {
        match kind {
            EventKind::UserJoin => &self.user_join,
            EventKind::UserLeft => &self.user_left,
            EventKind::MessageSent => &self.message_sent,
        }
    }

    fn hooks_mut(&mut self, kind: EventKind) -> &mut Vec<Arc<dyn EventHook>> {
        match kind {
            EventKind::UserJoin => &mut self.user_join,
            EventKind::UserLeft => &mut self.user_left,
            EventKind::MessageSent => &mut self.message_sent,
        }
    }

    pub fn hook_count(&self, kind: EventKind) -> usize {
        self.hooks(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        EventKind::ALL.iter().all(|kind| self.hooks(*kind).is_empty())
    }

    /// 按注册顺序同步调用该事件类型的全部钩子
    ///
    /// 第一个失败的钩子会终止本次分发，后续钩子不再调用。
    /// 没有注册钩子的类型是合法的空操作。
    pub fn dispatch(&self, event: &ChatEvent) -> Result<(), DispatchError> {
        let kind = event.kind();
        for (position, hook) in self.hooks(kind).iter().enumerate() {
            hook.handle(event).map_err(|source| DispatchError {
                kind,
                event_id: event.id(),
                hook: hook.name().to_owned(),
                position,
                source,
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |hooks: &[Arc<dyn EventHook>]| -> Vec<String> {
            hooks.iter().map(|hook| hook.name().to_owned()).collect()
        };
        f.debug_struct("EventRouter")
            .field("user_join", &names(&self.user_join))
            .field("user_left", &names(&self.user_left))
            .field("message_sent", &names(&self.message_sent))
            .finish()
    }
}
