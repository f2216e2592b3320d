// 实时事件通知：把已持久化的事件推送给在线订阅者
use domain::{ChatEvent, EventKind};
use tokio::sync::broadcast;

use crate::router::{EventHook, EventRouter, HookError};

/// 实时事件通知器
///
/// 只注册在实时路由上，重放时不会重复广播历史事件。
#[derive(Debug, Clone)]
pub struct EventNotifier {
    sender: broadcast::Sender<ChatEvent>,
}

impl EventNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// 为全部事件类型注册通知钩子
    pub fn register(&self, router: &mut EventRouter) {
        for kind in EventKind::ALL {
            router.hook(kind, std::sync::Arc::new(self.clone()));
        }
    }
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl EventHook for EventNotifier {
    fn handle(&self, event: &ChatEvent) -> Result<(), HookError> {
        // 没有订阅者时 send 返回错误，这不是失败
        if self.sender.send(event.clone()).is_err() {
            tracing::trace!(event_id = %event.id(), "no live subscribers");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "event_notifier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{join, user};

    #[test]
    fn publishing_without_subscribers_succeeds() {
        let notifier = EventNotifier::new(4);
        assert!(notifier.handle(&join(&user(1, "alice"))).is_ok());
    }

    #[tokio::test]
    async fn subscribers_receive_dispatched_events() {
        let notifier = EventNotifier::new(4);
        let mut router = EventRouter::new();
        notifier.register(&mut router);
        let mut receiver = notifier.subscribe();

        let event = join(&user(1, "alice"));
        router.dispatch(&event).unwrap();

        assert_eq!(receiver.recv().await.unwrap(), event);
        assert_eq!(notifier.subscriber_count(), 1);
    }
}
