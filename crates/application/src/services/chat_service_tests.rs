//! 聊天室服务单元测试

#[cfg(test)]
mod chat_service_tests {
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};
    use domain::{DomainError, EventKind, Timestamp};

    use crate::archive::MemoryEventArchive;
    use crate::bridge::{Bridge, BridgeConfig, BridgeDependencies};
    use crate::clock::Clock;
    use crate::error::ApplicationError;
    use crate::notifier::EventNotifier;
    use crate::projections::Projections;
    use crate::services::{ChatService, ChatServiceDependencies};
    use crate::test_support::user;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> Timestamp {
            self.0
        }
    }

    fn create_service(archive: Arc<MemoryEventArchive>) -> ChatService {
        let projections = Projections::new(10);
        let notifier = EventNotifier::new(16);
        let mut router = crate::router::EventRouter::new();
        projections.register(&mut router);
        notifier.register(&mut router);
        let bridge = Bridge::start(
            BridgeDependencies { archive, router },
            BridgeConfig::default(),
        );

        ChatService::new(ChatServiceDependencies {
            bridge,
            projections,
            notifier,
            clock: Arc::new(FixedClock(
                Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            )),
        })
    }

    #[tokio::test]
    async fn join_send_leave_updates_read_models() {
        let archive = Arc::new(MemoryEventArchive::new());
        let service = create_service(archive.clone());
        let alice = user(1, "alice");

        service.join(alice.clone()).unwrap().wait().await.unwrap();
        service
            .send_message(alice.clone(), "  hello  ")
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(service.online_users().len(), 1);
        let history = service.recent_messages();
        assert_eq!(history[0].content.as_str(), "hello");
        assert_eq!(
            history[0].sent_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
        );

        service.leave(alice).unwrap().wait().await.unwrap();
        assert!(service.online_users().is_empty());

        let kinds: Vec<EventKind> = archive.events().await.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![EventKind::UserJoin, EventKind::MessageSent, EventKind::UserLeft]
        );
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_submission() {
        let archive = Arc::new(MemoryEventArchive::new());
        let service = create_service(archive.clone());

        let err = service.send_message(user(1, "alice"), "   ").unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::InvalidArgument { .. })
        ));
        assert_eq!(service.bridge().pending(), 0);
        assert!(archive.events().await.is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_live_events() {
        let archive = Arc::new(MemoryEventArchive::new());
        let service = create_service(archive);
        let mut events = service.subscribe();

        let receipt = service.join(user(1, "alice")).unwrap();
        let event_id = receipt.event_id();
        receipt.wait().await.unwrap();

        let received = events.recv().await.unwrap();
        assert_eq!(received.id(), event_id);
        assert_eq!(received.kind(), EventKind::UserJoin);
    }
}
