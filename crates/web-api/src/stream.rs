use std::collections::HashSet;

use application::{OnlineUser, RecentMessage};
use domain::{ChatEvent, EventId, EventPayload, UserId};

/// 以快照为起点过滤实时事件
///
/// 订阅早于快照，两者之间分发的事件既在快照里也在实时流里。
/// 只放行会改变客户端视图的事件：已在线用户的加入、不在线用户的离开、快照中已有的消息都被跳过。
#[derive(Debug)]
pub(crate) struct SnapshotFilter {
    online: HashSet<UserId>,
    messages: HashSet<EventId>,
}

impl SnapshotFilter {
    pub(crate) fn new(users: &[OnlineUser], messages: &[RecentMessage]) -> Self {
        Self {
            online: users.iter().map(|u| u.id).collect(),
            messages: messages.iter().map(|m| m.id).collect(),
        }
    }

    pub(crate) fn admit(&mut self, event: &ChatEvent) -> bool {
        match event.payload() {
            EventPayload::UserJoin => self.online.insert(event.actor().id),
            EventPayload::UserLeft => self.online.remove(&event.actor().id),
            EventPayload::MessageSent { .. } => !self.messages.contains(&event.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{ChatUser, MessageContent, Nickname};

    fn user(nickname: &str) -> ChatUser {
        ChatUser::new(UserId::generate(), Nickname::parse(nickname).unwrap())
    }

    fn online(user: &ChatUser) -> OnlineUser {
        OnlineUser {
            id: user.id,
            nickname: user.nickname.clone(),
            joined_at: Utc::now(),
        }
    }

    fn join(user: &ChatUser) -> ChatEvent {
        ChatEvent::user_join(EventId::generate(), user.clone(), Utc::now())
    }

    fn leave(user: &ChatUser) -> ChatEvent {
        ChatEvent::user_left(EventId::generate(), user.clone(), Utc::now())
    }

    #[test]
    fn presence_already_in_snapshot_is_skipped() {
        let alice = user("alice");
        let bob = user("bob");
        let mut filter = SnapshotFilter::new(&[online(&alice)], &[]);

        // 快照已包含 alice 的加入，bob 的离开也已生效
        assert!(!filter.admit(&join(&alice)));
        assert!(!filter.admit(&leave(&bob)));

        assert!(filter.admit(&join(&bob)));
        assert!(filter.admit(&leave(&alice)));
        // 离开后重新加入是新的变化
        assert!(filter.admit(&join(&alice)));
    }

    #[test]
    fn messages_in_snapshot_are_skipped() {
        let alice = user("alice");
        let old = ChatEvent::message_sent(
            EventId::generate(),
            alice.clone(),
            MessageContent::new("old").unwrap(),
            Utc::now(),
        );
        let snapshot = vec![RecentMessage {
            id: old.id(),
            author: alice.clone(),
            content: MessageContent::new("old").unwrap(),
            sent_at: old.occurred_at(),
        }];
        let mut filter = SnapshotFilter::new(&[], &snapshot);

        assert!(!filter.admit(&old));
        let new = ChatEvent::message_sent(
            EventId::generate(),
            alice,
            MessageContent::new("new").unwrap(),
            Utc::now(),
        );
        assert!(filter.admit(&new));
    }
}
