use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

use domain::{ChatEvent, EventPayload, Nickname, Timestamp, UserId};
use serde::Serialize;

use crate::router::{EventHook, HookError};

/// 在线用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnlineUser {
    pub id: UserId,
    pub nickname: Nickname,
    pub joined_at: Timestamp,
}

/// 在线用户投影
///
/// 只由 UserJoin / UserLeft 事件修改。重复加入和离开不存在的用户都是空操作。
#[derive(Debug, Default)]
pub struct OnlineUsers {
    users: RwLock<BTreeMap<UserId, OnlineUser>>,
}

impl OnlineUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前在线用户，按加入时间排序
    pub fn snapshot(&self) -> Vec<OnlineUser> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        let mut online: Vec<OnlineUser> = users.values().cloned().collect();
        online.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)));
        online
    }

    pub fn ids(&self) -> BTreeSet<UserId> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users.keys().copied().collect()
    }

    pub fn contains(&self, id: UserId) -> bool {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventHook for OnlineUsers {
    fn handle(&self, event: &ChatEvent) -> Result<(), HookError> {
        let actor = event.actor();
        match event.payload() {
            EventPayload::UserJoin => {
                let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
                if users.contains_key(&actor.id) {
                    tracing::debug!(user_id = %actor.id, "user already online, join ignored");
                    return Ok(());
                }
                users.insert(
                    actor.id,
                    OnlineUser {
                        id: actor.id,
                        nickname: actor.nickname.clone(),
                        joined_at: event.occurred_at(),
                    },
                );
                tracing::debug!(user_id = %actor.id, online = users.len(), "user joined");
                Ok(())
            }
            EventPayload::UserLeft => {
                let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
                if users.remove(&actor.id).is_none() {
                    tracing::debug!(user_id = %actor.id, "user not online, leave ignored");
                } else {
                    tracing::debug!(user_id = %actor.id, online = users.len(), "user left");
                }
                Ok(())
            }
            EventPayload::MessageSent { .. } => Err(HookError::unexpected(self.name(), event.kind())),
        }
    }

    fn name(&self) -> &str {
        "online_users"
    }
}
