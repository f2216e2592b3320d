use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    ArchiveError, ChatEvent, ChatUser, EventArchive, EventId, EventKind, EventPayload,
    MessageContent, Nickname, UserId,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

fn map_sqlx_err(err: sqlx::Error) -> ArchiveError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => ArchiveError::Unavailable,
        other => ArchiveError::storage(other.to_string()),
    }
}

#[derive(Debug, FromRow)]
struct EventRecord {
    seq: i64,
    event_id: Uuid,
    kind: String,
    actor_id: Uuid,
    actor_nickname: String,
    content: Option<String>,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<EventRecord> for ChatEvent {
    type Error = ArchiveError;

    fn try_from(value: EventRecord) -> Result<Self, Self::Error> {
        let position = value.seq as u64;
        let corrupted = |message: String| ArchiveError::corrupted(position, message);

        let kind: EventKind = value.kind.parse().map_err(|err| corrupted(format!("{err}")))?;
        let nickname =
            Nickname::parse(value.actor_nickname).map_err(|err| corrupted(err.to_string()))?;
        let payload = match (kind, value.content) {
            (EventKind::UserJoin, _) => EventPayload::UserJoin,
            (EventKind::UserLeft, _) => EventPayload::UserLeft,
            (EventKind::MessageSent, Some(content)) => EventPayload::MessageSent {
                content: MessageContent::new(content).map_err(|err| corrupted(err.to_string()))?,
            },
            (EventKind::MessageSent, None) => {
                return Err(corrupted("message_sent event without content".to_string()))
            }
        };

        Ok(ChatEvent::restore(
            EventId::from(value.event_id),
            ChatUser::new(UserId::from(value.actor_id), nickname),
            value.occurred_at,
            payload,
        ))
    }
}

/// PostgreSQL事件归档实现
///
/// 每次追加是一条自动提交的 INSERT，返回时已持久化。
/// 重放顺序由自增的 `seq` 决定；事件桥是唯一写入者，因此 `seq` 顺序即提交顺序。
#[derive(Clone)]
pub struct PgEventArchive {
    pool: PgPool,
}

impl PgEventArchive {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 检查数据库连接是否正常
    pub async fn health_check(&self) -> Result<(), ArchiveError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}

#[async_trait]
impl EventArchive for PgEventArchive {
    async fn append(&self, event: &ChatEvent) -> Result<(), ArchiveError> {
        sqlx::query(
            r#"
            INSERT INTO chat_events (event_id, kind, actor_id, actor_nickname, content, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::from(event.id()))
        .bind(event.kind().as_str())
        .bind(Uuid::from(event.actor().id))
        .bind(event.actor().nickname.as_str())
        .bind(event.content().map(|content| content.as_str()))
        .bind(event.occurred_at())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        tracing::debug!(event_id = %event.id(), kind = %event.kind(), "event archived");
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<ChatEvent>, ArchiveError> {
        let records = sqlx::query_as::<_, EventRecord>(
            r#"
            SELECT seq, event_id, kind, actor_id, actor_nickname, content, occurred_at
            FROM chat_events
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(ChatEvent::try_from).collect()
    }

    async fn count(&self) -> Result<u64, ArchiveError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_events")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str, content: Option<&str>) -> EventRecord {
        EventRecord {
            seq: 42,
            event_id: Uuid::from_u128(1),
            kind: kind.to_string(),
            actor_id: Uuid::from_u128(2),
            actor_nickname: "alice".to_string(),
            content: content.map(str::to_string),
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn decodes_message_record() {
        let event = ChatEvent::try_from(record("message_sent", Some("hello"))).unwrap();
        assert_eq!(event.kind(), EventKind::MessageSent);
        assert_eq!(event.content().unwrap().as_str(), "hello");
        assert_eq!(event.actor().nickname.as_str(), "alice");
    }

    #[test]
    fn message_without_content_is_corrupted() {
        let err = ChatEvent::try_from(record("message_sent", None)).unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupted { position: 42, .. }));
    }

    #[test]
    fn unknown_kind_is_corrupted() {
        let err = ChatEvent::try_from(record("room_created", None)).unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupted { .. }));
    }
}
