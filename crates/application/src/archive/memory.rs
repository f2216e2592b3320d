use async_trait::async_trait;
use domain::{ArchiveError, ChatEvent, EventArchive};
use tokio::sync::RwLock;

/// 内存实现的事件归档（用于测试和无数据库的开发环境）
///
/// 进程退出后数据丢失，不满足生产环境的持久化要求。
#[derive(Debug, Default)]
pub struct MemoryEventArchive {
    events: RwLock<Vec<ChatEvent>>,
}

impl MemoryEventArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用已有事件初始化
    pub fn with_events(events: Vec<ChatEvent>) -> Self {
        Self {
            events: RwLock::new(events),
        }
    }

    /// 当前归档内容的快照
    pub async fn events(&self) -> Vec<ChatEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl EventArchive for MemoryEventArchive {
    async fn append(&self, event: &ChatEvent) -> Result<(), ArchiveError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<ChatEvent>, ArchiveError> {
        Ok(self.events().await)
    }

    async fn count(&self) -> Result<u64, ArchiveError> {
        Ok(self.events.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{join, message, user};

    #[tokio::test]
    async fn preserves_insertion_order() {
        let archive = MemoryEventArchive::new();
        let alice = user(1, "alice");
        let first = join(&alice);
        let second = message(&alice, "hello");

        archive.append(&first).await.unwrap();
        archive.append(&second).await.unwrap();

        assert_eq!(archive.read_all().await.unwrap(), vec![first, second]);
        assert_eq!(archive.count().await.unwrap(), 2);
    }
}
