use async_trait::async_trait;

use crate::errors::ArchiveError;
use crate::events::ChatEvent;

/// 事件归档 - 只追加的持久化事件日志
///
/// 实现需要保证：
/// - `append` 返回前事件已持久化
/// - `read_all` 按写入顺序返回全部事件
#[async_trait]
pub trait EventArchive: Send + Sync {
    /// 追加一个事件
    async fn append(&self, event: &ChatEvent) -> Result<(), ArchiveError>;

    /// 按写入顺序读取全部事件
    async fn read_all(&self) -> Result<Vec<ChatEvent>, ArchiveError>;

    /// 已归档的事件数量
    async fn count(&self) -> Result<u64, ArchiveError>;
}
