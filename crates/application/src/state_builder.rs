//! 启动时的状态重建
//!
//! 按归档顺序读取全部事件，通过一个只接了投影钩子的新路由逐个分发，
//! 在事件桥开始接收流量之前恢复内存投影。重建过程不写归档。

use std::sync::Arc;

use domain::{ArchiveError, EventArchive, EventKind};
use thiserror::Error;

use crate::router::{DispatchError, EventRouter};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RebuildError {
    #[error("failed to read archive: {0}")]
    Archive(#[from] ArchiveError),

    /// 重放中任何钩子失败都是致命错误，投影不可信
    #[error("replay failed at archived event #{position}: {source}")]
    Replay {
        position: usize,
        #[source]
        source: DispatchError,
    },
}

/// 重建统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub replayed: usize,
    pub joins: usize,
    pub leaves: usize,
    pub messages: usize,
}

impl RebuildReport {
    fn record(&mut self, kind: EventKind) {
        self.replayed += 1;
        match kind {
            EventKind::UserJoin => self.joins += 1,
            EventKind::UserLeft => self.leaves += 1,
            EventKind::MessageSent => self.messages += 1,
        }
    }
}

/// 状态重建器
pub struct StateBuilder {
    pub archive: Arc<dyn EventArchive>,
    /// 只注册投影钩子的重放路由
    pub router: EventRouter,
}

impl StateBuilder {
    pub fn new(archive: Arc<dyn EventArchive>, router: EventRouter) -> Self {
        Self { archive, router }
    }

    /// 顺序重放归档中的全部事件
    pub async fn rebuild(&self) -> Result<RebuildReport, RebuildError> {
        let events = self.archive.read_all().await?;
        tracing::info!(archived = events.len(), "replaying archive");

        let mut report = RebuildReport::default();
        for (position, event) in events.iter().enumerate() {
            self.router
                .dispatch(event)
                .map_err(|source| RebuildError::Replay { position, source })?;
            report.record(event.kind());
        }

        tracing::info!(
            replayed = report.replayed,
            joins = report.joins,
            leaves = report.leaves,
            messages = report.messages,
            "state rebuilt"
        );
        Ok(report)
    }
}
