//! 事件桥
//!
//! 事件流的唯一写入者：把并发的加入 / 离开 / 发言请求串行化为一个全序，
//! 先写入归档，再通过实时路由分发给投影钩子。
//!
//! - 提交是非阻塞的准入控制：容量同时计算排队中和处理中的事件，满了直接拒绝
//! - 单个 worker 逐个处理任务，归档写入成功之前绝不分发
//! - 钩子失败只记录日志，不影响后续事件（归档仍是权威数据，重建可修复投影）
//! - 关闭时停止接收新事件，在截止时间前排空队列

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use domain::{ArchiveError, ChatEvent, EventArchive, EventId};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch, Notify, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use crate::router::EventRouter;

/// 提交被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    QueueFull,
    ShuttingDown,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::QueueFull => f.write_str("queue is full"),
            RejectReason::ShuttingDown => f.write_str("bridge is shutting down"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// 同步拒绝，状态未改变，调用方可以重试
    #[error("submission rejected: {0}")]
    Rejected(RejectReason),

    /// 归档写入失败，事件没有被分发
    #[error("failed to persist event {event_id}: {source}")]
    PersistenceFailed {
        event_id: EventId,
        #[source]
        source: ArchiveError,
    },

    /// 已接收的事件在关闭超时后被丢弃
    #[error("event was accepted but dropped before delivery")]
    NotDelivered,

    #[error("bridge shutdown timed out with {pending} pending events")]
    ShutdownTimeout { pending: usize },

    #[error("bridge worker failed: {0}")]
    WorkerFailed(String),
}

/// 事件桥配置
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// 排队中和处理中事件的总上限
    pub queue_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { queue_capacity: 256 }
    }
}

pub struct BridgeDependencies {
    pub archive: Arc<dyn EventArchive>,
    /// 实时路由，由 worker 独占
    pub router: EventRouter,
}

struct Job {
    event: ChatEvent,
    reply: oneshot::Sender<Result<(), BridgeError>>,
    permit: OwnedSemaphorePermit,
}

/// 提交回执
///
/// 提交成功即表示事件已被接收；需要知道持久化结果的调用方可以等待回执。
#[derive(Debug)]
pub struct SubmitReceipt {
    event_id: EventId,
    reply: oneshot::Receiver<Result<(), BridgeError>>,
}

impl SubmitReceipt {
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// 等待事件写入归档并完成分发
    pub async fn wait(self) -> Result<(), BridgeError> {
        self.reply.await.unwrap_or(Err(BridgeError::NotDelivered))
    }
}

struct BridgeInner {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    permits: Arc<Semaphore>,
    capacity: usize,
    stop: Arc<Notify>,
    /// worker 退出后置为 true；worker 异常终止时发送端被丢弃
    exited: watch::Receiver<bool>,
}

/// 事件桥句柄，可在请求上下文之间廉价克隆
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl Bridge {
    /// 启动 worker 任务，必须在 tokio 运行时中调用
    pub fn start(deps: BridgeDependencies, config: BridgeConfig) -> Self {
        let capacity = config.queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let stop = Arc::new(Notify::new());

        tracing::info!(queue_capacity = capacity, router = ?deps.router, "starting bridge");
        let (exited_tx, exited) = watch::channel(false);
        let worker_stop = stop.clone();
        tokio::spawn(async move {
            run_worker(receiver, deps.archive, deps.router, worker_stop).await;
            exited_tx.send_replace(true);
        });

        Self {
            inner: Arc::new(BridgeInner {
                sender: Mutex::new(Some(sender)),
                permits: Arc::new(Semaphore::new(capacity)),
                capacity,
                stop,
                exited,
            }),
        }
    }

    /// 提交事件
    ///
    /// 返回时事件已进入队列，处理相对调用方是异步的。队列满或正在关闭时同步拒绝。
    pub fn submit(&self, event: ChatEvent) -> Result<SubmitReceipt, BridgeError> {
        let guard = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            tracing::warn!(event_id = %event.id(), "bridge is shutting down, event rejected");
            return Err(BridgeError::Rejected(RejectReason::ShuttingDown));
        };

        let Ok(permit) = self.inner.permits.clone().try_acquire_owned() else {
            tracing::warn!(
                event_id = %event.id(),
                kind = %event.kind(),
                capacity = self.inner.capacity,
                "bridge queue full, event rejected"
            );
            return Err(BridgeError::Rejected(RejectReason::QueueFull));
        };

        let event_id = event.id();
        let kind = event.kind();
        let (reply, receipt) = oneshot::channel();
        sender
            .try_send(Job {
                event,
                reply,
                permit,
            })
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => {
                    BridgeError::Rejected(RejectReason::QueueFull)
                }
                mpsc::error::TrySendError::Closed(_) => {
                    BridgeError::Rejected(RejectReason::ShuttingDown)
                }
            })?;

        tracing::debug!(event_id = %event_id, kind = %kind, "event accepted");
        Ok(SubmitReceipt {
            event_id,
            reply: receipt,
        })
    }

    /// 已接收但尚未处理完的事件数
    pub fn pending(&self) -> usize {
        self.inner.capacity - self.inner.permits.available_permits()
    }

    pub fn is_accepting(&self) -> bool {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// 停止接收新事件，并在截止时间前排空队列
    ///
    /// 超时时正在写入的事件会继续完成，但不会再开始新的任务；
    /// 仍在排队的事件被丢弃，其回执返回 [`BridgeError::NotDelivered`]。
    pub async fn shutdown(&self, deadline: Instant) -> Result<(), BridgeError> {
        let sender = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            tracing::info!(pending = self.pending(), "bridge stopped accepting events");
        }
        drop(sender);

        // 每个调用方都等待 worker 真正退出
        let mut exited = self.inner.exited.clone();
        let waited = tokio::time::timeout_at(deadline, exited.wait_for(|done| *done))
            .await
            .map(|r| r.map(|_| ()));
        match waited {
            Ok(Ok(())) => {
                tracing::info!("bridge drained and stopped");
                Ok(())
            }
            Ok(Err(_)) => {
                tracing::error!("bridge worker terminated abnormally");
                Err(BridgeError::WorkerFailed(
                    "worker exited without finishing".to_string(),
                ))
            }
            Err(_) => {
                let pending = self.pending();
                self.inner.stop.notify_one();
                tracing::warn!(pending, "bridge shutdown deadline exceeded");
                Err(BridgeError::ShutdownTimeout { pending })
            }
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<Job>,
    archive: Arc<dyn EventArchive>,
    router: EventRouter,
    stop: Arc<Notify>,
) {
    tracing::info!("bridge worker started");

    loop {
        let job = tokio::select! {
            biased;
            _ = stop.notified() => break,
            job = receiver.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };
        process(job, archive.as_ref(), &router).await;
    }

    receiver.close();
    let mut dropped = 0usize;
    while let Ok(job) = receiver.try_recv() {
        tracing::warn!(event_id = %job.event.id(), "dropping undelivered event");
        dropped += 1;
    }
    tracing::info!(dropped, "bridge worker stopped");
}

async fn process(job: Job, archive: &dyn EventArchive, router: &EventRouter) {
    let Job {
        event,
        reply,
        permit,
    } = job;
    let event_id = event.id();

    let outcome = match archive.append(&event).await {
        Ok(()) => {
            if let Err(err) = router.dispatch(&event) {
                tracing::error!(
                    event_id = %event_id,
                    kind = %err.kind,
                    hook = %err.hook,
                    error = %err.source,
                    "hook failed after event was persisted, projection is stale until rebuild"
                );
            } else {
                tracing::debug!(event_id = %event_id, kind = %event.kind(), "event dispatched");
            }
            Ok(())
        }
        Err(source) => {
            tracing::error!(
                event_id = %event_id,
                kind = %event.kind(),
                error = %source,
                "failed to persist event"
            );
            Err(BridgeError::PersistenceFailed { event_id, source })
        }
    };

    drop(permit);
    // 提交方可能不等待回执
    let _ = reply.send(outcome);
}
