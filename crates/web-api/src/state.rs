use std::sync::Arc;

use application::ChatService;
use tokio_util::sync::CancellationToken;

use crate::SessionTokens;

#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ChatService>,
    pub session: Arc<SessionTokens>,
    /// 取消后所有 SSE 流结束
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(chat_service: Arc<ChatService>, session: Arc<SessionTokens>) -> Self {
        Self {
            chat_service,
            session,
            shutdown: CancellationToken::new(),
        }
    }

    /// 通知长连接结束，让优雅关闭可以完成
    pub fn begin_shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
