use std::{
    future::{Future, IntoFuture},
    time::Duration,
};

use tokio::{net::TcpListener, sync::oneshot, time::Instant};

use crate::{routes::router, state::AppState};

/// 运行 HTTP 服务直到 `signal` 完成
///
/// 收到信号后结束所有 SSE 流并开始优雅关闭。宽限期到了仍未关闭的连接会被直接断开。
/// 返回宽限期的截止时间，调用方用同一个截止时间排空事件桥。
pub async fn serve<S>(
    listener: TcpListener,
    state: AppState,
    signal: S,
    grace: Duration,
) -> std::io::Result<Instant>
where
    S: Future<Output = ()> + Send + 'static,
{
    let (deadline_tx, deadline_rx) = oneshot::channel();
    let shutdown_state = state.clone();
    let server = axum::serve(listener, router(state)).with_graceful_shutdown(async move {
        signal.await;
        shutdown_state.begin_shutdown();
        let _ = deadline_tx.send(Instant::now() + grace);
    });
    let server = server.into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result?;
            Ok(Instant::now() + grace)
        }
        deadline = deadline_rx => {
            let deadline = deadline.unwrap_or_else(|_| Instant::now() + grace);
            match tokio::time::timeout_at(deadline, &mut server).await {
                Ok(result) => result?,
                Err(_) => tracing::warn!("connections still open at shutdown deadline, closing them"),
            }
            Ok(deadline)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::{
        Bridge, BridgeConfig, BridgeDependencies, ChatService, ChatServiceDependencies,
        EventNotifier, EventRouter, MemoryEventArchive, Projections, SystemClock,
    };
    use config::SessionConfig;
    use domain::{ChatUser, Nickname, UserId};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use crate::SessionTokens;

    fn state() -> AppState {
        let projections = Projections::new(10);
        let notifier = EventNotifier::new(16);
        let mut live_router = EventRouter::new();
        projections.register(&mut live_router);
        notifier.register(&mut live_router);
        let bridge = Bridge::start(
            BridgeDependencies {
                archive: Arc::new(MemoryEventArchive::new()),
                router: live_router,
            },
            BridgeConfig::default(),
        );
        let chat_service = ChatService::new(ChatServiceDependencies {
            bridge,
            projections,
            notifier,
            clock: Arc::new(SystemClock),
        });
        let session = SessionTokens::new(&SessionConfig {
            secret: "server-test-secret-with-at-least-32-chars".to_string(),
            expiration_hours: 1,
        });
        AppState::new(Arc::new(chat_service), Arc::new(session))
    }

    #[tokio::test]
    async fn open_event_stream_does_not_block_shutdown() {
        let state = state();
        let user = ChatUser::new(UserId::generate(), Nickname::parse("alice").unwrap());
        let token = state.session.issue(&user).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (signal_tx, signal_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(
            listener,
            state,
            async move {
                let _ = signal_rx.await;
            },
            Duration::from_secs(30),
        ));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(
                format!(
                    "GET /api/v1/room/events?token={token} HTTP/1.1\r\nHost: {addr}\r\n\r\n"
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        let mut received = String::new();
        let mut buf = [0u8; 1024];
        while !received.contains("event: snapshot") {
            let n = client.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before snapshot");
            received.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
        assert!(received.starts_with("HTTP/1.1 200"));

        signal_tx.send(()).unwrap();
        let started = Instant::now();
        let deadline = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server stops while the stream is open")
            .unwrap()
            .unwrap();
        // 连接主动结束，不需要等到宽限期截止
        assert!(deadline > started + Duration::from_secs(20));
    }
}
