//! 主应用程序入口
//!
//! 启动顺序：加载配置 → 打开事件归档 → 重建投影 → 启动事件桥 → 启动 Axum Web API。
//! 服务停止后在宽限期内排空事件桥。

use std::sync::Arc;

use anyhow::Context;
use application::{
    Bridge, BridgeConfig, BridgeDependencies, ChatService, ChatServiceDependencies, Clock,
    EventNotifier, EventRouter, MemoryEventArchive, Projections, StateBuilder, SystemClock,
};
use config::AppConfig;
use domain::EventArchive;
use infrastructure::{create_pg_pool, PgEventArchive, MIGRATOR};
use tracing_subscriber::EnvFilter;
use web_api::{serve, AppState, SessionTokens};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    // 初始化日志，RUST_LOG 优先于配置文件
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let archive = open_archive(&config).await?;

    // 从归档重建投影，失败则拒绝启动
    let projections = Projections::new(config.chat.last_messages_buffer_size);
    let report = StateBuilder::new(archive.clone(), projections.replay_router())
        .rebuild()
        .await
        .context("failed to rebuild state")?;
    tracing::info!(
        replayed = report.replayed,
        online = projections.online_users.len(),
        messages = projections.last_messages.len(),
        "state rebuilt from archive"
    );

    let notifier = EventNotifier::new(config.chat.notifier_capacity);
    let mut live_router = EventRouter::new();
    projections.register(&mut live_router);
    notifier.register(&mut live_router);

    let bridge = Bridge::start(
        BridgeDependencies {
            archive,
            router: live_router,
        },
        BridgeConfig {
            queue_capacity: config.chat.bridge_queue_capacity,
        },
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let chat_service = ChatService::new(ChatServiceDependencies {
        bridge: bridge.clone(),
        projections,
        notifier,
        clock,
    });
    let session = Arc::new(SessionTokens::new(&config.session));
    let state = AppState::new(Arc::new(chat_service), session);

    // 启动 Web 服务器
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("聊天室服务器启动在 http://{}", addr);
    // HTTP 关闭和事件桥排空共用同一个截止时间
    let deadline = serve(listener, state, shutdown_signal(), config.chat.shutdown_grace())
        .await
        .context("server error")?;

    tracing::info!(pending = bridge.pending(), "draining event bridge");
    match bridge.shutdown(deadline).await {
        Ok(()) => tracing::info!("event bridge drained"),
        Err(err) => tracing::warn!(error = %err, "event bridge did not drain before deadline"),
    }

    Ok(())
}

/// 配置了数据库时使用 PostgreSQL 归档，否则退回内存归档
async fn open_archive(config: &AppConfig) -> anyhow::Result<Arc<dyn EventArchive>> {
    match &config.database {
        Some(database) => {
            tracing::info!(
                "连接数据库: {}",
                database.url.split('@').next_back().unwrap_or("unknown")
            );
            let pool = create_pg_pool(&database.url, database.max_connections)
                .await
                .context("failed to connect to database")?;
            MIGRATOR
                .run(&pool)
                .await
                .context("failed to run migrations")?;
            Ok(Arc::new(PgEventArchive::new(pool)))
        }
        None => {
            tracing::warn!("no database configured, events are kept in memory only");
            Ok(Arc::new(MemoryEventArchive::new()))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
