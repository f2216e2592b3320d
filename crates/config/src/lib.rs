//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 服务监听地址
//! - 事件归档数据库（可选，未配置时使用内存归档）
//! - 会话令牌
//! - 事件桥与投影参数
//! - 日志过滤
//!
//! 配置按以下顺序叠加，后者覆盖前者：内置默认值 → YAML 文件 → `CHATROOM_` 前缀的环境变量
//! （嵌套字段用 `__` 分隔，例如 `CHATROOM_CHAT__BRIDGE_QUEUE_CAPACITY=64`）。

use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "CHATROOM_CONFIG";
/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "chatroom.yaml";

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务配置
    pub server: ServerConfig,
    /// 归档数据库配置
    pub database: Option<DatabaseConfig>,
    /// 会话令牌配置
    pub session: SessionConfig,
    /// 聊天室核心配置
    pub chat: ChatConfig,
    /// 日志配置
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// 会话令牌配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

/// 聊天室核心配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// 最近消息缓冲区大小
    pub last_messages_buffer_size: usize,
    /// 事件桥队列容量（排队中 + 处理中）
    pub bridge_queue_capacity: usize,
    /// 关闭时等待事件桥排空的时间
    pub shutdown_grace_secs: u64,
    /// 实时通知的广播缓冲
    pub notifier_capacity: usize,
}

impl ChatConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` 语法，`RUST_LOG` 优先
    pub filter: String,
}

impl Default for AppConfig {
    /// 开发环境默认值
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: None,
            session: SessionConfig {
                secret: "dev-secret-key-not-for-production-use-minimum-32-chars".to_string(),
                expiration_hours: 24 * 7,
            },
            chat: ChatConfig {
                last_messages_buffer_size: 100,
                bridge_queue_capacity: 256,
                shutdown_grace_secs: 15,
                notifier_capacity: 1024,
            },
            log: LogConfig {
                filter: "info".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 配置来源：默认值 → YAML 文件 → 环境变量
    pub fn figment() -> Figment {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("CHATROOM_").split("__"))
    }

    /// 加载并验证配置
    pub fn load() -> Result<Self, ConfigError> {
        let config: AppConfig = Self::figment().extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chat.bridge_queue_capacity == 0 {
            return Err(ConfigError::InvalidChatConfig(
                "bridge queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.chat.notifier_capacity == 0 {
            return Err(ConfigError::InvalidChatConfig(
                "notifier capacity must be greater than 0".to_string(),
            ));
        }

        if let Some(database) = &self.database {
            if database.url.is_empty() {
                return Err(ConfigError::InvalidDatabaseConfig(
                    "Database URL cannot be empty".to_string(),
                ));
            }
            if database.max_connections == 0 {
                return Err(ConfigError::InvalidDatabaseConfig(
                    "Max connections must be greater than 0".to_string(),
                ));
            }
        }

        // 至少 256 位
        if self.session.secret.len() < 32 {
            return Err(ConfigError::InvalidSessionSecret(
                "session secret must be at least 32 characters long".to_string(),
            ));
        }

        if self.session.expiration_hours <= 0 {
            return Err(ConfigError::InvalidSessionSecret(
                "session expiration must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("Invalid database configuration: {0}")]
    InvalidDatabaseConfig(String),
    #[error("Invalid session secret: {0}")]
    InvalidSessionSecret(String),
    #[error("Invalid chat configuration: {0}")]
    InvalidChatConfig(String),
}
