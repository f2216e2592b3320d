//! 领域模型错误定义
//!
//! 定义了事件模型和归档契约中可能出现的错误类型，提供清晰的错误上下文。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 参数校验失败
    #[error("invalid argument {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 未知的事件类型
    #[error("unknown event kind: {0}")]
    UnknownEventKind(String),
}

impl DomainError {
    /// 创建参数校验错误
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;

/// 事件归档错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// 底层存储失败（连接、写入、事务等）
    #[error("archive storage error: {message}")]
    Storage { message: String },

    /// 已归档的事件无法解码
    #[error("archived event at position {position} is corrupted: {message}")]
    Corrupted { position: u64, message: String },

    /// 归档暂不可用
    #[error("archive unavailable")]
    Unavailable,
}

impl ArchiveError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn corrupted(position: u64, message: impl Into<String>) -> Self {
        Self::Corrupted {
            position,
            message: message.into(),
        }
    }
}
