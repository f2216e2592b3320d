use domain::{ArchiveError, DomainError};
use thiserror::Error;

use crate::bridge::BridgeError;
use crate::state_builder::RebuildError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("rebuild error: {0}")]
    Rebuild(#[from] RebuildError),
}
