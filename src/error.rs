//! Crate-level error type.
//!
//! Each module seam carries its own `thiserror` enum; this aggregates
//! them for the publish loop. Every variant is fatal: the agent has no
//! retry semantics, a failed iteration ends the process.

use thiserror::Error;

use crate::config::ConfigError;
use crate::hostinfo::HostInfoError;
use crate::store::StoreError;

/// Result alias for publisher operations
pub type PublisherResult<T> = Result<T, PublisherError>;

/// Any failure the publish loop can surface
#[derive(Debug, Error)]
pub enum PublisherError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("host lookup failed: {0}")]
    HostInfo(#[from] HostInfoError),
}
