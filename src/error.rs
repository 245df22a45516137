//! Error types for hashledger

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The chain lost its genesis block. Never happens through the public API.
    #[error("Chain is empty")]
    EmptyChain,
    #[error("Invalid block linkage at block {index}")]
    InvalidBlockLinkage { index: u64 },
    #[error("Invalid proof of work at block {index}")]
    InvalidProofOfWork { index: u64 },
    #[error("Invalid block index: expected {expected}, found {found}")]
    InvalidBlockIndex { expected: u64, found: u64 },
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Invalid peer address: {0}")]
    InvalidPeerAddress(String),
    #[error("Invalid difficulty {0}: must be between 1 and 64 leading zeros")]
    InvalidDifficulty(u32),
    #[error("Mining was cancelled")]
    MiningCancelled,
    #[error("Mining failed: {0}")]
    MiningFailed(String),
    #[error("Proof became stale: the chain head changed while mining")]
    StaleProof,
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        ChainError::NetworkError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
