//! hashledger - a minimal hash-chained proof-of-work ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger, canonical hashing and chain validation
//! - [`transaction`] - Transaction type and submission parsing
//!
//! ## Consensus & Mining
//! - [`miner`] - Proof-of-work search and verification
//! - [`consensus`] - Longest-valid-chain resolution against peers
//!
//! ## Networking
//! - [`peers`] - Peer address registry
//! - [`node`] - Node service owning the ledger and peer set
//! - [`api`] - HTTP API
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! State lives only in memory; a restarted node starts again from genesis.

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod consensus;
pub mod miner;

// ============================================================================
// Networking
// ============================================================================
pub mod api;
pub mod node;
pub mod peers;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
