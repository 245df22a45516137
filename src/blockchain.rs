// Thin re-export module: implementation is in `blockchain/core.rs`, split into
// the block/ledger data model, chain validation and the canonical encoding
// used for block hashes.

pub mod core;
pub use self::core::*;
