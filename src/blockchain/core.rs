// core.rs splits responsibilities into submodules for easier maintenance.
pub mod chain;
pub mod encoding;
pub mod validation;

pub use chain::*;
pub use encoding::canonical_json;
pub use validation::*;
