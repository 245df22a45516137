/// Transaction types for hashledger
use serde::{Deserialize, Serialize};

/// A transfer amount, kept as the exact JSON number it arrived as so that an
/// integer `10` never turns into `10.0` when a block is re-encoded for hashing.
pub type Amount = serde_json::Number;

/// A value transfer waiting in the pending queue or recorded in a block.
///
/// There is no signing and no balance tracking; a transaction is only a
/// record of who claims to have sent what to whom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: Amount,
}

impl Transaction {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: impl Into<Amount>,
    ) -> Self {
        Transaction {
            sender: sender.into(),
            receiver: receiver.into(),
            amount: amount.into(),
        }
    }
}
