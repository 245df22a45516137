use serde_json::Value;

use super::types::{Amount, Transaction};
use crate::error::ChainError;

/// Reported when a submission lacks `sender`, `receiver` or `amount`.
pub const MISSING_FIELDS_MESSAGE: &str = "Some elements of the transaction are missing";

const REQUIRED_FIELDS: [&str; 3] = ["sender", "receiver", "amount"];

/// Turn an untrusted JSON submission into a [`Transaction`].
///
/// A body that is not an object, or an object missing any required key, is
/// rejected with [`MISSING_FIELDS_MESSAGE`]. Present keys with the wrong JSON
/// type get a message naming the field. Extra keys are ignored.
pub fn transaction_from_json(body: &Value) -> Result<Transaction, ChainError> {
    let fields = match body.as_object() {
        Some(fields) if REQUIRED_FIELDS.iter().all(|key| fields.contains_key(*key)) => fields,
        _ => return Err(ChainError::InvalidTransaction(MISSING_FIELDS_MESSAGE.to_string())),
    };

    let sender = string_field(fields.get("sender"), "sender")?;
    let receiver = string_field(fields.get("receiver"), "receiver")?;
    let amount: Amount = match fields.get("amount") {
        Some(Value::Number(n)) => n.clone(),
        _ => {
            return Err(ChainError::InvalidTransaction(
                "amount must be a number".to_string(),
            ))
        }
    };

    Ok(Transaction {
        sender,
        receiver,
        amount,
    })
}

fn string_field(value: Option<&Value>, name: &str) -> Result<String, ChainError> {
    match value {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(ChainError::InvalidTransaction(format!(
            "{} must be a string",
            name
        ))),
    }
}
