//! Transaction module split into types and validation for better modularity

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::{transaction_from_json, MISSING_FIELDS_MESSAGE};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_serializes_wire_fields() {
        let tx = Transaction::new("A", "B", 10);
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value, json!({"sender": "A", "receiver": "B", "amount": 10}));
    }

    #[test]
    fn test_integer_amount_stays_integer() {
        let tx: Transaction =
            serde_json::from_value(json!({"sender": "A", "receiver": "B", "amount": 10})).unwrap();
        assert!(tx.amount.is_u64());
        assert_eq!(serde_json::to_string(&tx.amount).unwrap(), "10");
    }

    #[test]
    fn test_float_amount_round_trips_exactly() {
        let tx: Transaction =
            serde_json::from_value(json!({"sender": "A", "receiver": "B", "amount": 2.5})).unwrap();
        assert!(tx.amount.is_f64());
        assert_eq!(serde_json::to_string(&tx.amount).unwrap(), "2.5");
    }

    #[test]
    fn test_from_json_accepts_complete_payload() {
        let body = json!({"sender": "alice", "receiver": "bob", "amount": 3});
        let tx = transaction_from_json(&body).unwrap();
        assert_eq!(tx, Transaction::new("alice", "bob", 3));
    }
}
