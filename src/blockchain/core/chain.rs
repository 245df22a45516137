use crate::blockchain::core::encoding::canonical_json;
use crate::blockchain::core::validation::{check_chain, is_chain_valid};
use crate::error::ChainError;
use crate::miner::ProofOfWork;
use crate::transaction::{Amount, Transaction};
use chrono::{DateTime, Local, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_PROOF: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Local wall-clock time as `YYYY-MM-DD HH:MM:SS[.ffffff]`. Stored as text
    /// because the exact string is part of the block hash.
    pub timestamp: String,
    pub proof: i64,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(
        index: u64,
        proof: i64,
        previous_hash: String,
        transactions: Vec<Transaction>,
    ) -> Self {
        Block {
            index,
            timestamp: format_timestamp(&Local::now()),
            proof,
            previous_hash,
            transactions,
        }
    }

    pub fn genesis() -> Self {
        Block::new(1, GENESIS_PROOF, GENESIS_PREVIOUS_HASH.to_string(), Vec::new())
    }

    /// SHA-256 of the canonical JSON form of every field, as lowercase hex.
    pub fn hash(&self) -> String {
        let encoded = canonical_json(&json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "proof": self.proof,
            "previous_hash": self.previous_hash,
            "transactions": self.transactions,
        }));
        hex::encode(Sha256::digest(encoded.as_bytes()))
    }
}

/// Render a block timestamp. The fractional part is dropped when it is zero.
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if at.nanosecond() / 1_000 == 0 {
        at.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

/// The local chain plus the queue of transactions waiting for the next block.
///
/// A ledger always holds at least the genesis block. It changes only through
/// [`append`](Ledger::append), which drains the pending queue into a new
/// block, and [`replace_chain`](Ledger::replace_chain), used by consensus.
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    pow: ProofOfWork,
}

impl Ledger {
    /// Create a new `Ledger` holding only the genesis block.
    pub fn new(pow: ProofOfWork) -> Self {
        Ledger {
            chain: vec![Block::genesis()],
            pending: Vec::new(),
            pow,
        }
    }

    pub fn with_difficulty(difficulty: u32) -> Result<Self, ChainError> {
        Ok(Self::new(ProofOfWork::new(difficulty)?))
    }

    pub fn head(&self) -> Result<&Block, ChainError> {
        self.chain.last().ok_or(ChainError::EmptyChain)
    }

    pub fn hash(block: &Block) -> String {
        block.hash()
    }

    /// Seal the pending queue into a new block on top of the chain.
    ///
    /// `proof` and `previous_hash` are taken as given; whether they are
    /// correct is only checked by [`validate`](Ledger::validate).
    pub fn append(&mut self, proof: i64, previous_hash: String) -> Block {
        let index = self.chain.len() as u64 + 1;
        let transactions = std::mem::take(&mut self.pending);
        let block = Block::new(index, proof, previous_hash, transactions);
        self.chain.push(block.clone());
        block
    }

    /// Queue a transaction and return the index of the block that will hold it.
    pub fn enqueue(
        &mut self,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: impl Into<Amount>,
    ) -> Result<u64, ChainError> {
        self.enqueue_transaction(Transaction::new(sender, receiver, amount))
    }

    pub fn enqueue_transaction(&mut self, transaction: Transaction) -> Result<u64, ChainError> {
        self.pending.push(transaction);
        Ok(self.head()?.index + 1)
    }

    /// Check a chain against this ledger's proof-of-work rule.
    pub fn validate(&self, chain: &[Block]) -> bool {
        is_chain_valid(chain, &self.pow)
    }

    /// Like [`validate`](Ledger::validate) but reports the first fault.
    pub fn check(&self, chain: &[Block]) -> Result<(), ChainError> {
        check_chain(chain, &self.pow)
    }

    /// Swap in a whole new chain. The pending queue is left untouched.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> Result<(), ChainError> {
        if chain.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        self.chain = chain;
        Ok(())
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false; kept for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(ProofOfWork::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    /// Mine the next block onto `ledger` the way a node does.
    fn mine_next(ledger: &mut Ledger) -> Block {
        let head = ledger.head().unwrap();
        let proof = ledger.proof_of_work().solve(head.proof);
        let previous_hash = head.hash();
        ledger.append(proof, previous_hash)
    }

    fn fixed_block() -> Block {
        Block {
            index: 2,
            timestamp: "2024-01-01 12:00:00.000001".to_string(),
            proof: 533,
            previous_hash: "0".to_string(),
            transactions: vec![Transaction::new("A", "B", 10)],
        }
    }

    #[test]
    fn test_genesis_invariant() {
        let ledger = Ledger::default();
        assert_eq!(ledger.len(), 1);
        let genesis = &ledger.chain()[0];
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.proof, 1);
        assert_eq!(genesis.previous_hash, "0");
        assert!(genesis.transactions.is_empty());
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn test_block_hash_reference_digest() {
        assert_eq!(
            fixed_block().hash(),
            "02dd9c4a795da08fa7f6431a9a688fd3e00dbc4302841a2d6986ebe5b0994119"
        );

        let genesis = Block {
            index: 1,
            timestamp: "2024-01-01 00:00:00".to_string(),
            proof: 1,
            previous_hash: "0".to_string(),
            transactions: vec![],
        };
        assert_eq!(
            genesis.hash(),
            "7559d8f36654a7be884147a4eba7d52ac0bae397d89c2c8efb430d5eb394ebb8"
        );
    }

    #[test]
    fn test_block_hash_reference_digest_for_unusual_amounts() {
        let cases = [
            ("0.00001", "e5b4f8af5b7aabd928e6db954882b845fe59c0e858564cd7f19c400143bfb017"),
            ("1e16", "47df382c4ec2dbf4a2a00920577e5d5c42a9a7ee4405306c8bcaee3451f33b0c"),
            (
                "100000000000000000000",
                "ba4ac7bfdd14dac6c5cee247078d99d54d8b81163fd6a41da6479b3f73056e33",
            ),
            ("123.456", "fded15e4e0467fd64e37a326e4314123b99ee294798a594988aa139370c01a3e"),
        ];
        for (amount, expected) in cases {
            let mut block = fixed_block();
            let amount: Amount = serde_json::from_str(amount).unwrap();
            block.transactions = vec![Transaction::new("A", "B", amount)];
            assert_eq!(block.hash(), expected, "amount {}", block.transactions[0].amount);
        }
    }

    #[test]
    fn test_block_hash_covers_every_field() {
        let base = fixed_block();
        let base_hash = base.hash();
        assert_eq!(base_hash.len(), 64);

        let mut changed = base.clone();
        changed.index = 3;
        assert_ne!(changed.hash(), base_hash);

        let mut changed = base.clone();
        changed.timestamp.push('1');
        assert_ne!(changed.hash(), base_hash);

        let mut changed = base.clone();
        changed.proof += 1;
        assert_ne!(changed.hash(), base_hash);

        let mut changed = base.clone();
        changed.previous_hash = "1".to_string();
        assert_ne!(changed.hash(), base_hash);

        let mut changed = base.clone();
        changed.transactions.push(Transaction::new("B", "A", 1));
        assert_ne!(changed.hash(), base_hash);
    }

    #[test]
    fn test_transaction_order_affects_hash() {
        let mut a = fixed_block();
        a.transactions = vec![Transaction::new("A", "B", 1), Transaction::new("C", "D", 2)];
        let mut b = a.clone();
        b.transactions.reverse();
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_enqueue_returns_next_block_index() {
        let mut ledger = Ledger::default();
        assert_eq!(ledger.enqueue("A", "B", 10).unwrap(), 2);
        assert_eq!(ledger.enqueue("B", "C", 5).unwrap(), 2);
        assert_eq!(ledger.pending().len(), 2);
    }

    #[test]
    fn test_append_drains_pending() {
        let mut ledger = Ledger::default();
        ledger.enqueue("A", "B", 10).unwrap();

        let head = ledger.head().unwrap().clone();
        let block = ledger.append(533, head.hash());

        assert_eq!(block.index, 2);
        assert_eq!(block.transactions, vec![Transaction::new("A", "B", 10)]);
        assert!(ledger.pending().is_empty());
        assert_eq!(ledger.head().unwrap(), &block);
    }

    #[test]
    fn test_append_does_not_validate() {
        let mut ledger = Ledger::default();
        let block = ledger.append(42, "not-a-hash".to_string());
        assert_eq!(block.index, 2);
        assert!(!ledger.validate(ledger.chain()));
    }

    #[test]
    fn test_mined_chain_is_linked() {
        let mut ledger = Ledger::default();
        for _ in 0..3 {
            mine_next(&mut ledger);
        }
        for pair in ledger.chain().windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].hash());
            assert_eq!(pair[1].index, pair[0].index + 1);
        }
        assert!(ledger.validate(ledger.chain()));
    }

    #[test]
    fn test_replace_chain_rejects_empty() {
        let mut ledger = Ledger::default();
        assert_eq!(ledger.replace_chain(vec![]), Err(ChainError::EmptyChain));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_replace_chain_keeps_pending() {
        let mut ledger = Ledger::default();
        ledger.enqueue("A", "B", 1).unwrap();

        let mut other = Ledger::default();
        mine_next(&mut other);
        ledger.replace_chain(other.chain().to_vec()).unwrap();

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.pending().len(), 1);
    }

    #[test]
    fn test_timestamp_format() {
        let whole = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(
            format_timestamp(&Utc.from_utc_datetime(&whole)),
            "2024-01-01 12:00:00"
        );

        let fractional = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_micro_opt(12, 0, 0, 1)
            .unwrap();
        assert_eq!(
            format_timestamp(&Utc.from_utc_datetime(&fractional)),
            "2024-01-01 12:00:00.000001"
        );
    }
}
