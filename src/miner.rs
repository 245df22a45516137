//! Proof-of-work search and verification.
//!
//! The puzzle only involves two integers: the proof of the previous block and
//! a candidate. A candidate `p` solves the puzzle for `previous` when the hex
//! SHA-256 digest of the decimal string `p² - previous²` starts with
//! `difficulty` ASCII zeros. The difference is signed, so a negative result is
//! hashed together with its leading `-`.
//!
//! The search has no upper bound. At the default difficulty it needs about
//! 65k hashes on average, and every extra zero multiplies that by sixteen.
//! Long searches should go through [`ProofOfWork::solve_cancellable`].

use crate::error::ChainError;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};

/// Leading hex zeros required when nothing else is configured.
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// A SHA-256 hex digest has 64 characters.
pub const MAX_DIFFICULTY: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: u32,
}

impl ProofOfWork {
    pub fn new(difficulty: u32) -> Result<Self, ChainError> {
        if difficulty == 0 || difficulty > MAX_DIFFICULTY {
            return Err(ChainError::InvalidDifficulty(difficulty));
        }
        Ok(ProofOfWork { difficulty })
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Find the first proof, counting up from 1, that solves the puzzle for
    /// `previous_proof`. Runs until it succeeds.
    pub fn solve(&self, previous_proof: i64) -> i64 {
        let mut candidate: i64 = 1;
        while !self.verify(previous_proof, candidate) {
            candidate += 1;
        }
        candidate
    }

    /// Same search as [`solve`](Self::solve), but gives up with
    /// [`ChainError::MiningCancelled`] once `cancel` is raised.
    pub fn solve_cancellable(
        &self,
        previous_proof: i64,
        cancel: &AtomicBool,
    ) -> Result<i64, ChainError> {
        let mut candidate: i64 = 1;
        loop {
            if cancel.load(Ordering::Relaxed) {
                return Err(ChainError::MiningCancelled);
            }
            if self.verify(previous_proof, candidate) {
                return Ok(candidate);
            }
            candidate += 1;
        }
    }

    pub fn verify(&self, previous_proof: i64, proof: i64) -> bool {
        meets_difficulty(&pow_digest(previous_proof, proof), self.difficulty)
    }
}

impl Default for ProofOfWork {
    fn default() -> Self {
        ProofOfWork {
            difficulty: DEFAULT_DIFFICULTY,
        }
    }
}

/// Hex digest of the puzzle for a `(previous_proof, proof)` pair.
pub fn pow_digest(previous_proof: i64, proof: i64) -> String {
    // i64 squares fit in i128 with room for the subtraction.
    let proof = i128::from(proof);
    let previous = i128::from(previous_proof);
    let difference = proof * proof - previous * previous;
    hex::encode(Sha256::digest(difference.to_string().as_bytes()))
}

fn meets_difficulty(digest: &str, difficulty: u32) -> bool {
    let zeros = difficulty as usize;
    digest.len() >= zeros && digest.bytes().take(zeros).all(|b| b == b'0')
}
