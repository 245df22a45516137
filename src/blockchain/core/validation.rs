use crate::blockchain::core::chain::Block;
use crate::error::ChainError;
use crate::miner::ProofOfWork;

/// Walk a chain from its second block and report the first broken rule.
///
/// Each block must carry the next index, the hash of its predecessor and a
/// proof that solves the puzzle for its predecessor's proof. The genesis
/// block itself is not inspected. Checking stops at the first failure.
pub fn check_chain(chain: &[Block], pow: &ProofOfWork) -> Result<(), ChainError> {
    let mut blocks = chain.iter();
    let mut previous = blocks.next().ok_or(ChainError::EmptyChain)?;

    for block in blocks {
        if block.previous_hash != previous.hash() {
            return Err(ChainError::InvalidBlockLinkage { index: block.index });
        }

        if !pow.verify(previous.proof, block.proof) {
            return Err(ChainError::InvalidProofOfWork { index: block.index });
        }

        let expected = previous.index.saturating_add(1);
        if block.index != expected {
            return Err(ChainError::InvalidBlockIndex {
                expected,
                found: block.index,
            });
        }

        previous = block;
    }

    Ok(())
}

pub fn is_chain_valid(chain: &[Block], pow: &ProofOfWork) -> bool {
    check_chain(chain, pow).is_ok()
}
