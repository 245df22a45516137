//! The node service: one ledger, one peer registry and the operations the
//! RPC surface exposes on them.

use crate::blockchain::{Block, Ledger};
use crate::config::Config;
use crate::consensus::{ChainSource, ConsensusResolver, HttpChainSource};
use crate::error::ChainError;
use crate::peers::PeerRegistry;
use crate::transaction::{Amount, Transaction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// How often a mined proof may turn out stale before mining gives up.
const MAX_STALE_RETRIES: usize = 3;

/// Reward transaction added to each block this node mines.
#[derive(Debug, Clone)]
pub struct MinerSettings {
    pub reward_receiver: String,
    pub reward_amount: Amount,
}

impl Default for MinerSettings {
    fn default() -> Self {
        Self {
            reward_receiver: "miner".to_string(),
            reward_amount: Amount::from(1),
        }
    }
}

pub struct NodeService {
    node_id: String,
    ledger: Arc<RwLock<Ledger>>,
    peers: Arc<RwLock<PeerRegistry>>,
    chain_source: Arc<dyn ChainSource>,
    resolver: ConsensusResolver,
    miner: MinerSettings,
    cancel: Arc<AtomicBool>,
}

impl NodeService {
    pub fn new(
        ledger: Ledger,
        chain_source: Arc<dyn ChainSource>,
        resolver: ConsensusResolver,
        miner: MinerSettings,
    ) -> Self {
        Self {
            node_id: uuid::Uuid::new_v4().simple().to_string(),
            ledger: Arc::new(RwLock::new(ledger)),
            peers: Arc::new(RwLock::new(PeerRegistry::new())),
            chain_source,
            resolver,
            miner,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build a node from validated config, talking to peers over HTTP.
    pub async fn from_config(config: &Config) -> Result<Self, ChainError> {
        let ledger = Ledger::with_difficulty(config.miner.difficulty)?;
        let source = HttpChainSource::new(config.fetch_timeout())?;
        let node = Self::new(
            ledger,
            Arc::new(source),
            ConsensusResolver::new(config.fetch_timeout()),
            MinerSettings {
                reward_receiver: config.miner.reward_receiver.clone(),
                reward_amount: config.miner.reward_amount.clone(),
            },
        );

        if !config.network.bootstrap_peers.is_empty() {
            node.connect_nodes(&config.network.bootstrap_peers).await?;
        }
        Ok(node)
    }

    /// Random dash-free identifier, used as the sender of mining rewards.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn ledger(&self) -> &Arc<RwLock<Ledger>> {
        &self.ledger
    }

    /// Solve the next proof and seal the pending queue, plus this node's
    /// reward, into a new block.
    ///
    /// The search runs on a blocking thread without holding the ledger lock.
    /// If the head changes before the block is appended the proof is stale
    /// and the search starts over on the new head.
    pub async fn mine_block(&self) -> Result<Block, ChainError> {
        for attempt in 0..=MAX_STALE_RETRIES {
            let (previous_proof, previous_hash, pow) = {
                let ledger = self.ledger.read().await;
                let head = ledger.head()?;
                (head.proof, head.hash(), *ledger.proof_of_work())
            };

            let cancel = self.cancel.clone();
            let proof = tokio::task::spawn_blocking(move || {
                pow.solve_cancellable(previous_proof, &cancel)
            })
            .await
            .map_err(|e| ChainError::MiningFailed(e.to_string()))??;

            let mut ledger = self.ledger.write().await;
            if ledger.head()?.hash() != previous_hash {
                debug!(attempt, "chain head moved while mining; retrying");
                continue;
            }

            ledger.enqueue(
                self.node_id.clone(),
                self.miner.reward_receiver.clone(),
                self.miner.reward_amount.clone(),
            )?;
            let block = ledger.append(proof, previous_hash);
            info!(
                index = block.index,
                proof = block.proof,
                transactions = block.transactions.len(),
                "mined block"
            );
            return Ok(block);
        }

        warn!(retries = MAX_STALE_RETRIES, "giving up mining: head kept moving");
        Err(ChainError::StaleProof)
    }

    /// Queue a transaction; returns the index of the block that will hold it.
    pub async fn submit_transaction(&self, transaction: Transaction) -> Result<u64, ChainError> {
        let mut ledger = self.ledger.write().await;
        let index = ledger.enqueue_transaction(transaction)?;
        debug!(index, pending = ledger.pending().len(), "queued transaction");
        Ok(index)
    }

    /// Register peers. Every address is normalized first; if any is invalid
    /// none are added. Returns the registry contents afterwards.
    pub async fn connect_nodes(&self, addresses: &[String]) -> Result<Vec<String>, ChainError> {
        let normalized = addresses
            .iter()
            .map(|a| crate::peers::normalize_peer_address(a))
            .collect::<Result<Vec<_>, _>>()?;

        let mut peers = self.peers.write().await;
        for address in &normalized {
            if peers.add(address)? {
                info!(peer = %address, "connected peer");
            }
        }
        Ok(peers.list())
    }

    pub async fn peer_list(&self) -> Vec<String> {
        self.peers.read().await.list()
    }

    pub async fn chain_snapshot(&self) -> Vec<Block> {
        self.ledger.read().await.chain().to_vec()
    }

    pub async fn is_chain_valid(&self) -> bool {
        let ledger = self.ledger.read().await;
        match ledger.check(ledger.chain()) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "local chain failed validation");
                false
            }
        }
    }

    /// Run consensus against every registered peer. Returns whether the chain
    /// was replaced and the chain as it stands afterwards.
    pub async fn resolve_conflicts(&self) -> (bool, Vec<Block>) {
        let peers = self.peers.read().await.clone();
        let replaced = self
            .resolver
            .resolve(&self.ledger, &peers, self.chain_source.as_ref())
            .await;
        (replaced, self.chain_snapshot().await)
    }

    /// Abort any in-flight proof search; later mining attempts fail fast.
    pub fn shutdown(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}
