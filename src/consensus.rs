//! Longest-valid-chain consensus.
//!
//! A node asks every known peer for its chain and adopts the longest one that
//! is strictly longer than its own and passes full validation. Length is the
//! only fork-choice metric; cumulative work is not compared.

use crate::blockchain::{check_chain, Block, Ledger};
use crate::error::ChainError;
use crate::miner::ProofOfWork;
use crate::peers::PeerRegistry;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Body of `GET /get_chain`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len();
        ChainResponse { chain, length }
    }
}

/// Where peer chains come from.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, ChainError>;
}

/// Fetches chains over HTTP from `http://{peer}/get_chain`.
#[derive(Debug, Clone)]
pub struct HttpChainSource {
    client: reqwest::Client,
}

impl HttpChainSource {
    pub fn new(timeout: Duration) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChainSource for HttpChainSource {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, ChainError> {
        let response = self
            .client
            .get(format!("http://{}/get_chain", peer))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::NetworkError(format!(
                "{} answered with status {}",
                peer, status
            )));
        }

        Ok(response.json::<ChainResponse>().await?)
    }
}

/// A peer chain that beat the local chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub peer: String,
    pub chain: Vec<Block>,
}

/// Pick the chain to adopt from already fetched peer responses.
///
/// Responses are scanned in the given order. A chain becomes the candidate
/// when it is strictly longer than both `local_length` and the current
/// candidate and it validates, so among equally long winners the earliest
/// peer is kept. Failed fetches are skipped.
pub fn select_longest_chain(
    local_length: usize,
    responses: Vec<(String, Result<ChainResponse, ChainError>)>,
    pow: &ProofOfWork,
) -> Option<Candidate> {
    let mut max_length = local_length;
    let mut best = None;

    for (peer, response) in responses {
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                debug!(peer = %peer, error = %e, "skipping peer");
                continue;
            }
        };

        let length = response.chain.len();
        if response.length != length {
            debug!(
                peer = %peer,
                reported = response.length,
                actual = length,
                "peer reported a length that does not match its chain"
            );
        }

        if length <= max_length {
            continue;
        }

        match check_chain(&response.chain, pow) {
            Ok(()) => {
                max_length = length;
                best = Some(Candidate {
                    peer,
                    chain: response.chain,
                });
            }
            Err(e) => warn!(peer = %peer, length, error = %e, "rejecting invalid peer chain"),
        }
    }

    best
}

#[derive(Debug, Clone)]
pub struct ConsensusResolver {
    fetch_timeout: Duration,
}

impl ConsensusResolver {
    pub fn new(fetch_timeout: Duration) -> Self {
        Self { fetch_timeout }
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Replace the local chain with the longest valid peer chain, if any peer
    /// has one strictly longer. Returns whether the chain was replaced.
    ///
    /// Peers are fetched concurrently, each bounded by the fetch timeout, and
    /// scanned in the registry's sorted order. The swap itself happens under
    /// the ledger's write lock and is skipped if the ledger grew past the
    /// candidate in the meantime.
    pub async fn resolve<S>(
        &self,
        local: &RwLock<Ledger>,
        peers: &PeerRegistry,
        source: &S,
    ) -> bool
    where
        S: ChainSource + ?Sized,
    {
        let (original_length, pow) = {
            let ledger = local.read().await;
            (ledger.len(), *ledger.proof_of_work())
        };

        let fetches = peers.iter().map(|peer| async move {
            let fetch = source.fetch_chain(peer);
            let response = match tokio::time::timeout(self.fetch_timeout, fetch).await {
                Ok(response) => response,
                Err(_) => Err(ChainError::NetworkError(format!(
                    "{} timed out after {:?}",
                    peer, self.fetch_timeout
                ))),
            };
            (peer.clone(), response)
        });
        let responses = join_all(fetches).await;

        let Some(candidate) = select_longest_chain(original_length, responses, &pow) else {
            debug!(length = original_length, "local chain is already the longest");
            return false;
        };

        let mut ledger = local.write().await;
        let new_length = candidate.chain.len();
        if new_length <= ledger.len() {
            info!(
                peer = %candidate.peer,
                candidate = new_length,
                local = ledger.len(),
                "local chain grew while resolving; keeping it"
            );
            return false;
        }

        match ledger.replace_chain(candidate.chain) {
            Ok(()) => {
                info!(
                    peer = %candidate.peer,
                    old_length = original_length,
                    new_length,
                    "replaced local chain with longer peer chain"
                );
                true
            }
            Err(e) => {
                warn!(peer = %candidate.peer, error = %e, "failed to replace chain");
                false
            }
        }
    }
}

impl Default for ConsensusResolver {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}
