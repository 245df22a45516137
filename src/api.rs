//! HTTP API for a hashledger node.
//!
//! A thin layer over [`NodeService`]: handlers parse and shape JSON and
//! nothing else. The route names and payloads are the wire contract other
//! nodes rely on, `GET /get_chain` in particular.

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use crate::blockchain::Block;
use crate::consensus::ChainResponse;
use crate::error::ChainError;
use crate::node::NodeService;
use crate::transaction::{transaction_from_json, Transaction};

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    /// Rejected client input, answered with a plain-text 400.
    InvalidInput(String),
    Chain(ChainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Chain(e) => {
                let status = match e {
                    ChainError::InvalidTransaction(_) | ChainError::InvalidPeerAddress(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    ChainError::StaleProof => StatusCode::CONFLICT,
                    ChainError::MiningCancelled => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, Json(ErrorResponse { error: e.to_string() })).into_response()
            }
        }
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::InvalidTransaction(msg) => ApiError::InvalidInput(msg),
            ChainError::InvalidPeerAddress(_) => ApiError::InvalidInput(err.to_string()),
            other => ApiError::Chain(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

pub const CONNECTED_MESSAGE: &str =
    "All of the nodes are now connected. The Hashledger Blockchain now contains the following nodes: ";

#[derive(Serialize)]
pub struct MineBlockResponse {
    pub message: String,
    pub index: u64,
    pub timestamp: String,
    pub proof: i64,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
}

impl MineBlockResponse {
    fn from_block(block: Block) -> Self {
        MineBlockResponse {
            message: "Congratulations, you just mined a block!".to_string(),
            index: block.index,
            timestamp: block.timestamp,
            proof: block.proof,
            previous_hash: block.previous_hash,
            transactions: block.transactions,
        }
    }
}

#[derive(Serialize)]
pub struct ValidityResponse {
    pub message: String,
    pub is_valid: bool,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
pub struct ConnectResponse {
    pub message: String,
    pub total_nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct ReplaceChainResponse {
    pub message: String,
    pub chain: Vec<Block>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints
pub fn build_api_router(node: Arc<NodeService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![http::Method::GET, http::Method::POST, http::Method::OPTIONS])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        .route("/mine_block", get(mine_block))
        .route("/get_chain", get(get_chain))
        .route("/is_valid", get(is_valid))
        .route("/add_transaction", post(add_transaction))
        .route("/connect_node", post(connect_node))
        .route("/replace_chain", get(replace_chain))
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors)
        .with_state(node)
}

/// Serve the API until ctrl-c, then cancel any running proof search.
pub async fn run_api_server(
    node: Arc<NodeService>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(node.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, node_id = %node.node_id(), "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
            node.shutdown();
        })
        .await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn mine_block(
    State(node): State<Arc<NodeService>>,
) -> Result<Json<MineBlockResponse>, ApiError> {
    let block = node.mine_block().await?;
    Ok(Json(MineBlockResponse::from_block(block)))
}

async fn get_chain(State(node): State<Arc<NodeService>>) -> Json<ChainResponse> {
    Json(ChainResponse::new(node.chain_snapshot().await))
}

async fn is_valid(State(node): State<Arc<NodeService>>) -> Json<ValidityResponse> {
    let is_valid = node.is_chain_valid().await;
    let message = if is_valid {
        "Chain is valid"
    } else {
        "Chain has been tampered with"
    };
    Json(ValidityResponse {
        message: message.to_string(),
        is_valid,
    })
}

/// Bodies that are not JSON at all are treated like an empty payload, so
/// they hit the same missing-field errors.
fn parse_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

async fn add_transaction(
    State(node): State<Arc<NodeService>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let transaction = transaction_from_json(&parse_body(&body))?;
    let index = node.submit_transaction(transaction).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("This transaction will be added to Block {}", index),
        }),
    ))
}

async fn connect_node(
    State(node): State<Arc<NodeService>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let nodes = match parse_body(&body).get("nodes") {
        None | Some(Value::Null) => return Err(ApiError::InvalidInput("No nodes".to_string())),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ApiError::InvalidInput("nodes must be a list of addresses".to_string()))?,
        Some(_) => {
            return Err(ApiError::InvalidInput(
                "nodes must be a list of addresses".to_string(),
            ))
        }
    };

    let total_nodes = node.connect_nodes(&nodes).await?;

    Ok((
        StatusCode::CREATED,
        Json(ConnectResponse {
            message: CONNECTED_MESSAGE.to_string(),
            total_nodes,
        }),
    ))
}

async fn replace_chain(State(node): State<Arc<NodeService>>) -> Json<ReplaceChainResponse> {
    let (replaced, chain) = node.resolve_conflicts().await;
    let message = if replaced {
        "The nodes had different chains so the chain was replaced by the longer one."
    } else {
        "All good. The chain is the largest one."
    };
    Json(ReplaceChainResponse {
        message: message.to_string(),
        chain,
    })
}
