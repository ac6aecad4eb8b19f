//! JSON-RPC front-end for the development ledger.

use crate::chain::DevLedger;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256, U128, U256, U64};
use alloy::rpc::json_rpc::{ErrorPayload, Id, Response as RpcResponse, ResponsePayload};
use alloy::rpc::types::TransactionRequest;
use axum::{
    body::Bytes,
    extract::{Request, State},
    middleware::{self as axum_middleware, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use identity_registry::abi;
use ledger_client::{Ledger, LedgerError, EXECUTION_REVERTED};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Reported by `web3_clientVersion`.
pub const CLIENT_VERSION: &str = concat!("dev-ledger/v", env!("CARGO_PKG_VERSION"));

/// JSON-RPC error codes.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    /// Generic node-side failure (unknown sender, funds, nonce, gas limit).
    pub const SERVER_ERROR: i64 = -32000;
    pub use ledger_client::EXECUTION_REVERTED;
}

type RpcError = ErrorPayload<Value>;

/// An incoming JSON-RPC 2.0 call.
#[derive(Debug, Deserialize)]
struct RpcCall {
    #[serde(default)]
    id: Option<Id>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<DevLedger>,
}

impl AppState {
    pub fn new(ledger: DevLedger) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub chain_id: u64,
    pub block_number: u64,
}

/// Create the JSON-RPC router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(rpc))
        .route("/health", get(health))
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve the ledger in a background task.
///
/// Returns the bound address, so port 0 can be used in tests.
pub async fn spawn(state: AppState, addr: SocketAddr) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    let app = create_router(state);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    info!("Development ledger listening on {}", local);
    Ok(local)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let block_number = state.ledger.block_number().await.unwrap_or_default();

    Json(HealthResponse {
        status: "ok".to_string(),
        chain_id: state.ledger.config().chain_id,
        block_number,
    })
}

async fn rpc(State(state): State<AppState>, body: Bytes) -> Json<RpcResponse<Value, Value>> {
    let call: RpcCall = match serde_json::from_slice(&body) {
        Ok(c) => c,
        Err(e) => {
            return Json(RpcResponse {
                id: Id::None,
                payload: ResponsePayload::Failure(failure(
                    codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                )),
            })
        }
    };

    debug!(method = %call.method, "RPC call");

    let id = call.id.unwrap_or(Id::None);
    let payload = match dispatch(&state.ledger, &call.method, call.params).await {
        Ok(result) => ResponsePayload::Success(result),
        Err(error) => {
            warn!(
                method = %call.method,
                code = error.code,
                message = %error.message,
                "RPC call failed"
            );
            ResponsePayload::Failure(error)
        }
    };
    Json(RpcResponse { id, payload })
}

async fn dispatch(ledger: &DevLedger, method: &str, params: Value) -> Result<Value, RpcError> {
    match method {
        "web3_clientVersion" => Ok(json!(CLIENT_VERSION)),
        "net_version" => Ok(json!(ledger.config().chain_id.to_string())),
        "eth_chainId" => to_value(U64::from(ledger.chain_id().await.map_err(rpc_error)?)),
        "eth_accounts" => to_value(ledger.accounts().await.map_err(rpc_error)?),
        "eth_blockNumber" => to_value(U64::from(ledger.block_number().await.map_err(rpc_error)?)),
        "eth_gasPrice" => to_value(U128::from(ledger.gas_price().await.map_err(rpc_error)?)),
        "eth_getBalance" => {
            let address: Address = param(&params, 0)?;
            let balance: U256 = ledger.balance(address).await.map_err(rpc_error)?;
            to_value(balance)
        }
        "eth_getTransactionCount" => {
            let address: Address = param(&params, 0)?;
            let count = ledger.transaction_count(address).await.map_err(rpc_error)?;
            to_value(U64::from(count))
        }
        "eth_getCode" => {
            let address: Address = param(&params, 0)?;
            to_value(ledger.code(address).await.unwrap_or_default())
        }
        "eth_getBlockByNumber" => {
            // Blocks only ever list transaction hashes.
            let tag: BlockNumberOrTag = param(&params, 0)?;
            let number = match tag {
                BlockNumberOrTag::Earliest => Some(0),
                tag => tag.as_number(),
            };
            to_value(ledger.block(number).await)
        }
        "eth_estimateGas" => {
            let tx: TransactionRequest = param(&params, 0)?;
            let gas = ledger.estimate_gas(&tx).await.map_err(rpc_error)?;
            to_value(U64::from(gas))
        }
        "eth_sendTransaction" => {
            let tx: TransactionRequest = param(&params, 0)?;
            to_value(ledger.submit(tx).await.map_err(rpc_error)?)
        }
        "eth_getTransactionReceipt" => {
            let hash: B256 = param(&params, 0)?;
            to_value(ledger.transaction_receipt(hash).await)
        }
        "eth_call" => {
            let tx: TransactionRequest = param(&params, 0)?;
            to_value(ledger.call(&tx).await.map_err(rpc_error)?)
        }
        other => Err(failure(
            codes::METHOD_NOT_FOUND,
            format!("Method {} not supported", other),
        )),
    }
}

fn failure(code: i64, message: String) -> RpcError {
    ErrorPayload {
        code,
        message: message.into(),
        data: None,
    }
}

fn param<T: DeserializeOwned>(params: &Value, index: usize) -> Result<T, RpcError> {
    let value = params.get(index).cloned().ok_or_else(|| {
        failure(codes::INVALID_PARAMS, format!("missing parameter {}", index))
    })?;

    serde_json::from_value(value).map_err(|e| {
        failure(
            codes::INVALID_PARAMS,
            format!("invalid parameter {}: {}", index, e),
        )
    })
}

fn to_value<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| failure(codes::SERVER_ERROR, e.to_string()))
}

/// Map a ledger failure onto the error object a node would return.
pub fn rpc_error(error: LedgerError) -> ErrorPayload<Value> {
    match error {
        LedgerError::Reverted(reason) => ErrorPayload {
            code: EXECUTION_REVERTED,
            message: format!("execution reverted: {}", reason).into(),
            data: Some(json!(abi::encode_revert(&reason))),
        },
        LedgerError::Rpc { code, message } => failure(code, message),
        LedgerError::UnknownAccount(address) => failure(
            codes::SERVER_ERROR,
            format!("sender account not recognized: {}", address),
        ),
        other => failure(codes::SERVER_ERROR, other.to_string()),
    }
}

/// Logging middleware for requests.
async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_success() {
        debug!(%method, %uri, %status, ?duration, "Request completed");
    } else {
        warn!(%method, %uri, %status, ?duration, "Request failed");
    }

    response
}
