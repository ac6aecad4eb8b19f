//! End-to-end deployment over JSON-RPC.

use alloy::consensus::{Header as ConsensusHeader, Receipt, ReceiptEnvelope, ReceiptWithBloom};
use alloy::primitives::{Bloom, B256};
use alloy::rpc::types::{Block, BlockTransactions, Header, TransactionReceipt};
use dev_ledger::{spawn, AppState, DevLedger};
use ledger_client::{RegistryClient, RpcLedger};
use registry_deployer::config::DeployConfig;
use registry_deployer::{run, Config, DeployError, DeploymentArtifact};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BYTECODE: &str = "0x608060405234801561001057600080fd5b50";

fn write_compiled(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("AadhaarVerification.json");
    let artifact = json!({
        "contractName": "AadhaarVerification",
        "abi": identity_registry::abi::interface_description(),
        "bytecode": BYTECODE
    });
    std::fs::write(&path, artifact.to_string()).unwrap();
    path
}

fn test_config(url: String, temp_dir: &TempDir, smoke_test: bool) -> Config {
    Config {
        rpc_url: Some(url),
        deploy: DeployConfig {
            artifact_path: write_compiled(temp_dir.path()),
            assets_dir: temp_dir.path().join("assets"),
            smoke_test,
            poll_interval: Duration::from_millis(10),
            request_timeout: Duration::from_secs(5),
        },
        ..Config::default()
    }
}

async fn start_dev_ledger() -> String {
    let addr = spawn(
        AppState::new(DevLedger::default()),
        "127.0.0.1:0".parse().unwrap(),
    )
    .await
    .unwrap();
    format!("http://{}", addr)
}

async fn mock_result(mock_server: &MockServer, rpc_method: &str, result: serde_json::Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": result
        })))
        .mount(mock_server)
        .await;
}

const ACCOUNT: &str = "0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1";

fn mined_receipt(tx_hash: B256, success: bool) -> serde_json::Value {
    let receipt: TransactionReceipt = TransactionReceipt {
        inner: ReceiptEnvelope::Legacy(ReceiptWithBloom::new(
            Receipt {
                status: success.into(),
                cumulative_gas_used: 2_000_000,
                logs: Vec::new(),
            },
            Bloom::default(),
        )),
        transaction_hash: tx_hash,
        transaction_index: Some(0),
        block_hash: Some(B256::repeat_byte(0x01)),
        block_number: Some(1),
        gas_used: 2_000_000,
        effective_gas_price: 20_000_000_000,
        blob_gas_used: None,
        blob_gas_price: None,
        from: ACCOUNT.parse().unwrap(),
        to: None,
        contract_address: None,
    };
    serde_json::to_value(receipt).unwrap()
}

fn block_with(tx_hash: B256) -> serde_json::Value {
    let header = ConsensusHeader {
        number: 1,
        ..Default::default()
    };
    let block: Block = Block::new(Header::new(header), BlockTransactions::Hashes(vec![tx_hash]));
    serde_json::to_value(block).unwrap()
}

#[tokio::test]
async fn test_deploy_persist_and_smoke_test() {
    let url = start_dev_ledger().await;
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(url.clone(), &temp_dir, true);

    let provisioned = run(&config).await.unwrap();

    // Address file holds exactly the checksummed address
    let address = std::fs::read_to_string(&provisioned.files.address).unwrap();
    assert_eq!(address, provisioned.deployment.address.to_checksum(None));

    let abi: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&provisioned.files.abi).unwrap()).unwrap();
    assert_eq!(abi, identity_registry::abi::interface_description());

    let saved = DeploymentArtifact::load(&temp_dir.path().join("assets"))
        .await
        .unwrap();
    assert_eq!(saved.address, provisioned.deployment.address);
    assert_eq!(saved.network, "development");
    assert_eq!(saved.chain_id, 1337);

    let smoke = provisioned.smoke.unwrap();
    assert_eq!(smoke.record_count, 1);
    assert!(smoke.is_registered);

    // The sample identity is readable by a fresh client
    let ledger = RpcLedger::new(&url, Duration::from_secs(5)).unwrap();
    let client = RegistryClient::new(
        Arc::new(ledger),
        provisioned.deployment.address,
        provisioned.deployment.deployer,
    );
    let verification = client.verify("test_hash_123").await.unwrap();
    assert_eq!(verification.name, "Test User");
    assert!(verification.is_verified);
}

#[tokio::test]
async fn test_smoke_test_can_be_disabled() {
    let url = start_dev_ledger().await;
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(url, &temp_dir, false);

    let provisioned = run(&config).await.unwrap();
    assert!(provisioned.smoke.is_none());
    assert!(provisioned.files.address.exists());
}

#[tokio::test]
async fn test_missing_artifact_fails_before_deploying() {
    let url = start_dev_ledger().await;
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(url.clone(), &temp_dir, true);
    config.deploy.artifact_path = temp_dir.path().join("missing.json");

    let result = run(&config).await;
    assert!(matches!(result, Err(DeployError::Artifact(_))));
    assert!(!temp_dir.path().join("assets").exists());

    let ledger = RpcLedger::new(&url, Duration::from_secs(5)).unwrap();
    assert_eq!(ledger_client::Ledger::block_number(&ledger).await.unwrap(), 0);
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config("http://127.0.0.1:1".into(), &temp_dir, true);

    let result = run(&config).await;
    assert!(matches!(result, Err(DeployError::Ledger(_))));
}

#[tokio::test]
async fn test_failed_receipt_is_deployment_failure() {
    let mock_server = MockServer::start().await;
    let tx_hash = B256::repeat_byte(0xab);

    mock_result(&mock_server, "eth_chainId", json!("0x539")).await;
    mock_result(&mock_server, "eth_accounts", json!([ACCOUNT])).await;
    mock_result(&mock_server, "eth_estimateGas", json!("0x1e8480")).await;
    mock_result(&mock_server, "eth_gasPrice", json!("0x4a817c800")).await;
    mock_result(&mock_server, "eth_getBalance", json!("0x56bc75e2d63100000")).await;
    mock_result(&mock_server, "eth_getTransactionCount", json!("0x0")).await;
    mock_result(&mock_server, "eth_sendTransaction", json!(tx_hash)).await;
    mock_result(&mock_server, "eth_blockNumber", json!("0x1")).await;
    mock_result(&mock_server, "eth_getBlockByNumber", block_with(tx_hash)).await;
    mock_result(
        &mock_server,
        "eth_getTransactionReceipt",
        mined_receipt(tx_hash, false),
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let config = test_config(mock_server.uri(), &temp_dir, true);

    let result = run(&config).await;
    assert!(matches!(result, Err(DeployError::Deployment(ref m)) if m.contains("failed")));
    assert!(!temp_dir.path().join("assets").exists());
}

#[tokio::test]
async fn test_insufficient_balance_detected_before_submission() {
    let mock_server = MockServer::start().await;

    mock_result(&mock_server, "eth_chainId", json!("0x539")).await;
    mock_result(&mock_server, "eth_accounts", json!([ACCOUNT])).await;
    mock_result(&mock_server, "eth_estimateGas", json!("0x1e8480")).await;
    mock_result(&mock_server, "eth_gasPrice", json!("0x4a817c800")).await;
    mock_result(&mock_server, "eth_getBalance", json!("0x0")).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_sendTransaction" })))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config = test_config(mock_server.uri(), &temp_dir, true);

    let result = run(&config).await;
    assert!(matches!(result, Err(DeployError::InsufficientFunds { .. })));
}

#[tokio::test]
async fn test_wrong_chain_for_hosted_network() {
    let mock_server = MockServer::start().await;
    mock_result(&mock_server, "eth_chainId", json!("0x539")).await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(mock_server.uri(), &temp_dir, true);
    config.network = "goerli".into();
    config.private_key = Some(secrecy::SecretString::new(
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".into(),
    ));

    let result = run(&config).await;
    assert!(matches!(result, Err(DeployError::Config(ref m)) if m.contains("chain id")));
}
