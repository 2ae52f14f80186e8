use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::json;
use tokio::task::JoinHandle;

use contract_gas_projector::aggregator::{PageFetcher, RetryPolicy};
use contract_gas_projector::analysis::Analyzer;
use contract_gas_projector::api::{app_router, AppState};
use contract_gas_projector::explorer::{ContractError, ContractInfo, ContractSource, FetchError};
use contract_gas_projector::growth::GrowthSeries;
use contract_gas_projector::models::{GrowthPoint, TransactionRecord, TxPage};
use contract_gas_projector::projector::EarningsRates;

const BUSY: &str = "0x00000000000000000000000000000000000000aa";
const EMPTY: &str = "0x00000000000000000000000000000000000000bb";
const BROKEN: &str = "0x00000000000000000000000000000000000000cc";
const UNVERIFIED: &str = "0x00000000000000000000000000000000000000dd";
const SOURCELESS: &str = "0x00000000000000000000000000000000000000ee";

struct FakeExplorer;

#[async_trait]
impl PageFetcher for FakeExplorer {
    async fn fetch_page(
        &self,
        address: &str,
        start_block: u64,
        _page_size: usize,
    ) -> Result<TxPage, FetchError> {
        match (address, start_block) {
            (BUSY, 0) => Ok(TxPage::from_records(vec![
                TransactionRecord {
                    block_number: Some(100),
                    gas_used: Some(600_000),
                    timestamp: Some(1_672_574_400),
                },
                TransactionRecord {
                    block_number: Some(200),
                    gas_used: Some(400_000),
                    timestamp: Some(1_680_000_000),
                },
            ])),
            (BROKEN, _) => Err(FetchError::Upstream("Invalid API Key".to_string())),
            _ => Ok(TxPage::default()),
        }
    }
}

#[async_trait]
impl ContractSource for FakeExplorer {
    async fn fetch_contract(&self, address: &str) -> Result<ContractInfo, ContractError> {
        match address {
            BUSY => Ok(ContractInfo {
                name: "Counter".to_string(),
                compiler_version: "v0.8.20+commit.a1b79de6".to_string(),
                source_code: "contract Counter {}".to_string(),
                abi: Some(json!([])),
                bytecode: "0x60806040".to_string(),
                is_verified: true,
            }),
            UNVERIFIED => Ok(ContractInfo {
                name: String::new(),
                compiler_version: String::new(),
                source_code: String::new(),
                abi: None,
                bytecode: "0x6080".to_string(),
                is_verified: false,
            }),
            SOURCELESS => Ok(ContractInfo {
                name: "Proxy".to_string(),
                compiler_version: "v0.8.20+commit.a1b79de6".to_string(),
                source_code: String::new(),
                abi: Some(json!([])),
                bytecode: "6080".to_string(),
                is_verified: true,
            }),
            _ => Err(ContractError::Upstream("Invalid API Key".to_string())),
        }
    }
}

#[tokio::test]
async fn health_endpoint_works() {
    let (base_url, handle) = spawn_app().await;
    let body: serde_json::Value = get_json(&base_url, "/health", 200).await;
    assert_eq!(body.get("status").and_then(|s| s.as_str()), Some("ok"));
    handle.abort();
}

#[tokio::test]
async fn analyze_returns_totals_and_estimate() {
    let (base_url, handle) = spawn_app().await;
    let body = get_json(&base_url, &format!("/analyze/{}", BUSY), 200).await;

    assert_eq!(body["total_transactions"], 2);
    assert_eq!(body["total_gas_used"], 1_000_000);
    assert_eq!(body["earliest_date"], "2023-01-01");
    assert_eq!(body["projection"]["outcome"], "estimate");
    assert_eq!(body["projection"]["growth_since_date"], 400);
    assert_eq!(body["formatted"]["primary"], "1.09K FTN");
    assert_eq!(body["formatted"]["usd"], "$4.39K");
    assert!(body["upstream_error"].is_null());
    handle.abort();
}

#[tokio::test]
async fn analyze_without_transactions_is_not_applicable() {
    let (base_url, handle) = spawn_app().await;
    let body = get_json(&base_url, &format!("/analyze/{}", EMPTY), 200).await;

    assert_eq!(body["total_transactions"], 0);
    assert_eq!(body["projection"]["outcome"], "not_applicable");
    assert_eq!(body["projection"]["reason"], "no_transactions");
    assert!(body["formatted"].is_null());
    handle.abort();
}

#[tokio::test]
async fn analyze_reports_upstream_error_with_partial_totals() {
    let (base_url, handle) = spawn_app().await;
    let body = get_json(&base_url, &format!("/analyze/{}", BROKEN), 200).await;

    assert_eq!(body["total_transactions"], 0);
    assert_eq!(body["upstream_error"], "Invalid API Key");
    handle.abort();
}

#[tokio::test]
async fn analyze_rejects_bad_address() {
    let (base_url, handle) = spawn_app().await;
    let body = get_json(&base_url, "/analyze/0x1234", 400).await;
    assert!(body["error"].as_str().is_some());
    handle.abort();
}

#[tokio::test]
async fn contract_endpoint_reports_deployability() {
    let (base_url, handle) = spawn_app().await;

    let body = get_json(&base_url, &format!("/contract/{}", BUSY), 200).await;
    assert_eq!(body["name"], "Counter");
    assert_eq!(body["deployable"], true);
    assert_eq!(body["bytecode_length"], 4);
    assert_eq!(body["bytecode"], "0x60806040");
    assert_eq!(body["source_code"], "contract Counter {}");
    assert_eq!(body["abi"], json!([]));

    let body = get_json(&base_url, &format!("/contract/{}", UNVERIFIED), 200).await;
    assert_eq!(body["deployable"], false);
    assert!(body["deploy_blocker"]
        .as_str()
        .map(|m| m.contains("not verified"))
        .unwrap_or(false));
    assert!(body["source_code"].is_null());
    assert!(body["abi"].is_null());

    let body = get_json(&base_url, &format!("/contract/{}", SOURCELESS), 200).await;
    assert_eq!(body["bytecode"], "0x6080");
    assert!(body["source_code"].is_null());
    handle.abort();
}

#[tokio::test]
async fn contract_source_endpoint_returns_verified_source() {
    let (base_url, handle) = spawn_app().await;

    let body = get_json(&base_url, &format!("/contract/{}/source", BUSY), 200).await;
    assert_eq!(body["name"], "Counter");
    assert_eq!(body["source_code"], "contract Counter {}");

    let body = get_json(&base_url, &format!("/contract/{}/source", UNVERIFIED), 404).await;
    assert!(body["error"]
        .as_str()
        .map(|m| m.contains("not verified"))
        .unwrap_or(false));

    let body = get_json(&base_url, &format!("/contract/{}/source", SOURCELESS), 404).await;
    assert_eq!(body["error"], "No source code available for this contract.");
    handle.abort();
}

#[tokio::test]
async fn contract_errors_are_rewritten_for_users() {
    let (base_url, handle) = spawn_app().await;
    let body = get_json(&base_url, &format!("/contract/{}", BROKEN), 502).await;
    let message = body["error"].as_str().unwrap_or_default();
    assert!(!message.is_empty());
    assert!(!message.contains("API Key"));
    handle.abort();
}

#[tokio::test]
async fn chain_growth_and_stats_endpoints_respond() {
    let (base_url, handle) = spawn_app().await;

    let chain = get_json(&base_url, "/chain", 200).await;
    assert_eq!(chain["id"], 2552);
    assert_eq!(chain["add_chain_params"]["chainId"], "0x9f8");

    let growth = get_json(&base_url, "/growth", 200).await;
    assert_eq!(growth["entries"], 2);
    assert_eq!(growth["latest"]["value"], 500);

    let stats = get_json(&base_url, "/stats", 200).await;
    assert!(stats.get("analyses").is_some());
    assert!(stats.get("pages").is_some());
    assert!(stats.get("rate_limit_retries").is_some());
    handle.abort();
}

async fn get_json(base_url: &str, path: &str, expected_status: u16) -> serde_json::Value {
    let res = Client::new()
        .get(format!("{}{}", base_url, path))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), expected_status, "status for {}", path);
    res.json().await.unwrap()
}

async fn spawn_app() -> (String, JoinHandle<()>) {
    let explorer = Arc::new(FakeExplorer);
    let analyzer = Analyzer::new(
        explorer.clone(),
        Arc::new(growth_series()),
        EarningsRates::default(),
        RetryPolicy::default(),
    );
    let state = AppState {
        analyzer,
        contracts: explorer,
    };
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let server = axum::serve(listener, app);
    let handle = tokio::spawn(async move {
        let _ = server.await;
    });

    (base_url, handle)
}

fn growth_series() -> GrowthSeries {
    let date = |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
    GrowthSeries::from_points(vec![
        GrowthPoint {
            date: date("2023-01-01"),
            value: 100,
        },
        GrowthPoint {
            date: date("2023-06-01"),
            value: 500,
        },
    ])
}
