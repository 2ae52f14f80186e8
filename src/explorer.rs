use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::{
    aggregator::PageFetcher,
    models::{TransactionRecord, TxPage},
};

const END_BLOCK: u64 = 99_999_999;
const NOT_VERIFIED: &str = "Contract source code not verified";
const NO_TRANSACTIONS: &str = "No transactions found";

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("explorer rate limit reached")]
    RateLimited,
    #[error("{0}")]
    Upstream(String),
    #[error("explorer request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected explorer response: {0}")]
    Decode(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ContractError {
    #[error("contract source code is not verified")]
    NotVerified,
    #[error("contract has no published source code")]
    NoSourceCode,
    #[error("contract ABI is missing")]
    MissingAbi,
    #[error("contract bytecode is missing")]
    MissingBytecode,
    #[error("{0}")]
    Upstream(String),
    #[error("explorer request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected explorer response: {0}")]
    Decode(String),
}

impl ContractError {
    /// Short message suitable for end users; never includes upstream text.
    pub fn user_message(&self) -> &'static str {
        match self {
            ContractError::NotVerified => {
                "This contract's source code is not verified, so it cannot be redeployed."
            }
            ContractError::NoSourceCode => "No source code available for this contract.",
            ContractError::MissingAbi => "No ABI is published for this contract.",
            ContractError::MissingBytecode => "Bytecode for this contract is not available.",
            ContractError::Upstream(_) | ContractError::Transport(_) | ContractError::Decode(_) => {
                "Could not load contract details from the explorer. Please try again."
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractInfo {
    pub name: String,
    pub compiler_version: String,
    pub source_code: String,
    pub abi: Option<Value>,
    pub bytecode: String,
    pub is_verified: bool,
}

impl From<FetchError> for ContractError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::RateLimited => ContractError::Upstream(err.to_string()),
            FetchError::Upstream(message) => ContractError::Upstream(message),
            FetchError::Transport(e) => ContractError::Transport(e),
            FetchError::Decode(message) => ContractError::Decode(message),
        }
    }
}

impl ContractInfo {
    /// Verified source text, or the reason there is none to show.
    pub fn ensure_source(&self) -> Result<&str, ContractError> {
        if !self.is_verified {
            return Err(ContractError::NotVerified);
        }
        if self.source_code.trim().is_empty() {
            return Err(ContractError::NoSourceCode);
        }
        Ok(&self.source_code)
    }

    pub fn ensure_deployable(&self) -> Result<(), ContractError> {
        if self.abi.is_none() {
            return Err(if self.is_verified {
                ContractError::MissingAbi
            } else {
                ContractError::NotVerified
            });
        }
        if self.bytecode.trim_start_matches("0x").is_empty() {
            return Err(ContractError::MissingBytecode);
        }
        Ok(())
    }

    pub fn is_deployable(&self) -> bool {
        self.ensure_deployable().is_ok()
    }

    pub fn prefixed_bytecode(&self) -> String {
        if self.bytecode.starts_with("0x") {
            self.bytecode.clone()
        } else {
            format!("0x{}", self.bytecode)
        }
    }
}

#[async_trait]
pub trait ContractSource: Send + Sync {
    async fn fetch_contract(&self, address: &str) -> Result<ContractInfo, ContractError>;
}

#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct SourceCodeEntry {
    #[serde(rename = "SourceCode", default)]
    source_code: String,
    #[serde(rename = "ABI", default)]
    abi: String,
    #[serde(rename = "ContractName", default)]
    contract_name: String,
    #[serde(rename = "CompilerVersion", default)]
    compiler_version: String,
    #[serde(rename = "Bytecode", default)]
    bytecode: String,
    #[serde(rename = "Implementation", default)]
    implementation: String,
}

#[derive(Clone)]
pub struct EtherscanClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl EtherscanClient {
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build reqwest client")?;
        let base_url = Url::parse(base_url).context("invalid ETHERSCAN_API_URL")?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    async fn get(&self, params: &[(&str, String)]) -> Result<EtherscanResponse, FetchError> {
        let response = self
            .http
            .get(self.base_url.clone())
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        Ok(response
            .error_for_status()?
            .json::<EtherscanResponse>()
            .await?)
    }

    async fn fetch_code(&self, address: &str) -> Result<String, ContractError> {
        let response = self
            .get(&[
                ("module", "proxy".to_string()),
                ("action", "eth_getCode".to_string()),
                ("address", address.to_string()),
                ("tag", "latest".to_string()),
            ])
            .await?;
        Ok(response.result.as_str().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl PageFetcher for EtherscanClient {
    async fn fetch_page(
        &self,
        address: &str,
        start_block: u64,
        page_size: usize,
    ) -> Result<TxPage, FetchError> {
        let response = self
            .get(&[
                ("module", "account".to_string()),
                ("action", "txlist".to_string()),
                ("address", address.to_string()),
                ("startblock", start_block.to_string()),
                ("endblock", END_BLOCK.to_string()),
                ("page", "1".to_string()),
                ("offset", page_size.to_string()),
                ("sort", "asc".to_string()),
            ])
            .await?;
        tracing::debug!(
            "txlist {} from block {}: status={} message={}",
            address,
            start_block,
            response.status,
            response.message
        );
        decode_txlist(response)
    }
}

#[async_trait]
impl ContractSource for EtherscanClient {
    async fn fetch_contract(&self, address: &str) -> Result<ContractInfo, ContractError> {
        let response = self
            .get(&[
                ("module", "contract".to_string()),
                ("action", "getsourcecode".to_string()),
                ("address", address.to_string()),
            ])
            .await?;

        let (mut info, implementation) = decode_source_code(response)?;

        if info.bytecode.is_empty() {
            // Proxies carry no bytecode of their own; read the implementation's.
            let code_address = implementation.unwrap_or_else(|| address.to_string());
            tracing::debug!("no bytecode in source response, fetching code of {}", code_address);
            let code = self.fetch_code(&code_address).await?;
            if code != "0x" {
                info.bytecode = code;
            }
        }

        Ok(info)
    }
}

fn decode_txlist(response: EtherscanResponse) -> Result<TxPage, FetchError> {
    if response.status == "1" {
        return decode_result(response.result);
    }

    let result_text = response.result.as_str().unwrap_or_default();
    if is_rate_limited(&response.message) || is_rate_limited(result_text) {
        return Err(FetchError::RateLimited);
    }
    if response.message.eq_ignore_ascii_case(NO_TRANSACTIONS) {
        return Ok(TxPage::default());
    }
    Err(FetchError::Upstream(upstream_message(
        &response.message,
        result_text,
        "Failed to fetch transaction list",
    )))
}

/// Normalizes the two shapes `result` arrives in: a plain array, or an object
/// keyed by numeric-looking strings.
pub fn decode_result(result: Value) -> Result<TxPage, FetchError> {
    match result {
        Value::Null => Ok(TxPage::default()),
        Value::Array(items) => Ok(TxPage::from_records(
            items.iter().map(record_from_value).collect(),
        )),
        Value::Object(map) => {
            let mut numeric: Vec<(u64, TransactionRecord)> = Vec::new();
            let mut other: Vec<TransactionRecord> = Vec::new();
            for (key, value) in map.iter() {
                let record = record_from_value(value);
                match key.trim().parse::<u64>() {
                    Ok(index) => numeric.push((index, record)),
                    Err(_) => other.push(record),
                }
            }
            numeric.sort_by_key(|(index, _)| *index);

            let cursor_block = numeric.last().and_then(|(_, r)| r.block_number);
            let mut records: Vec<TransactionRecord> =
                numeric.into_iter().map(|(_, r)| r).collect();
            records.extend(other);

            Ok(TxPage {
                records,
                cursor_block,
            })
        }
        other => Err(FetchError::Decode(format!(
            "txlist result is neither a list nor an object: {}",
            other
        ))),
    }
}

fn record_from_value(value: &Value) -> TransactionRecord {
    let Some(obj) = value.as_object() else {
        return TransactionRecord::default();
    };
    TransactionRecord {
        block_number: obj.get("blockNumber").and_then(parse_u64),
        gas_used: obj.get("gasUsed").and_then(parse_u64),
        timestamp: obj
            .get("timeStamp")
            .and_then(parse_u64)
            .and_then(|ts| i64::try_from(ts).ok()),
    }
}

fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn decode_source_code(
    response: EtherscanResponse,
) -> Result<(ContractInfo, Option<String>), ContractError> {
    let result_text = response.result.as_str().unwrap_or_default().to_string();
    let entries: Vec<SourceCodeEntry> = match (response.status.as_str(), response.result) {
        ("1", Value::Array(items)) if !items.is_empty() => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()
            .map_err(|e| ContractError::Decode(e.to_string()))?,
        _ => {
            return Err(ContractError::Upstream(upstream_message(
                &response.message,
                &result_text,
                "Failed to fetch contract data",
            )))
        }
    };

    let Some(entry) = entries.into_iter().next() else {
        return Err(ContractError::Decode("empty getsourcecode result".to_string()));
    };

    let is_verified = entry.abi != NOT_VERIFIED;
    let abi = if is_verified && !entry.abi.trim().is_empty() {
        serde_json::from_str(&entry.abi).ok()
    } else {
        None
    };

    let implementation = Some(entry.implementation.trim().to_string()).filter(|s| !s.is_empty());

    let info = ContractInfo {
        name: entry.contract_name,
        compiler_version: entry.compiler_version,
        source_code: entry.source_code,
        abi,
        bytecode: entry.bytecode,
        is_verified,
    };
    Ok((info, implementation))
}

fn is_rate_limited(text: &str) -> bool {
    text.to_ascii_lowercase().contains("rate limit")
}

fn upstream_message(message: &str, result: &str, fallback: &str) -> String {
    if !result.is_empty() && (message.is_empty() || message == "NOTOK") {
        result.to_string()
    } else if !message.is_empty() {
        message.to_string()
    } else {
        fallback.to_string()
    }
}
