use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    aggregator::{normalize_address, AggregateError},
    analysis::{AnalysisReport, Analyzer},
    chain::BAHAMUT_HORIZON,
    explorer::{ContractError, ContractSource},
    format::format_magnitude,
    models::GrowthPoint,
    stats::{AnalysisSnapshot, ANALYSIS_STATS},
};

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Analyzer,
    pub contracts: Arc<dyn ContractSource>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct FormattedEarnings {
    primary: String,
    usd: String,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    #[serde(flatten)]
    report: AnalysisReport,
    formatted: Option<FormattedEarnings>,
}

#[derive(Serialize)]
struct ContractResponse {
    address: String,
    name: String,
    compiler_version: String,
    is_verified: bool,
    has_abi: bool,
    source_code: Option<String>,
    abi: Option<Value>,
    bytecode: String,
    bytecode_length: usize,
    deployable: bool,
    deploy_blocker: Option<&'static str>,
}

#[derive(Serialize)]
struct SourceResponse {
    address: String,
    name: String,
    source_code: String,
}

#[derive(Serialize)]
struct GrowthSummary {
    entries: usize,
    first: Option<GrowthPoint>,
    latest: Option<GrowthPoint>,
}

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Upstream(message) => (StatusCode::BAD_GATEWAY, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<AggregateError> for ApiError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::InvalidAddress(_) => {
                ApiError::BadRequest("Please enter a valid contract address".to_string())
            }
            AggregateError::Network { message, .. } => ApiError::Upstream(message),
        }
    }
}

impl From<ContractError> for ApiError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::NotVerified | ContractError::NoSourceCode => {
                ApiError::NotFound(err.user_message().to_string())
            }
            _ => {
                tracing::warn!("contract lookup failed: {}", err);
                ApiError::Upstream(err.user_message().to_string())
            }
        }
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn analyze(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let report = state.analyzer.analyze(&address).await?;
    let formatted = report.projection.estimate().map(|e| FormattedEarnings {
        primary: format!(
            "{} {}",
            format_magnitude(e.primary_unit_amount),
            BAHAMUT_HORIZON.native_currency.symbol
        ),
        usd: format!("${}", format_magnitude(e.usd_amount)),
    });
    Ok(Json(AnalyzeResponse { report, formatted }))
}

async fn contract(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ContractResponse>, ApiError> {
    let address = normalize_address(&address)?;
    let info = state.contracts.fetch_contract(&address).await?;
    let deploy_blocker = info.ensure_deployable().err().map(|e| e.user_message());
    let source_code = info.ensure_source().ok().map(str::to_string);

    Ok(Json(ContractResponse {
        address,
        has_abi: info.abi.is_some(),
        source_code,
        bytecode: info.prefixed_bytecode(),
        bytecode_length: info.bytecode.trim_start_matches("0x").len() / 2,
        deployable: deploy_blocker.is_none(),
        deploy_blocker,
        name: info.name,
        compiler_version: info.compiler_version,
        is_verified: info.is_verified,
        abi: info.abi,
    }))
}

async fn contract_source(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<SourceResponse>, ApiError> {
    let address = normalize_address(&address)?;
    let info = state.contracts.fetch_contract(&address).await?;
    let source_code = info.ensure_source()?.to_string();

    Ok(Json(SourceResponse {
        address,
        name: info.name,
        source_code,
    }))
}

async fn chain() -> Json<Value> {
    Json(json!({
        "id": BAHAMUT_HORIZON.id,
        "add_chain_params": BAHAMUT_HORIZON.add_chain_params(),
    }))
}

async fn growth(State(state): State<AppState>) -> Json<GrowthSummary> {
    let series = state.analyzer.growth();
    Json(GrowthSummary {
        entries: series.len(),
        first: series.first().copied(),
        latest: series.latest().copied(),
    })
}

async fn stats() -> Json<AnalysisSnapshot> {
    Json(ANALYSIS_STATS.snapshot())
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze/:address", get(analyze))
        .route("/contract/:address", get(contract))
        .route("/contract/:address/source", get(contract_source))
        .route("/chain", get(chain))
        .route("/growth", get(growth))
        .route("/stats", get(stats))
        .with_state(state)
}

pub async fn run_http_server(addr: &str, state: AppState) -> Result<()> {
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
