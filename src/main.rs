mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use contract_gas_projector::{
    aggregator::normalize_address,
    analysis::{AnalysisReport, Analyzer},
    api::{self, AppState},
    chain::BAHAMUT_HORIZON,
    config::Config,
    explorer::{ContractSource, EtherscanClient},
    format::format_magnitude,
    growth::GrowthSeries,
    models::{NotApplicableReason, Projection},
};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { address, json } => {
            let config = load_config()?;
            let analyzer = build_analyzer(&config, explorer_client(&config)?)?;
            let report = analyzer.analyze(&address).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Contract { address, source } => {
            let config = load_config()?;
            let client = explorer_client(&config)?;
            let address = normalize_address(&address)?;
            let info = match client.fetch_contract(&address).await {
                Ok(info) => info,
                Err(e) => {
                    tracing::debug!("contract lookup failed: {}", e);
                    anyhow::bail!("{}", e.user_message());
                }
            };

            if source {
                match info.ensure_source() {
                    Ok(code) => println!("{}", code),
                    Err(e) => anyhow::bail!("{}", e.user_message()),
                }
                return Ok(());
            }

            println!("Contract: {}", info.name);
            println!("Compiler: {}", info.compiler_version);
            println!("Verified: {}", info.is_verified);
            match info.ensure_deployable() {
                Ok(()) => println!(
                    "Deployable: yes ({} bytes)",
                    info.prefixed_bytecode().len().saturating_sub(2) / 2
                ),
                Err(e) => println!("Deployable: no ({})", e.user_message()),
            }
        }
        Commands::Chain => {
            println!(
                "{}",
                serde_json::to_string_pretty(&BAHAMUT_HORIZON.add_chain_params())?
            );
        }
        Commands::Serve { addr } => {
            let config = load_config()?;
            let client = explorer_client(&config)?;
            let bind = addr.unwrap_or_else(|| config.http_bind_addr.clone());
            let state = AppState {
                analyzer: build_analyzer(&config, client.clone())?,
                contracts: client,
            };
            api::run_http_server(&bind, state).await?;
        }
    }

    Ok(())
}

fn load_config() -> anyhow::Result<Config> {
    Config::from_env().context("failed to load configuration")
}

fn explorer_client(config: &Config) -> anyhow::Result<Arc<EtherscanClient>> {
    let client = EtherscanClient::new(&config.etherscan_api_url, &config.etherscan_api_key)
        .context("failed to create explorer client")?;
    Ok(Arc::new(client))
}

fn build_analyzer(config: &Config, client: Arc<EtherscanClient>) -> anyhow::Result<Analyzer> {
    let growth = GrowthSeries::load(&config.growth_data_path)?;
    Ok(Analyzer::new(
        client,
        Arc::new(growth),
        config.rates(),
        config.retry_policy(),
    ))
}

fn print_report(report: &AnalysisReport) {
    println!("Address: {}", report.address);
    println!("Transactions: {}", report.aggregation.total_transactions);
    println!("Total gas used: {}", report.aggregation.total_gas_used);
    if let Some(date) = report.earliest_date {
        println!("First transaction: {}", date);
    }
    if let Some(message) = &report.upstream_error {
        println!("Warning: totals are partial ({})", message);
    }

    let symbol = BAHAMUT_HORIZON.native_currency.symbol;
    match &report.projection {
        Projection::Estimate(estimate) => {
            println!("Network gas growth since first tx: {}", estimate.growth_since_date);
            println!(
                "Potential earnings: {} {} (${})",
                format_magnitude(estimate.primary_unit_amount),
                symbol,
                format_magnitude(estimate.usd_amount)
            );
        }
        Projection::TooNew { created } => {
            println!(
                "Contract first seen {}; at least 2 days of history are needed for an estimate",
                created
            );
        }
        Projection::NotApplicable { reason } => {
            let why = match reason {
                NotApplicableReason::NoTransactions => "no transactions with gas usage",
                NotApplicableReason::NoGrowthData => "growth data is empty",
                NotApplicableReason::ZeroGrowth => "no network growth since first transaction",
            };
            println!("No estimate: {}", why);
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}
