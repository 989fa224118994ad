//! Command-line interface for finscope

mod cli;
mod render;

use anyhow::Context;
use clap::Parser;
use finscope_stock::{Extractor, StockConfig, StockService};
use serde_json::json;
use std::process::ExitCode;
use tracing::{error, info};

use crate::cli::{Cli, Command, IndicatorsArgs, QuoteArgs};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.json_logs {
        finscope_utils::init_tracing_json();
    } else {
        finscope_utils::init_tracing();
    }

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = StockConfig::from_env().context("invalid FINSCOPE_* configuration")?;
    let service = StockService::new(config).context("failed to build stock service")?;

    match cli.command {
        Command::Quote(args) => quote(&service, args).await,
        Command::Indicators(args) => indicators(&service, args).await,
    }
}

async fn quote(service: &StockService, args: QuoteArgs) -> anyhow::Result<ExitCode> {
    info!(symbols = args.symbols.len(), "Fetching quotes");
    let reports = service.quotes(&args.symbols).await;
    let failed = reports.iter().filter(|r| !r.success).count();

    if args.json {
        let output = if args.health {
            json!({ "reports": reports, "health": service.health() })
        } else {
            serde_json::to_value(&reports)?
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let field_order: Vec<String> = Extractor::default()
            .specs()
            .iter()
            .map(|s| s.name.clone())
            .collect();
        for report in &reports {
            if let Some(record) = &report.record {
                println!("{}", record.symbol());
                println!("{}", render::record_table(record, &field_order));
            }
        }
        println!("{}", render::summary_table(&reports));
        if args.health {
            println!("{}", render::health_table(&service.health()));
        }
    }

    if failed > 0 {
        info!(failed, total = reports.len(), "Some quotes failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn indicators(service: &StockService, args: IndicatorsArgs) -> anyhow::Result<ExitCode> {
    let range = args.range.unwrap_or(service.config().history_range);
    let analysis = service
        .analysis(&args.symbol, Some(range), &args.indicators)
        .await
        .with_context(|| format!("failed to compute indicators for {}", args.symbol))?;
    let set = &analysis.indicators;

    if args.json {
        let output = json!({
            "symbol": args.symbol.to_uppercase(),
            "range": range,
            "indicators": set,
            "patterns": analysis.patterns,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} over {range} ({} bars)", args.symbol.to_uppercase(), set.points);
        println!("{}", render::indicator_table(set));
        if let Some(patterns) = &analysis.patterns {
            println!("{}", render::pattern_table(patterns));
        }
    }
    Ok(ExitCode::SUCCESS)
}
