use clap::{Args, Parser, Subcommand};
use finscope_stock::{HistoryRange, IndicatorRequest};

#[derive(Debug, Parser)]
#[command(name = "finscope")]
#[command(about = "Resilient stock quotes and technical indicators", long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch and extract quote pages
    Quote(QuoteArgs),
    /// Compute technical indicators over daily history
    Indicators(IndicatorsArgs),
}

#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// Ticker symbols, fetched concurrently
    #[arg(required = true)]
    pub symbols: Vec<String>,

    /// Print reports as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Print fetch health counters afterwards
    #[arg(long)]
    pub health: bool,
}

#[derive(Debug, Args)]
pub struct IndicatorsArgs {
    pub symbol: String,

    /// History range (1mo, 3mo, 6mo, 1y, 2y, 5y, ytd)
    #[arg(long)]
    pub range: Option<HistoryRange>,

    /// Indicator to compute, e.g. sma_20, rsi_14, macd, bollinger; repeatable
    #[arg(long = "indicator", short = 'i')]
    pub indicators: Vec<IndicatorRequest>,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}
