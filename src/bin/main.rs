use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use rust_decimal::Decimal;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use paper_trader::console::Console;
use paper_trader::display;
use paper_trader::ledger::Ledger;
use paper_trader::marketplace::simulation::SimulationQuotes;
use paper_trader::marketplace::yahoo::{self, Yahoo};
use paper_trader::marketplace::{get_quotes, QuoteSource};
use paper_trader::symbol::Symbol;

#[derive(Parser, Debug)]
#[command(version, about = "Stock quotes and a paper trading console")]
struct Args {
    #[arg(long, env = "QUOTE_ENDPOINT", default_value = yahoo::ENDPOINT)]
    quote_endpoint: String,
    /// Trade against a JSON file of fixed quotes instead of the live provider
    #[arg(long, env = "QUOTES_FILE")]
    quotes_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive paper trading
    Trade {
        #[arg(long, env = "STARTING_CASH", default_value = "50000")]
        starting_cash: Decimal,
    },
    /// Print the current quote of each symbol
    Quote {
        #[arg(required = true)]
        symbol: Vec<String>,
    },
    /// Refreshing market overview table
    Watch {
        #[arg(long, value_delimiter = ',', default_value = "AAPL,MSFT,NVDA,AMZN")]
        symbol: Vec<String>,
        /// Seconds between refreshes
        #[arg(long, default_value = "10")]
        interval: u64,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("{}=warn,reqwest=warn", env!("CARGO_CRATE_NAME")).into()
        }))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if let Err(err) = run(args).await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    match args.quotes_file {
        Some(path) => run_command(args.command, SimulationQuotes::from_file(&path).await?).await,
        None => run_command(args.command, Yahoo::new(&args.quote_endpoint)?).await,
    }
}

fn parse_symbols(symbols: &[String]) -> Result<Vec<Symbol>> {
    symbols
        .iter()
        .map(|symbol| Symbol::try_from(symbol).map_err(|e| anyhow!(e)))
        .collect()
}

async fn run_command<Q: QuoteSource>(command: Commands, quotes: Q) -> Result<()> {
    match command {
        Commands::Trade { starting_cash } => run_trade(quotes, starting_cash).await,
        Commands::Quote { symbol } => run_quote(quotes, parse_symbols(&symbol)?).await,
        Commands::Watch { symbol, interval } => {
            run_watch(quotes, parse_symbols(&symbol)?, interval).await
        }
    }
}

async fn run_trade<Q: QuoteSource>(quotes: Q, starting_cash: Decimal) -> Result<()> {
    let mut ledger = Ledger::new(starting_cash)?;
    info!("Paper trading with {}", starting_cash);

    let mut console = Console::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    console.run(&mut ledger, &quotes).await
}

async fn run_quote<Q: QuoteSource>(quotes: Q, symbols: Vec<Symbol>) -> Result<()> {
    for symbol in symbols.iter() {
        let quote = quotes.get_quote(symbol).await?;
        println!("{}", display::quote_details(&quote, &Local::now()));
    }
    Ok(())
}

async fn run_watch<Q: QuoteSource>(quotes: Q, symbols: Vec<Symbol>, interval: u64) -> Result<()> {
    let mut refresh = tokio::time::interval(Duration::from_secs(interval.max(1)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = refresh.tick() => {
                let rows = get_quotes(&quotes, &symbols).await;

                let mut stdout = std::io::stdout();
                execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
                println!("Live Stock Tracker (Press Ctrl+C to exit)");
                println!("{}", display::market_overview(&rows, &Local::now()));
                stdout.flush()?;

                for (symbol, res) in rows.iter() {
                    if let Err(err) = res {
                        warn!("Failed to fetch {} : {:#}", symbol, err);
                    }
                }
            }
            _ = &mut ctrl_c => {
                println!();
                return Ok(());
            }
        }
    }
}
