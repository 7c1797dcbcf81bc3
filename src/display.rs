use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, TimeZone};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use rust_decimal::{Decimal, RoundingStrategy};
use strum::IntoEnumIterator;

use crate::command::{MenuChoice, Reply};
use crate::ledger::{LedgerError, LedgerSnapshot, StockView};
use crate::quote::Quote;
use crate::symbol::Symbol;

const CLOCK_FORMAT: &str = "%-m/%-d/%Y, %-I:%M %p";
const LOT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// US dollar formatting: `$48,000.00`, `-$12.50`.
pub fn format_money(value: Decimal) -> String {
    let value = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if value < Decimal::ZERO { "-" } else { "" };
    let digits = format!("{:.2}", value.abs());
    let (int, frac) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}${}.{}", sign, grouped, frac)
}

/// Money with an explicit `+` for gains, colored green or red.
pub fn format_pnl(value: Decimal) -> String {
    if value < Decimal::ZERO {
        format_money(value).red().to_string()
    } else {
        format!("+{}", format_money(value)).green().to_string()
    }
}

fn format_change(quote: &Quote) -> String {
    match (quote.change, quote.change_percent) {
        (Some(change), Some(percent)) => format!("{:.2} ({:.2}%)", change, percent),
        (Some(change), None) => format!("{:.2}", change),
        _ => String::from("N/A"),
    }
}

fn describe_error(error: &LedgerError) -> String {
    match error {
        LedgerError::InsufficientFunds { needed, available } => format!(
            "Insufficient cash. Need {}, have {}.",
            format_money(*needed),
            format_money(*available)
        ),
        other => other.to_string(),
    }
}

pub fn menu() -> String {
    let mut s = vec![format!("\n{}", "=== Paper Trader ===".bold())];
    for choice in MenuChoice::iter() {
        s.push(format!("{}) {}", choice.number(), choice));
    }
    s.join("\n")
}

pub fn welcome(starting_cash: Decimal) -> String {
    format!("\nWelcome! Starting cash: {}.", format_money(starting_cash))
}

fn write_snapshot(
    f: &mut std::fmt::Formatter<'_>,
    snapshot: &LedgerSnapshot,
) -> std::fmt::Result {
    writeln!(f, "\n--- Account ---")?;
    writeln!(f, "Cash: {}", format_money(snapshot.cash).yellow())?;
    if snapshot.holdings.is_empty() {
        return writeln!(f, "Holdings: (none)");
    }
    writeln!(f, "Holdings:")?;
    for (symbol, lot) in snapshot.holdings.iter() {
        writeln!(
            f,
            "  {} - qty: {}, buyPrice: {}, cost: {}, bought: {}",
            symbol.to_string().purple(),
            lot.quantity,
            format_money(lot.buy_price),
            format_money(lot.cost()),
            lot.opened_at.format(LOT_TIME_FORMAT)
        )?;
    }
    Ok(())
}

fn write_view(f: &mut std::fmt::Formatter<'_>, view: &StockView) -> std::fmt::Result {
    let quote = &view.quote;
    writeln!(f, "\n{} ({})", quote.display_name.bold(), quote.symbol)?;
    writeln!(f, "Price: {} {}", format_money(quote.price), quote.currency)?;
    match quote.pe_ratio {
        Some(pe) => writeln!(f, "P/E: {}", pe)?,
        None => writeln!(f, "P/E: N/A")?,
    }
    if let Some(position) = &view.position {
        writeln!(
            f,
            "Owned: qty {} @ {} (unrealized P&L: {})",
            position.lot.quantity,
            format_money(position.lot.buy_price),
            format_pnl(position.unrealized_pnl)
        )?;
    }
    Ok(())
}

impl Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Snapshot(snapshot) => write_snapshot(f, snapshot),
            Reply::Viewed(view) => write_view(f, view),
            Reply::Bought(receipt) => write!(
                f,
                "{} {} {} @ {}. New cash: {}.",
                "Bought".green(),
                receipt.quantity,
                receipt.symbol,
                format_money(receipt.price),
                format_money(receipt.cash)
            ),
            Reply::Sold(receipt) => {
                writeln!(
                    f,
                    "{} {} {} @ {} for {}.",
                    "Sold".red(),
                    receipt.lot.quantity,
                    receipt.symbol,
                    format_money(receipt.price),
                    format_money(receipt.proceeds)
                )?;
                writeln!(
                    f,
                    "P&L vs buy @ {}: {}",
                    format_money(receipt.lot.buy_price),
                    format_pnl(receipt.pnl)
                )?;
                write!(f, "New cash: {}.", format_money(receipt.cash))
            }
            Reply::Failed {
                action,
                error: error @ LedgerError::QuoteUnavailable { .. },
            } => write!(f, "{} failed: {}", action, describe_error(error)),
            Reply::Failed { error, .. } => write!(f, "{}", describe_error(error)),
            Reply::InvalidInput(message) => write!(f, "{}", message),
            Reply::Cancelled => write!(f, "Cancelled."),
            Reply::Goodbye => write!(f, "\nGoodbye!\n"),
        }
    }
}

pub fn quote_details<Tz>(quote: &Quote, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    [
        format!("\n{}", quote.display_name.bold()),
        format!("Symbol: {}", quote.symbol),
        format!("Price: {} {}", quote.price, quote.currency),
        format!("Change: {}", format_change(quote)),
        format!("Time: {}", at.format(CLOCK_FORMAT)),
    ]
    .join("\n")
}

pub fn market_overview<Tz>(rows: &[(Symbol, Result<Quote>)], at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Symbol", "Name", "Price", "Change"]);
    for (symbol, quote) in rows {
        match quote {
            Ok(quote) => table.add_row(vec![
                quote.symbol.to_string(),
                quote.display_name.clone(),
                format!("{} {}", quote.price, quote.currency),
                format_change(quote),
            ]),
            Err(_) => table.add_row(vec![
                symbol.to_string(),
                String::from("unavailable"),
                String::from("-"),
                String::from("-"),
            ]),
        };
    }
    format!(
        "\n{} - {}\n{}\n",
        "Market Overview".bold(),
        at.format(CLOCK_FORMAT),
        table
    )
}
