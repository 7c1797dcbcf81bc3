use std::fmt::Display;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::debug;

use crate::command::{dispatch, Action, Command, MenuChoice, Reply};
use crate::display;
use crate::ledger::{Ledger, LedgerError};
use crate::marketplace::QuoteSource;
use crate::symbol::Symbol;

/// Line-based menu loop. Input ending early is treated as choosing Exit.
pub struct Console<R, W> {
    lines: Lines<R>,
    output: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            lines: input.lines(),
            output,
        }
    }

    async fn say(&mut self, text: impl Display) -> Result<()> {
        self.output
            .write_all(format!("{}\n", text).as_bytes())
            .await
            .context("Failed to write to console")?;
        self.output
            .flush()
            .await
            .context("Failed to write to console")?;
        Ok(())
    }

    async fn prompt(&mut self, question: &str) -> Result<Option<String>> {
        self.output
            .write_all(question.as_bytes())
            .await
            .context("Failed to write to console")?;
        self.output
            .flush()
            .await
            .context("Failed to write to console")?;
        let line = self
            .lines
            .next_line()
            .await
            .context("Failed to read from console")?;
        Ok(line.map(|line| line.trim().to_owned()))
    }

    async fn read_command(&mut self, ledger: &Ledger) -> Result<Command> {
        loop {
            self.say(display::menu()).await?;
            let question = format!("> Choose an option (1-{}): ", MenuChoice::count());
            let Some(choice) = self.prompt(&question).await? else {
                return Ok(Command::Exit);
            };

            let command = match MenuChoice::parse(&choice) {
                Some(MenuChoice::Balance) => Command::Balance,
                Some(MenuChoice::Exit) => Command::Exit,
                Some(MenuChoice::Buy) => {
                    let Some(symbol) = self.prompt("Symbol to BUY: ").await? else {
                        return Ok(Command::Exit);
                    };
                    if symbol.is_empty() {
                        self.say(Reply::Cancelled).await?;
                        continue;
                    }
                    if let Some(held) = Symbol::try_from(&symbol)
                        .ok()
                        .filter(|held| ledger.lot(held).is_some())
                    {
                        let error = LedgerError::DuplicatePosition(held);
                        self.say(Reply::Failed {
                            action: Action::Buy,
                            error,
                        })
                        .await?;
                        continue;
                    }
                    let Some(quantity) = self.prompt("Quantity (multiple of 5): ").await? else {
                        return Ok(Command::Exit);
                    };
                    Command::Buy { symbol, quantity }
                }
                Some(MenuChoice::Sell) => {
                    let Some(symbol) = self
                        .prompt("Stock Symbol to SELL (ex: AAPL, NVDA): ")
                        .await?
                    else {
                        return Ok(Command::Exit);
                    };
                    Command::Sell { symbol }
                }
                Some(MenuChoice::View) => {
                    let Some(symbol) = self
                        .prompt("Stock Symbol to VIEW (ex: AAPL, NVDA): ")
                        .await?
                    else {
                        return Ok(Command::Exit);
                    };
                    Command::View { symbol }
                }
                None => {
                    self.say(format!("Please choose 1-{}.", MenuChoice::count()))
                        .await?;
                    continue;
                }
            };
            return Ok(command);
        }
    }

    pub async fn run<Q: QuoteSource>(&mut self, ledger: &mut Ledger, quotes: &Q) -> Result<()> {
        self.say(display::welcome(ledger.cash())).await?;
        loop {
            let command = self.read_command(ledger).await?;
            debug!("Console command : {:?}", command);
            let reply = dispatch(ledger, quotes, command).await;
            self.say(&reply).await?;
            if reply == Reply::Goodbye {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::marketplace::simulation::SimulationQuotes;
    use crate::quote::Quote;

    async fn run_session(input: &str, ledger: &mut Ledger) -> String {
        colored::control::set_override(false);
        let quotes = SimulationQuotes::new(vec![
            Quote::new(Symbol::try_from("AAPL").unwrap(), dec!(200)),
            Quote::new(Symbol::try_from("NVDA").unwrap(), dec!(120)),
        ]);
        let mut output: Vec<u8> = Vec::new();
        let mut console = Console::new(input.as_bytes(), &mut output);
        console.run(ledger, &quotes).await.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn test_buy_view_sell_session() {
        let mut ledger = Ledger::new(dec!(50000)).unwrap();
        let out = run_session("2\naapl\n10\n4\nAAPL\n1\n3\nAAPL\n5\n", &mut ledger).await;

        assert!(out.contains("Welcome! Starting cash: $50,000.00."));
        assert!(out.contains("Bought 10 AAPL @ $200.00. New cash: $48,000.00."));
        assert!(out.contains("Owned: qty 10 @ $200.00 (unrealized P&L: +$0.00)"));
        assert!(out.contains("Cash: $48,000.00"));
        assert!(out.contains("Sold 10 AAPL @ $200.00 for $2,000.00."));
        assert!(out.contains("Goodbye!"));
        assert_eq!(ledger.cash(), dec!(50000));
    }

    #[tokio::test]
    async fn test_rejections_do_not_end_session() {
        let mut ledger = Ledger::new(dec!(1000)).unwrap();
        let out = run_session("9\n2\nNVDA\n7\n2\nNVDA\n10\n3\nMSFT\n2\n\n5\n", &mut ledger).await;

        assert!(out.contains("Please choose 1-5."));
        assert!(out.contains("Quantity must be a positive multiple of 5"));
        assert!(out.contains("Insufficient cash. Need $1,200.00, have $1,000.00."));
        assert!(out.contains("You don't own MSFT"));
        assert!(out.contains("Cancelled."));
        assert!(out.contains("Goodbye!"));
        assert_eq!(ledger, Ledger::new(dec!(1000)).unwrap());
    }

    #[tokio::test]
    async fn test_held_symbol_skips_quantity_prompt() {
        let mut ledger = Ledger::new(dec!(50000)).unwrap();
        let out = run_session("2\nAAPL\n5\n2\naapl\n5\n", &mut ledger).await;

        assert!(out.contains("You already own a lot of AAPL. Sell it before buying again."));
        assert_eq!(out.matches("Quantity (multiple of 5): ").count(), 1);
        assert!(out.contains("Goodbye!"));
        assert_eq!(ledger.cash(), dec!(49000));
    }

    #[tokio::test]
    async fn test_end_of_input_exits() {
        let mut ledger = Ledger::new(dec!(50000)).unwrap();
        let out = run_session("2\nAAPL\n", &mut ledger).await;
        assert!(out.contains("Goodbye!"));
        assert_eq!(ledger.cash(), dec!(50000));
    }
}
