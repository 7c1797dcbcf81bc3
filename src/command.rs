use strum::{Display, EnumIter, IntoEnumIterator};

use crate::ledger::{BuyReceipt, Ledger, LedgerError, LedgerSnapshot, SellReceipt, StockView};
use crate::marketplace::QuoteSource;
use crate::symbol::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display)]
pub enum MenuChoice {
    #[strum(to_string = "View balance / holdings")]
    Balance,
    #[strum(to_string = "Buy stock")]
    Buy,
    #[strum(to_string = "Sell stock")]
    Sell,
    #[strum(to_string = "View stock")]
    View,
    #[strum(to_string = "Exit")]
    Exit,
}

impl MenuChoice {
    /// Menu entries are numbered from 1.
    pub fn parse(input: &str) -> Option<Self> {
        let n: usize = input.trim().parse().ok()?;
        Self::iter().nth(n.checked_sub(1)?)
    }

    pub fn number(self) -> usize {
        self as usize + 1
    }

    pub fn count() -> usize {
        Self::iter().count()
    }
}

/// One console request, holding the text as typed.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Balance,
    Buy { symbol: String, quantity: String },
    Sell { symbol: String },
    View { symbol: String },
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Action {
    Buy,
    Sell,
    View,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Snapshot(LedgerSnapshot),
    Bought(BuyReceipt),
    Sold(SellReceipt),
    Viewed(StockView),
    Failed { action: Action, error: LedgerError },
    InvalidInput(String),
    Cancelled,
    Goodbye,
}

enum SymbolInput {
    Empty,
    Invalid(String),
    Valid(Symbol),
}

fn parse_symbol(input: &str) -> SymbolInput {
    if input.trim().is_empty() {
        return SymbolInput::Empty;
    }
    match Symbol::try_from(input) {
        Ok(symbol) => SymbolInput::Valid(symbol),
        Err(err) => SymbolInput::Invalid(err),
    }
}

fn parse_quantity(input: &str) -> Result<u32, LedgerError> {
    input
        .trim()
        .parse::<u32>()
        .map_err(|_| LedgerError::InvalidQuantity(input.trim().to_owned()))
}

/// Runs `command` against the ledger and returns what should be shown for it.
/// Rejections come back as [`Reply::Failed`], the ledger is never left half updated.
pub async fn dispatch<Q: QuoteSource>(
    ledger: &mut Ledger,
    quotes: &Q,
    command: Command,
) -> Reply {
    match command {
        Command::Balance => Reply::Snapshot(ledger.snapshot()),
        Command::Exit => Reply::Goodbye,
        Command::Buy { symbol, quantity } => {
            let symbol = match parse_symbol(&symbol) {
                SymbolInput::Valid(symbol) => symbol,
                SymbolInput::Empty => return Reply::Cancelled,
                SymbolInput::Invalid(err) => return Reply::InvalidInput(err),
            };
            let res = if ledger.lot(&symbol).is_some() {
                Err(LedgerError::DuplicatePosition(symbol))
            } else {
                match parse_quantity(&quantity) {
                    Ok(quantity) => ledger.buy(quotes, &symbol, quantity).await,
                    Err(err) => Err(err),
                }
            };
            match res {
                Ok(receipt) => Reply::Bought(receipt),
                Err(error) => Reply::Failed {
                    action: Action::Buy,
                    error,
                },
            }
        }
        Command::Sell { symbol } => match parse_symbol(&symbol) {
            SymbolInput::Valid(symbol) => match ledger.sell(quotes, &symbol).await {
                Ok(receipt) => Reply::Sold(receipt),
                Err(error) => Reply::Failed {
                    action: Action::Sell,
                    error,
                },
            },
            SymbolInput::Empty => Reply::Cancelled,
            SymbolInput::Invalid(err) => Reply::InvalidInput(err),
        },
        Command::View { symbol } => match parse_symbol(&symbol) {
            SymbolInput::Valid(symbol) => match ledger.view(quotes, &symbol).await {
                Ok(view) => Reply::Viewed(view),
                Err(error) => Reply::Failed {
                    action: Action::View,
                    error,
                },
            },
            SymbolInput::Empty => Reply::Cancelled,
            SymbolInput::Invalid(err) => Reply::InvalidInput(err),
        },
    }
}
