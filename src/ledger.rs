use std::collections::BTreeMap;

use anyhow::bail;
use chrono::{DateTime, Utc};
use colored::Colorize;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::marketplace::QuoteSource;
use crate::quote::Quote;
use crate::symbol::Symbol;

/// Shares are bought in multiples of this.
pub const LOT_SIZE: u32 = 5;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Quantity must be a positive multiple of 5, got {0:?}")]
    InvalidQuantity(String),
    #[error("You already own a lot of {0}. Sell it before buying again.")]
    DuplicatePosition(Symbol),
    #[error("You don't own {0}")]
    NoPosition(Symbol),
    #[error("Insufficient cash. Need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },
    #[error("No usable quote for {symbol} : {reason}")]
    QuoteUnavailable { symbol: Symbol, reason: String },
}

/// A single open position.
#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub quantity: u32,
    pub buy_price: Decimal,
    pub pe_at_buy: Option<Decimal>,
    pub opened_at: DateTime<Utc>,
}

impl Lot {
    pub fn cost(&self) -> Decimal {
        self.buy_price * Decimal::from(self.quantity)
    }

    pub fn pnl_at(&self, price: Decimal) -> Decimal {
        (price - self.buy_price) * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuyReceipt {
    pub symbol: Symbol,
    pub quantity: u32,
    pub price: Decimal,
    pub cost: Decimal,
    pub cash: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SellReceipt {
    pub symbol: Symbol,
    pub lot: Lot,
    pub price: Decimal,
    pub proceeds: Decimal,
    pub pnl: Decimal,
    pub cash: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub lot: Lot,
    pub unrealized_pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockView {
    pub quote: Quote,
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    pub cash: Decimal,
    pub holdings: BTreeMap<Symbol, Lot>,
}

/// Cash balance plus at most one lot per symbol.
///
/// Every operation validates first and commits in one step at the end, so a
/// rejected buy or sell leaves the ledger untouched. Mutating operations take
/// `&mut self` across the quote fetch, which keeps them strictly serial.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    cash: Decimal,
    holdings: BTreeMap<Symbol, Lot>,
}

impl Ledger {
    pub fn new(starting_cash: Decimal) -> anyhow::Result<Self> {
        if starting_cash < Decimal::ZERO {
            bail!("Starting cash can't be negative: {}", starting_cash);
        }
        Ok(Self {
            cash: starting_cash,
            holdings: BTreeMap::new(),
        })
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn lot(&self, symbol: &Symbol) -> Option<&Lot> {
        self.holdings.get(symbol)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            cash: self.cash,
            holdings: self.holdings.clone(),
        }
    }

    async fn fetch_quote<Q: QuoteSource>(
        quotes: &Q,
        symbol: &Symbol,
    ) -> Result<Quote, LedgerError> {
        let quote = quotes
            .get_quote(symbol)
            .await
            .map_err(|err| LedgerError::QuoteUnavailable {
                symbol: symbol.clone(),
                reason: format!("{:#}", err),
            })?;
        if quote.price <= Decimal::ZERO {
            return Err(LedgerError::QuoteUnavailable {
                symbol: symbol.clone(),
                reason: format!("unusable price {}", quote.price),
            });
        }
        Ok(quote)
    }

    pub async fn buy<Q: QuoteSource>(
        &mut self,
        quotes: &Q,
        symbol: &Symbol,
        quantity: u32,
    ) -> Result<BuyReceipt, LedgerError> {
        if self.holdings.contains_key(symbol) {
            debug!("Rejected buy of {} : already held", symbol);
            return Err(LedgerError::DuplicatePosition(symbol.clone()));
        }
        if quantity == 0 || quantity % LOT_SIZE != 0 {
            debug!("Rejected buy of {} {}", quantity, symbol);
            return Err(LedgerError::InvalidQuantity(quantity.to_string()));
        }

        let quote = Self::fetch_quote(quotes, symbol).await?;

        // the provider may answer with a different canonical symbol
        if quote.symbol != *symbol && self.holdings.contains_key(&quote.symbol) {
            return Err(LedgerError::DuplicatePosition(quote.symbol));
        }

        let cost = quote
            .price
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| LedgerError::QuoteUnavailable {
                symbol: symbol.clone(),
                reason: format!("price {} out of range", quote.price),
            })?;
        if cost > self.cash {
            debug!(
                "Rejected buy of {} {} : cost {} over cash {}",
                quantity, symbol, cost, self.cash
            );
            return Err(LedgerError::InsufficientFunds {
                needed: cost,
                available: self.cash,
            });
        }

        self.cash -= cost;
        self.holdings.insert(
            quote.symbol.clone(),
            Lot {
                quantity,
                buy_price: quote.price,
                pe_at_buy: quote.pe_ratio,
                opened_at: Utc::now(),
            },
        );

        info!(
            " {} {} {} @ {} : cash {}",
            "BUY".green(),
            quantity,
            quote.symbol,
            quote.price,
            self.cash
        );

        Ok(BuyReceipt {
            symbol: quote.symbol,
            quantity,
            price: quote.price,
            cost,
            cash: self.cash,
        })
    }

    pub async fn sell<Q: QuoteSource>(
        &mut self,
        quotes: &Q,
        symbol: &Symbol,
    ) -> Result<SellReceipt, LedgerError> {
        if !self.holdings.contains_key(symbol) {
            debug!("Rejected sell of {} : not held", symbol);
            return Err(LedgerError::NoPosition(symbol.clone()));
        }

        let quote = Self::fetch_quote(quotes, symbol).await?;

        let Some(quantity) = self.holdings.get(symbol).map(|lot| lot.quantity) else {
            return Err(LedgerError::NoPosition(symbol.clone()));
        };
        let proceeds = quote.price.checked_mul(Decimal::from(quantity));
        let cash = proceeds.and_then(|proceeds| self.cash.checked_add(proceeds));
        let (Some(proceeds), Some(cash)) = (proceeds, cash) else {
            return Err(LedgerError::QuoteUnavailable {
                symbol: symbol.clone(),
                reason: format!("price {} out of range", quote.price),
            });
        };

        let Some(lot) = self.holdings.remove(symbol) else {
            return Err(LedgerError::NoPosition(symbol.clone()));
        };
        let pnl = lot.pnl_at(quote.price);
        self.cash = cash;

        info!(
            " {} {} {} @ {} : pnl {} cash {}",
            "SELL".red(),
            lot.quantity,
            symbol,
            quote.price,
            pnl,
            self.cash
        );

        Ok(SellReceipt {
            symbol: symbol.clone(),
            lot,
            price: quote.price,
            proceeds,
            pnl,
            cash: self.cash,
        })
    }

    pub async fn view<Q: QuoteSource>(
        &self,
        quotes: &Q,
        symbol: &Symbol,
    ) -> Result<StockView, LedgerError> {
        let quote = Self::fetch_quote(quotes, symbol).await?;
        let position = self.holdings.get(&quote.symbol).map(|lot| Position {
            lot: lot.clone(),
            unrealized_pnl: lot.pnl_at(quote.price),
        });
        Ok(StockView { quote, position })
    }
}
