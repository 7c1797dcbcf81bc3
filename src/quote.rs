use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::symbol::Symbol;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Quote {
    pub symbol: Symbol,
    pub display_name: String,
    pub price: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub pe_ratio: Option<Decimal>,
    #[serde(default)]
    pub change: Option<Decimal>,
    #[serde(default)]
    pub change_percent: Option<Decimal>,
}

fn default_currency() -> String {
    String::from("USD")
}

impl Quote {
    /// Minimal quote, mostly for simulated markets.
    pub fn new(symbol: Symbol, price: Decimal) -> Self {
        Self {
            display_name: symbol.to_string(),
            symbol,
            price,
            currency: default_currency(),
            pe_ratio: None,
            change: None,
            change_percent: None,
        }
    }

    pub fn with_pe_ratio(mut self, pe_ratio: Decimal) -> Self {
        self.pe_ratio = Some(pe_ratio);
        self
    }
}
