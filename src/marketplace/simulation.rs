use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::marketplace::QuoteSource;
use crate::quote::Quote;
use crate::symbol::Symbol;

/// Quote table held in memory. Clones share the same table, so a test can keep a
/// handle and move prices while a ledger trades against it.
#[derive(Debug, Clone, Default)]
pub struct SimulationQuotes {
    quotes: Arc<RwLock<HashMap<Symbol, Quote>>>,
}

impl SimulationQuotes {
    pub fn new(quotes: Vec<Quote>) -> Self {
        Self {
            quotes: Arc::new(RwLock::new(
                quotes
                    .into_iter()
                    .map(|quote| (quote.symbol.clone(), quote))
                    .collect(),
            )),
        }
    }

    /// Loads a JSON array of quotes.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read quotes file {}", path.display()))?;
        let quotes: Vec<Quote> = serde_json::de::from_str(&content)
            .with_context(|| format!("Failed to parse quotes file {}", path.display()))?;
        info!("Loaded {} simulated quotes", quotes.len());
        Ok(Self::new(quotes))
    }

    pub async fn set_quote(&self, quote: Quote) {
        let mut quotes = self.quotes.write().await;
        quotes.insert(quote.symbol.clone(), quote);
    }

    /// Answers requests for `alias` with the quote of `target`, the way a provider
    /// resolves share classes or renamed tickers.
    pub async fn set_alias(&self, alias: Symbol, target: &Symbol) -> Result<()> {
        let mut quotes = self.quotes.write().await;
        let quote = quotes
            .get(target)
            .cloned()
            .ok_or_else(|| anyhow!("No quote for {}", target))?;
        quotes.insert(alias, quote);
        Ok(())
    }

    pub async fn remove_quote(&self, symbol: &Symbol) -> Option<Quote> {
        let mut quotes = self.quotes.write().await;
        quotes.remove(symbol)
    }
}

impl QuoteSource for SimulationQuotes {
    async fn get_quote(&self, symbol: &Symbol) -> Result<Quote> {
        let quotes = self.quotes.read().await;
        quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| anyhow!("No quote for {}", symbol))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[tokio::test]
    async fn test_set_and_remove_quote() {
        let aapl = Symbol::try_from("AAPL").unwrap();
        let quotes = SimulationQuotes::default();
        assert!(quotes.get_quote(&aapl).await.is_err());

        let handle = quotes.clone();
        handle.set_quote(Quote::new(aapl.clone(), dec!(200))).await;
        assert_eq!(quotes.get_quote(&aapl).await.unwrap().price, dec!(200));

        assert!(handle.remove_quote(&aapl).await.is_some());
        assert!(quotes.get_quote(&aapl).await.is_err());
    }

    #[tokio::test]
    async fn test_from_file() {
        let path = std::env::temp_dir().join(format!("paper-trader-quotes-{}.json", std::process::id()));
        tokio::fs::write(
            &path,
            r#"[
                {"symbol": "msft", "display_name": "Microsoft", "price": "410.25", "pe_ratio": "35.1"},
                {"symbol": "NVDA", "display_name": "NVIDIA", "price": 120.5, "currency": "USD"}
            ]"#,
        )
        .await
        .unwrap();

        let quotes = SimulationQuotes::from_file(&path).await;
        let _ = tokio::fs::remove_file(&path).await;
        let quotes = quotes.unwrap();

        let msft = quotes
            .get_quote(&Symbol::try_from("MSFT").unwrap())
            .await
            .unwrap();
        assert_eq!(msft.display_name, "Microsoft");
        assert_eq!(msft.price, dec!(410.25));
        assert_eq!(msft.currency, "USD");
        assert_eq!(msft.pe_ratio, Some(dec!(35.1)));

        let nvda = quotes
            .get_quote(&Symbol::try_from("NVDA").unwrap())
            .await
            .unwrap();
        assert_eq!(nvda.price, dec!(120.5));
    }
}
