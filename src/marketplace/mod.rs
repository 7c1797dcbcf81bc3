use anyhow::Result;
use futures::future;

use crate::quote::Quote;
use crate::symbol::Symbol;

pub mod simulation;
pub mod yahoo;

pub trait QuoteSource {
    async fn get_quote(&self, symbol: &Symbol) -> Result<Quote>;
}

/// Fetches every symbol concurrently, keeping the input order.
pub async fn get_quotes<Q: QuoteSource>(
    quotes: &Q,
    symbols: &[Symbol],
) -> Vec<(Symbol, Result<Quote>)> {
    let results = future::join_all(symbols.iter().map(|symbol| quotes.get_quote(symbol))).await;
    symbols.iter().cloned().zip(results).collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::marketplace::simulation::SimulationQuotes;

    #[tokio::test]
    async fn test_get_quotes_keeps_order_and_failures() {
        let msft = Symbol::try_from("MSFT").unwrap();
        let nope = Symbol::try_from("NOPE").unwrap();
        let amzn = Symbol::try_from("AMZN").unwrap();
        let quotes = SimulationQuotes::new(vec![
            Quote::new(amzn.clone(), dec!(185.2)),
            Quote::new(msft.clone(), dec!(410.25)),
        ]);

        let rows = get_quotes(&quotes, &[msft.clone(), nope.clone(), amzn.clone()]).await;
        let symbols: Vec<&Symbol> = rows.iter().map(|(symbol, _)| symbol).collect();
        assert_eq!(symbols, vec![&msft, &nope, &amzn]);
        assert_eq!(rows[0].1.as_ref().unwrap().price, dec!(410.25));
        assert!(rows[1].1.is_err());
        assert!(rows[2].1.is_ok());
    }
}
