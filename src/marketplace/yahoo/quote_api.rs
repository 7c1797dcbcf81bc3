use anyhow::{anyhow, bail, Context, Result};
use reqwest::Url;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::marketplace::yahoo::Yahoo;
use crate::quote::Quote;
use crate::symbol::Symbol;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteResponse,
}

#[derive(Deserialize, Debug)]
struct QuoteResponse {
    #[serde(default)]
    result: Vec<QuoteResult>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
    pub symbol: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub currency: Option<String>,
    pub regular_market_price: Option<f64>,
    pub regular_market_change: Option<f64>,
    pub regular_market_change_percent: Option<f64>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<f64>,
}

fn to_decimal(value: Option<f64>, dp: u32) -> Option<Decimal> {
    value
        .and_then(Decimal::from_f64)
        .map(|d| d.round_dp(dp).normalize())
}

impl TryFrom<QuoteResult> for Quote {
    type Error = anyhow::Error;

    fn try_from(value: QuoteResult) -> Result<Self, Self::Error> {
        let symbol = Symbol::try_from(&value.symbol).map_err(|e| anyhow!(e))?;
        let price = to_decimal(value.regular_market_price, 4)
            .filter(|price| *price > Decimal::ZERO)
            .ok_or_else(|| anyhow!("No price for {}", symbol))?;

        Ok(Quote {
            display_name: value
                .short_name
                .or(value.long_name)
                .unwrap_or_else(|| symbol.to_string()),
            symbol,
            price,
            currency: value.currency.unwrap_or_else(|| String::from("USD")),
            pe_ratio: to_decimal(value.trailing_pe, 2),
            change: to_decimal(value.regular_market_change, 4),
            change_percent: to_decimal(value.regular_market_change_percent, 4),
        })
    }
}

pub fn parse_quote(body: &str, symbol: &Symbol) -> Result<Quote> {
    let envelope: QuoteEnvelope =
        serde_json::de::from_str(body).context("Unexpected quote response format")?;
    let response = envelope.quote_response;

    if let Some(error) = response.error.filter(|error| !error.is_null()) {
        bail!("Quote provider error for {} : {}", symbol, error);
    }

    let mut results = response.result;
    if results.is_empty() {
        bail!("No quote found for {}", symbol);
    }
    let index = results
        .iter()
        .position(|r| r.symbol.eq_ignore_ascii_case(symbol.as_str()))
        .unwrap_or(0);

    Quote::try_from(results.swap_remove(index))
}

impl Yahoo {
    pub async fn get_market_quote(&self, symbol: &Symbol) -> Result<Quote> {
        let params = [("symbols", symbol.as_str())];
        let url = Url::parse_with_params(
            format!("{}/v7/finance/quote", self.endpoint).as_str(),
            &params,
        )?;
        debug!("Getting quote {}", url);

        let res = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Quote request for {} failed", symbol))?;
        let status = res.status();
        let body = res.text().await?;

        debug!("Quote response {} : {}", status, body);

        if !status.is_success() {
            bail!("Quote provider answered {} for {}", status, symbol);
        }

        parse_quote(&body, symbol)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn symbol(s: &str) -> Symbol {
        Symbol::try_from(s).unwrap()
    }

    #[test]
    fn test_quote_from_json() {
        let body = json!({
            "quoteResponse": {
                "result": [{
                    "language": "en-US",
                    "quoteType": "EQUITY",
                    "symbol": "AAPL",
                    "shortName": "Apple Inc.",
                    "longName": "Apple Inc.",
                    "currency": "USD",
                    "regularMarketPrice": 227.52,
                    "regularMarketChange": -1.2300415,
                    "regularMarketChangePercent": -0.5377,
                    "trailingPE": 34.567891
                }],
                "error": null
            }
        })
        .to_string();

        let res = parse_quote(&body, &symbol("aapl"));
        assert!(res.is_ok());
        let quote = res.unwrap();
        assert_eq!(quote.symbol, symbol("AAPL"));
        assert_eq!(quote.display_name, "Apple Inc.");
        assert_eq!(quote.price, dec!(227.52));
        assert_eq!(quote.currency, "USD");
        assert_eq!(quote.pe_ratio, Some(dec!(34.57)));
        assert_eq!(quote.change, Some(dec!(-1.23)));
        assert_eq!(quote.change_percent, Some(dec!(-0.5377)));
    }

    #[test]
    fn test_quote_defaults() {
        let body = json!({
            "quoteResponse": {
                "result": [{ "symbol": "XYZ", "regularMarketPrice": 12 }],
                "error": null
            }
        })
        .to_string();

        let quote = parse_quote(&body, &symbol("XYZ")).unwrap();
        assert_eq!(quote.display_name, "XYZ");
        assert_eq!(quote.currency, "USD");
        assert_eq!(quote.price, dec!(12));
        assert_eq!(quote.pe_ratio, None);
        assert_eq!(quote.change, None);
    }

    #[test]
    fn test_quote_picks_requested_symbol() {
        let body = json!({
            "quoteResponse": {
                "result": [
                    { "symbol": "MSFT", "regularMarketPrice": 410.1 },
                    { "symbol": "NVDA", "regularMarketPrice": 120.5 }
                ]
            }
        })
        .to_string();

        let quote = parse_quote(&body, &symbol("nvda")).unwrap();
        assert_eq!(quote.symbol, symbol("NVDA"));
        assert_eq!(quote.price, dec!(120.5));
    }

    #[test]
    fn test_quote_without_price_is_an_error() {
        let body = json!({
            "quoteResponse": {
                "result": [{ "symbol": "DEAD", "shortName": "Delisted" }],
                "error": null
            }
        })
        .to_string();
        assert!(parse_quote(&body, &symbol("DEAD")).is_err());

        let body = json!({
            "quoteResponse": {
                "result": [{ "symbol": "ZERO", "regularMarketPrice": 0.0 }]
            }
        })
        .to_string();
        assert!(parse_quote(&body, &symbol("ZERO")).is_err());
    }

    #[test]
    fn test_empty_or_failed_response_is_an_error() {
        let body = json!({ "quoteResponse": { "result": [], "error": null } }).to_string();
        assert!(parse_quote(&body, &symbol("NOPE")).is_err());

        let body = json!({
            "quoteResponse": {
                "result": [],
                "error": { "code": "Unauthorized", "description": "Invalid Crumb" }
            }
        })
        .to_string();
        let err = parse_quote(&body, &symbol("AAPL")).unwrap_err();
        assert!(err.to_string().contains("Invalid Crumb"));

        assert!(parse_quote("<html>rate limited</html>", &symbol("AAPL")).is_err());
    }
}
