use anyhow::{Context, Result};
use reqwest::Client;

use crate::marketplace::QuoteSource;
use crate::quote::Quote;
use crate::symbol::Symbol;

mod quote_api;

pub const ENDPOINT: &str = "https://query1.finance.yahoo.com";

// the quote endpoint rejects requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) paper-trader";

#[derive(Debug, Clone)]
pub struct Yahoo {
    client: Client,
    endpoint: String,
}

impl Yahoo {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build http client")?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
        })
    }
}

impl QuoteSource for Yahoo {
    async fn get_quote(&self, symbol: &Symbol) -> Result<Quote> {
        self.get_market_quote(symbol).await
    }
}
