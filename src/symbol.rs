use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Upper-cased ticker symbol as the quote provider knows it (`AAPL`, `BRK-B`, `^GSPC`).
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Symbol {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.is_empty() {
            return Err(String::from("No symbol provided"));
        }
        if let Some(c) = value
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')))
        {
            return Err(format!("Invalid character {:?} in symbol {}", c, value));
        }
        Ok(Self(value.to_ascii_uppercase()))
    }
}

impl TryFrom<&String> for Symbol {
    type Error = String;

    fn try_from(value: &String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        let symbol = Symbol::try_from("  aapl ");
        assert!(symbol.is_ok());
        assert_eq!(symbol.unwrap().as_str(), "AAPL");

        let symbol = Symbol::try_from("brk-b").unwrap();
        assert_eq!(symbol.to_string(), String::from("BRK-B"));

        assert!(Symbol::try_from("^gspc").is_ok());
        assert!(Symbol::try_from("EURUSD=X").is_ok());
    }

    #[test]
    fn test_rejects_empty_and_garbage() {
        assert!(Symbol::try_from("").is_err());
        assert!(Symbol::try_from("   ").is_err());
        assert!(Symbol::try_from("AA PL").is_err());
        assert!(Symbol::try_from("MSFT;").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let symbol: Symbol = serde_json::from_str("\"nvda\"").unwrap();
        assert_eq!(symbol.as_str(), "NVDA");
        assert_eq!(serde_json::to_string(&symbol).unwrap(), "\"NVDA\"");
        assert!(serde_json::from_str::<Symbol>("\"\"").is_err());
    }
}
