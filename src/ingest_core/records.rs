//! Raw event rows as exported from the chain indexer
//!
//! Field names follow the upstream column names (`FROM_ADDRESS`, `TX_TO`, ...),
//! so exported rows deserialize without renaming. Extra columns are ignored.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A row that can be read from a JSONL event file
pub trait EventRecord: DeserializeOwned + Send + 'static {
    /// Stream name used in logs
    const SOURCE: &'static str;

    fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Native value transfer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "FROM_ADDRESS", default)]
    pub from_address: Option<String>,
    #[serde(rename = "TO_ADDRESS", default)]
    pub to_address: Option<String>,
    #[serde(rename = "NETWORK", default)]
    pub network: Option<String>,
}

/// DEX swap. The interaction edge is originator → called contract (`TX_TO`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DexSwap {
    #[serde(rename = "ORIGIN_FROM_ADDRESS", default)]
    pub origin_from_address: Option<String>,
    #[serde(rename = "ORIGIN_TO_ADDRESS", default)]
    pub origin_to_address: Option<String>,
    #[serde(rename = "TX_TO", default)]
    pub tx_to: Option<String>,
    #[serde(rename = "SENDER", default)]
    pub sender: Option<String>,
    #[serde(rename = "NETWORK", default)]
    pub network: Option<String>,
}

/// ERC-20 style token transfer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenTransfer {
    #[serde(rename = "FROM_ADDRESS", default)]
    pub from_address: Option<String>,
    #[serde(rename = "TO_ADDRESS", default)]
    pub to_address: Option<String>,
    #[serde(rename = "ORIGIN_FROM_ADDRESS", default)]
    pub origin_from_address: Option<String>,
    #[serde(rename = "ORIGIN_TO_ADDRESS", default)]
    pub origin_to_address: Option<String>,
    #[serde(rename = "NETWORK", default)]
    pub network: Option<String>,
}

impl EventRecord for Transaction {
    const SOURCE: &'static str = "transactions";
}

impl EventRecord for DexSwap {
    const SOURCE: &'static str = "dex_swaps";
}

impl EventRecord for TokenTransfer {
    const SOURCE: &'static str = "token_transfers";
}

/// All three event tables, loaded from one source
#[derive(Debug, Clone, Default)]
pub struct EventTables {
    pub transactions: Vec<Transaction>,
    pub dex_swaps: Vec<DexSwap>,
    pub token_transfers: Vec<TokenTransfer>,
}

impl EventTables {
    pub fn total_rows(&self) -> usize {
        self.transactions.len() + self.dex_swaps.len() + self.token_transfers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transaction_jsonl() {
        let line = r#"{"TX_HASH":"0xabc","FROM_ADDRESS":"0x1111","TO_ADDRESS":"0x2222","VALUE":1.5,"NETWORK":"ethereum"}"#;
        let tx = Transaction::from_jsonl(line).unwrap();
        assert_eq!(tx.from_address.as_deref(), Some("0x1111"));
        assert_eq!(tx.to_address.as_deref(), Some("0x2222"));
        assert_eq!(tx.network.as_deref(), Some("ethereum"));
    }

    #[test]
    fn test_parse_dex_swap_with_nulls() {
        let line = r#"{"ORIGIN_FROM_ADDRESS":"0xaaaa","ORIGIN_TO_ADDRESS":"0xbbbb","TX_TO":null,"SENDER":"0xcccc"}"#;
        let swap = DexSwap::from_jsonl(line).unwrap();
        assert_eq!(swap.origin_from_address.as_deref(), Some("0xaaaa"));
        assert!(swap.tx_to.is_none());
        assert!(swap.network.is_none());
    }

    #[test]
    fn test_missing_columns_default_to_none() {
        let transfer = TokenTransfer::from_jsonl("{}").unwrap();
        assert_eq!(transfer, TokenTransfer::default());
    }

    #[test]
    fn test_malformed_jsonl() {
        assert!(Transaction::from_jsonl(r#"{"FROM_ADDRESS": "#).is_err());
    }
}
