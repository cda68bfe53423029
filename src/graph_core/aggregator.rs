//! Event aggregation: three event tables → directed, weighted pair counts

use crate::ingest_core::{DexSwap, EventTables, TokenTransfer, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "tx")]
    Tx,
    #[serde(rename = "dex-swap")]
    DexSwap,
    #[serde(rename = "token-transfer")]
    TokenTransfer,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Tx => "tx",
            EventKind::DexSwap => "dex-swap",
            EventKind::TokenTransfer => "token-transfer",
        }
    }
}

/// One address-to-address interaction
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub from: Option<String>,
    pub to: Option<String>,
    pub kind: EventKind,
    pub network: Option<String>,
}

impl From<&Transaction> for Event {
    fn from(tx: &Transaction) -> Self {
        Event {
            from: tx.from_address.clone(),
            to: tx.to_address.clone(),
            kind: EventKind::Tx,
            network: tx.network.clone(),
        }
    }
}

impl From<&DexSwap> for Event {
    fn from(swap: &DexSwap) -> Self {
        Event {
            from: swap.origin_from_address.clone(),
            to: swap.tx_to.clone(),
            kind: EventKind::DexSwap,
            network: swap.network.clone(),
        }
    }
}

impl From<&TokenTransfer> for Event {
    fn from(transfer: &TokenTransfer) -> Self {
        Event {
            from: transfer.from_address.clone(),
            to: transfer.to_address.clone(),
            kind: EventKind::TokenTransfer,
            network: transfer.network.clone(),
        }
    }
}

/// Directed pair with its interaction count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedEdge {
    pub from: String,
    pub to: String,
    pub events: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub tx_events: u64,
    pub dex_swap_events: u64,
    pub token_transfer_events: u64,
    pub dropped_null: u64,
    pub dropped_network: u64,
    pub directed_pairs: u64,
}

impl AggregationStats {
    pub fn accepted(&self) -> u64 {
        self.tx_events + self.dex_swap_events + self.token_transfer_events
    }
}

pub struct EventAggregator {
    // BTreeMap keeps the edge list sorted by (from, to)
    pairs: BTreeMap<(String, String), u64>,
    networks: Option<HashSet<String>>,
    stats: AggregationStats,
}

/// Blank or missing counts as null. Addresses are kept byte-exact otherwise.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl EventAggregator {
    /// `networks` empty = accept every network, including untagged rows
    pub fn new(networks: &[String]) -> Self {
        let networks = if networks.is_empty() {
            None
        } else {
            Some(networks.iter().map(|n| n.to_lowercase()).collect())
        };

        Self {
            pairs: BTreeMap::new(),
            networks,
            stats: AggregationStats::default(),
        }
    }

    pub fn add_event(&mut self, event: &Event) {
        if let Some(ref allowed) = self.networks {
            let accepted = event
                .network
                .as_deref()
                .map(|n| allowed.contains(&n.to_lowercase()))
                .unwrap_or(false);
            if !accepted {
                self.stats.dropped_network += 1;
                return;
            }
        }

        let (from, to) = match (non_empty(&event.from), non_empty(&event.to)) {
            (Some(from), Some(to)) => (from, to),
            _ => {
                self.stats.dropped_null += 1;
                return;
            }
        };

        match event.kind {
            EventKind::Tx => self.stats.tx_events += 1,
            EventKind::DexSwap => self.stats.dex_swap_events += 1,
            EventKind::TokenTransfer => self.stats.token_transfer_events += 1,
        }

        *self
            .pairs
            .entry((from.to_string(), to.to_string()))
            .or_insert(0) += 1;
        self.stats.directed_pairs = self.pairs.len() as u64;
    }

    pub fn add_transactions(&mut self, rows: &[Transaction]) {
        for row in rows {
            self.add_event(&Event::from(row));
        }
    }

    pub fn add_dex_swaps(&mut self, rows: &[DexSwap]) {
        for row in rows {
            self.add_event(&Event::from(row));
        }
    }

    pub fn add_token_transfers(&mut self, rows: &[TokenTransfer]) {
        for row in rows {
            self.add_event(&Event::from(row));
        }
    }

    pub fn add_tables(&mut self, tables: &EventTables) {
        self.add_transactions(&tables.transactions);
        self.add_dex_swaps(&tables.dex_swaps);
        self.add_token_transfers(&tables.token_transfers);
    }

    pub fn stats(&self) -> &AggregationStats {
        &self.stats
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Directed pair counts, sorted by (from, to)
    pub fn into_edges(self) -> Vec<WeightedEdge> {
        self.pairs
            .into_iter()
            .map(|((from, to), events)| WeightedEdge { from, to, events })
            .collect()
    }
}
