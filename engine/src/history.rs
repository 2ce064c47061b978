//! Append-only trade history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bot::BotEvent;

/// Oldest entries are dropped beyond this cap.
pub const MAX_ENTRIES: usize = 1000;

/// One recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Monotonically increasing sequence number
    pub seq: u64,
    /// Wall-clock append time
    pub timestamp: DateTime<Utc>,
    /// Market symbol
    pub symbol: String,
    /// Event name, e.g. "Take Profit" or "DCA Buy #2"
    pub event: String,
    /// PnL percent at the time of the event
    pub pnl_percent: f64,
    /// Realized quote-currency PnL settled by the event
    #[serde(rename = "pnl_usd")]
    pub pnl_amount: f64,
    /// Market price at the time of the event
    pub price: f64,
}

/// Append-only event log. Ordering is append order; entries are never
/// mutated or removed except for the oldest beyond [`MAX_ENTRIES`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<HistoryEntry>,
    next_seq: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, symbol: &str, event: &BotEvent) {
        let entry = HistoryEntry {
            seq: self.next_seq,
            timestamp: Utc::now(),
            symbol: symbol.to_string(),
            event: event.label(),
            pnl_percent: event.pnl_percent(),
            pnl_amount: event.pnl_amount(),
            price: event.price(),
        };
        self.next_seq += 1;
        self.entries.push(entry);
        if self.entries.len() > MAX_ENTRIES {
            let excess = self.entries.len() - MAX_ENTRIES;
            self.entries.drain(..excess);
        }
    }

    /// Up to `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    /// All retained entries in append order.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(price: f64) -> BotEvent {
        BotEvent::BotStarted { price }
    }

    #[test]
    fn test_seq_is_monotonic_and_survives_capping() {
        let mut log = EventLog::new();
        for _ in 0..MAX_ENTRIES + 10 {
            log.append("BTC-USDT", &started(100.0));
        }
        assert_eq!(log.len(), MAX_ENTRIES);
        let entries = log.entries();
        assert_eq!(entries.first().unwrap().seq, 10);
        assert_eq!(entries.last().unwrap().seq, (MAX_ENTRIES + 9) as u64);
        for pair in entries.windows(2) {
            assert_eq!(pair[1].seq, pair[0].seq + 1);
        }
    }

    #[test]
    fn test_recent_is_newest_first() {
        let mut log = EventLog::new();
        log.append("BTC-USDT", &started(100.0));
        log.append(
            "BTC-USDT",
            &BotEvent::TakeProfitHit {
                price: 101.5,
                pnl_percent: 1.5,
                pnl_amount: 0.3,
            },
        );
        let recent = log.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event, "Take Profit");
        assert_eq!(recent[1].event, "Bot Started");
        assert!((recent[0].pnl_amount - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_safety_order_label_includes_index() {
        let mut log = EventLog::new();
        log.append(
            "ETH-USDT",
            &BotEvent::SafetyOrderFilled {
                order_index: 3,
                price: 95.0,
                quantity: 0.4,
                pnl_percent: -4.2,
            },
        );
        assert_eq!(log.entries()[0].event, "DCA Buy #3");
    }
}
