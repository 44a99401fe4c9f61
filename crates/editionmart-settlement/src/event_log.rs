//! Append-only notification log.
//!
//! Records are numbered from 0 without gaps. Observers tail the log with
//! [`EventLog::since`] from the last offset they processed; the JSON-lines
//! export is the same stream in serialized form.

use editionmart_escrow::TokenMove;
use editionmart_types::{Address, LogRecord, MarketEvent, Result};

/// `TransferSingle` notification for a ledger move performed by `operator`.
#[must_use]
pub fn transfer_event(operator: Address, mv: &TokenMove) -> MarketEvent {
    MarketEvent::TransferSingle {
        operator,
        from: mv.from,
        to: mv.to,
        id: mv.token_id,
        value: mv.value,
    }
}

#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<LogRecord>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event and return its sequence number.
    pub fn append(&mut self, event: MarketEvent) -> u64 {
        let sequence = self.records.len() as u64;
        self.records.push(LogRecord { sequence, event });
        sequence
    }

    /// Append events in order.
    pub fn append_all(&mut self, events: impl IntoIterator<Item = MarketEvent>) {
        for event in events {
            self.append(event);
        }
    }

    /// Records from `offset` onwards. An offset past the end yields nothing.
    #[must_use]
    pub fn since(&self, offset: u64) -> &[LogRecord] {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    #[must_use]
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One JSON object per line.
    pub fn to_json_lines(&self) -> Result<String> {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Parse a JSON-lines export. Blank lines are skipped.
    pub fn parse_json_lines(input: &str) -> Result<Vec<LogRecord>> {
        input
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }
}
