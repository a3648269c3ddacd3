use chrono::{DateTime, Utc};

/// One completed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub inquiry: String,
    pub answer: String,
    pub duration_ms: i64,
    pub completed_at: DateTime<Utc>,
}

impl Exchange {
    pub fn new(inquiry: String, answer: String, duration_ms: i64) -> Self {
        Self {
            inquiry,
            answer,
            duration_ms,
            completed_at: Utc::now(),
        }
    }
}

/// Append-only record of the turns completed in this process.
#[derive(Debug, Clone, Default)]
pub struct History {
    exchanges: Vec<Exchange>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, exchange: Exchange) {
        self.exchanges.push(exchange);
    }

    /// The last `n` exchanges, oldest first.
    pub fn recent(&self, n: usize) -> &[Exchange] {
        let start = self.exchanges.len().saturating_sub(n);
        &self.exchanges[start..]
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}
