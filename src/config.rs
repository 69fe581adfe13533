use crate::domain::money::DEFAULT_TOLERANCE;
use chrono::Duration;
use rust_decimal::Decimal;

/// Tunables shared by the ledger services.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// How long after payment a transaction may still be voided.
    pub void_window: Duration,
    /// Allowed difference between a tendered and an expected amount.
    pub amount_tolerance: Decimal,
    pub transaction_prefix: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            void_window: Duration::hours(2),
            amount_tolerance: DEFAULT_TOLERANCE,
            transaction_prefix: "TXN".to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn with_void_window_minutes(mut self, minutes: i64) -> Self {
        self.void_window = Duration::minutes(minutes);
        self
    }
}
