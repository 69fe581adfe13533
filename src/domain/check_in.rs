use super::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Check-in and settlement state of one slot.
///
/// `total_paid` only ever grows; voids and refunds do not reduce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInRecord {
    pub slot_id: String,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_in_by: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
    pub settled_via_payment_method_id: Option<String>,
    pub settled_by: Option<String>,
    pub total_paid: Money,
    pub notes: Option<String>,
}

impl CheckInRecord {
    pub fn new(slot_id: &str) -> Self {
        Self {
            slot_id: slot_id.to_string(),
            checked_in_at: None,
            checked_in_by: None,
            settled_at: None,
            settled_via_payment_method_id: None,
            settled_by: None,
            total_paid: Money::ZERO,
            notes: None,
        }
    }

    pub fn record_check_in(&mut self, actor: &str, at: DateTime<Utc>, notes: Option<String>) {
        self.checked_in_at = Some(at);
        self.checked_in_by = Some(actor.to_string());
        if notes.is_some() {
            self.notes = notes;
        }
    }

    pub fn record_payment(&mut self, amount: Money) {
        self.total_paid += amount;
    }

    /// Marks the slot as having nothing left to pay.
    pub fn record_settlement(&mut self, payment_method_id: &str, actor: &str, at: DateTime<Utc>) {
        self.settled_at = Some(at);
        self.settled_via_payment_method_id = Some(payment_method_id.to_string());
        self.settled_by = Some(actor.to_string());
    }

    pub fn clear_check_in(&mut self) {
        self.checked_in_at = None;
        self.checked_in_by = None;
    }
}
