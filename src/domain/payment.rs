use super::money::Money;
use crate::error::LedgerError;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethodType {
    Cash,
    Card,
    MemberAccount,
    Voucher,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub club_id: String,
    pub name: String,
    pub r#type: PaymentMethodType,
    pub is_enabled: bool,
    /// A reference (card slip, voucher code) must accompany the payment.
    #[serde(default)]
    pub requires_ref: bool,
    #[serde(default)]
    pub opens_pos: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Completed,
    Voided,
    Refunded,
}

/// Amount charged for one line item at the moment of payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemPayment {
    pub line_item_id: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: String,
    pub club_id: String,
    pub transaction_number: String,
    pub amount: Money,
    pub payment_method_id: String,
    pub status: TransactionStatus,
    pub paid_at: DateTime<Utc>,
    pub paid_by: String,
    pub reference: Option<String>,
    pub idempotency_key: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
    pub voided_by: Option<String>,
    pub void_reason: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refunded_by: Option<String>,
    pub refund_amount: Option<Money>,
    pub refund_reason: Option<String>,
    pub line_item_payments: Vec<LineItemPayment>,
}

/// Formats a transaction number: `TXN-2026-00042`.
pub fn format_transaction_number(prefix: &str, year: i32, sequence: u32) -> String {
    format!("{}-{}-{:05}", prefix, year, sequence)
}

impl PaymentTransaction {
    pub fn line_item_ids(&self) -> impl Iterator<Item = &str> {
        self.line_item_payments
            .iter()
            .map(|p| p.line_item_id.as_str())
    }

    pub fn refunded_so_far(&self) -> Money {
        self.refund_amount.unwrap_or(Money::ZERO)
    }

    fn ensure_completed(&self) -> Result<(), LedgerError> {
        if self.status == TransactionStatus::Completed {
            Ok(())
        } else {
            Err(LedgerError::Conflict(format!(
                "Transaction {} is {:?}",
                self.transaction_number, self.status
            )))
        }
    }

    /// Voids the transaction if it is still inside the void window.
    ///
    /// The caller is responsible for reopening the referenced line items.
    pub fn void(
        &mut self,
        reason: &str,
        actor: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<(), LedgerError> {
        self.ensure_completed()?;
        if now - self.paid_at > window {
            return Err(LedgerError::Conflict(format!(
                "Transaction {} is older than the {} minute void window, refund it instead",
                self.transaction_number,
                window.num_minutes()
            )));
        }
        self.status = TransactionStatus::Voided;
        self.voided_at = Some(now);
        self.voided_by = Some(actor.to_string());
        self.void_reason = Some(reason.to_string());
        Ok(())
    }

    /// Records a refund. Partial refunds accumulate; once the accumulated amount reaches the
    /// transaction amount the transaction becomes `Refunded`.
    pub fn refund(
        &mut self,
        amount: Money,
        reason: &str,
        actor: &str,
        now: DateTime<Utc>,
        tolerance: Decimal,
    ) -> Result<(), LedgerError> {
        self.ensure_completed()?;
        let amount = Money::positive(amount.value())?;
        let refundable = self.amount - self.refunded_so_far();
        if amount > refundable {
            return Err(LedgerError::ValidationError(format!(
                "Refund of {} exceeds refundable amount {}",
                amount, refundable
            )));
        }
        let accumulated = self.refunded_so_far() + amount;
        if accumulated.approx_eq(self.amount, tolerance) {
            self.status = TransactionStatus::Refunded;
        }
        self.refund_amount = Some(accumulated);
        self.refund_reason = Some(reason.to_string());
        self.refunded_at = Some(now);
        self.refunded_by = Some(actor.to_string());
        Ok(())
    }
}
