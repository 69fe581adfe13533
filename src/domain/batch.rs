//! Atomic write batches.
//!
//! Every mutation of the ledger is a [`WriteBatch`]: a list of guards checked against the
//! committed state and a list of writes applied only if every guard holds. Stores evaluate
//! guards and apply writes under one exclusive section, so a guard read at commit time can
//! never be invalidated before the writes land.

use super::check_in::CheckInRecord;
use super::line_item::LineItem;
use super::money::Money;
use super::payment::{PaymentMethod, PaymentTransaction, TransactionStatus};
use super::roster::{Slot, TeeTime};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    /// Compare-and-swap on the two lifecycle flags read at the start of an operation.
    LineItemState {
        id: String,
        is_paid: bool,
        is_transferred: bool,
    },
    /// Compare-and-swap on a transaction's status and accumulated refunds.
    TransactionState {
        id: String,
        status: TransactionStatus,
        refund_amount: Option<Money>,
    },
    /// The check-in record of a slot is unchanged since it was read. `None` means no
    /// record existed yet.
    CheckInRecordState {
        slot_id: String,
        record: Option<CheckInRecord>,
    },
    /// Compare-and-swap on a slot's check-in timestamp.
    SlotCheckIn {
        slot_id: String,
        checked_in_at: Option<DateTime<Utc>>,
    },
    /// The method still exists with the enabled flag it was read with.
    PaymentMethodState { id: String, is_enabled: bool },
    /// Some enabled method other than `excluding` must exist for the club.
    OtherEnabledPaymentMethod { club_id: String, excluding: String },
    TransactionNumberFree { club_id: String, number: String },
    IdempotencyKeyFree { club_id: String, key: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    PutLineItem(LineItem),
    DeleteLineItem(String),
    PutTransaction(PaymentTransaction),
    PutPaymentMethod(PaymentMethod),
    DeletePaymentMethod(String),
    PutTeeTime(TeeTime),
    PutSlot(Slot),
    PutCheckInRecord(CheckInRecord),
}

/// Synchronous read access to committed state, used while a commit holds its lock.
pub trait LedgerView {
    fn slot(&self, id: &str) -> Result<Option<Slot>>;
    fn line_item(&self, id: &str) -> Result<Option<LineItem>>;
    fn transaction(&self, id: &str) -> Result<Option<PaymentTransaction>>;
    fn transaction_by_number(
        &self,
        club_id: &str,
        number: &str,
    ) -> Result<Option<PaymentTransaction>>;
    fn transaction_by_idempotency_key(
        &self,
        club_id: &str,
        key: &str,
    ) -> Result<Option<PaymentTransaction>>;
    fn payment_method(&self, id: &str) -> Result<Option<PaymentMethod>>;
    fn payment_methods(&self, club_id: &str) -> Result<Vec<PaymentMethod>>;
    fn check_in_record(&self, slot_id: &str) -> Result<Option<CheckInRecord>>;
}

impl Guard {
    pub fn verify(&self, view: &impl LedgerView) -> Result<()> {
        match self {
            Guard::LineItemState {
                id,
                is_paid,
                is_transferred,
            } => {
                let current = view.line_item(id)?.ok_or_else(|| {
                    LedgerError::Conflict(format!("Line item {} no longer exists", id))
                })?;
                if current.is_paid != *is_paid || current.is_transferred != *is_transferred {
                    return Err(LedgerError::Conflict(format!(
                        "Line item {} was modified concurrently (paid={}, transferred={})",
                        id, current.is_paid, current.is_transferred
                    )));
                }
                Ok(())
            }
            Guard::TransactionState {
                id,
                status,
                refund_amount,
            } => {
                let current = view
                    .transaction(id)?
                    .ok_or_else(|| LedgerError::not_found("transaction", id.as_str()))?;
                if current.status != *status || current.refund_amount != *refund_amount {
                    return Err(LedgerError::Conflict(format!(
                        "Transaction {} was modified concurrently (now {:?})",
                        current.transaction_number, current.status
                    )));
                }
                Ok(())
            }
            Guard::CheckInRecordState { slot_id, record } => {
                if view.check_in_record(slot_id)? != *record {
                    return Err(LedgerError::Conflict(format!(
                        "Check-in record of player {} was modified concurrently",
                        slot_id
                    )));
                }
                Ok(())
            }
            Guard::SlotCheckIn {
                slot_id,
                checked_in_at,
            } => {
                let current = view
                    .slot(slot_id)?
                    .ok_or_else(|| LedgerError::not_found("player", slot_id.as_str()))?;
                if current.checked_in_at != *checked_in_at {
                    return Err(LedgerError::Conflict(format!(
                        "Check-in of player {} was changed concurrently",
                        slot_id
                    )));
                }
                Ok(())
            }
            Guard::PaymentMethodState { id, is_enabled } => {
                let current = view.payment_method(id)?.ok_or_else(|| {
                    LedgerError::Conflict(format!("Payment method {} no longer exists", id))
                })?;
                if current.is_enabled != *is_enabled {
                    return Err(LedgerError::Conflict(format!(
                        "Payment method {} was modified concurrently",
                        current.name
                    )));
                }
                Ok(())
            }
            Guard::OtherEnabledPaymentMethod { club_id, excluding } => {
                let methods = view.payment_methods(club_id)?;
                if methods.iter().any(|m| m.is_enabled && m.id != *excluding) {
                    Ok(())
                } else {
                    Err(LedgerError::Conflict(
                        "At least one payment method must remain enabled".to_string(),
                    ))
                }
            }
            Guard::TransactionNumberFree { club_id, number } => {
                if view.transaction_by_number(club_id, number)?.is_some() {
                    return Err(LedgerError::IntegrityFault(format!(
                        "Transaction number {} already issued",
                        number
                    )));
                }
                Ok(())
            }
            Guard::IdempotencyKeyFree { club_id, key } => {
                if view.transaction_by_idempotency_key(club_id, key)?.is_some() {
                    return Err(LedgerError::IntegrityFault(format!(
                        "Idempotency key {} already used",
                        key
                    )));
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub guards: Vec<Guard>,
    pub writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(&mut self, guard: Guard) -> &mut Self {
        self.guards.push(guard);
        self
    }

    pub fn write(&mut self, write: Write) -> &mut Self {
        self.writes.push(write);
        self
    }

    /// Requires `item` to still have the lifecycle flags it was read with.
    pub fn guard_line_item(&mut self, item: &LineItem) -> &mut Self {
        self.guard(Guard::LineItemState {
            id: item.id.clone(),
            is_paid: item.is_paid,
            is_transferred: item.is_transferred,
        })
    }

    /// Guards the pre-read state of `tx` and writes `updated` in its place.
    pub fn swap_transaction(
        &mut self,
        tx: &PaymentTransaction,
        updated: PaymentTransaction,
    ) -> &mut Self {
        self.guard(Guard::TransactionState {
            id: tx.id.clone(),
            status: tx.status,
            refund_amount: tx.refund_amount,
        })
        .write(Write::PutTransaction(updated))
    }

    /// Guards the pre-read state of `item` and writes `updated` in its place.
    pub fn swap_line_item(&mut self, item: &LineItem, updated: LineItem) -> &mut Self {
        self.guard_line_item(item)
            .write(Write::PutLineItem(updated))
    }

    /// Guards the check-in record as it was read (`None` if absent) and writes `updated`.
    pub fn swap_check_in_record(
        &mut self,
        read: Option<CheckInRecord>,
        updated: CheckInRecord,
    ) -> &mut Self {
        self.guard(Guard::CheckInRecordState {
            slot_id: updated.slot_id.clone(),
            record: read,
        })
        .write(Write::PutCheckInRecord(updated))
    }

    /// Guards the check-in timestamp of `slot` and writes `updated` in its place.
    pub fn swap_slot(&mut self, slot: &Slot, updated: Slot) -> &mut Self {
        self.guard(Guard::SlotCheckIn {
            slot_id: slot.id.clone(),
            checked_in_at: slot.checked_in_at,
        })
        .write(Write::PutSlot(updated))
    }

    /// Guards the enabled flag of `method` as it was read.
    pub fn guard_payment_method(&mut self, method: &PaymentMethod) -> &mut Self {
        self.guard(Guard::PaymentMethodState {
            id: method.id.clone(),
            is_enabled: method.is_enabled,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Checks every guard. The first failure rejects the whole batch.
    pub fn verify(&self, view: &impl LedgerView) -> Result<()> {
        self.guards.iter().try_for_each(|g| g.verify(view))
    }
}
