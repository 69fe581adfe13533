use super::context::LedgerContext;
use crate::domain::batch::{Guard, Write, WriteBatch};
use crate::domain::line_item::LineItem;
use crate::domain::money::Money;
use crate::domain::payment::{
    LineItemPayment, PaymentTransaction, TransactionStatus, format_transaction_number,
};
use crate::error::{LedgerError, Result};
use chrono::Datelike;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub club_id: String,
    pub line_item_ids: Vec<String>,
    pub amount: Money,
    pub payment_method_id: String,
    pub paid_by: String,
    pub reference: Option<String>,
    /// Retrying with the same key returns the original transaction instead of charging twice.
    pub idempotency_key: Option<String>,
}

/// Receipt-level view of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionSummary {
    pub id: String,
    pub transaction_number: String,
    pub status: TransactionStatus,
    pub amount: Money,
    pub refunded: Money,
    pub payment_method_id: String,
    pub line_item_count: usize,
}

impl From<&PaymentTransaction> for TransactionSummary {
    fn from(tx: &PaymentTransaction) -> Self {
        Self {
            id: tx.id.clone(),
            transaction_number: tx.transaction_number.clone(),
            status: tx.status,
            amount: tx.amount,
            refunded: tx.refunded_so_far(),
            payment_method_id: tx.payment_method_id.clone(),
            line_item_count: tx.line_item_payments.len(),
        }
    }
}

/// A validated payment whose batch has not been committed yet.
pub(crate) struct PreparedPayment {
    pub batch: WriteBatch,
    pub transaction: PaymentTransaction,
}

/// Atomic payment, void and refund against groups of line items.
#[derive(Clone)]
pub struct PaymentProcessor {
    ctx: LedgerContext,
}

impl PaymentProcessor {
    /// Creates a new processor over the shared ledger context.
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Pays for exactly the given line items: all of them are marked paid together with one
    /// new transaction, or nothing changes.
    pub async fn process_payment(&self, request: PaymentRequest) -> Result<PaymentTransaction> {
        if let Some(existing) = self.replay(&request).await? {
            info!(
                transaction_number = %existing.transaction_number,
                "Idempotent payment replayed"
            );
            return Ok(existing);
        }

        let committed = match self.prepare_payment(&request).await {
            Ok(prepared) => self
                .ctx
                .store
                .commit(prepared.batch)
                .await
                .map(|_| prepared.transaction),
            Err(e) => Err(e),
        };
        let tx = match committed {
            Ok(tx) => tx,
            Err(e) => {
                // A concurrent call carrying the same key may have committed first.
                if let Some(existing) = self.replay(&request).await? {
                    return Ok(existing);
                }
                warn!(club_id = %request.club_id, error = %e, "Payment rejected");
                return Err(e);
            }
        };

        info!(
            transaction_number = %tx.transaction_number,
            amount = %tx.amount,
            items = tx.line_item_payments.len(),
            paid_by = %tx.paid_by,
            "Payment processed"
        );
        Ok(tx)
    }

    async fn replay(&self, request: &PaymentRequest) -> Result<Option<PaymentTransaction>> {
        match &request.idempotency_key {
            Some(key) => {
                self.ctx
                    .store
                    .transaction_by_idempotency_key(&request.club_id, key)
                    .await
            }
            None => Ok(None),
        }
    }

    pub(crate) async fn prepare_payment(&self, request: &PaymentRequest) -> Result<PreparedPayment> {
        let method = self
            .ctx
            .store
            .payment_method(&request.payment_method_id)
            .await?
            .filter(|m| m.club_id == request.club_id)
            .ok_or_else(|| {
                LedgerError::not_found("payment method", request.payment_method_id.as_str())
            })?;
        if !method.is_enabled {
            return Err(LedgerError::ValidationError(format!(
                "Payment method {} is disabled",
                method.name
            )));
        }
        let reference = request
            .reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty());
        if method.requires_ref && reference.is_none() {
            return Err(LedgerError::ValidationError(format!(
                "Payment method {} requires a reference",
                method.name
            )));
        }

        let items = self.resolve_unpaid(request).await?;
        let expected: Money = items.iter().map(LineItem::line_total).sum();
        if request.amount.value().is_sign_negative()
            || !request
                .amount
                .approx_eq(expected, self.ctx.config.amount_tolerance)
        {
            return Err(LedgerError::ValidationError(format!(
                "Payment amount {} does not match line item total {}",
                request.amount, expected
            )));
        }

        let now = self.ctx.clock.now();
        let sequence = self
            .ctx
            .store
            .allocate_transaction_sequence(&request.club_id, now.year())
            .await?;
        let transaction = PaymentTransaction {
            id: Uuid::new_v4().to_string(),
            club_id: request.club_id.clone(),
            transaction_number: format_transaction_number(
                &self.ctx.config.transaction_prefix,
                now.year(),
                sequence,
            ),
            amount: expected,
            payment_method_id: method.id.clone(),
            status: TransactionStatus::Completed,
            paid_at: now,
            paid_by: request.paid_by.clone(),
            reference: reference.map(str::to_string),
            idempotency_key: request.idempotency_key.clone(),
            voided_at: None,
            voided_by: None,
            void_reason: None,
            refunded_at: None,
            refunded_by: None,
            refund_amount: None,
            refund_reason: None,
            line_item_payments: items
                .iter()
                .map(|i| LineItemPayment {
                    line_item_id: i.id.clone(),
                    amount: i.line_total(),
                })
                .collect(),
        };

        let mut batch = WriteBatch::new();
        batch.guard(Guard::TransactionNumberFree {
            club_id: transaction.club_id.clone(),
            number: transaction.transaction_number.clone(),
        });
        if let Some(key) = &transaction.idempotency_key {
            batch.guard(Guard::IdempotencyKeyFree {
                club_id: transaction.club_id.clone(),
                key: key.clone(),
            });
        }
        batch.write(Write::PutTransaction(transaction.clone()));
        for item in &items {
            let mut paid = item.clone();
            paid.mark_paid(&method.id, now)?;
            batch.swap_line_item(item, paid);
        }

        Ok(PreparedPayment { batch, transaction })
    }

    /// Resolves every requested item. Any missing or already-paid item rejects the call.
    async fn resolve_unpaid(&self, request: &PaymentRequest) -> Result<Vec<LineItem>> {
        if request.line_item_ids.is_empty() {
            return Err(LedgerError::ValidationError(
                "At least one line item is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        let mut clubs: HashMap<String, String> = HashMap::new();
        let mut items = Vec::with_capacity(request.line_item_ids.len());
        for item_id in &request.line_item_ids {
            if !seen.insert(item_id.as_str()) {
                return Err(LedgerError::ValidationError(format!(
                    "Line item {} listed twice",
                    item_id
                )));
            }
            let item = self.ctx.require_line_item(item_id).await?;
            if item.is_paid {
                return Err(LedgerError::Conflict(format!(
                    "Line item {} is already paid",
                    item_id
                )));
            }
            if !clubs.contains_key(&item.tee_time_id) {
                let tee_time = self.ctx.require_tee_time(&item.tee_time_id).await?;
                clubs.insert(tee_time.id, tee_time.club_id);
            }
            if clubs.get(&item.tee_time_id) != Some(&request.club_id) {
                return Err(LedgerError::ValidationError(format!(
                    "Line item {} does not belong to club {}",
                    item_id, request.club_id
                )));
            }
            items.push(item);
        }
        Ok(items)
    }

    /// Voids a completed transaction inside the void window and reopens its line items.
    pub async fn void_transaction(
        &self,
        transaction_id: &str,
        reason: &str,
        actor: &str,
    ) -> Result<PaymentTransaction> {
        let tx = self.require_transaction(transaction_id).await?;
        let mut voided = tx.clone();
        voided.void(
            reason,
            actor,
            self.ctx.clock.now(),
            self.ctx.config.void_window,
        )?;

        let mut batch = WriteBatch::new();
        batch.swap_transaction(&tx, voided.clone());
        for item_id in tx.line_item_ids() {
            let item = self.ctx.store.line_item(item_id).await?.ok_or_else(|| {
                LedgerError::IntegrityFault(format!(
                    "Line item {} paid by {} no longer exists",
                    item_id, tx.transaction_number
                ))
            })?;
            if !item.is_paid {
                return Err(LedgerError::IntegrityFault(format!(
                    "Line item {} paid by {} is not marked paid",
                    item_id, tx.transaction_number
                )));
            }
            let mut reopened = item.clone();
            reopened.reopen();
            batch.swap_line_item(&item, reopened);
        }
        self.ctx.store.commit(batch).await?;

        info!(
            transaction_number = %voided.transaction_number,
            reason = %reason,
            actor = %actor,
            "Transaction voided"
        );
        Ok(voided)
    }

    /// Records a refund. Line items stay paid whatever the amount.
    pub async fn refund_transaction(
        &self,
        transaction_id: &str,
        amount: Money,
        reason: &str,
        actor: &str,
    ) -> Result<PaymentTransaction> {
        let tx = self.require_transaction(transaction_id).await?;
        let mut refunded = tx.clone();
        refunded.refund(
            amount,
            reason,
            actor,
            self.ctx.clock.now(),
            self.ctx.config.amount_tolerance,
        )?;

        let mut batch = WriteBatch::new();
        batch.swap_transaction(&tx, refunded.clone());
        self.ctx.store.commit(batch).await?;

        info!(
            transaction_number = %refunded.transaction_number,
            amount = %amount,
            status = ?refunded.status,
            actor = %actor,
            "Transaction refunded"
        );
        Ok(refunded)
    }

    /// Looks a transaction up by its club-scoped number.
    pub async fn transaction_by_number(
        &self,
        club_id: &str,
        number: &str,
    ) -> Result<PaymentTransaction> {
        self.ctx
            .store
            .transaction_by_number(club_id, number)
            .await?
            .ok_or_else(|| LedgerError::not_found("transaction", number))
    }

    /// Looks a transaction up by id, failing with `NotFound` when absent.
    pub async fn require_transaction(&self, transaction_id: &str) -> Result<PaymentTransaction> {
        self.ctx
            .store
            .transaction(transaction_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))
    }
}
