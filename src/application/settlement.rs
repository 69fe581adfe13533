use super::carts::CartAggregator;
use super::context::{LedgerContext, RACE_ATTEMPTS};
use super::payments::{PaymentProcessor, PaymentRequest};
use crate::domain::check_in::CheckInRecord;
use crate::domain::money::Money;
use crate::domain::policy::{ClubPolicy, MemberStatus};
use crate::domain::roster::Slot;
use crate::error::{LedgerError, Result};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

/// Decides whether a player may check in.
///
/// A player is refused when the club blocks suspended members and the player's member
/// record is suspended, or when the club requires everything paid, validation was not
/// skipped and something is still owed. Skipping validation never bypasses suspension.
pub fn evaluate(
    policy: &ClubPolicy,
    member_status: Option<MemberStatus>,
    unpaid_total: Money,
    skip_validation: bool,
) -> Result<()> {
    if policy.block_suspended_members && member_status == Some(MemberStatus::Suspended) {
        return Err(LedgerError::PolicyViolation(
            "Member is suspended".to_string(),
        ));
    }
    if policy.require_all_items_paid && !skip_validation && unpaid_total.is_positive() {
        return Err(LedgerError::PolicyViolation(format!(
            "Outstanding balance of {} must be paid before check-in",
            unpaid_total
        )));
    }
    Ok(())
}

/// Gathers policy, membership and balance for a slot and applies [`evaluate`].
#[derive(Clone)]
pub struct SettlementGate {
    ctx: LedgerContext,
    carts: CartAggregator,
}

impl SettlementGate {
    /// Creates a new gate over the shared ledger context.
    pub fn new(ctx: LedgerContext) -> Self {
        Self {
            carts: CartAggregator::new(ctx.clone()),
            ctx,
        }
    }

    /// Refuses check-in with `PolicyViolation` when [`evaluate`] says so.
    pub async fn authorize(&self, slot: &Slot, club_id: &str, skip_validation: bool) -> Result<()> {
        let policy = self.ctx.policies.policy(club_id).await?;
        let member_status = match &slot.member_id {
            Some(member_id) => self.ctx.members.status(member_id).await?,
            None => None,
        };
        let (_, unpaid_total) = self.carts.unpaid_items(&slot.id).await?;
        evaluate(&policy, member_status, unpaid_total, skip_validation).inspect_err(|e| {
            warn!(player_id = %slot.id, reason = %e, "Check-in refused");
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettleRequest {
    pub slot_id: String,
    pub payment_method_id: String,
    pub actor: String,
    /// Pay only these items. `None` pays everything the player owes.
    pub line_item_ids: Option<Vec<String>>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementOutcome {
    pub slot_id: String,
    pub player_name: String,
    pub amount_paid: Money,
    pub remaining_balance: Money,
    pub transaction_number: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSettlementResult {
    pub slot_id: String,
    pub player_name: String,
    pub success: bool,
    pub amount_paid: Money,
    pub transaction_number: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightSettlement {
    pub tee_time_id: String,
    pub success: bool,
    pub total_paid: Money,
    pub results: Vec<PlayerSettlementResult>,
    /// Players that owed nothing and were left alone.
    pub already_settled: Vec<String>,
}

/// Pays off players' carts and records it on their check-in record.
#[derive(Clone)]
pub struct SettlementCoordinator {
    ctx: LedgerContext,
    carts: CartAggregator,
    payments: PaymentProcessor,
}

impl SettlementCoordinator {
    /// Creates a new coordinator over the shared ledger context.
    pub fn new(ctx: LedgerContext) -> Self {
        Self {
            carts: CartAggregator::new(ctx.clone()),
            payments: PaymentProcessor::new(ctx.clone()),
            ctx,
        }
    }

    /// Pays the requested (or all) unpaid items of one player. The payment and the
    /// check-in record update commit together.
    pub async fn settle_player(&self, request: SettleRequest) -> Result<SettlementOutcome> {
        let mut attempt = 1;
        loop {
            match self.try_settle_player(&request).await {
                Err(LedgerError::Conflict(reason)) if attempt < RACE_ATTEMPTS => {
                    warn!(
                        player_id = %request.slot_id,
                        attempt,
                        %reason,
                        "Settlement lost a race, retrying"
                    );
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    async fn try_settle_player(&self, request: &SettleRequest) -> Result<SettlementOutcome> {
        let slot = self.ctx.require_slot(&request.slot_id).await?;
        let tee_time = self.ctx.require_tee_time(&slot.tee_time_id).await?;
        let (unpaid, unpaid_total) = self.carts.unpaid_items(&slot.id).await?;

        if unpaid.is_empty() {
            return Ok(SettlementOutcome {
                slot_id: slot.id,
                player_name: slot.name,
                amount_paid: Money::ZERO,
                remaining_balance: Money::ZERO,
                transaction_number: None,
                message: "Already settled".to_string(),
            });
        }

        let targeted: Vec<String> = match &request.line_item_ids {
            Some(ids) => {
                let owed: HashSet<&str> = unpaid.iter().map(|i| i.id.as_str()).collect();
                if let Some(stray) = ids.iter().find(|id| !owed.contains(id.as_str())) {
                    return Err(LedgerError::ValidationError(format!(
                        "Line item {} is not an unpaid item of player {}",
                        stray, slot.id
                    )));
                }
                ids.clone()
            }
            None => unpaid.iter().map(|i| i.id.clone()).collect(),
        };
        let amount: Money = unpaid
            .iter()
            .filter(|i| targeted.contains(&i.id))
            .map(|i| i.line_total())
            .sum();
        let remaining = unpaid_total - amount;

        if remaining.is_positive() {
            let policy = self.ctx.policies.policy(&tee_time.club_id).await?;
            if !policy.allow_partial_payment {
                return Err(LedgerError::PolicyViolation(format!(
                    "Partial payment is not allowed, outstanding balance is {}",
                    unpaid_total
                )));
            }
        }

        let mut prepared = self
            .payments
            .prepare_payment(&PaymentRequest {
                club_id: tee_time.club_id.clone(),
                line_item_ids: targeted,
                amount,
                payment_method_id: request.payment_method_id.clone(),
                paid_by: request.actor.clone(),
                reference: request.reference.clone(),
                idempotency_key: None,
            })
            .await?;

        let read = self.ctx.store.check_in_record(&slot.id).await?;
        let mut record = read
            .clone()
            .unwrap_or_else(|| CheckInRecord::new(&slot.id));
        record.record_payment(prepared.transaction.amount);
        if !remaining.is_positive() {
            record.record_settlement(
                &request.payment_method_id,
                &request.actor,
                prepared.transaction.paid_at,
            );
        }
        prepared.batch.swap_check_in_record(read, record);
        self.ctx.store.commit(prepared.batch).await?;

        let tx = prepared.transaction;
        info!(
            player_id = %slot.id,
            transaction_number = %tx.transaction_number,
            amount = %tx.amount,
            remaining = %remaining,
            "Player settled"
        );
        Ok(SettlementOutcome {
            slot_id: slot.id,
            player_name: slot.name,
            amount_paid: tx.amount,
            remaining_balance: remaining,
            transaction_number: Some(tx.transaction_number),
            message: if remaining.is_positive() {
                format!("Partially settled, {} remaining", remaining)
            } else {
                "Settled".to_string()
            },
        })
    }

    /// Settles every player of the flight who still owes something, each independently.
    pub async fn settle_all_players(
        &self,
        tee_time_id: &str,
        payment_method_id: &str,
        actor: &str,
    ) -> Result<FlightSettlement> {
        self.ctx.require_tee_time(tee_time_id).await?;
        let slots = self.ctx.store.slots_for_tee_time(tee_time_id).await?;

        let mut results = Vec::new();
        let mut already_settled = Vec::new();
        for slot in slots {
            let (unpaid, _) = self.carts.unpaid_items(&slot.id).await?;
            if unpaid.is_empty() {
                already_settled.push(slot.id);
                continue;
            }
            let outcome = self
                .settle_player(SettleRequest {
                    slot_id: slot.id.clone(),
                    payment_method_id: payment_method_id.to_string(),
                    actor: actor.to_string(),
                    line_item_ids: None,
                    reference: None,
                })
                .await;
            results.push(match outcome {
                Ok(o) => PlayerSettlementResult {
                    slot_id: o.slot_id,
                    player_name: o.player_name,
                    success: true,
                    amount_paid: o.amount_paid,
                    transaction_number: o.transaction_number,
                    message: o.message,
                },
                Err(e) => PlayerSettlementResult {
                    slot_id: slot.id,
                    player_name: slot.name,
                    success: false,
                    amount_paid: Money::ZERO,
                    transaction_number: None,
                    message: e.to_string(),
                },
            });
        }

        let total_paid = results.iter().map(|r| r.amount_paid).sum();
        let success = results.iter().all(|r| r.success);
        info!(
            tee_time_id,
            settled = results.iter().filter(|r| r.success).count(),
            failed = results.iter().filter(|r| !r.success).count(),
            "Flight settlement finished"
        );
        Ok(FlightSettlement {
            tee_time_id: tee_time_id.to_string(),
            success,
            total_paid,
            results,
            already_settled,
        })
    }
}
