use super::context::{LedgerContext, RACE_ATTEMPTS};
use super::settlement::SettlementGate;
use crate::domain::batch::WriteBatch;
use crate::domain::check_in::CheckInRecord;
use crate::domain::roster::Slot;
use crate::error::{LedgerError, Result};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckInOptions {
    /// Check in even with an outstanding balance. Suspension still applies.
    pub skip_validation: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerCheckInResult {
    pub slot_id: String,
    pub player_name: String,
    pub success: bool,
    pub already_checked_in: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightCheckIn {
    pub tee_time_id: String,
    /// True only when every requested player succeeded.
    pub success: bool,
    pub results: Vec<PlayerCheckInResult>,
}

impl FlightCheckIn {
    pub fn result_for(&self, slot_id: &str) -> Option<&PlayerCheckInResult> {
        self.results.iter().find(|r| r.slot_id == slot_id)
    }
}

/// Per-player and per-flight check-in.
///
/// Flight operations evaluate each player on their own: one refused player never stops
/// the others from being checked in.
#[derive(Clone)]
pub struct CheckInCoordinator {
    ctx: LedgerContext,
    gate: SettlementGate,
}

impl CheckInCoordinator {
    /// Creates a new coordinator over the shared ledger context.
    pub fn new(ctx: LedgerContext) -> Self {
        Self {
            gate: SettlementGate::new(ctx.clone()),
            ctx,
        }
    }

    /// Checks in one player. Checking in twice reports "already checked in" and changes nothing.
    pub async fn check_in_player(
        &self,
        slot_id: &str,
        actor: &str,
        options: &CheckInOptions,
    ) -> Result<PlayerCheckInResult> {
        let mut attempt = 1;
        loop {
            match self.try_check_in_player(slot_id, actor, options).await {
                Err(LedgerError::Conflict(reason)) if attempt < RACE_ATTEMPTS => {
                    warn!(player_id = %slot_id, attempt, %reason, "Check-in lost a race, retrying");
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    async fn try_check_in_player(
        &self,
        slot_id: &str,
        actor: &str,
        options: &CheckInOptions,
    ) -> Result<PlayerCheckInResult> {
        let slot = self.ctx.require_slot(slot_id).await?;
        if slot.is_checked_in() {
            return Ok(already_checked_in(slot));
        }

        let tee_time = self.ctx.require_tee_time(&slot.tee_time_id).await?;
        self.gate
            .authorize(&slot, &tee_time.club_id, options.skip_validation)
            .await?;

        let now = self.ctx.clock.now();
        let read = self.ctx.store.check_in_record(&slot.id).await?;
        let mut record = read
            .clone()
            .unwrap_or_else(|| CheckInRecord::new(&slot.id));
        record.record_check_in(actor, now, options.notes.clone());
        let mut updated = slot.clone();
        updated.checked_in_at = Some(now);

        let mut batch = WriteBatch::new();
        batch
            .swap_slot(&slot, updated)
            .swap_check_in_record(read, record);
        self.ctx.store.commit(batch).await?;

        info!(player_id = %slot.id, actor = %actor, "Player checked in");
        Ok(PlayerCheckInResult {
            slot_id: slot.id,
            player_name: slot.name,
            success: true,
            already_checked_in: false,
            message: "Checked in".to_string(),
        })
    }

    /// Checks in the requested players of a flight, each independently.
    pub async fn check_in_flight(
        &self,
        tee_time_id: &str,
        player_ids: &[String],
        actor: &str,
        options: &CheckInOptions,
    ) -> Result<FlightCheckIn> {
        self.ctx.require_tee_time(tee_time_id).await?;

        let mut results = Vec::with_capacity(player_ids.len());
        for player_id in player_ids {
            let result = match self.flight_slot(tee_time_id, player_id).await {
                Ok(_) => self.check_in_player(player_id, actor, options).await,
                Err(e) => Err(e),
            };
            results.push(result.unwrap_or_else(|e| PlayerCheckInResult {
                slot_id: player_id.clone(),
                player_name: player_id.clone(),
                success: false,
                already_checked_in: false,
                message: e.to_string(),
            }));
        }

        let success = results.iter().all(|r| r.success);
        info!(
            tee_time_id,
            requested = player_ids.len(),
            refused = results.iter().filter(|r| !r.success).count(),
            "Flight check-in finished"
        );
        Ok(FlightCheckIn {
            tee_time_id: tee_time_id.to_string(),
            success,
            results,
        })
    }

    /// Checks in every player of the flight not yet checked in.
    pub async fn check_in_all_players(
        &self,
        tee_time_id: &str,
        actor: &str,
        options: &CheckInOptions,
    ) -> Result<FlightCheckIn> {
        self.ctx.require_tee_time(tee_time_id).await?;
        let pending: Vec<String> = self
            .ctx
            .store
            .slots_for_tee_time(tee_time_id)
            .await?
            .into_iter()
            .filter(|s| !s.is_checked_in())
            .map(|s| s.id)
            .collect();
        self.check_in_flight(tee_time_id, &pending, actor, options)
            .await
    }

    /// Reverts a check-in. Settlement data on the record is kept.
    pub async fn undo_check_in(&self, slot_id: &str, actor: &str) -> Result<Slot> {
        let slot = self.ctx.require_slot(slot_id).await?;
        if !slot.is_checked_in() {
            return Err(LedgerError::Conflict(format!(
                "Player {} is not checked in",
                slot_id
            )));
        }
        let mut updated = slot.clone();
        updated.checked_in_at = None;

        let mut batch = WriteBatch::new();
        batch.swap_slot(&slot, updated.clone());
        if let Some(read) = self.ctx.store.check_in_record(slot_id).await? {
            let mut record = read.clone();
            record.clear_check_in();
            batch.swap_check_in_record(Some(read), record);
        }
        self.ctx.store.commit(batch).await?;

        info!(player_id = %slot_id, actor = %actor, "Check-in undone");
        Ok(updated)
    }

    async fn flight_slot(&self, tee_time_id: &str, player_id: &str) -> Result<Slot> {
        let slot = self.ctx.require_slot(player_id).await?;
        if slot.tee_time_id != tee_time_id {
            return Err(LedgerError::ValidationError(format!(
                "Player {} is not part of tee time {}",
                player_id, tee_time_id
            )));
        }
        Ok(slot)
    }
}

fn already_checked_in(slot: Slot) -> PlayerCheckInResult {
    PlayerCheckInResult {
        slot_id: slot.id,
        player_name: slot.name,
        success: true,
        already_checked_in: true,
        message: "Already checked in".to_string(),
    }
}
