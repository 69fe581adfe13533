use super::context::LedgerContext;
use super::line_items::{ensure_distinct, rejection_reason};
use crate::domain::batch::WriteBatch;
use crate::domain::line_item::LineItem;
use crate::error::{ItemRejection, LedgerError, Result};
use tracing::{info, warn};

/// Moves line items between players of the same flight.
///
/// Each mutation commits with a compare-and-swap on the item's `is_paid`/`is_transferred`
/// flags, so a payment landing between read and commit makes the transfer fail instead of
/// being overwritten.
#[derive(Clone)]
pub struct TransferCoordinator {
    ctx: LedgerContext,
}

impl TransferCoordinator {
    /// Creates a new coordinator over the shared ledger context.
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Hands an unpaid item from one player to another player of the same flight.
    pub async fn transfer_line_item(
        &self,
        item_id: &str,
        from_player_id: &str,
        to_player_id: &str,
        actor: &str,
    ) -> Result<LineItem> {
        let item = self.ctx.require_line_item(item_id).await?;
        let to_slot = self.ctx.require_slot(to_player_id).await?;
        if to_slot.tee_time_id != item.tee_time_id {
            return Err(LedgerError::Conflict(format!(
                "Player {} is not in the flight of line item {}",
                to_player_id, item_id
            )));
        }

        let mut updated = item.clone();
        updated.transfer(from_player_id, to_player_id, self.ctx.clock.now())?;

        let mut batch = WriteBatch::new();
        batch.swap_line_item(&item, updated.clone());
        self.ctx.store.commit(batch).await?;

        info!(
            line_item_id = %item_id,
            from = %from_player_id,
            to = %to_player_id,
            actor = %actor,
            "Line item transferred"
        );
        Ok(updated)
    }

    /// Returns the item to its original owner.
    pub async fn undo_transfer(&self, item_id: &str, actor: &str) -> Result<LineItem> {
        let item = self.ctx.require_line_item(item_id).await?;
        let mut updated = item.clone();
        updated.undo_transfer()?;

        let mut batch = WriteBatch::new();
        batch.swap_line_item(&item, updated.clone());
        self.ctx.store.commit(batch).await?;

        info!(
            line_item_id = %item_id,
            owner = %updated.owner_player_id,
            actor = %actor,
            "Line item transfer undone"
        );
        Ok(updated)
    }

    /// Transfers every item to `to_player_id`, or none of them.
    ///
    /// All items must be unpaid, not already transferred, and in the destination
    /// player's flight. Every offending item is reported.
    pub async fn bulk_transfer_line_items(
        &self,
        item_ids: &[String],
        to_player_id: &str,
        actor: &str,
    ) -> Result<Vec<LineItem>> {
        ensure_distinct(item_ids)?;
        let to_slot = self.ctx.require_slot(to_player_id).await?;
        let now = self.ctx.clock.now();

        let mut rejections = Vec::new();
        let mut batch = WriteBatch::new();
        let mut transferred = Vec::with_capacity(item_ids.len());

        for item_id in item_ids {
            let Some(item) = self.ctx.store.line_item(item_id).await? else {
                rejections.push(reject(item_id, "not found"));
                continue;
            };
            if item.tee_time_id != to_slot.tee_time_id {
                rejections.push(reject(item_id, "belongs to a different flight"));
                continue;
            }
            let mut updated = item.clone();
            let from = item.owner_player_id.clone();
            if let Err(e) = updated.transfer(&from, to_player_id, now) {
                rejections.push(ItemRejection {
                    line_item_id: item_id.clone(),
                    reason: rejection_reason(&item, e),
                });
                continue;
            }
            batch.swap_line_item(&item, updated.clone());
            transferred.push(updated);
        }

        if !rejections.is_empty() {
            warn!(
                rejected = rejections.len(),
                to = %to_player_id,
                "Bulk transfer rejected"
            );
            return Err(LedgerError::BatchRejected(rejections));
        }

        self.ctx.store.commit(batch).await?;
        info!(
            count = transferred.len(),
            to = %to_player_id,
            actor = %actor,
            "Line items transferred"
        );
        Ok(transferred)
    }
}

fn reject(item_id: &str, reason: &str) -> ItemRejection {
    ItemRejection {
        line_item_id: item_id.to_string(),
        reason: reason.to_string(),
    }
}
