use super::context::LedgerContext;
use crate::domain::batch::{Write, WriteBatch};
use crate::domain::line_item::{LineItem, NewLineItem};
use crate::error::{ItemRejection, LedgerError, Result};
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

/// Creation and pre-payment editing of line items.
#[derive(Clone)]
pub struct LineItemService {
    ctx: LedgerContext,
}

impl LineItemService {
    /// Creates a new service over the shared ledger context.
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Adds an unpaid item to a player's cart, computing its tax from the rate and type.
    pub async fn add_line_item(&self, input: NewLineItem) -> Result<LineItem> {
        let slot = self.ctx.require_slot(&input.player_id).await?;
        let item = LineItem::create(Uuid::new_v4().to_string(), slot.tee_time_id, input)?;

        let mut batch = WriteBatch::new();
        batch.write(Write::PutLineItem(item.clone()));
        self.ctx.store.commit(batch).await?;

        info!(
            line_item_id = %item.id,
            player_id = %item.owner_player_id,
            total = %item.line_total(),
            "Line item added"
        );
        Ok(item)
    }

    /// Changes the quantity of an unpaid item that is still with its owner.
    pub async fn update_quantity(&self, item_id: &str, quantity: u8) -> Result<LineItem> {
        let item = self.ctx.require_line_item(item_id).await?;
        let mut updated = item.clone();
        updated.set_quantity(quantity)?;

        let mut batch = WriteBatch::new();
        batch.swap_line_item(&item, updated.clone());
        self.ctx.store.commit(batch).await?;

        info!(line_item_id = %item_id, quantity, "Line item quantity updated");
        Ok(updated)
    }

    /// Deletes an unpaid, untransferred item.
    pub async fn remove_line_item(&self, item_id: &str) -> Result<()> {
        let item = self.ctx.require_line_item(item_id).await?;
        item.ensure_editable()?;

        let mut batch = WriteBatch::new();
        batch
            .guard_line_item(&item)
            .write(Write::DeleteLineItem(item.id.clone()));
        self.ctx.store.commit(batch).await?;

        info!(line_item_id = %item_id, "Line item removed");
        Ok(())
    }

    /// Removes every item or none. All invalid items are reported together.
    pub async fn bulk_remove_line_items(&self, item_ids: &[String]) -> Result<usize> {
        ensure_distinct(item_ids)?;
        let mut rejections = Vec::new();
        let mut batch = WriteBatch::new();

        for item_id in item_ids {
            let Some(item) = self.ctx.store.line_item(item_id).await? else {
                rejections.push(ItemRejection {
                    line_item_id: item_id.clone(),
                    reason: "not found".to_string(),
                });
                continue;
            };
            if let Err(e) = item.ensure_editable() {
                rejections.push(ItemRejection {
                    line_item_id: item_id.clone(),
                    reason: rejection_reason(&item, e),
                });
                continue;
            }
            batch
                .guard_line_item(&item)
                .write(Write::DeleteLineItem(item.id));
        }

        if !rejections.is_empty() {
            warn!(rejected = rejections.len(), "Bulk removal rejected");
            return Err(LedgerError::BatchRejected(rejections));
        }

        let removed = batch.writes.len();
        self.ctx.store.commit(batch).await?;
        info!(removed, "Line items removed");
        Ok(removed)
    }
}

/// Bulk operations take each line item once.
pub(crate) fn ensure_distinct(item_ids: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(item_ids.len());
    match item_ids.iter().find(|id| !seen.insert(id.as_str())) {
        Some(id) => Err(LedgerError::ValidationError(format!(
            "Line item {} listed twice",
            id
        ))),
        None => Ok(()),
    }
}

pub(crate) fn rejection_reason(item: &LineItem, fallback: LedgerError) -> String {
    if item.is_paid {
        "already paid".to_string()
    } else if item.is_transferred {
        "already transferred".to_string()
    } else {
        fallback.to_string()
    }
}
