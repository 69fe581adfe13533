use super::context::LedgerContext;
use crate::domain::line_item::{LineItem, LineItemType};
use crate::domain::money::Money;
use crate::error::Result;
use serde::Serialize;
use tracing::debug;

/// One line of a cart as shown to staff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub line_item_id: String,
    pub r#type: LineItemType,
    pub description: String,
    pub quantity: u8,
    pub unit_amount: Money,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub is_paid: bool,
}

impl From<&LineItem> for CartLine {
    fn from(item: &LineItem) -> Self {
        Self {
            line_item_id: item.id.clone(),
            r#type: item.r#type,
            description: item.description.clone(),
            quantity: item.quantity,
            unit_amount: item.total_amount,
            subtotal: item.line_subtotal(),
            tax: item.line_tax(),
            total: item.line_total(),
            is_paid: item.is_paid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferredInLine {
    pub line: CartLine,
    pub from_player_id: String,
    pub from_player_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferredOutLine {
    pub line: CartLine,
    pub to_player_id: String,
    pub to_player_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotCart {
    pub player_id: String,
    pub player_name: String,
    pub tee_time_id: String,
    /// Items the player owns and has always owned.
    pub items: Vec<CartLine>,
    /// Items the player owns because someone transferred them in.
    pub transferred_in: Vec<TransferredInLine>,
    /// The player's items now carried by someone else. Not part of the totals.
    pub transferred_out: Vec<TransferredOutLine>,
    pub subtotal: Money,
    pub tax_total: Money,
    pub grand_total: Money,
    pub paid_amount: Money,
    pub balance_due: Money,
    pub is_settled: bool,
}

/// Pre-payment quote over the unpaid items of several players.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchTotal {
    pub player_ids: Vec<String>,
    pub line_item_ids: Vec<String>,
    pub subtotal: Money,
    pub tax_total: Money,
    pub grand_total: Money,
    pub paid_amount: Money,
    pub balance_due: Money,
}

#[derive(Debug, Default)]
struct Totals {
    subtotal: Money,
    tax: Money,
    total: Money,
    paid: Money,
}

impl Totals {
    fn add(&mut self, item: &LineItem) {
        self.subtotal += item.line_subtotal();
        self.tax += item.line_tax();
        self.total += item.line_total();
        if item.is_paid {
            self.paid += item.line_total();
        }
    }
}

/// Read-only rollups of line items. Ownership is always `owner_player_id`.
#[derive(Clone)]
pub struct CartAggregator {
    ctx: LedgerContext,
}

impl CartAggregator {
    /// Creates a new aggregator over the shared ledger context.
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Current cart of one player: owned items, items handed over by others, items handed
    /// away, and the totals over what the player owns now.
    pub async fn get_slot_cart(&self, player_id: &str) -> Result<SlotCart> {
        let slot = self.ctx.require_slot(player_id).await?;
        let owned = self.ctx.store.line_items_owned_by(player_id).await?;

        let mut totals = Totals::default();
        let mut items = Vec::new();
        let mut transferred_in = Vec::new();
        for item in &owned {
            totals.add(item);
            if item.is_transferred {
                let from = item
                    .transferred_from_player_id
                    .clone()
                    .unwrap_or_default();
                transferred_in.push(TransferredInLine {
                    line: CartLine::from(item),
                    from_player_name: self.ctx.player_name(&from).await?,
                    from_player_id: from,
                });
            } else {
                items.push(CartLine::from(item));
            }
        }

        let mut transferred_out = Vec::new();
        for item in self.ctx.store.line_items_transferred_from(player_id).await? {
            transferred_out.push(TransferredOutLine {
                line: CartLine::from(&item),
                to_player_name: self.ctx.player_name(&item.owner_player_id).await?,
                to_player_id: item.owner_player_id,
            });
        }

        let balance_due = totals.total - totals.paid;
        debug!(player_id, balance_due = %balance_due, "Computed slot cart");
        Ok(SlotCart {
            player_id: slot.id,
            player_name: slot.name,
            tee_time_id: slot.tee_time_id,
            items,
            transferred_in,
            transferred_out,
            subtotal: totals.subtotal,
            tax_total: totals.tax,
            grand_total: totals.total,
            paid_amount: totals.paid,
            balance_due,
            is_settled: balance_due <= Money::ZERO,
        })
    }

    /// Sums the unpaid items of `player_ids`. `paid_amount` is always zero: this is a quote,
    /// not a ledger read.
    pub async fn calculate_batch_total(&self, player_ids: &[String]) -> Result<BatchTotal> {
        let mut totals = Totals::default();
        let mut line_item_ids = Vec::new();
        for player_id in player_ids {
            self.ctx.require_slot(player_id).await?;
            for item in self.ctx.store.line_items_owned_by(player_id).await? {
                if !item.is_paid {
                    totals.add(&item);
                    line_item_ids.push(item.id);
                }
            }
        }
        Ok(BatchTotal {
            player_ids: player_ids.to_vec(),
            line_item_ids,
            subtotal: totals.subtotal,
            tax_total: totals.tax,
            grand_total: totals.total,
            paid_amount: Money::ZERO,
            balance_due: totals.total,
        })
    }

    /// Unpaid items owned by one player and their combined total.
    pub(crate) async fn unpaid_items(&self, player_id: &str) -> Result<(Vec<LineItem>, Money)> {
        let unpaid: Vec<LineItem> = self
            .ctx
            .store
            .line_items_owned_by(player_id)
            .await?
            .into_iter()
            .filter(|i| !i.is_paid)
            .collect();
        let total = unpaid.iter().map(LineItem::line_total).sum();
        Ok((unpaid, total))
    }
}
