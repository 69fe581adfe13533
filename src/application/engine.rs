use super::carts::{CartAggregator, SlotCart};
use super::check_in::{CheckInCoordinator, CheckInOptions, FlightCheckIn, PlayerCheckInResult};
use super::context::LedgerContext;
use super::line_items::LineItemService;
use super::payment_methods::PaymentMethodService;
use super::payments::{PaymentProcessor, PaymentRequest, TransactionSummary};
use super::settlement::{FlightSettlement, SettleRequest, SettlementCoordinator, SettlementOutcome};
use super::transfers::TransferCoordinator;
use crate::domain::line_item::LineItem;
use crate::domain::money::Money;
use crate::domain::roster::Slot;
use crate::error::Result;
use tracing::debug;

/// One ledger operation, as read from a command feed.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCommand {
    Transfer {
        line_item_id: String,
        from_player_id: String,
        to_player_id: String,
        actor: String,
    },
    UndoTransfer {
        line_item_id: String,
        actor: String,
    },
    BulkTransfer {
        line_item_ids: Vec<String>,
        to_player_id: String,
        actor: String,
    },
    UpdateQuantity {
        line_item_id: String,
        quantity: u8,
    },
    Remove {
        line_item_id: String,
    },
    BulkRemove {
        line_item_ids: Vec<String>,
    },
    Pay(PaymentRequest),
    Void {
        club_id: String,
        transaction_number: String,
        reason: String,
        actor: String,
    },
    Refund {
        club_id: String,
        transaction_number: String,
        amount: Money,
        reason: String,
        actor: String,
    },
    CheckIn {
        player_id: String,
        actor: String,
        options: CheckInOptions,
    },
    UndoCheckIn {
        player_id: String,
        actor: String,
    },
    CheckInFlight {
        tee_time_id: String,
        player_ids: Vec<String>,
        actor: String,
        options: CheckInOptions,
    },
    CheckInAll {
        tee_time_id: String,
        actor: String,
        options: CheckInOptions,
    },
    Settle(SettleRequest),
    SettleAll {
        tee_time_id: String,
        payment_method_id: String,
        actor: String,
    },
}

/// What a successfully executed command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    LineItems(Vec<LineItem>),
    Removed(usize),
    Transaction(TransactionSummary),
    CheckIn(PlayerCheckInResult),
    FlightCheckIn(FlightCheckIn),
    Slot(Slot),
    Settlement(SettlementOutcome),
    FlightSettlement(FlightSettlement),
}

impl CommandOutcome {
    /// One-line human summary, used by the CLI.
    pub fn describe(&self) -> String {
        match self {
            Self::LineItems(items) => format!("{} line item(s) updated", items.len()),
            Self::Removed(count) => format!("{} line item(s) removed", count),
            Self::Transaction(tx) => format!(
                "{} {:?} amount {} refunded {}",
                tx.transaction_number, tx.status, tx.amount, tx.refunded
            ),
            Self::CheckIn(r) => format!("{}: {}", r.player_name, r.message),
            Self::FlightCheckIn(f) => format!(
                "flight {}: {}/{} checked in",
                f.tee_time_id,
                f.results.iter().filter(|r| r.success).count(),
                f.results.len()
            ),
            Self::Slot(slot) => format!("{}: check-in undone", slot.name),
            Self::Settlement(s) => format!("{}: {}", s.player_name, s.message),
            Self::FlightSettlement(f) => {
                format!("flight {}: {} collected", f.tee_time_id, f.total_paid)
            }
        }
    }
}

/// Entry point wiring every ledger service over one shared context.
///
/// The services are cheap handles; the engine only exists so callers need a single value
/// and so command feeds can be replayed through [`LedgerEngine::execute`].
#[derive(Clone)]
pub struct LedgerEngine {
    ctx: LedgerContext,
    carts: CartAggregator,
    line_items: LineItemService,
    transfers: TransferCoordinator,
    payments: PaymentProcessor,
    payment_methods: PaymentMethodService,
    settlement: SettlementCoordinator,
    check_in: CheckInCoordinator,
}

impl LedgerEngine {
    /// Creates a new engine, wiring every service to `ctx`.
    pub fn new(ctx: LedgerContext) -> Self {
        Self {
            carts: CartAggregator::new(ctx.clone()),
            line_items: LineItemService::new(ctx.clone()),
            transfers: TransferCoordinator::new(ctx.clone()),
            payments: PaymentProcessor::new(ctx.clone()),
            payment_methods: PaymentMethodService::new(ctx.clone()),
            settlement: SettlementCoordinator::new(ctx.clone()),
            check_in: CheckInCoordinator::new(ctx.clone()),
            ctx,
        }
    }

    /// Returns the shared context.
    pub fn context(&self) -> &LedgerContext {
        &self.ctx
    }

    /// Returns the cart aggregator.
    pub fn carts(&self) -> &CartAggregator {
        &self.carts
    }

    /// Returns the line item service.
    pub fn line_items(&self) -> &LineItemService {
        &self.line_items
    }

    /// Returns the transfer coordinator.
    pub fn transfers(&self) -> &TransferCoordinator {
        &self.transfers
    }

    /// Returns the payment processor.
    pub fn payments(&self) -> &PaymentProcessor {
        &self.payments
    }

    /// Returns the payment method service.
    pub fn payment_methods(&self) -> &PaymentMethodService {
        &self.payment_methods
    }

    /// Returns the settlement coordinator.
    pub fn settlement(&self) -> &SettlementCoordinator {
        &self.settlement
    }

    /// Returns the check-in coordinator.
    pub fn check_in(&self) -> &CheckInCoordinator {
        &self.check_in
    }

    /// Runs one command through the matching service.
    pub async fn execute(&self, command: LedgerCommand) -> Result<CommandOutcome> {
        debug!(?command, "Executing command");
        let outcome = match command {
            LedgerCommand::Transfer {
                line_item_id,
                from_player_id,
                to_player_id,
                actor,
            } => CommandOutcome::LineItems(vec![
                self.transfers
                    .transfer_line_item(&line_item_id, &from_player_id, &to_player_id, &actor)
                    .await?,
            ]),
            LedgerCommand::UndoTransfer {
                line_item_id,
                actor,
            } => CommandOutcome::LineItems(vec![
                self.transfers.undo_transfer(&line_item_id, &actor).await?,
            ]),
            LedgerCommand::BulkTransfer {
                line_item_ids,
                to_player_id,
                actor,
            } => CommandOutcome::LineItems(
                self.transfers
                    .bulk_transfer_line_items(&line_item_ids, &to_player_id, &actor)
                    .await?,
            ),
            LedgerCommand::UpdateQuantity {
                line_item_id,
                quantity,
            } => CommandOutcome::LineItems(vec![
                self.line_items
                    .update_quantity(&line_item_id, quantity)
                    .await?,
            ]),
            LedgerCommand::Remove { line_item_id } => {
                self.line_items.remove_line_item(&line_item_id).await?;
                CommandOutcome::Removed(1)
            }
            LedgerCommand::BulkRemove { line_item_ids } => CommandOutcome::Removed(
                self.line_items
                    .bulk_remove_line_items(&line_item_ids)
                    .await?,
            ),
            LedgerCommand::Pay(request) => {
                let tx = self.payments.process_payment(request).await?;
                CommandOutcome::Transaction(TransactionSummary::from(&tx))
            }
            LedgerCommand::Void {
                club_id,
                transaction_number,
                reason,
                actor,
            } => {
                let tx = self
                    .payments
                    .transaction_by_number(&club_id, &transaction_number)
                    .await?;
                let voided = self
                    .payments
                    .void_transaction(&tx.id, &reason, &actor)
                    .await?;
                CommandOutcome::Transaction(TransactionSummary::from(&voided))
            }
            LedgerCommand::Refund {
                club_id,
                transaction_number,
                amount,
                reason,
                actor,
            } => {
                let tx = self
                    .payments
                    .transaction_by_number(&club_id, &transaction_number)
                    .await?;
                let refunded = self
                    .payments
                    .refund_transaction(&tx.id, amount, &reason, &actor)
                    .await?;
                CommandOutcome::Transaction(TransactionSummary::from(&refunded))
            }
            LedgerCommand::CheckIn {
                player_id,
                actor,
                options,
            } => CommandOutcome::CheckIn(
                self.check_in
                    .check_in_player(&player_id, &actor, &options)
                    .await?,
            ),
            LedgerCommand::UndoCheckIn { player_id, actor } => {
                CommandOutcome::Slot(self.check_in.undo_check_in(&player_id, &actor).await?)
            }
            LedgerCommand::CheckInFlight {
                tee_time_id,
                player_ids,
                actor,
                options,
            } => CommandOutcome::FlightCheckIn(
                self.check_in
                    .check_in_flight(&tee_time_id, &player_ids, &actor, &options)
                    .await?,
            ),
            LedgerCommand::CheckInAll {
                tee_time_id,
                actor,
                options,
            } => CommandOutcome::FlightCheckIn(
                self.check_in
                    .check_in_all_players(&tee_time_id, &actor, &options)
                    .await?,
            ),
            LedgerCommand::Settle(request) => {
                CommandOutcome::Settlement(self.settlement.settle_player(request).await?)
            }
            LedgerCommand::SettleAll {
                tee_time_id,
                payment_method_id,
                actor,
            } => CommandOutcome::FlightSettlement(
                self.settlement
                    .settle_all_players(&tee_time_id, &payment_method_id, &actor)
                    .await?,
            ),
        };
        Ok(outcome)
    }

    /// Carts of every known player, ordered by flight then position.
    pub async fn all_carts(&self) -> Result<Vec<SlotCart>> {
        let mut slots = self.ctx.store.slots().await?;
        slots.sort_by(|a, b| {
            a.tee_time_id
                .cmp(&b.tee_time_id)
                .then(a.position.cmp(&b.position))
        });
        let mut carts = Vec::with_capacity(slots.len());
        for slot in slots {
            carts.push(self.carts.get_slot_cart(&slot.id).await?);
        }
        Ok(carts)
    }
}
