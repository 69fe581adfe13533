use super::carts::CartAggregator;
use super::check_in::CheckInCoordinator;
use super::context::LedgerContext;
use super::line_items::LineItemService;
use super::payment_methods::PaymentMethodService;
use super::payments::PaymentProcessor;
use super::settlement::SettlementCoordinator;
use super::transfers::TransferCoordinator;
use crate::config::LedgerConfig;
use crate::domain::batch::{Write, WriteBatch};
use crate::domain::line_item::{LineItem, LineItemType, NewLineItem};
use crate::domain::money::Money;
use crate::domain::payment::{PaymentMethod, PaymentMethodType};
use crate::domain::roster::{PlayerType, Slot, TeeTime};
use crate::domain::tax::TaxType;
use crate::infrastructure::clock::ManualClock;
use crate::infrastructure::in_memory::{
    InMemoryLedgerStore, StaticClubPolicies, StaticMemberDirectory,
};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub(crate) const CLUB: &str = "club-1";

/// Flight `tt-1` with players p1..p4 (p1 is member m1), flight `tt-2` with q1,
/// and payment methods cash, card (needs a reference) and a disabled voucher.
pub(crate) struct Fixture {
    pub ctx: LedgerContext,
    pub clock: Arc<ManualClock>,
    pub policies: StaticClubPolicies,
    pub members: StaticMemberDirectory,
}

impl Fixture {
    pub async fn new() -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 5, 2, 7, 30, 0).unwrap(),
        ));
        let policies = StaticClubPolicies::new();
        let members = StaticMemberDirectory::new();
        let ctx = LedgerContext::new(
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(policies.clone()),
            Arc::new(members.clone()),
            clock.clone(),
            LedgerConfig::default(),
        );

        let mut seed = WriteBatch::new();
        for (tee_time, hour) in [("tt-1", 8), ("tt-2", 9)] {
            seed.write(Write::PutTeeTime(TeeTime {
                id: tee_time.to_string(),
                club_id: CLUB.to_string(),
                starts_at: Utc.with_ymd_and_hms(2026, 5, 2, hour, 0, 0).unwrap(),
            }));
        }
        for (id, tee_time, position) in [
            ("p1", "tt-1", 1),
            ("p2", "tt-1", 2),
            ("p3", "tt-1", 3),
            ("p4", "tt-1", 4),
            ("q1", "tt-2", 1),
        ] {
            seed.write(Write::PutSlot(Slot {
                id: id.to_string(),
                tee_time_id: tee_time.to_string(),
                position,
                r#type: if id == "p1" {
                    PlayerType::Member
                } else {
                    PlayerType::Guest
                },
                name: id.to_uppercase(),
                member_id: (id == "p1").then(|| "m1".to_string()),
                checked_in_at: None,
            }));
        }
        for (id, enabled, requires_ref, sort_order) in [
            ("cash", true, false, 1),
            ("card", true, true, 2),
            ("voucher", false, false, 3),
        ] {
            seed.write(Write::PutPaymentMethod(PaymentMethod {
                id: id.to_string(),
                club_id: CLUB.to_string(),
                name: id.to_string(),
                r#type: PaymentMethodType::Other,
                is_enabled: enabled,
                requires_ref,
                opens_pos: false,
                sort_order,
            }));
        }
        ctx.store.commit(seed).await.unwrap();

        Self {
            ctx,
            clock,
            policies,
            members,
        }
    }

    pub fn carts(&self) -> CartAggregator {
        CartAggregator::new(self.ctx.clone())
    }

    pub fn line_items(&self) -> LineItemService {
        LineItemService::new(self.ctx.clone())
    }

    pub fn transfers(&self) -> TransferCoordinator {
        TransferCoordinator::new(self.ctx.clone())
    }

    pub fn payments(&self) -> PaymentProcessor {
        PaymentProcessor::new(self.ctx.clone())
    }

    pub fn payment_methods(&self) -> PaymentMethodService {
        PaymentMethodService::new(self.ctx.clone())
    }

    pub fn settlement(&self) -> SettlementCoordinator {
        SettlementCoordinator::new(self.ctx.clone())
    }

    pub fn check_in(&self) -> CheckInCoordinator {
        CheckInCoordinator::new(self.ctx.clone())
    }
}

/// Adds a green fee with 7% tax on top.
pub(crate) async fn add_item(ctx: &LedgerContext, player_id: &str, base: Decimal) -> LineItem {
    LineItemService::new(ctx.clone())
        .add_line_item(NewLineItem {
            player_id: player_id.to_string(),
            r#type: LineItemType::GreenFee,
            description: "Green fee".to_string(),
            base_amount: Money::new(base),
            tax_type: TaxType::Add,
            tax_rate: dec!(7),
            quantity: 1,
        })
        .await
        .unwrap()
}
