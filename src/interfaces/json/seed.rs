//! Initial ledger state loaded from JSON.
//!
//! Line items in a seed carry their own ids so that command feeds can refer to them. Their
//! flight comes from the owning slot, which must be part of the same seed.

use crate::domain::batch::{Write, WriteBatch};
use crate::domain::line_item::{LineItem, NewLineItem};
use crate::domain::payment::PaymentMethod;
use crate::domain::policy::{ClubPolicy, MemberStatus};
use crate::domain::ports::LedgerStore;
use crate::domain::roster::{Slot, TeeTime};
use crate::error::{LedgerError, Result};
use crate::infrastructure::in_memory::{StaticClubPolicies, StaticMemberDirectory};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct SeedLineItem {
    pub id: String,
    #[serde(flatten)]
    pub item: NewLineItem,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub tee_times: Vec<TeeTime>,
    pub slots: Vec<Slot>,
    pub line_items: Vec<SeedLineItem>,
    pub payment_methods: Vec<PaymentMethod>,
    /// Club id to policy. Clubs left out use the default policy.
    pub policies: BTreeMap<String, ClubPolicy>,
    /// Member id to directory status.
    pub members: BTreeMap<String, MemberStatus>,
}

/// Counts of what a seed wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedStats {
    pub tee_times: usize,
    pub slots: usize,
    pub line_items: usize,
    pub payment_methods: usize,
}

impl Seed {
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }

    /// Writes the seed in one batch and registers its policies and members.
    pub async fn apply(
        self,
        store: &dyn LedgerStore,
        policies: &StaticClubPolicies,
        members: &StaticMemberDirectory,
    ) -> Result<SeedStats> {
        let flights: HashMap<&str, &str> = self
            .slots
            .iter()
            .map(|s| (s.id.as_str(), s.tee_time_id.as_str()))
            .collect();

        let mut line_items = Vec::with_capacity(self.line_items.len());
        for seeded in &self.line_items {
            let tee_time_id = flights
                .get(seeded.item.player_id.as_str())
                .ok_or_else(|| {
                    LedgerError::ValidationError(format!(
                        "Seed line item {} belongs to unknown player {}",
                        seeded.id, seeded.item.player_id
                    ))
                })?;
            line_items.push(LineItem::create(
                seeded.id.clone(),
                tee_time_id.to_string(),
                seeded.item.clone(),
            )?);
        }

        let stats = SeedStats {
            tee_times: self.tee_times.len(),
            slots: self.slots.len(),
            line_items: line_items.len(),
            payment_methods: self.payment_methods.len(),
        };

        let mut batch = WriteBatch::new();
        for tee_time in self.tee_times {
            batch.write(Write::PutTeeTime(tee_time));
        }
        for slot in self.slots {
            batch.write(Write::PutSlot(slot));
        }
        for item in line_items {
            batch.write(Write::PutLineItem(item));
        }
        for method in self.payment_methods {
            batch.write(Write::PutPaymentMethod(method));
        }
        store.commit(batch).await?;

        for (club_id, policy) in self.policies {
            policies.set(&club_id, policy).await;
        }
        for (member_id, status) in self.members {
            members.set(&member_id, status).await;
        }

        info!(
            tee_times = stats.tee_times,
            slots = stats.slots,
            line_items = stats.line_items,
            payment_methods = stats.payment_methods,
            "Seed applied"
        );
        Ok(stats)
    }
}
