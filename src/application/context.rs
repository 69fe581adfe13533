use crate::config::LedgerConfig;
use crate::domain::line_item::LineItem;
use crate::domain::ports::{ClockRef, ClubPolicySourceRef, LedgerStoreRef, MemberDirectoryRef};
use crate::domain::roster::{Slot, TeeTime};
use crate::error::{LedgerError, Result};
use std::sync::Arc;

/// Read-then-commit operations that lose a guard to a concurrent update re-read and retry
/// up to this many times in total.
pub(crate) const RACE_ATTEMPTS: u32 = 3;

/// Collaborators shared by every ledger service. Cheap to clone.
#[derive(Clone)]
pub struct LedgerContext {
    pub store: LedgerStoreRef,
    pub policies: ClubPolicySourceRef,
    pub members: MemberDirectoryRef,
    pub clock: ClockRef,
    pub config: Arc<LedgerConfig>,
}

impl LedgerContext {
    pub fn new(
        store: LedgerStoreRef,
        policies: ClubPolicySourceRef,
        members: MemberDirectoryRef,
        clock: ClockRef,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            policies,
            members,
            clock,
            config: Arc::new(config),
        }
    }

    pub(crate) async fn require_slot(&self, slot_id: &str) -> Result<Slot> {
        self.store
            .slot(slot_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("player", slot_id))
    }

    pub(crate) async fn require_tee_time(&self, tee_time_id: &str) -> Result<TeeTime> {
        self.store
            .tee_time(tee_time_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("tee time", tee_time_id))
    }

    pub(crate) async fn require_line_item(&self, item_id: &str) -> Result<LineItem> {
        self.store
            .line_item(item_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("line item", item_id))
    }

    /// Display name for a player, falling back to the id for slots that no longer exist.
    pub(crate) async fn player_name(&self, slot_id: &str) -> Result<String> {
        Ok(self
            .store
            .slot(slot_id)
            .await?
            .map(|s| s.name)
            .unwrap_or_else(|| slot_id.to_string()))
    }
}
