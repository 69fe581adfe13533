use super::batch::WriteBatch;
use super::check_in::CheckInRecord;
use super::line_item::LineItem;
use super::payment::{PaymentMethod, PaymentTransaction};
use super::policy::{ClubPolicy, MemberStatus};
use super::roster::{Slot, TeeTime};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Persistence for everything the ledger reads and writes.
///
/// Reads return committed state. All mutations go through [`LedgerStore::commit`], which
/// must verify the batch guards and apply the writes atomically.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn tee_time(&self, id: &str) -> Result<Option<TeeTime>>;
    async fn slot(&self, id: &str) -> Result<Option<Slot>>;
    async fn slots(&self) -> Result<Vec<Slot>>;
    async fn slots_for_tee_time(&self, tee_time_id: &str) -> Result<Vec<Slot>>;

    async fn line_item(&self, id: &str) -> Result<Option<LineItem>>;
    async fn line_items_owned_by(&self, player_id: &str) -> Result<Vec<LineItem>>;
    /// Items this player handed to someone else and that are still away.
    async fn line_items_transferred_from(&self, player_id: &str) -> Result<Vec<LineItem>>;

    async fn payment_method(&self, id: &str) -> Result<Option<PaymentMethod>>;
    async fn payment_methods(&self, club_id: &str) -> Result<Vec<PaymentMethod>>;

    async fn transaction(&self, id: &str) -> Result<Option<PaymentTransaction>>;
    async fn transaction_by_number(
        &self,
        club_id: &str,
        number: &str,
    ) -> Result<Option<PaymentTransaction>>;
    async fn transaction_by_idempotency_key(
        &self,
        club_id: &str,
        key: &str,
    ) -> Result<Option<PaymentTransaction>>;

    async fn check_in_record(&self, slot_id: &str) -> Result<Option<CheckInRecord>>;

    /// Atomically increments and returns the per-club counter for `year`, starting at 1.
    async fn allocate_transaction_sequence(&self, club_id: &str, year: i32) -> Result<u32>;

    async fn commit(&self, batch: WriteBatch) -> Result<()>;
}

/// Club policy lookup, owned by club configuration upstream.
#[async_trait]
pub trait ClubPolicySource: Send + Sync {
    async fn policy(&self, club_id: &str) -> Result<ClubPolicy>;
}

/// Membership status lookup.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn status(&self, member_id: &str) -> Result<Option<MemberStatus>>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;
pub type ClubPolicySourceRef = Arc<dyn ClubPolicySource>;
pub type MemberDirectoryRef = Arc<dyn MemberDirectory>;
pub type ClockRef = Arc<dyn Clock>;
