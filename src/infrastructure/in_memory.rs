use crate::domain::batch::{LedgerView, Write, WriteBatch};
use crate::domain::check_in::CheckInRecord;
use crate::domain::line_item::LineItem;
use crate::domain::payment::{PaymentMethod, PaymentTransaction};
use crate::domain::policy::{ClubPolicy, MemberStatus};
use crate::domain::ports::{ClubPolicySource, LedgerStore, MemberDirectory};
use crate::domain::roster::{Slot, TeeTime};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    tee_times: BTreeMap<String, TeeTime>,
    slots: BTreeMap<String, Slot>,
    line_items: BTreeMap<String, LineItem>,
    payment_methods: BTreeMap<String, PaymentMethod>,
    transactions: BTreeMap<String, PaymentTransaction>,
    check_ins: BTreeMap<String, CheckInRecord>,
    sequences: HashMap<(String, i32), u32>,
}

impl LedgerState {
    fn apply(&mut self, write: Write) {
        match write {
            Write::PutLineItem(item) => {
                self.line_items.insert(item.id.clone(), item);
            }
            Write::DeleteLineItem(id) => {
                self.line_items.remove(&id);
            }
            Write::PutTransaction(tx) => {
                self.transactions.insert(tx.id.clone(), tx);
            }
            Write::PutPaymentMethod(method) => {
                self.payment_methods.insert(method.id.clone(), method);
            }
            Write::DeletePaymentMethod(id) => {
                self.payment_methods.remove(&id);
            }
            Write::PutTeeTime(tee_time) => {
                self.tee_times.insert(tee_time.id.clone(), tee_time);
            }
            Write::PutSlot(slot) => {
                self.slots.insert(slot.id.clone(), slot);
            }
            Write::PutCheckInRecord(record) => {
                self.check_ins.insert(record.slot_id.clone(), record);
            }
        }
    }

    fn find_transaction(
        &self,
        predicate: impl Fn(&PaymentTransaction) -> bool,
    ) -> Option<PaymentTransaction> {
        self.transactions.values().find(|t| predicate(t)).cloned()
    }
}

impl LedgerView for LedgerState {
    fn slot(&self, id: &str) -> Result<Option<Slot>> {
        Ok(self.slots.get(id).cloned())
    }

    fn line_item(&self, id: &str) -> Result<Option<LineItem>> {
        Ok(self.line_items.get(id).cloned())
    }

    fn transaction(&self, id: &str) -> Result<Option<PaymentTransaction>> {
        Ok(self.transactions.get(id).cloned())
    }

    fn transaction_by_number(
        &self,
        club_id: &str,
        number: &str,
    ) -> Result<Option<PaymentTransaction>> {
        Ok(self.find_transaction(|t| t.club_id == club_id && t.transaction_number == number))
    }

    fn transaction_by_idempotency_key(
        &self,
        club_id: &str,
        key: &str,
    ) -> Result<Option<PaymentTransaction>> {
        Ok(self.find_transaction(|t| {
            t.club_id == club_id && t.idempotency_key.as_deref() == Some(key)
        }))
    }

    fn payment_method(&self, id: &str) -> Result<Option<PaymentMethod>> {
        Ok(self.payment_methods.get(id).cloned())
    }

    fn payment_methods(&self, club_id: &str) -> Result<Vec<PaymentMethod>> {
        let mut methods: Vec<PaymentMethod> = self
            .payment_methods
            .values()
            .filter(|m| m.club_id == club_id)
            .cloned()
            .collect();
        methods.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.id.cmp(&b.id)));
        Ok(methods)
    }

    fn check_in_record(&self, slot_id: &str) -> Result<Option<CheckInRecord>> {
        Ok(self.check_ins.get(slot_id).cloned())
    }
}

/// A thread-safe in-memory ledger.
///
/// One `RwLock` covers all entities, so a commit verifies its guards and applies its writes
/// while no other commit can interleave. Clones share the same state.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn tee_time(&self, id: &str) -> Result<Option<TeeTime>> {
        Ok(self.state.read().await.tee_times.get(id).cloned())
    }

    async fn slot(&self, id: &str) -> Result<Option<Slot>> {
        Ok(self.state.read().await.slots.get(id).cloned())
    }

    async fn slots(&self) -> Result<Vec<Slot>> {
        Ok(self.state.read().await.slots.values().cloned().collect())
    }

    async fn slots_for_tee_time(&self, tee_time_id: &str) -> Result<Vec<Slot>> {
        let state = self.state.read().await;
        let mut slots: Vec<Slot> = state
            .slots
            .values()
            .filter(|s| s.tee_time_id == tee_time_id)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.position);
        Ok(slots)
    }

    async fn line_item(&self, id: &str) -> Result<Option<LineItem>> {
        self.state.read().await.line_item(id)
    }

    async fn line_items_owned_by(&self, player_id: &str) -> Result<Vec<LineItem>> {
        let state = self.state.read().await;
        Ok(state
            .line_items
            .values()
            .filter(|i| i.owner_player_id == player_id)
            .cloned()
            .collect())
    }

    async fn line_items_transferred_from(&self, player_id: &str) -> Result<Vec<LineItem>> {
        let state = self.state.read().await;
        Ok(state
            .line_items
            .values()
            .filter(|i| {
                i.is_transferred
                    && i.owner_player_id != player_id
                    && (i.original_player_id.as_deref() == Some(player_id)
                        || i.transferred_from_player_id.as_deref() == Some(player_id))
            })
            .cloned()
            .collect())
    }

    async fn payment_method(&self, id: &str) -> Result<Option<PaymentMethod>> {
        Ok(self.state.read().await.payment_methods.get(id).cloned())
    }

    async fn payment_methods(&self, club_id: &str) -> Result<Vec<PaymentMethod>> {
        LedgerView::payment_methods(&*self.state.read().await, club_id)
    }

    async fn transaction(&self, id: &str) -> Result<Option<PaymentTransaction>> {
        LedgerView::transaction(&*self.state.read().await, id)
    }

    async fn transaction_by_number(
        &self,
        club_id: &str,
        number: &str,
    ) -> Result<Option<PaymentTransaction>> {
        self.state
            .read()
            .await
            .transaction_by_number(club_id, number)
    }

    async fn transaction_by_idempotency_key(
        &self,
        club_id: &str,
        key: &str,
    ) -> Result<Option<PaymentTransaction>> {
        self.state
            .read()
            .await
            .transaction_by_idempotency_key(club_id, key)
    }

    async fn check_in_record(&self, slot_id: &str) -> Result<Option<CheckInRecord>> {
        Ok(self.state.read().await.check_ins.get(slot_id).cloned())
    }

    async fn allocate_transaction_sequence(&self, club_id: &str, year: i32) -> Result<u32> {
        let mut state = self.state.write().await;
        let next = state
            .sequences
            .entry((club_id.to_string(), year))
            .or_insert(0);
        *next += 1;
        Ok(*next)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut state = self.state.write().await;
        batch.verify(&*state)?;
        for write in batch.writes {
            state.apply(write);
        }
        Ok(())
    }
}

/// Club policies held in memory. Clubs without an entry get [`ClubPolicy::default`].
#[derive(Default, Clone)]
pub struct StaticClubPolicies {
    policies: Arc<RwLock<HashMap<String, ClubPolicy>>>,
}

impl StaticClubPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, club_id: &str, policy: ClubPolicy) {
        self.policies
            .write()
            .await
            .insert(club_id.to_string(), policy);
    }
}

#[async_trait]
impl ClubPolicySource for StaticClubPolicies {
    async fn policy(&self, club_id: &str) -> Result<ClubPolicy> {
        Ok(self
            .policies
            .read()
            .await
            .get(club_id)
            .copied()
            .unwrap_or_default())
    }
}

#[derive(Default, Clone)]
pub struct StaticMemberDirectory {
    members: Arc<RwLock<HashMap<String, MemberStatus>>>,
}

impl StaticMemberDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, member_id: &str, status: MemberStatus) {
        self.members
            .write()
            .await
            .insert(member_id.to_string(), status);
    }
}

#[async_trait]
impl MemberDirectory for StaticMemberDirectory {
    async fn status(&self, member_id: &str) -> Result<Option<MemberStatus>> {
        Ok(self.members.read().await.get(member_id).copied())
    }
}
