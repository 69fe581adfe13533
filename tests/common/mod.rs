#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use fairway_ledger::application::context::LedgerContext;
use fairway_ledger::application::engine::LedgerEngine;
use fairway_ledger::application::payments::PaymentRequest;
use fairway_ledger::config::LedgerConfig;
use fairway_ledger::domain::batch::WriteBatch;
use fairway_ledger::domain::check_in::CheckInRecord;
use fairway_ledger::domain::line_item::{LineItem, LineItemType, NewLineItem};
use fairway_ledger::domain::money::Money;
use fairway_ledger::domain::payment::{PaymentMethod, PaymentMethodType, PaymentTransaction};
use fairway_ledger::domain::ports::{LedgerStore, LedgerStoreRef};
use fairway_ledger::domain::roster::{PlayerType, Slot, TeeTime};
use fairway_ledger::domain::tax::TaxType;
use fairway_ledger::error::Result;
use fairway_ledger::infrastructure::clock::ManualClock;
use fairway_ledger::infrastructure::in_memory::{
    InMemoryLedgerStore, StaticClubPolicies, StaticMemberDirectory,
};
use fairway_ledger::interfaces::json::seed::Seed;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CLUB: &str = "club-1";

pub fn opening_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 2, 7, 30, 0).unwrap()
}

/// Two flights: `tt-1` with Ana (p1, member m1), Ben (p2), Cleo (p3), Dev (p4), and
/// `tt-2` with Eli (q1). Methods: cash, card (reference required), voucher (disabled).
pub fn club_seed() -> Seed {
    let tee_time = |id: &str, hour: u32| TeeTime {
        id: id.to_string(),
        club_id: CLUB.to_string(),
        starts_at: Utc.with_ymd_and_hms(2026, 5, 2, hour, 0, 0).unwrap(),
    };
    let slot = |id: &str, tee_time_id: &str, position: u8, name: &str| Slot {
        id: id.to_string(),
        tee_time_id: tee_time_id.to_string(),
        position,
        r#type: if id == "p1" {
            PlayerType::Member
        } else {
            PlayerType::Guest
        },
        name: name.to_string(),
        member_id: (id == "p1").then(|| "m1".to_string()),
        checked_in_at: None,
    };
    let method = |id: &str, enabled: bool, requires_ref: bool, sort_order: i32| PaymentMethod {
        id: id.to_string(),
        club_id: CLUB.to_string(),
        name: id.to_string(),
        r#type: PaymentMethodType::Other,
        is_enabled: enabled,
        requires_ref,
        opens_pos: false,
        sort_order,
    };

    Seed {
        tee_times: vec![tee_time("tt-1", 8), tee_time("tt-2", 9)],
        slots: vec![
            slot("p1", "tt-1", 1, "Ana"),
            slot("p2", "tt-1", 2, "Ben"),
            slot("p3", "tt-1", 3, "Cleo"),
            slot("p4", "tt-1", 4, "Dev"),
            slot("q1", "tt-2", 1, "Eli"),
        ],
        payment_methods: vec![
            method("cash", true, false, 1),
            method("card", true, true, 2),
            method("voucher", false, false, 3),
        ],
        ..Seed::default()
    }
}

pub struct TestLedger {
    pub engine: LedgerEngine,
    pub clock: Arc<ManualClock>,
    pub policies: StaticClubPolicies,
    pub members: StaticMemberDirectory,
}

impl TestLedger {
    pub async fn new() -> Self {
        Self::with_config(LedgerConfig::default()).await
    }

    pub async fn with_config(config: LedgerConfig) -> Self {
        Self::with_store(Arc::new(InMemoryLedgerStore::new()), config).await
    }

    pub async fn with_store(store: LedgerStoreRef, config: LedgerConfig) -> Self {
        let policies = StaticClubPolicies::new();
        let members = StaticMemberDirectory::new();
        club_seed()
            .apply(store.as_ref(), &policies, &members)
            .await
            .unwrap();

        let clock = Arc::new(ManualClock::new(opening_time()));
        let ctx = LedgerContext::new(
            store,
            Arc::new(policies.clone()),
            Arc::new(members.clone()),
            clock.clone(),
            config,
        );
        Self {
            engine: LedgerEngine::new(ctx),
            clock,
            policies,
            members,
        }
    }

    /// Adds one item with 7% tax on top.
    pub async fn green_fee(&self, player_id: &str, base: Decimal) -> LineItem {
        self.add(player_id, base, TaxType::Add, Decimal::new(7, 0), 1)
            .await
    }

    pub async fn add(
        &self,
        player_id: &str,
        base: Decimal,
        tax_type: TaxType,
        tax_rate: Decimal,
        quantity: u8,
    ) -> LineItem {
        self.engine
            .line_items()
            .add_line_item(NewLineItem {
                player_id: player_id.to_string(),
                r#type: LineItemType::GreenFee,
                description: "Green fee".to_string(),
                base_amount: Money::new(base),
                tax_type,
                tax_rate,
                quantity,
            })
            .await
            .unwrap()
    }

    pub async fn item(&self, id: &str) -> LineItem {
        self.engine
            .context()
            .store
            .line_item(id)
            .await
            .unwrap()
            .unwrap()
    }
}

pub fn payment(ids: &[&LineItem], amount: Decimal, method: &str) -> PaymentRequest {
    PaymentRequest {
        club_id: CLUB.to_string(),
        line_item_ids: ids.iter().map(|i| i.id.clone()).collect(),
        amount: Money::new(amount),
        payment_method_id: method.to_string(),
        paid_by: "pro-shop".to_string(),
        reference: None,
        idempotency_key: None,
    }
}

/// Seed used by the CLI tests: Ana (p1) and Ben (p2) in `tt-1`, cash only.
pub const CLI_SEED: &str = r#"{
    "tee_times": [{"id": "tt-1", "club_id": "club-1", "starts_at": "2026-05-02T08:00:00Z"}],
    "slots": [
        {"id": "p1", "tee_time_id": "tt-1", "position": 1, "type": "MEMBER", "name": "Ana", "member_id": "m1"},
        {"id": "p2", "tee_time_id": "tt-1", "position": 2, "type": "GUEST", "name": "Ben"}
    ],
    "line_items": [
        {"id": "li-1", "player_id": "p1", "type": "GREEN_FEE", "description": "Green fee",
         "base_amount": "100", "tax_type": "ADD", "tax_rate": "7"},
        {"id": "li-2", "player_id": "p2", "type": "GREEN_FEE", "description": "Green fee",
         "base_amount": "50", "tax_type": "EXEMPT", "tax_rate": "0"},
        {"id": "li-3", "player_id": "p1", "type": "CART", "description": "Cart",
         "base_amount": "20", "tax_type": "EXEMPT", "tax_rate": "0"}
    ],
    "payment_methods": [
        {"id": "cash", "club_id": "club-1", "name": "Cash", "type": "CASH", "is_enabled": true,
         "requires_ref": false, "opens_pos": false, "sort_order": 1}
    ]
}"#;

pub const COMMAND_HEADER: &str =
    "op,club,tee_time,player,target,items,amount,quantity,method,reference,key,skip_validation,actor,note";

pub fn temp_file(contents: &str) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// In-memory store that lets tests interleave read-then-commit operations.
///
/// Check-in record reads return the value found on entry but only after `delay`, so that
/// concurrent operations on one player overlap. Pinned payment methods are served instead of
/// the committed row, standing in for a read taken before some other update.
pub struct InterleavingStore {
    inner: InMemoryLedgerStore,
    delay: Duration,
    pinned_methods: Mutex<HashMap<String, PaymentMethod>>,
}

impl InterleavingStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryLedgerStore::new(),
            delay,
            pinned_methods: Mutex::new(HashMap::new()),
        }
    }

    pub fn pin_payment_method(&self, method: PaymentMethod) {
        self.pinned_methods
            .lock()
            .unwrap()
            .insert(method.id.clone(), method);
    }
}

#[async_trait]
impl LedgerStore for InterleavingStore {
    async fn tee_time(&self, id: &str) -> Result<Option<TeeTime>> {
        self.inner.tee_time(id).await
    }

    async fn slot(&self, id: &str) -> Result<Option<Slot>> {
        self.inner.slot(id).await
    }

    async fn slots(&self) -> Result<Vec<Slot>> {
        self.inner.slots().await
    }

    async fn slots_for_tee_time(&self, tee_time_id: &str) -> Result<Vec<Slot>> {
        self.inner.slots_for_tee_time(tee_time_id).await
    }

    async fn line_item(&self, id: &str) -> Result<Option<LineItem>> {
        self.inner.line_item(id).await
    }

    async fn line_items_owned_by(&self, player_id: &str) -> Result<Vec<LineItem>> {
        self.inner.line_items_owned_by(player_id).await
    }

    async fn line_items_transferred_from(&self, player_id: &str) -> Result<Vec<LineItem>> {
        self.inner.line_items_transferred_from(player_id).await
    }

    async fn payment_method(&self, id: &str) -> Result<Option<PaymentMethod>> {
        let pinned = self.pinned_methods.lock().unwrap().get(id).cloned();
        match pinned {
            Some(method) => Ok(Some(method)),
            None => self.inner.payment_method(id).await,
        }
    }

    async fn payment_methods(&self, club_id: &str) -> Result<Vec<PaymentMethod>> {
        self.inner.payment_methods(club_id).await
    }

    async fn transaction(&self, id: &str) -> Result<Option<PaymentTransaction>> {
        self.inner.transaction(id).await
    }

    async fn transaction_by_number(
        &self,
        club_id: &str,
        number: &str,
    ) -> Result<Option<PaymentTransaction>> {
        self.inner.transaction_by_number(club_id, number).await
    }

    async fn transaction_by_idempotency_key(
        &self,
        club_id: &str,
        key: &str,
    ) -> Result<Option<PaymentTransaction>> {
        self.inner.transaction_by_idempotency_key(club_id, key).await
    }

    async fn check_in_record(&self, slot_id: &str) -> Result<Option<CheckInRecord>> {
        let record = self.inner.check_in_record(slot_id).await;
        tokio::time::sleep(self.delay).await;
        record
    }

    async fn allocate_transaction_sequence(&self, club_id: &str, year: i32) -> Result<u32> {
        self.inner.allocate_transaction_sequence(club_id, year).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.inner.commit(batch).await
    }
}
