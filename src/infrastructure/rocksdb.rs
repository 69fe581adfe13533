use crate::domain::batch::{LedgerView, Write, WriteBatch};
use crate::domain::check_in::CheckInRecord;
use crate::domain::line_item::LineItem;
use crate::domain::payment::{PaymentMethod, PaymentTransaction};
use crate::domain::ports::LedgerStore;
use crate::domain::roster::{Slot, TeeTime};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const CF_TEE_TIMES: &str = "tee_times";
pub const CF_SLOTS: &str = "slots";
pub const CF_LINE_ITEMS: &str = "line_items";
pub const CF_PAYMENT_METHODS: &str = "payment_methods";
pub const CF_TRANSACTIONS: &str = "transactions";
pub const CF_CHECK_INS: &str = "check_ins";
/// Per-club, per-year transaction counters, keyed `club_id:year`.
pub const CF_SEQUENCES: &str = "sequences";

const COLUMN_FAMILIES: [&str; 7] = [
    CF_TEE_TIMES,
    CF_SLOTS,
    CF_LINE_ITEMS,
    CF_PAYMENT_METHODS,
    CF_TRANSACTIONS,
    CF_CHECK_INS,
    CF_SEQUENCES,
];

/// A persistent ledger backed by RocksDB, one column family per entity.
///
/// Values are JSON. Commits and counter increments are serialized by one async mutex: guards
/// are read while it is held and the writes land as a single `rocksdb::WriteBatch`, so no
/// other commit can slip in between verification and write. Clones share the database.
#[derive(Clone)]
pub struct RocksDBLedgerStore {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDBLedgerStore {
    /// Opens or creates the database at `path`, creating missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            LedgerError::InternalError(Box::new(std::io::Error::other(format!(
                "Column family {} not found",
                name
            ))))
        })
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &str) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key.as_bytes())? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for entry in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = entry?;
            values.push(decode(&value)?);
        }
        Ok(values)
    }

    fn find_transaction(
        &self,
        predicate: impl Fn(&PaymentTransaction) -> bool,
    ) -> Result<Option<PaymentTransaction>> {
        Ok(self
            .scan::<PaymentTransaction>(CF_TRANSACTIONS)?
            .into_iter()
            .find(|t| predicate(t)))
    }

    fn club_payment_methods(&self, club_id: &str) -> Result<Vec<PaymentMethod>> {
        let mut methods: Vec<PaymentMethod> = self
            .scan::<PaymentMethod>(CF_PAYMENT_METHODS)?
            .into_iter()
            .filter(|m| m.club_id == club_id)
            .collect();
        methods.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.id.cmp(&b.id)));
        Ok(methods)
    }

    fn stage(&self, batch: &mut rocksdb::WriteBatch, write: Write) -> Result<()> {
        match write {
            Write::PutLineItem(item) => put(batch, self.cf(CF_LINE_ITEMS)?, &item.id, &item),
            Write::DeleteLineItem(id) => {
                batch.delete_cf(self.cf(CF_LINE_ITEMS)?, id.as_bytes());
                Ok(())
            }
            Write::PutTransaction(tx) => put(batch, self.cf(CF_TRANSACTIONS)?, &tx.id, &tx),
            Write::PutPaymentMethod(method) => {
                put(batch, self.cf(CF_PAYMENT_METHODS)?, &method.id, &method)
            }
            Write::DeletePaymentMethod(id) => {
                batch.delete_cf(self.cf(CF_PAYMENT_METHODS)?, id.as_bytes());
                Ok(())
            }
            Write::PutTeeTime(tee_time) => {
                put(batch, self.cf(CF_TEE_TIMES)?, &tee_time.id, &tee_time)
            }
            Write::PutSlot(slot) => put(batch, self.cf(CF_SLOTS)?, &slot.id, &slot),
            Write::PutCheckInRecord(record) => {
                put(batch, self.cf(CF_CHECK_INS)?, &record.slot_id, &record)
            }
        }
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        LedgerError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

fn put<T: Serialize>(
    batch: &mut rocksdb::WriteBatch,
    cf: &ColumnFamily,
    key: &str,
    value: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec(value).map_err(|e| {
        LedgerError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })?;
    batch.put_cf(cf, key.as_bytes(), bytes);
    Ok(())
}

/// Committed state as seen by guards while the commit lock is held.
struct CommittedView<'a>(&'a RocksDBLedgerStore);

impl LedgerView for CommittedView<'_> {
    fn slot(&self, id: &str) -> Result<Option<Slot>> {
        self.0.get(CF_SLOTS, id)
    }

    fn line_item(&self, id: &str) -> Result<Option<LineItem>> {
        self.0.get(CF_LINE_ITEMS, id)
    }

    fn transaction(&self, id: &str) -> Result<Option<PaymentTransaction>> {
        self.0.get(CF_TRANSACTIONS, id)
    }

    fn transaction_by_number(
        &self,
        club_id: &str,
        number: &str,
    ) -> Result<Option<PaymentTransaction>> {
        self.0
            .find_transaction(|t| t.club_id == club_id && t.transaction_number == number)
    }

    fn transaction_by_idempotency_key(
        &self,
        club_id: &str,
        key: &str,
    ) -> Result<Option<PaymentTransaction>> {
        self.0.find_transaction(|t| {
            t.club_id == club_id && t.idempotency_key.as_deref() == Some(key)
        })
    }

    fn payment_method(&self, id: &str) -> Result<Option<PaymentMethod>> {
        self.0.get(CF_PAYMENT_METHODS, id)
    }

    fn payment_methods(&self, club_id: &str) -> Result<Vec<PaymentMethod>> {
        self.0.club_payment_methods(club_id)
    }

    fn check_in_record(&self, slot_id: &str) -> Result<Option<CheckInRecord>> {
        self.0.get(CF_CHECK_INS, slot_id)
    }
}

#[async_trait]
impl LedgerStore for RocksDBLedgerStore {
    async fn tee_time(&self, id: &str) -> Result<Option<TeeTime>> {
        self.get(CF_TEE_TIMES, id)
    }

    async fn slot(&self, id: &str) -> Result<Option<Slot>> {
        self.get(CF_SLOTS, id)
    }

    async fn slots(&self) -> Result<Vec<Slot>> {
        self.scan(CF_SLOTS)
    }

    async fn slots_for_tee_time(&self, tee_time_id: &str) -> Result<Vec<Slot>> {
        let mut slots: Vec<Slot> = self
            .scan::<Slot>(CF_SLOTS)?
            .into_iter()
            .filter(|s| s.tee_time_id == tee_time_id)
            .collect();
        slots.sort_by_key(|s| s.position);
        Ok(slots)
    }

    async fn line_item(&self, id: &str) -> Result<Option<LineItem>> {
        self.get(CF_LINE_ITEMS, id)
    }

    async fn line_items_owned_by(&self, player_id: &str) -> Result<Vec<LineItem>> {
        Ok(self
            .scan::<LineItem>(CF_LINE_ITEMS)?
            .into_iter()
            .filter(|i| i.owner_player_id == player_id)
            .collect())
    }

    async fn line_items_transferred_from(&self, player_id: &str) -> Result<Vec<LineItem>> {
        Ok(self
            .scan::<LineItem>(CF_LINE_ITEMS)?
            .into_iter()
            .filter(|i| {
                i.is_transferred
                    && i.owner_player_id != player_id
                    && (i.original_player_id.as_deref() == Some(player_id)
                        || i.transferred_from_player_id.as_deref() == Some(player_id))
            })
            .collect())
    }

    async fn payment_method(&self, id: &str) -> Result<Option<PaymentMethod>> {
        self.get(CF_PAYMENT_METHODS, id)
    }

    async fn payment_methods(&self, club_id: &str) -> Result<Vec<PaymentMethod>> {
        self.club_payment_methods(club_id)
    }

    async fn transaction(&self, id: &str) -> Result<Option<PaymentTransaction>> {
        self.get(CF_TRANSACTIONS, id)
    }

    async fn transaction_by_number(
        &self,
        club_id: &str,
        number: &str,
    ) -> Result<Option<PaymentTransaction>> {
        CommittedView(self).transaction_by_number(club_id, number)
    }

    async fn transaction_by_idempotency_key(
        &self,
        club_id: &str,
        key: &str,
    ) -> Result<Option<PaymentTransaction>> {
        CommittedView(self).transaction_by_idempotency_key(club_id, key)
    }

    async fn check_in_record(&self, slot_id: &str) -> Result<Option<CheckInRecord>> {
        self.get(CF_CHECK_INS, slot_id)
    }

    async fn allocate_transaction_sequence(&self, club_id: &str, year: i32) -> Result<u32> {
        let _guard = self.commit_lock.lock().await;
        let cf = self.cf(CF_SEQUENCES)?;
        let key = format!("{}:{}", club_id, year);

        let current = match self.db.get_pinned_cf(cf, key.as_bytes())? {
            Some(bytes) => {
                let raw: [u8; 4] = bytes.as_ref().try_into().map_err(|_| {
                    LedgerError::IntegrityFault(format!("Corrupt sequence counter {}", key))
                })?;
                u32::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = current + 1;
        self.db.put_cf(cf, key.as_bytes(), next.to_be_bytes())?;
        Ok(next)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        batch.verify(&CommittedView(self))?;

        let mut staged = rocksdb::WriteBatch::default();
        for write in batch.writes {
            self.stage(&mut staged, write)?;
        }
        self.db.write(&staged)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::Guard;
    use crate::domain::line_item::{LineItemType, NewLineItem};
    use crate::domain::money::Money;
    use crate::domain::tax::TaxType;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn item(id: &str) -> LineItem {
        LineItem::create(
            id.to_string(),
            "tt-1".to_string(),
            NewLineItem {
                player_id: "p1".to_string(),
                r#type: LineItemType::Caddy,
                description: "Caddy".to_string(),
                base_amount: Money::new(dec!(300)),
                tax_type: TaxType::Include,
                tax_rate: dec!(7),
                quantity: 1,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBLedgerStore::open(dir.path()).expect("Failed to open RocksDB");
        for name in COLUMN_FAMILIES {
            assert!(store.db.cf_handle(name).is_some(), "missing {}", name);
        }
    }

    #[tokio::test]
    async fn test_commit_and_read_back() {
        let dir = tempdir().unwrap();
        let store = RocksDBLedgerStore::open(dir.path()).unwrap();

        let mut batch = WriteBatch::new();
        batch.write(Write::PutLineItem(item("li-1")));
        store.commit(batch).await.unwrap();

        let stored = store.line_item("li-1").await.unwrap().unwrap();
        assert_eq!(stored, item("li-1"));
        assert_eq!(store.line_items_owned_by("p1").await.unwrap().len(), 1);
        assert!(store.line_item("li-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_guard_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = RocksDBLedgerStore::open(dir.path()).unwrap();

        let mut batch = WriteBatch::new();
        batch
            .guard(Guard::LineItemState {
                id: "missing".to_string(),
                is_paid: false,
                is_transferred: false,
            })
            .write(Write::PutLineItem(item("li-1")));
        assert!(store.commit(batch).await.is_err());
        assert!(store.line_item("li-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sequence_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDBLedgerStore::open(dir.path()).unwrap();
            assert_eq!(store.allocate_transaction_sequence("club-1", 2026).await.unwrap(), 1);
            assert_eq!(store.allocate_transaction_sequence("club-1", 2026).await.unwrap(), 2);
            assert_eq!(store.allocate_transaction_sequence("club-2", 2026).await.unwrap(), 1);
        }
        let store = RocksDBLedgerStore::open(dir.path()).unwrap();
        assert_eq!(store.allocate_transaction_sequence("club-1", 2026).await.unwrap(), 3);
        assert_eq!(store.allocate_transaction_sequence("club-1", 2027).await.unwrap(), 1);
    }
}
