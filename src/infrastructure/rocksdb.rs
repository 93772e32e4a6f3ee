use crate::domain::ports::RecordStore;
use crate::domain::records::{
    NewPlatformCard, NewPlatformCustomer, NewSubscription, PlatformCard, PlatformCustomer,
    ProjectId, RecordId, RecordKind, SaveOptions, Subscription, UserId,
};
use crate::error::{DonationError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for store bookkeeping (the record id sequence).
pub const CF_META: &str = "meta";

/// Column Family mapping owners to record ids.
///
/// Keys are `<kind>/<owner id><record id>` with both ids big-endian, so a
/// prefix scan yields one owner's records in creation order. Customers and
/// cards are owned by their user, subscriptions by their project.
pub const CF_INDEX: &str = "index";

const LAST_ID_KEY: &[u8] = b"last_id";

fn index_prefix(kind: RecordKind, owner: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(kind.as_str().len() + 17);
    key.extend_from_slice(kind.as_str().as_bytes());
    key.push(b'/');
    key.extend_from_slice(&owner.to_be_bytes());
    key
}

fn index_key(kind: RecordKind, owner: u64, id: RecordId) -> Vec<u8> {
    let mut key = index_prefix(kind, owner);
    key.extend_from_slice(&id.0.to_be_bytes());
    key
}

/// A persistent record store using RocksDB.
///
/// Each `RecordKind` lives in its own Column Family named after the entity
/// type, keyed by the big-endian record id. Values are JSON. Lookups by user
/// or project go through `CF_INDEX`.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    writes: Arc<Mutex<()>>,
}

fn internal(message: String) -> DonationError {
    DonationError::InternalError(Box::new(std::io::Error::other(message)))
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating the
    /// column families that are missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let mut families: Vec<ColumnFamilyDescriptor> = RecordKind::ALL
            .iter()
            .map(|kind| ColumnFamilyDescriptor::new(kind.as_str(), Options::default()))
            .collect();
        families.push(ColumnFamilyDescriptor::new(CF_META, Options::default()));
        families.push(ColumnFamilyDescriptor::new(CF_INDEX, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            writes: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| internal(format!("Column family {} not found", name)))
    }

    /// Allocates the next record id. Callers must hold `writes`.
    fn next_id(&self) -> Result<RecordId> {
        let meta = self.cf(CF_META)?;
        let last = match self.db.get_cf(meta, LAST_ID_KEY)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| internal("Corrupt record id sequence".to_string()))?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = last + 1;
        self.db.put_cf(meta, LAST_ID_KEY, next.to_be_bytes())?;
        Ok(RecordId(next))
    }

    /// Writes a record and its index entry atomically.
    fn put<T: Serialize>(
        &self,
        kind: RecordKind,
        owner: u64,
        id: RecordId,
        value: &T,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(kind.as_str())?, id.0.to_be_bytes(), bytes);
        batch.put_cf(self.cf(CF_INDEX)?, index_key(kind, owner, id), b"");
        self.db.write(batch)?;
        Ok(())
    }

    /// Records of one kind belonging to `owner`, in id order.
    fn owned<T: DeserializeOwned>(&self, kind: RecordKind, owner: u64) -> Result<Vec<T>> {
        let index = self.cf(CF_INDEX)?;
        let records = self.cf(kind.as_str())?;
        let prefix = index_prefix(kind, owner);

        let mut values = Vec::new();
        let iter = self
            .db
            .iterator_cf(index, IteratorMode::From(prefix.as_slice(), Direction::Forward));
        for item in iter {
            let (key, _) = item.map_err(|e| internal(format!("RocksDB iteration error: {}", e)))?;
            let Some(id) = key.strip_prefix(prefix.as_slice()) else {
                break;
            };
            let value = self.db.get_cf(records, id)?.ok_or_else(|| {
                internal(format!("Index entry for missing {} record", kind))
            })?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }
}

#[async_trait]
impl RecordStore for RocksDBStore {
    async fn save_customer(&self, customer: NewPlatformCustomer) -> Result<PlatformCustomer> {
        let _writes = self.writes.lock().await;
        if !self
            .owned::<PlatformCustomer>(RecordKind::PlatformCustomer, customer.user.0)?
            .is_empty()
        {
            return Err(DonationError::ValidationError(format!(
                "User {} already has a platform customer",
                customer.user
            )));
        }

        let saved = PlatformCustomer {
            id: self.next_id()?,
            email: customer.email,
            user: customer.user,
        };
        self.put(RecordKind::PlatformCustomer, saved.user.0, saved.id, &saved)?;
        Ok(saved)
    }

    async fn save_card(&self, card: NewPlatformCard) -> Result<PlatformCard> {
        let _writes = self.writes.lock().await;
        let saved = PlatformCard {
            id: self.next_id()?,
            stripe_token: card.stripe_token,
            user: card.user,
        };
        self.put(RecordKind::PlatformCard, saved.user.0, saved.id, &saved)?;
        Ok(saved)
    }

    async fn save_subscription(
        &self,
        subscription: NewSubscription,
        options: &SaveOptions,
    ) -> Result<Subscription> {
        let _writes = self.writes.lock().await;
        let saved = Subscription {
            id: self.next_id()?,
            quantity: subscription.quantity,
            user: subscription.user,
        };
        self.put(
            RecordKind::Subscription,
            options.project_id.0,
            saved.id,
            &saved,
        )?;
        Ok(saved)
    }

    async fn customer_for_user(&self, user: UserId) -> Result<Option<PlatformCustomer>> {
        Ok(self
            .owned::<PlatformCustomer>(RecordKind::PlatformCustomer, user.0)?
            .into_iter()
            .next())
    }

    async fn cards_for_user(&self, user: UserId) -> Result<Vec<PlatformCard>> {
        self.owned(RecordKind::PlatformCard, user.0)
    }

    async fn subscriptions_for_project(&self, project: ProjectId) -> Result<Vec<Subscription>> {
        self.owned(RecordKind::Subscription, project.0)
    }

    async fn count(&self, kind: RecordKind) -> Result<usize> {
        let cf = self.cf(kind.as_str())?;
        let mut count = 0;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item.map_err(|e| internal(format!("RocksDB iteration error: {}", e)))?;
            count += 1;
        }
        Ok(count)
    }
}
