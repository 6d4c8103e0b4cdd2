//! Identity store: messaging contact → events-platform person.
//!
//! The store is injected wherever it is needed instead of living in a
//! global, so handlers and tests can swap the backing implementation.

use anyhow::Result;
use async_trait::async_trait;
use shared_types::{ContactId, PersonId};
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::db::{self, person_map, DbPool};

/// Persistent mapping from contact id to person id.
///
/// Exactly one person per contact; writing an existing contact replaces
/// its person.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Insert or replace the person linked to `contact`.
    async fn upsert(&self, contact: &ContactId, person: &PersonId) -> Result<()>;

    /// The person linked to `contact`, if any.
    async fn person_for(&self, contact: &ContactId) -> Result<Option<PersonId>>;

    /// All mappings ordered by contact.
    async fn list(&self) -> Result<Vec<(ContactId, PersonId)>>;
}

/// SQLite-backed store used by the server and the CLI.
#[derive(Clone)]
pub struct SqliteIdentityStore {
    pool: DbPool,
}

impl SqliteIdentityStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (and create if needed) the database file at `path`.
    pub async fn open(path: &str) -> Result<Self> {
        let pool = db::establish_connection_pool(path, 4).await?;
        Ok(Self::new(pool))
    }

    /// Private in-memory database, mostly for tests.
    pub async fn in_memory() -> Result<Self> {
        let pool = db::establish_connection_pool(":memory:", 1).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn upsert(&self, contact: &ContactId, person: &PersonId) -> Result<()> {
        let phone = contact.as_str().to_string();
        let person = person.as_str().to_string();

        db::with_connection(&self.pool, move |conn| {
            person_map::upsert(conn, &phone, &person)
        })
        .await?;

        Ok(())
    }

    async fn person_for(&self, contact: &ContactId) -> Result<Option<PersonId>> {
        let phone = contact.as_str().to_string();

        let found =
            db::with_connection(&self.pool, move |conn| person_map::find_person(conn, &phone))
                .await?;

        Ok(found.map(PersonId::new))
    }

    async fn list(&self) -> Result<Vec<(ContactId, PersonId)>> {
        let rows = db::with_connection(&self.pool, person_map::list_all).await?;

        Ok(rows
            .into_iter()
            .filter_map(|(phone, person)| {
                ContactId::normalise(&phone).map(|contact| (contact, PersonId::new(person)))
            })
            .collect())
    }
}

/// Process-local store with the same semantics as the SQLite one.
#[derive(Default)]
pub struct MemoryIdentityStore {
    entries: Mutex<BTreeMap<ContactId, PersonId>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapping(self, contact: &str, person: &str) -> Self {
        if let Some(contact) = ContactId::normalise(contact) {
            self.lock().insert(contact, PersonId::new(person));
        }
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ContactId, PersonId>> {
        // A poisoned map is still a valid map.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn upsert(&self, contact: &ContactId, person: &PersonId) -> Result<()> {
        self.lock().insert(contact.clone(), person.clone());
        Ok(())
    }

    async fn person_for(&self, contact: &ContactId) -> Result<Option<PersonId>> {
        Ok(self.lock().get(contact).cloned())
    }

    async fn list(&self) -> Result<Vec<(ContactId, PersonId)>> {
        Ok(self
            .lock()
            .iter()
            .map(|(c, p)| (c.clone(), p.clone()))
            .collect())
    }
}
