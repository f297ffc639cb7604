use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::cookie::Cookie;
use crate::error::Result;
use crate::session::store::{IdSessionStorage, SessionDataStore};
use crate::session::SessionData;

struct Entry {
    data: SessionData,
    expires: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at < now)
    }
}

/// In-process session data, keyed by random UUIDs.
///
/// Everything is lost on restart; meant for development and tests.
#[derive(Default)]
pub struct MemoryDataStore {
    entries: DashMap<String, Entry>,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SessionDataStore for MemoryDataStore {
    async fn create_data(
        &self,
        data: &SessionData,
        expires: Option<DateTime<Utc>>,
    ) -> Result<String> {
        loop {
            let id = uuid::Uuid::new_v4().to_string();
            if !self.entries.contains_key(&id) {
                self.update_data(&id, data, expires).await?;
                return Ok(id);
            }
        }
    }

    async fn read_data(&self, id: &str) -> Result<Option<SessionData>> {
        let now = Utc::now();
        if let Some(entry) = self.entries.get(id) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.data.clone()));
            }
        }
        self.entries.remove_if(id, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn update_data(
        &self,
        id: &str,
        data: &SessionData,
        expires: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.entries.insert(
            id.to_string(),
            Entry {
                data: data.clone(),
                expires,
            },
        );
        Ok(())
    }

    async fn delete_data(&self, id: &str) -> Result<()> {
        self.entries.remove(id);
        Ok(())
    }
}

/// Id-cookie session storage backed by a [`MemoryDataStore`].
pub fn memory_session_storage(cookie: Cookie) -> IdSessionStorage<MemoryDataStore> {
    IdSessionStorage::new(cookie, MemoryDataStore::new())
}
