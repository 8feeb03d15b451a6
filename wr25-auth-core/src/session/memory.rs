use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

use super::{SessionRecord, SessionStore};
use crate::Result;

/// In-process session store
///
/// Sessions are lost on restart and not shared between nodes.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Cache<String, SessionRecord>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().build(),
        }
    }

    /// Store whose sessions expire after `idle` without being read or written.
    #[must_use]
    pub fn with_idle_timeout(idle: Duration) -> Self {
        Self {
            inner: Cache::builder().time_to_idle(idle).build(),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.inner.get(id).await)
    }

    async fn save(&self, id: &str, record: SessionRecord) -> Result<()> {
        self.inner.insert(id.to_string(), record).await;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.inner.remove(id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::User;

    #[tokio::test]
    async fn test_save_load_remove() {
        let store = MemoryStore::new();
        assert!(store.load("missing").await.unwrap().is_none());

        let mut record = SessionRecord::new();
        record.set_user(User {
            nick_name: "Jane Doe".to_string(),
            ..User::default()
        });
        store.save("sid", record.clone()).await.unwrap();

        assert_eq!(store.load("sid").await.unwrap(), Some(record.clone()));
        assert_eq!(store.remove("sid").await.unwrap(), Some(record));
        assert!(store.load("sid").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let store = MemoryStore::with_idle_timeout(Duration::from_millis(50));
        store.save("sid", SessionRecord::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.load("sid").await.unwrap().is_none());
    }
}
