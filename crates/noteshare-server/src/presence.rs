//! Best-effort record of who logged in recently.
//!
//! Presence is telemetry only. It is never consulted for authorization, it
//! does not survive a restart, and separate instances keep separate views.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use noteshare_core::db::unix_timestamp;

#[async_trait]
pub trait PresenceTracker: Send + Sync {
    async fn mark(&self, username: &str);

    /// Usernames seen within the retention window, sorted.
    async fn snapshot(&self) -> Vec<String>;
}

/// Process-local presence with a fixed retention window.
pub struct InMemoryPresence {
    ttl_secs: i64,
    seen: RwLock<HashMap<String, i64>>,
}

impl InMemoryPresence {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl_secs,
            seen: RwLock::new(HashMap::new()),
        }
    }

    async fn mark_at(&self, username: &str, now: i64) {
        let mut seen = self.seen.write().await;
        seen.insert(username.to_string(), now);
        let ttl = self.ttl_secs;
        seen.retain(|_, last| now - *last < ttl);
    }

    async fn snapshot_at(&self, now: i64) -> Vec<String> {
        let seen = self.seen.read().await;
        let mut names: Vec<String> = seen
            .iter()
            .filter(|(_, last)| now - **last < self.ttl_secs)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl PresenceTracker for InMemoryPresence {
    async fn mark(&self, username: &str) {
        self.mark_at(username, unix_timestamp()).await;
    }

    async fn snapshot(&self) -> Vec<String> {
        self.snapshot_at(unix_timestamp()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn marks_are_deduplicated_and_sorted() {
        let presence = InMemoryPresence::new(3600);
        presence.mark("bob").await;
        presence.mark("alice").await;
        presence.mark("bob").await;
        assert_eq!(presence.snapshot().await, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn stale_entries_drop_out() {
        let presence = InMemoryPresence::new(60);
        presence.mark_at("alice", 1_000).await;
        presence.mark_at("bob", 1_030).await;

        assert_eq!(presence.snapshot_at(1_059).await, vec!["alice", "bob"]);
        assert_eq!(presence.snapshot_at(1_060).await, vec!["bob"]);

        // A later mark prunes the stale entry from the map itself.
        presence.mark_at("carol", 1_100).await;
        assert_eq!(presence.seen.read().await.len(), 1);
    }
}
