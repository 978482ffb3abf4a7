use crate::database::{Database, DbError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub user_id: u64,
    pub guild_id: u64,
}

impl RecordKey {
    pub fn new(user_id: u64, guild_id: u64) -> Self {
        Self { user_id, guild_id }
    }
}

/// An open voice session. Only exists while the user is connected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTimer {
    pub user_id: u64,
    pub guild_id: u64,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceTotal {
    pub id: u64,
    pub user_id: u64,
    pub guild_id: u64,
    pub time: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedTotal {
    pub total: VoiceTotal,
    /// 1-based place on the guild leaderboard.
    pub position: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    pub timers: usize,
    pub totals: usize,
}

#[derive(Default, Serialize, Deserialize, Clone, Debug)]
pub struct VoiceDatabase {
    pub timers: HashMap<RecordKey, SessionTimer>,
    pub totals: HashMap<RecordKey, VoiceTotal>,
    pub next_total_id: u64,
}

impl VoiceDatabase {
    /// Adds `elapsed` to the user's total, creating the record on first use.
    fn credit(&mut self, key: RecordKey, elapsed: Duration) -> VoiceTotal {
        if let Some(total) = self.totals.get_mut(&key) {
            total.time += elapsed;
            return total.clone();
        }

        let total = VoiceTotal {
            id: self.next_total_id,
            user_id: key.user_id,
            guild_id: key.guild_id,
            time: elapsed,
        };
        self.next_total_id += 1;
        self.totals.insert(key, total.clone());
        total
    }
}

pub type VoiceStore = Database<VoiceDatabase>;

impl VoiceStore {
    pub async fn find_timer(&self, key: RecordKey) -> Option<SessionTimer> {
        self.read(|db| db.timers.get(&key).cloned()).await
    }

    /// Returns `false` without touching the store when a timer already exists.
    pub async fn insert_timer(&self, key: RecordKey, started_at: DateTime<Utc>) -> Result<bool, DbError> {
        if self.read(|db| db.timers.contains_key(&key)).await {
            return Ok(false);
        }

        self.transaction(|db| {
            if db.timers.contains_key(&key) {
                return Ok(false);
            }
            db.timers.insert(
                key,
                SessionTimer {
                    user_id: key.user_id,
                    guild_id: key.guild_id,
                    started_at,
                },
            );
            Ok(true)
        })
        .await
    }

    pub async fn find_total(&self, key: RecordKey) -> Option<VoiceTotal> {
        self.read(|db| db.totals.get(&key).cloned()).await
    }

    /// Removes the open timer and credits the elapsed time in one
    /// transaction. `None` when no timer is open, in which case nothing is
    /// written.
    pub async fn close_session(
        &self,
        key: RecordKey,
        now: DateTime<Utc>,
    ) -> Result<Option<(Duration, VoiceTotal)>, DbError> {
        if self.find_timer(key).await.is_none() {
            return Ok(None);
        }

        self.transaction(|db| {
            let Some(timer) = db.timers.remove(&key) else {
                return Ok(None);
            };
            let elapsed = (now - timer.started_at).to_std().unwrap_or_default();
            Ok(Some((elapsed, db.credit(key, elapsed))))
        })
        .await
    }

    /// Replaces the stored time. Returns `false` if the user has no total.
    pub async fn overwrite_time(&self, key: RecordKey, time: Duration) -> Result<bool, DbError> {
        if self.find_total(key).await.is_none() {
            return Ok(false);
        }

        self.transaction(|db| match db.totals.get_mut(&key) {
            Some(total) => {
                total.time = time;
                Ok(true)
            }
            None => Ok(false),
        })
        .await
    }

    /// Every total in the guild, longest first. Ties keep creation order.
    pub async fn guild_totals_sorted(&self, guild_id: u64) -> Vec<VoiceTotal> {
        let mut totals: Vec<VoiceTotal> = self
            .read(|db| {
                db.totals
                    .values()
                    .filter(|t| t.guild_id == guild_id)
                    .cloned()
                    .collect()
            })
            .await;

        totals.sort_by(|a, b| b.time.cmp(&a.time).then(a.id.cmp(&b.id)));
        totals
    }

    pub async fn delete_guild(&self, guild_id: u64) -> Result<ResetSummary, DbError> {
        self.transaction(|db| {
            let timers = db.timers.len();
            db.timers.retain(|key, _| key.guild_id != guild_id);
            let totals = db.totals.len();
            db.totals.retain(|key, _| key.guild_id != guild_id);

            Ok(ResetSummary {
                timers: timers - db.timers.len(),
                totals: totals - db.totals.len(),
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::temp_path;

    async fn store() -> VoiceStore {
        Database::new(temp_path("store")).await.unwrap()
    }

    async fn credit(store: &VoiceStore, key: RecordKey, secs: u64) -> VoiceTotal {
        store
            .transaction(|db| Ok(db.credit(key, Duration::from_secs(secs))))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn insert_timer_is_idempotent() {
        let store = store().await;
        let key = RecordKey::new(1, 10);
        let first = Utc::now();

        assert!(store.insert_timer(key, first).await.unwrap());
        assert!(!store.insert_timer(key, first + chrono::Duration::seconds(5)).await.unwrap());
        assert_eq!(store.find_timer(key).await.unwrap().started_at, first);
    }

    #[tokio::test]
    async fn credit_creates_then_increments() {
        let store = store().await;
        let key = RecordKey::new(1, 10);

        let created = credit(&store, key, 30).await;
        let updated = credit(&store, key, 45).await;

        assert_eq!(created.id, updated.id);
        assert_eq!(updated.time, Duration::from_secs(75));
    }

    #[tokio::test]
    async fn ties_keep_creation_order() {
        let store = store().await;
        for user in [3, 1, 2] {
            credit(&store, RecordKey::new(user, 10), 60).await;
        }

        let users: Vec<u64> = store
            .guild_totals_sorted(10)
            .await
            .iter()
            .map(|t| t.user_id)
            .collect();
        assert_eq!(users, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn overwrite_time_skips_missing_users() {
        let store = store().await;
        let key = RecordKey::new(1, 10);

        assert!(!store.overwrite_time(key, Duration::from_secs(10)).await.unwrap());
        assert!(store.find_total(key).await.is_none());

        credit(&store, key, 500).await;
        assert!(store.overwrite_time(key, Duration::from_secs(10)).await.unwrap());
        assert_eq!(store.find_total(key).await.unwrap().time, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn close_session_moves_time_from_timer_to_total() {
        let store = store().await;
        let key = RecordKey::new(1, 10);
        let start = Utc::now();
        store.insert_timer(key, start).await.unwrap();

        let (elapsed, total) = store
            .close_session(key, start + chrono::Duration::seconds(90))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(elapsed, Duration::from_secs(90));
        assert_eq!(total.time, Duration::from_secs(90));
        assert!(store.find_timer(key).await.is_none());
        assert_eq!(store.find_total(key).await, Some(total));
    }

    #[tokio::test]
    async fn close_session_without_timer_writes_nothing() {
        let store = store().await;
        let key = RecordKey::new(1, 10);
        store.insert_timer(key, Utc::now()).await.unwrap();
        store.delete_guild(10).await.unwrap();

        assert!(store.close_session(key, Utc::now()).await.unwrap().is_none());
        assert!(store.find_total(key).await.is_none());
    }

    #[tokio::test]
    async fn failed_close_keeps_the_open_session() {
        let path = temp_path("close-fail");
        let store: VoiceStore = Database::new(path.clone()).await.unwrap();
        let key = RecordKey::new(1, 10);
        let start = Utc::now();
        store.insert_timer(key, start).await.unwrap();

        // A directory at the snapshot path makes every later save fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let result = store
            .close_session(key, start + chrono::Duration::seconds(30))
            .await;

        assert!(result.is_err());
        assert_eq!(store.find_timer(key).await.map(|t| t.started_at), Some(start));
        assert!(store.find_total(key).await.is_none());
        let _ = std::fs::remove_dir(&path);
        let _ = std::fs::remove_file(format!("{}.tmp", path));
    }
}
