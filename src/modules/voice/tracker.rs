use super::database::{RankedTotal, RecordKey, ResetSummary, VoiceStore, VoiceTotal};
use crate::{config::TrackerConfig, database::DbError, utils::format_duration};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// One user's voice connection change inside a guild.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceStateChange {
    pub user_id: u64,
    pub guild_id: u64,
    pub user_tag: String,
    pub is_bot: bool,
    pub old_channel: Option<u64>,
    pub new_channel: Option<u64>,
}

impl VoiceStateChange {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.user_id, self.guild_id)
    }

    fn is_disconnect(&self) -> bool {
        self.old_channel.is_some() && self.new_channel.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceOutcome {
    /// Bot user while bots are not tracked.
    Ignored,
    Started,
    /// Already timing this user, or a move between channels.
    Continued,
    /// Left without a timer on record.
    NoTimer,
    Credited(Duration),
}

/// 1-based place of `user_id` on a sorted board. `None` when the user is
/// not on it, e.g. after a reset that landed between two reads.
fn rank_in(board: &[VoiceTotal], user_id: u64) -> Option<usize> {
    board.iter().position(|t| t.user_id == user_id).map(|idx| idx + 1)
}

#[derive(Debug)]
pub struct VoiceTracker {
    store: VoiceStore,
    config: TrackerConfig,
    locks: DashMap<RecordKey, Arc<Mutex<()>>>,
}

impl VoiceTracker {
    pub fn new(store: VoiceStore, config: TrackerConfig) -> Self {
        Self {
            store,
            config,
            locks: DashMap::new(),
        }
    }

    pub async fn handle_voice_update(&self, change: &VoiceStateChange) -> Result<VoiceOutcome, DbError> {
        self.handle_voice_update_at(change, Utc::now()).await
    }

    pub async fn handle_voice_update_at(
        &self,
        change: &VoiceStateChange,
        now: DateTime<Utc>,
    ) -> Result<VoiceOutcome, DbError> {
        if change.is_bot && !self.config.allow_bots {
            return Ok(VoiceOutcome::Ignored);
        }

        let key = change.key();
        let lock = self.locks.entry(key).or_default().clone();
        let outcome = {
            let _guard = lock.lock().await;
            self.apply(change, key, now).await
        };

        drop(lock);
        self.locks.remove_if(&key, |_, l| Arc::strong_count(l) == 1);
        outcome
    }

    async fn apply(
        &self,
        change: &VoiceStateChange,
        key: RecordKey,
        now: DateTime<Utc>,
    ) -> Result<VoiceOutcome, DbError> {
        if change.new_channel.is_some() {
            if self.store.insert_timer(key, now).await? {
                if self.config.debug {
                    info!("{} has joined a voice channel", change.user_tag);
                }
                return Ok(VoiceOutcome::Started);
            }
            return Ok(VoiceOutcome::Continued);
        }

        if !change.is_disconnect() {
            return Ok(VoiceOutcome::Continued);
        }

        if self.config.debug {
            info!("{} has left a voice channel", change.user_tag);
        }

        let Some((elapsed, total)) = self.store.close_session(key, now).await? else {
            debug!("No open session for {} in {}", change.user_id, change.guild_id);
            return Ok(VoiceOutcome::NoTimer);
        };

        if self.config.debug {
            info!("{} for {}", format_duration(elapsed, true), change.user_tag);
        }
        debug!(
            "User {} in {} now at {:?}",
            total.user_id, total.guild_id, total.time
        );

        Ok(VoiceOutcome::Credited(elapsed))
    }

    pub async fn leaderboard(&self, guild_id: u64) -> Vec<VoiceTotal> {
        self.store.guild_totals_sorted(guild_id).await
    }

    pub async fn user_data(&self, guild_id: u64, user_id: u64) -> Option<RankedTotal> {
        let total = self.store.find_total(RecordKey::new(user_id, guild_id)).await?;
        let position = rank_in(&self.leaderboard(guild_id).await, user_id)?;

        Some(RankedTotal { total, position })
    }

    pub async fn reset(&self, guild_id: u64) -> Result<ResetSummary, DbError> {
        let summary = self.store.delete_guild(guild_id).await?;
        info!(
            "Reset voice data for guild {}: {} timers, {} totals",
            guild_id, summary.timers, summary.totals
        );
        Ok(summary)
    }

    /// Overwrites a user's accumulated time. Users without a total are left
    /// alone and `false` is returned.
    pub async fn set_time(&self, guild_id: u64, user_id: u64, time: Duration) -> Result<bool, DbError> {
        let key = RecordKey::new(user_id, guild_id);
        let lock = self.locks.entry(key).or_default().clone();
        let updated = {
            let _guard = lock.lock().await;
            self.store.overwrite_time(key, time).await
        };

        drop(lock);
        self.locks.remove_if(&key, |_, l| Arc::strong_count(l) == 1);
        updated
    }
}
