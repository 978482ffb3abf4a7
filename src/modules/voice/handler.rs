use super::tracker::{VoiceStateChange, VoiceTracker};
use crate::events::EventHandler;
use async_trait::async_trait;
use poise::serenity_prelude::{Context, FullEvent, VoiceState};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct VoiceHandler {
    tracker: Arc<VoiceTracker>,
}

impl VoiceHandler {
    pub fn new(tracker: Arc<VoiceTracker>) -> Self {
        Self { tracker }
    }
}

fn voice_change(old: Option<&VoiceState>, new: &VoiceState) -> Option<VoiceStateChange> {
    let guild_id = new.guild_id.or_else(|| old.and_then(|s| s.guild_id))?;
    let user = new.member.as_ref().map(|m| &m.user);

    Some(VoiceStateChange {
        user_id: new.user_id.get(),
        guild_id: guild_id.get(),
        user_tag: user.map_or_else(|| new.user_id.to_string(), |u| u.tag()),
        is_bot: user.is_some_and(|u| u.bot),
        old_channel: old.and_then(|s| s.channel_id).map(|c| c.get()),
        new_channel: new.channel_id.map(|c| c.get()),
    })
}

#[async_trait]
impl EventHandler for VoiceHandler {
    fn name(&self) -> &str {
        "VoiceTime"
    }

    async fn handle(
        &self,
        _ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let FullEvent::VoiceStateUpdate { old, new } = event else {
            return Ok(());
        };

        let Some(change) = voice_change(old.as_ref(), new) else {
            trace!("Ignoring voice state without a guild for {}", new.user_id);
            return Ok(());
        };

        let outcome = self.tracker.handle_voice_update(&change).await?;
        trace!(
            "Voice update for {} in {}: {:?}",
            change.user_id,
            change.guild_id,
            outcome
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const USER: u64 = 200_000_000_000_000_001;
    const GUILD: u64 = 300_000_000_000_000_001;

    fn state(guild: Option<u64>, channel: Option<u64>, bot: bool) -> VoiceState {
        let member = guild.map(|guild_id| {
            json!({
                "user": {
                    "id": USER.to_string(),
                    "username": "tester",
                    "discriminator": "0001",
                    "global_name": null,
                    "avatar": null,
                    "bot": bot,
                },
                "guild_id": guild_id.to_string(),
                "nick": null,
                "avatar": null,
                "roles": [],
                "joined_at": "2024-01-01T00:00:00.000000+00:00",
                "premium_since": null,
                "deaf": false,
                "mute": false,
                "flags": 0,
                "pending": false,
            })
        });

        serde_json::from_value(json!({
            "guild_id": guild.map(|g| g.to_string()),
            "channel_id": channel.map(|c| c.to_string()),
            "user_id": USER.to_string(),
            "member": member,
            "session_id": "f00dfeed",
            "deaf": false,
            "mute": false,
            "self_deaf": false,
            "self_mute": false,
            "self_stream": false,
            "self_video": false,
            "suppress": false,
            "request_to_speak_timestamp": null,
        }))
        .unwrap()
    }

    #[test]
    fn join_maps_ids_and_tag() {
        let change = voice_change(None, &state(Some(GUILD), Some(7), false)).unwrap();

        assert_eq!(
            change,
            VoiceStateChange {
                user_id: USER,
                guild_id: GUILD,
                user_tag: "tester#0001".to_string(),
                is_bot: false,
                old_channel: None,
                new_channel: Some(7),
            }
        );
    }

    #[test]
    fn leave_keeps_the_old_channel() {
        let old = state(Some(GUILD), Some(7), false);
        let change = voice_change(Some(&old), &state(Some(GUILD), None, false)).unwrap();

        assert_eq!(change.old_channel, Some(7));
        assert_eq!(change.new_channel, None);
    }

    #[test]
    fn move_carries_both_channels() {
        let old = state(Some(GUILD), Some(7), false);
        let change = voice_change(Some(&old), &state(Some(GUILD), Some(8), false)).unwrap();

        assert_eq!((change.old_channel, change.new_channel), (Some(7), Some(8)));
    }

    #[test]
    fn bot_flag_comes_from_the_member() {
        let change = voice_change(None, &state(Some(GUILD), Some(7), true)).unwrap();
        assert!(change.is_bot);
    }

    #[test]
    fn guild_falls_back_to_the_old_state() {
        let old = state(Some(GUILD), Some(7), false);
        let change = voice_change(Some(&old), &state(None, None, false)).unwrap();

        assert_eq!(change.guild_id, GUILD);
        assert_eq!(change.user_tag, USER.to_string());
        assert!(!change.is_bot);
    }

    #[test]
    fn states_without_a_guild_are_dropped() {
        assert!(voice_change(None, &state(None, Some(7), false)).is_none());
    }
}
