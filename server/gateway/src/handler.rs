use std::sync::{Arc, OnceLock};

use serenity::all as sy;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vr_control::{UserId, VoiceMember, VoiceStateChange};

use crate::discord::channel_ref;

/// Serenity event handler that turns voice-state updates into [`VoiceStateChange`]s
/// and queues them for the controller.
pub struct Forwarder {
    tx: mpsc::Sender<VoiceStateChange>,
    identity: Arc<OnceLock<UserId>>,
}

impl Forwarder {
    pub fn new(tx: mpsc::Sender<VoiceStateChange>, identity: Arc<OnceLock<UserId>>) -> Self {
        Self { tx, identity }
    }
}

#[async_trait::async_trait]
impl sy::EventHandler for Forwarder {
    async fn ready(&self, _ctx: sy::Context, ready: sy::Ready) {
        info!(name = %ready.user.name, id = %ready.user.id, "logged in");
        let _ = self.identity.set(UserId(ready.user.id.get()));
    }

    async fn voice_state_update(
        &self,
        ctx: sy::Context,
        old: Option<sy::VoiceState>,
        new: sy::VoiceState,
    ) {
        let Some(ev) = to_change(&ctx.cache, old.as_ref(), &new) else {
            debug!(user = %new.user_id, "voice update outside a guild");
            return;
        };

        if self.tx.send(ev).await.is_err() {
            warn!("controller stopped, dropping voice event");
        }
    }
}

fn to_change(
    cache: &sy::Cache,
    old: Option<&sy::VoiceState>,
    new: &sy::VoiceState,
) -> Option<VoiceStateChange> {
    let guild = new.guild_id.or_else(|| old.and_then(|o| o.guild_id))?;

    let (display_name, bot) = match &new.member {
        Some(m) => (m.display_name().to_string(), m.user.bot),
        None => match cache.user(new.user_id) {
            Some(u) => (u.name.clone(), u.bot),
            None => (new.user_id.to_string(), false),
        },
    };

    let channel = |id: Option<sy::ChannelId>| id.map(|id| channel_ref(cache, guild, id));

    Some(VoiceStateChange {
        member: VoiceMember {
            id: UserId(new.user_id.get()),
            display_name,
            bot,
        },
        before: channel(old.and_then(|o| o.channel_id)),
        after: channel(new.channel_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vr_control::{ChannelId, GuildId};

    fn voice_state(
        guild: Option<&str>,
        channel: Option<&str>,
        member: serde_json::Value,
    ) -> sy::VoiceState {
        let mut v = json!({
            "guild_id": guild,
            "channel_id": channel,
            "user_id": "20",
            "session_id": "s1",
            "deaf": false,
            "mute": false,
            "self_deaf": false,
            "self_mute": false,
            "self_stream": false,
            "self_video": false,
            "suppress": false,
            "request_to_speak_timestamp": null,
        });
        if !member.is_null() {
            v["member"] = member;
        }
        serde_json::from_value(v).unwrap()
    }

    fn member(nick: &str, bot: bool) -> serde_json::Value {
        json!({
            "guild_id": "1",
            "user": {
                "id": "20",
                "username": "someone",
                "discriminator": "0",
                "global_name": null,
                "avatar": null,
                "bot": bot,
            },
            "nick": nick,
            "roles": [],
            "joined_at": "2024-01-01T00:00:00Z",
            "deaf": false,
            "mute": false,
            "flags": 0,
            "pending": false,
        })
    }

    #[test]
    fn carries_member_name_bot_flag_and_channels() {
        let cache = sy::Cache::new();
        let old = voice_state(Some("1"), Some("200"), serde_json::Value::Null);
        let new = voice_state(Some("1"), Some("100"), member("Dj", true));

        let ev = to_change(&cache, Some(&old), &new).unwrap();

        assert_eq!(ev.member.id, UserId(20));
        assert_eq!(ev.member.display_name, "Dj");
        assert!(ev.member.bot);
        let before = ev.before.unwrap();
        let after = ev.after.unwrap();
        assert_eq!(before.id, ChannelId(200));
        assert_eq!(after.id, ChannelId(100));
        assert_eq!(after.guild_id, GuildId(1));
        // Uncached channels are named by id.
        assert_eq!(after.name, "100");
    }

    #[test]
    fn unknown_user_is_not_a_bot() {
        let cache = sy::Cache::new();
        let new = voice_state(Some("1"), None, serde_json::Value::Null);

        let ev = to_change(&cache, None, &new).unwrap();

        assert_eq!(ev.member.display_name, "20");
        assert!(!ev.member.bot);
        assert!(ev.before.is_none());
        assert!(ev.after.is_none());
    }

    #[test]
    fn guild_falls_back_to_previous_state() {
        let cache = sy::Cache::new();
        let old = voice_state(Some("5"), Some("300"), serde_json::Value::Null);
        let new = voice_state(None, None, serde_json::Value::Null);

        let ev = to_change(&cache, Some(&old), &new).unwrap();
        assert_eq!(ev.before.unwrap().guild_id, GuildId(5));

        assert!(to_change(&cache, None, &new).is_none());
    }
}
