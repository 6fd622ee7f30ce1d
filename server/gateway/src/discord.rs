//! Pass-through from the controller's capability traits to serenity's cache and HTTP client.

use std::sync::{Arc, OnceLock};

use serenity::all as sy;
use tracing::debug;
use vr_control::{
    ChannelId, ChannelRef, GuildDirectory, GuildId, MemberPresence, PlatformError, PlatformResult,
    UserId, VoiceMover,
};

pub struct SerenityPlatform {
    http: Arc<sy::Http>,
    cache: Arc<sy::Cache>,
    /// Set by the event handler on `ready`.
    identity: Arc<OnceLock<UserId>>,
}

impl SerenityPlatform {
    pub fn new(
        http: Arc<sy::Http>,
        cache: Arc<sy::Cache>,
        identity: Arc<OnceLock<UserId>>,
    ) -> Self {
        Self { http, cache, identity }
    }

    fn cached_voice_channel(&self, guild: sy::GuildId, user: sy::UserId) -> Option<ChannelRef> {
        let channel = self
            .cache
            .guild(guild)?
            .voice_states
            .get(&user)
            .and_then(|vs| vs.channel_id)?;
        Some(channel_ref(&self.cache, guild, channel))
    }
}

/// Build a [`ChannelRef`], naming it from the guild cache when possible.
pub fn channel_ref(cache: &sy::Cache, guild: sy::GuildId, id: sy::ChannelId) -> ChannelRef {
    let name = cache
        .guild(guild)
        .and_then(|g| g.channels.get(&id).map(|c| c.name.clone()))
        .unwrap_or_else(|| id.to_string());
    ChannelRef {
        id: ChannelId(id.get()),
        guild_id: GuildId(guild.get()),
        name,
    }
}

fn platform_error(e: serenity::Error, what: &'static str) -> PlatformError {
    let status = match &e {
        serenity::Error::Http(h) => h.status_code().map(|s| s.as_u16()),
        _ => None,
    };
    classify(status, e.to_string(), what)
}

fn classify(status: Option<u16>, msg: String, what: &'static str) -> PlatformError {
    match status {
        Some(404) => PlatformError::NotFound(what),
        Some(403) => PlatformError::PermissionDenied(msg),
        _ => PlatformError::Remote(msg),
    }
}

#[async_trait::async_trait]
impl GuildDirectory for SerenityPlatform {
    fn current_user(&self) -> Option<UserId> {
        self.identity.get().copied()
    }

    fn cached_member(&self, guild: GuildId, user: UserId) -> Option<MemberPresence> {
        let gid = sy::GuildId::new(guild.0);
        let uid = sy::UserId::new(user.0);

        let display_name = {
            let g = self.cache.guild(gid)?;
            let voice = g.voice_states.get(&uid);
            let member = g.members.get(&uid).or_else(|| voice.and_then(|v| v.member.as_ref()));
            match (member, voice) {
                (Some(m), _) => m.display_name().to_string(),
                (None, Some(_)) => user.to_string(),
                (None, None) => return None,
            }
        };

        Some(MemberPresence {
            user_id: user,
            display_name,
            voice_channel: self.cached_voice_channel(gid, uid),
        })
    }

    async fn fetch_member(&self, guild: GuildId, user: UserId) -> PlatformResult<MemberPresence> {
        let gid = sy::GuildId::new(guild.0);
        let uid = sy::UserId::new(user.0);

        let member = self
            .http
            .get_member(gid, uid)
            .await
            .map_err(|e| platform_error(e, "member"))?;

        // A fetched member carries no voice state; the gateway cache is the only source.
        Ok(MemberPresence {
            user_id: user,
            display_name: member.display_name().to_string(),
            voice_channel: self.cached_voice_channel(gid, uid),
        })
    }

    async fn resync_channel(&self, guild: GuildId) -> PlatformResult<Option<ChannelRef>> {
        let gid = sy::GuildId::new(guild.0);

        let cached = self
            .cache
            .guild(gid)
            .map(|g| g.afk_metadata.as_ref().map(|a| a.afk_channel_id));

        let afk = match cached {
            Some(afk) => afk,
            None => {
                debug!(guild = %guild, "guild not cached, fetching");
                self.http
                    .get_guild(gid)
                    .await
                    .map_err(|e| platform_error(e, "guild"))?
                    .afk_metadata
                    .map(|a| a.afk_channel_id)
            }
        };

        Ok(afk.map(|id| channel_ref(&self.cache, gid, id)))
    }
}

#[async_trait::async_trait]
impl VoiceMover for SerenityPlatform {
    async fn move_member(
        &self,
        guild: GuildId,
        user: UserId,
        channel: ChannelId,
        reason: &str,
    ) -> PlatformResult<()> {
        let builder = sy::EditMember::new()
            .voice_channel(sy::ChannelId::new(channel.0))
            .audit_log_reason(reason);

        sy::GuildId::new(guild.0)
            .edit_member(&self.http, sy::UserId::new(user.0), builder)
            .await
            .map(|_| ())
            .map_err(|e| platform_error(e, "member"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_maps_to_platform_error() {
        assert!(matches!(
            classify(Some(404), "gone".into(), "member"),
            PlatformError::NotFound("member")
        ));
        assert!(matches!(
            classify(Some(403), "missing access".into(), "member"),
            PlatformError::PermissionDenied(m) if m == "missing access"
        ));
        assert!(matches!(classify(Some(500), "oops".into(), "guild"), PlatformError::Remote(_)));
        assert!(matches!(classify(None, "reset".into(), "guild"), PlatformError::Remote(_)));
    }

    #[test]
    fn non_http_errors_are_remote() {
        let json = serde_json::from_str::<u8>("x").unwrap_err();
        let e = platform_error(serenity::Error::Json(json), "member");
        assert!(matches!(e, PlatformError::Remote(_)));
    }
}
