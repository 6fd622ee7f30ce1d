use tracing::{debug, warn};

use crate::{
    errors::{PlatformError, PlatformResult},
    events::{ChannelRef, MemberPresence},
    ChannelId, GuildId, UserId,
};

/// Member and channel lookups against the platform (cache first, remote on demand).
#[async_trait::async_trait]
pub trait GuildDirectory: Send + Sync {
    /// Identity of this automation's own connection, once the platform has reported it.
    fn current_user(&self) -> Option<UserId>;

    /// Lookup served from local cache only. `None` means "not cached", not "absent".
    fn cached_member(&self, guild: GuildId, user: UserId) -> Option<MemberPresence>;

    /// Direct remote fetch of a guild member.
    async fn fetch_member(&self, guild: GuildId, user: UserId) -> PlatformResult<MemberPresence>;

    /// The guild's designated resync (AFK) channel, if one is configured.
    async fn resync_channel(&self, guild: GuildId) -> PlatformResult<Option<ChannelRef>>;
}

/// Outbound "move member to channel" command.
#[async_trait::async_trait]
pub trait VoiceMover: Send + Sync {
    async fn move_member(
        &self,
        guild: GuildId,
        user: UserId,
        channel: ChannelId,
        reason: &str,
    ) -> PlatformResult<()>;
}

/// Cached lookup with remote fallback. Not-found and forbidden fetches resolve to `None`.
pub async fn resolve_member(
    directory: &dyn GuildDirectory,
    guild: GuildId,
    user: UserId,
) -> Option<MemberPresence> {
    if let Some(m) = directory.cached_member(guild, user) {
        return Some(m);
    }

    debug!(guild = %guild, user = %user, "member not cached, fetching");
    match directory.fetch_member(guild, user).await {
        Ok(m) => Some(m),
        Err(PlatformError::NotFound(_)) | Err(PlatformError::PermissionDenied(_)) => None,
        Err(e) => {
            warn!(guild = %guild, user = %user, "member fetch failed: {e}");
            None
        }
    }
}
