use parking_lot::RwLock;
use std::{
    collections::HashMap,
    sync::Arc,
};
use tokio::time::Instant;

use crate::{
    errors::{PlatformError, PlatformResult},
    events::{ChannelRef, MemberPresence},
    platform::{GuildDirectory, VoiceMover},
    ChannelId, GuildId, UserId,
};

/// Injected failure for moves into a given channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveFailure {
    Forbidden,
    Remote,
}

/// A move that took effect.
#[derive(Clone, Debug)]
pub struct MoveRecord {
    pub at: Instant,
    pub guild: GuildId,
    pub user: UserId,
    pub channel: ChannelId,
    pub reason: String,
}

/// In-process stand-in for the platform: guild channels, members, voice states,
/// and a log of every move. Lookups and moves yield once to mimic a round-trip.
#[derive(Clone, Default)]
pub struct InMemoryPlatform {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    current_user: Option<UserId>,
    channels: HashMap<ChannelId, ChannelRef>,
    resync: HashMap<GuildId, ChannelId>,
    // (guild,user) -> (display name, served from cache)
    members: HashMap<(GuildId, UserId), (String, bool)>,
    voice: HashMap<(GuildId, UserId), ChannelId>,
    failures: HashMap<ChannelId, MoveFailure>,
    moves: Vec<MoveRecord>,
    move_attempts: usize,
    fetches: usize,
}

impl Inner {
    fn presence(&self, guild: GuildId, user: UserId, name: &str) -> MemberPresence {
        MemberPresence {
            user_id: user,
            display_name: name.to_string(),
            voice_channel: self
                .voice
                .get(&(guild, user))
                .and_then(|c| self.channels.get(c))
                .cloned(),
        }
    }
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_read<R>(&self, f: impl FnOnce(&Inner) -> R) -> R {
        let g = self.inner.read();
        f(&g)
    }

    fn with_write<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut g = self.inner.write();
        f(&mut g)
    }

    pub fn set_current_user(&self, user: UserId) {
        self.with_write(|i| i.current_user = Some(user));
    }

    pub fn add_channel(&self, guild: GuildId, id: ChannelId, name: &str) -> ChannelRef {
        let ch = ChannelRef {
            id,
            guild_id: guild,
            name: name.to_string(),
        };
        self.with_write(|i| i.channels.insert(id, ch.clone()));
        ch
    }

    pub fn channel(&self, id: ChannelId) -> Option<ChannelRef> {
        self.with_read(|i| i.channels.get(&id).cloned())
    }

    pub fn set_resync_channel(&self, guild: GuildId, channel: Option<ChannelId>) {
        self.with_write(|i| match channel {
            Some(c) => i.resync.insert(guild, c),
            None => i.resync.remove(&guild),
        });
    }

    /// Register a guild member. Uncached members are only visible through a fetch.
    pub fn add_member(&self, guild: GuildId, user: UserId, display_name: &str, cached: bool) {
        self.with_write(|i| i.members.insert((guild, user), (display_name.to_string(), cached)));
    }

    pub fn remove_member(&self, guild: GuildId, user: UserId) {
        self.with_write(|i| {
            i.members.remove(&(guild, user));
            i.voice.remove(&(guild, user));
        });
    }

    pub fn set_voice(&self, guild: GuildId, user: UserId, channel: Option<ChannelId>) {
        self.with_write(|i| match channel {
            Some(c) => i.voice.insert((guild, user), c),
            None => i.voice.remove(&(guild, user)),
        });
    }

    pub fn voice_channel(&self, guild: GuildId, user: UserId) -> Option<ChannelId> {
        self.with_read(|i| i.voice.get(&(guild, user)).copied())
    }

    pub fn fail_moves_to(&self, channel: ChannelId, failure: MoveFailure) {
        self.with_write(|i| i.failures.insert(channel, failure));
    }

    pub fn moves(&self) -> Vec<MoveRecord> {
        self.with_read(|i| i.moves.clone())
    }

    pub fn move_attempts(&self) -> usize {
        self.with_read(|i| i.move_attempts)
    }

    pub fn fetch_count(&self) -> usize {
        self.with_read(|i| i.fetches)
    }
}

#[async_trait::async_trait]
impl GuildDirectory for InMemoryPlatform {
    fn current_user(&self) -> Option<UserId> {
        self.with_read(|i| i.current_user)
    }

    fn cached_member(&self, guild: GuildId, user: UserId) -> Option<MemberPresence> {
        self.with_read(|i| match i.members.get(&(guild, user)) {
            Some((name, true)) => Some(i.presence(guild, user, name)),
            _ => None,
        })
    }

    async fn fetch_member(&self, guild: GuildId, user: UserId) -> PlatformResult<MemberPresence> {
        tokio::task::yield_now().await;
        self.with_write(|i| -> PlatformResult<MemberPresence> {
            i.fetches += 1;
            let (name, _) = i
                .members
                .get(&(guild, user))
                .ok_or(PlatformError::NotFound("member"))?;
            Ok(i.presence(guild, user, name))
        })
    }

    async fn resync_channel(&self, guild: GuildId) -> PlatformResult<Option<ChannelRef>> {
        Ok(self.with_read(|i| i.resync.get(&guild).and_then(|c| i.channels.get(c)).cloned()))
    }
}

#[async_trait::async_trait]
impl VoiceMover for InMemoryPlatform {
    async fn move_member(
        &self,
        guild: GuildId,
        user: UserId,
        channel: ChannelId,
        reason: &str,
    ) -> PlatformResult<()> {
        tokio::task::yield_now().await;
        self.with_write(|i| -> PlatformResult<()> {
            i.move_attempts += 1;
            match i.failures.get(&channel) {
                Some(MoveFailure::Forbidden) => {
                    return Err(PlatformError::PermissionDenied("missing Move Members".into()))
                }
                Some(MoveFailure::Remote) => {
                    return Err(PlatformError::Remote("connection reset".into()))
                }
                None => {}
            }
            if !i.members.contains_key(&(guild, user)) {
                return Err(PlatformError::NotFound("member"));
            }
            if !i.channels.contains_key(&channel) {
                return Err(PlatformError::NotFound("channel"));
            }
            i.voice.insert((guild, user), channel);
            i.moves.push(MoveRecord {
                at: Instant::now(),
                guild,
                user,
                channel,
                reason: reason.to_string(),
            });
            Ok(())
        })
    }
}
