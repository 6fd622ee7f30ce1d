use crate::{ChannelId, GuildId, UserId};

/// A voice channel as seen in an event or lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: ChannelId,
    pub guild_id: GuildId,
    pub name: String,
}

/// The member whose voice state changed.
#[derive(Clone, Debug)]
pub struct VoiceMember {
    pub id: UserId,
    pub display_name: String,
    pub bot: bool,
}

/// One voice-state-change notification: the member's channel before and after.
#[derive(Clone, Debug)]
pub struct VoiceStateChange {
    pub member: VoiceMember,
    pub before: Option<ChannelRef>,
    pub after: Option<ChannelRef>,
}

impl VoiceStateChange {
    /// The channel that gives the event its guild context: `after`, else `before`.
    pub fn context_channel(&self) -> Option<&ChannelRef> {
        self.after.as_ref().or(self.before.as_ref())
    }

    /// True when the member entered `channel` from nowhere or from another channel.
    pub fn is_join_of(&self, channel: ChannelId) -> bool {
        let entered = self.after.as_ref().is_some_and(|a| a.id == channel);
        let was_elsewhere = self.before.as_ref().map_or(true, |b| b.id != channel);
        entered && was_elsewhere
    }
}

/// A resolved member and where they currently are in voice.
#[derive(Clone, Debug)]
pub struct MemberPresence {
    pub user_id: UserId,
    pub display_name: String,
    pub voice_channel: Option<ChannelRef>,
}

impl std::fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
