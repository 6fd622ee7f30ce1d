pub mod config;
pub mod controller;
pub mod errors;
pub mod events;
pub mod ids;
pub mod memory;
pub mod platform;
pub mod source;

pub use config::ResyncConfig;
pub use controller::{Outcome, ResyncController, RunStats, Skip, Stage};
pub use errors::{PlatformError, PlatformResult};
pub use events::{ChannelRef, MemberPresence, VoiceMember, VoiceStateChange};
pub use ids::{ChannelId, GuildId, UserId};
pub use memory::{InMemoryPlatform, MoveFailure, MoveRecord};
pub use platform::{resolve_member, GuildDirectory, VoiceMover};
pub use source::{ScriptedSource, VoiceEventSource};
