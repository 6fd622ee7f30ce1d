use std::time::Duration;

use crate::UserId;

pub const DEFAULT_PAUSE: Duration = Duration::from_millis(600);
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(12);
pub const DEFAULT_REASON: &str = "Voice resync cycle";

#[derive(Clone, Debug)]
pub struct ResyncConfig {
    /// The user whose connection gets resynced.
    pub operator: UserId,
    /// Time spent in the resync channel before moving back.
    pub pause: Duration,
    /// Minimum spacing between the starts of two cycles.
    pub cooldown: Duration,
    /// Audit log reason attached to both moves.
    pub reason: String,
}

impl ResyncConfig {
    pub fn new(operator: UserId) -> Self {
        Self {
            operator,
            pause: DEFAULT_PAUSE,
            cooldown: DEFAULT_COOLDOWN,
            reason: DEFAULT_REASON.to_string(),
        }
    }
}
