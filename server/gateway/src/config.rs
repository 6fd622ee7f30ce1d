use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use vr_control::{ResyncConfig, UserId};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "vr-gateway",
    about = "Moves the operator out and back when someone joins their voice channel"
)]
pub struct Config {
    /// Bot token for the platform connection
    #[arg(long, env = "DISCORD_TOKEN", default_value = "", hide_env_values = true)]
    pub token: String,

    /// Numeric id of the operator whose connection gets resynced
    #[arg(long, env = "USER_ID", default_value = "")]
    pub user_id: String,

    /// Seconds spent in the resync channel
    #[arg(long, env = "RESYNC_PAUSE_SECONDS", default_value_t = 0.6)]
    pub pause_seconds: f64,

    /// Minimum seconds between two resync cycles
    #[arg(long, env = "RESYNC_COOLDOWN_SECONDS", default_value_t = 12.0)]
    pub cooldown_seconds: f64,

    /// Audit log reason attached to each move
    #[arg(long, env = "RESYNC_AUDIT_REASON", default_value = vr_control::config::DEFAULT_REASON)]
    pub reason: String,

    /// Voice events buffered between the gateway and the controller
    #[arg(long, env = "RESYNC_QUEUE_DEPTH", default_value_t = 1024)]
    pub queue_depth: usize,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("set DISCORD_TOKEN (or --token) to the bot token")]
    MissingToken,

    #[error("set USER_ID (or --user-id) to the operator's numeric id")]
    MissingOperator,

    #[error("invalid operator id: {0:?}")]
    InvalidOperator(String),

    #[error("invalid {name}: {value}")]
    InvalidDuration { name: &'static str, value: f64 },

    #[error("queue depth must be at least 1")]
    ZeroQueueDepth,
}

/// Validated startup settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub token: String,
    pub resync: ResyncConfig,
    pub queue_depth: usize,
}

impl Config {
    pub fn validate(self) -> Result<Settings, ConfigError> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err(ConfigError::MissingToken);
        }

        let raw = self.user_id.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingOperator);
        }
        let operator = match raw.parse::<u64>() {
            Ok(id) if id != 0 => UserId(id),
            _ => return Err(ConfigError::InvalidOperator(raw.to_string())),
        };

        if self.queue_depth == 0 {
            return Err(ConfigError::ZeroQueueDepth);
        }

        let mut resync = ResyncConfig::new(operator);
        resync.pause = seconds("pause", self.pause_seconds)?;
        resync.cooldown = seconds("cooldown", self.cooldown_seconds)?;
        resync.reason = self.reason;

        Ok(Settings {
            token: token.to_string(),
            resync,
            queue_depth: self.queue_depth,
        })
    }
}

fn seconds(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDuration { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            token: " secret ".into(),
            user_id: " 123456789 ".into(),
            pause_seconds: 0.6,
            cooldown_seconds: 12.0,
            reason: "Voice resync cycle".into(),
            queue_depth: 1024,
        }
    }

    #[test]
    fn trims_and_converts() {
        let s = base().validate().unwrap();
        assert_eq!(s.token, "secret");
        assert_eq!(s.resync.operator, UserId(123_456_789));
        assert_eq!(s.resync.pause, Duration::from_millis(600));
        assert_eq!(s.resync.cooldown, Duration::from_secs(12));
    }

    #[test]
    fn empty_token_is_fatal() {
        let cfg = Config { token: "   ".into(), ..base() };
        assert_eq!(cfg.validate().unwrap_err(), ConfigError::MissingToken);
    }

    #[test]
    fn operator_must_be_a_nonzero_number() {
        let missing = Config { user_id: "".into(), ..base() };
        assert_eq!(missing.validate().unwrap_err(), ConfigError::MissingOperator);

        let bad = Config { user_id: "me".into(), ..base() };
        assert_eq!(bad.validate().unwrap_err(), ConfigError::InvalidOperator("me".into()));

        let zero = Config { user_id: "0".into(), ..base() };
        assert!(matches!(zero.validate(), Err(ConfigError::InvalidOperator(_))));
    }

    #[test]
    fn negative_durations_are_rejected() {
        let cfg = Config { pause_seconds: -1.0, ..base() };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidDuration { name: "pause", .. })));

        let cfg = Config { cooldown_seconds: f64::NAN, ..base() };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidDuration { name: "cooldown", .. })
        ));
    }

    #[test]
    fn flags_parse() {
        let cfg = Config::try_parse_from([
            "vr-gateway",
            "--token",
            "t",
            "--user-id",
            "42",
            "--pause-seconds",
            "1.5",
            "--cooldown-seconds",
            "30",
            "--reason",
            "resync",
            "--queue-depth",
            "8",
        ])
        .unwrap();
        let s = cfg.validate().unwrap();
        assert_eq!(s.resync.operator, UserId(42));
        assert_eq!(s.resync.pause, Duration::from_millis(1500));
        assert_eq!(s.resync.cooldown, Duration::from_secs(30));
        assert_eq!(s.resync.reason, "resync");
        assert_eq!(s.queue_depth, 8);
    }
}
