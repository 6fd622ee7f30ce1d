use thiserror::Error;

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Failures reported by the platform behind a [`crate::GuildDirectory`] or
/// [`crate::VoiceMover`].
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("not found: {0}")]
    NotFound(&'static str),

    /// Missing permission or the role hierarchy forbids the action.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("remote error: {0}")]
    Remote(String),
}
