use thiserror::Error;

/// Exit code for an unreadable, malformed or empty configuration.
pub const EXIT_CONFIG: i32 = 10;
/// Exit code when the assessment service is unreachable or out of capacity.
pub const EXIT_SERVICE_UNAVAILABLE: i32 = 8;

/// Errors that end the whole run before any host is scanned.
#[derive(Error, Debug)]
pub enum FatalError {
    #[error("invalid config: {0}")]
    Config(String),

    #[error("assessment service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl FatalError {
    pub fn exit_code(&self) -> i32 {
        match self {
            FatalError::Config(_) => EXIT_CONFIG,
            FatalError::ServiceUnavailable(_) => EXIT_SERVICE_UNAVAILABLE,
        }
    }
}

/// Exit code for a run that ended with `err`; anything that is not a [`FatalError`] maps to 1.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<FatalError>()
        .map(FatalError::exit_code)
        .unwrap_or(1)
}
