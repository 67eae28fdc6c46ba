//! Domain error types.
//!
//! Missing prices are not errors here; they surface as
//! [`Diagnostic`](crate::domain::diagnostic::Diagnostic) values instead.

use crate::domain::universe::UniverseError;

/// Top-level error type for dualmom.
#[derive(Debug, thiserror::Error)]
pub enum DualmomError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error("invalid allocation weights: {reason}")]
    InvalidWeights { reason: String },

    #[error("price data error: {reason}")]
    PriceData { reason: String },

    #[error("no price data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DualmomError {
    /// True for errors raised while validating setup, before any period runs.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DualmomError::ConfigParse { .. }
                | DualmomError::ConfigMissing { .. }
                | DualmomError::ConfigInvalid { .. }
                | DualmomError::Universe(_)
                | DualmomError::InvalidWeights { .. }
        )
    }
}

impl From<&DualmomError> for std::process::ExitCode {
    fn from(err: &DualmomError) -> Self {
        let code: u8 = match err {
            DualmomError::Io(_) => 1,
            DualmomError::ConfigParse { .. }
            | DualmomError::ConfigMissing { .. }
            | DualmomError::ConfigInvalid { .. }
            | DualmomError::Universe(_)
            | DualmomError::InvalidWeights { .. } => 2,
            DualmomError::Database { .. } | DualmomError::DatabaseQuery { .. } => 3,
            DualmomError::PriceData { .. } | DualmomError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
