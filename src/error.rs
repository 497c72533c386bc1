//! Error kinds surfaced by the evaluation pipeline.

use thiserror::Error;

/// Errors raised while evaluating a single request.
///
/// Every variant carries a human readable detail which ends up in the
/// `failed to <stage>, <detail>` response message.
#[derive(Debug, Error)]
pub enum BotError {
    /// Missing or invalid setting. Raised before any exchange call.
    #[error("{0}")]
    Configuration(String),

    /// Transport failure or non-success response from a read call.
    #[error("{0}")]
    Fetch(String),

    /// Market data that cannot be interpreted.
    #[error("{0}")]
    DataShape(String),

    /// Candle batch not ordered newest first.
    #[error("{0}")]
    Ordering(String),

    /// Quote older than the freshness window.
    #[error("{0}")]
    StaleData(String),

    /// Instrument missing from the response list.
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidSize(String),

    #[error("{0}")]
    NoPosition(String),

    /// Order submission rejected by the exchange.
    #[error("{0}")]
    Execution(String),

    /// Order cancellation rejected by the exchange.
    #[error("{0}")]
    Cancel(String),
}

impl BotError {
    /// Short kind label, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Fetch(_) => "fetch",
            Self::DataShape(_) => "data_shape",
            Self::Ordering(_) => "ordering",
            Self::StaleData(_) => "stale_data",
            Self::NotFound(_) => "not_found",
            Self::InvalidSize(_) => "invalid_size",
            Self::NoPosition(_) => "no_position",
            Self::Execution(_) => "execution",
            Self::Cancel(_) => "cancel",
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;
