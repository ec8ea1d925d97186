//! Error taxonomy for document acquisition.
//!
//! A user cancelling the file picker is not an error; it surfaces as
//! [`AcquisitionResult::Cancelled`](crate::models::AcquisitionResult::Cancelled).
//! Everything else that can go wrong between "a document is on its way" and
//! "the viewer shows it" is one of the variants below.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// Chunk metadata disagreed within one transfer, or a chunk could not
    /// be decoded. The pending transfer is discarded.
    #[error("transfer protocol violation: {0}")]
    TransferProtocolViolation(String),

    /// Non-2xx response or a transport error while fetching a document.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The conversion engine failed to initialize or open the document.
    #[error("conversion engine failure: {0}")]
    ConversionEngineFailure(#[source] anyhow::Error),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("unexpected failure: {0}")]
    Unknown(String),
}

impl AcquisitionError {
    /// Short machine-readable code, used in HTTP error bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TransferProtocolViolation(_) => "protocol_violation",
            Self::NetworkFailure(_) => "network_failure",
            Self::ConversionEngineFailure(_) => "engine_failure",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::Unknown(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, AcquisitionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_failure_keeps_source() {
        let err = AcquisitionError::ConversionEngineFailure(anyhow::anyhow!("exit status 3"));
        assert_eq!(err.code(), "engine_failure");
        assert!(err.to_string().contains("exit status 3"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
