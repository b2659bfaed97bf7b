//! Error types for model conversion

use thiserror::Error;

/// Errors that can occur while converting a decoded graph
///
/// The loader and decoder reject bad input before conversion starts, so
/// these indicate a bug rather than a problem with the document.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("internal error while converting '{service}': {reason}")]
    Internal { service: String, reason: String },
}

impl ConvertError {
    pub fn internal(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Internal {
            service: service.into(),
            reason: reason.into(),
        }
    }
}
