use std::time::Duration;
use thiserror::Error;

/// A queue payload that is not a `METHOD,TARGET` instruction
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed postback instruction, no ',' delimiter: {0}")]
    MissingDelimiter(String),

    #[error("Malformed postback instruction, empty method: {0}")]
    EmptyMethod(String),

    #[error("Postback instruction is not valid UTF-8")]
    InvalidUtf8,
}

/// Failure reported by the network collaborator for a single request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    /// The request could not be built (bad method token, unparsable URL)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// No response was obtained (connection refused, reset, DNS, ...)
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Final outcome of a failed delivery
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Invalid postback request: {0}")]
    InvalidRequest(String),

    /// Status 300-499; never retried
    #[error("Postback rejected with HTTP status {status}")]
    ClientRejection { status: u16 },

    #[error("Postback failed after {attempts} attempt(s), last failure: {last_failure}")]
    RetriesExhausted { attempts: u32, last_failure: String },

    #[error("Postback delivery canceled")]
    Canceled,
}

impl DeliveryError {
    /// Whether another attempt could have changed the outcome
    pub fn is_transient(&self) -> bool {
        matches!(self, DeliveryError::RetriesExhausted { .. })
    }
}

/// Errors while rendering a postback URL template
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown param {{{0}}} in endpoint URL")]
    UnknownParameter(String),

    #[error("Missing parameters in URL: {0}")]
    MissingParameters(String),

    #[error("Invalid postback URL {url}: {details}")]
    InvalidUrl { url: String, details: String },
}
