use thiserror::Error;

/// Errors from the model service.
///
/// Any of these aborts the current turn only.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// The request never got a response.
    #[error("network: {0}")]
    Network(String),

    /// The model service returned an error status.
    #[error("model api: {0}")]
    Api(String),

    /// The response could not be understood.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}
