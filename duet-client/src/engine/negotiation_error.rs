use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("no peer connection resource is installed")]
    NoResource,

    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error("remote offer rejected: {0}")]
    InvalidOffer(String),

    #[error("no local offer is outstanding")]
    NoOutstandingOffer,

    #[error("remote answer rejected: {0}")]
    InvalidAnswer(String),

    #[error("a local offer is already outstanding")]
    OfferOutstanding,
}
