use std::time::Duration;

use thiserror::Error;

use crate::models::{CandidateId, EventId};

/// Rejected admin input. Surfaced to the caller; no event is created.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{field} is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("date must be YYYY-MM-DD, got {0:?}")]
    InvalidDate(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum LifecycleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("event {0} is not pending")]
    NotPending(EventId),
    #[error("event {0} already has a transition in flight")]
    TransitionInFlight(EventId),
    #[error("unknown scraped candidate #{0}")]
    UnknownCandidate(CandidateId),
    #[error("no event id left after {0}")]
    IdsExhausted(EventId),
}

/// Failure of an external collaborator. Never escapes the controller: it is
/// logged and replaced with the sentinel category or an empty candidate list.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("missing gemini api key")]
    MissingApiKey,
    #[error("http error: {0}")]
    Http(String),
    #[error("api error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}
