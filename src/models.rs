use std::fmt;

use serde::{Deserialize, Serialize};

use crate::taxonomy::Category;

pub type EventId = i64;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Approved,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub date: String, // YYYY-MM-DD
    pub location: String,
    pub image_url: String,
    pub category: Category,
    pub coords: Coords,
    pub status: EventStatus,
}

impl Event {
    pub fn is_pending(&self) -> bool {
        self.status == EventStatus::Pending
    }
}

/// Partial event proposed by discovery. Not an `Event` until promoted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ScrapedCandidate {
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CandidateId(pub u32);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A scraped candidate plus the transient handle it was given at discovery time.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub handle: CandidateId,
    #[serde(flatten)]
    pub scraped: ScrapedCandidate,
}

/// Raw admin form input for a manually entered event. Coordinates arrive as
/// text and are validated before anything else happens.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub lat: String,
    pub lng: String,
}

pub fn placeholder_image_url(id: EventId) -> String {
    format!("https://picsum.photos/seed/{id}/400/300")
}
