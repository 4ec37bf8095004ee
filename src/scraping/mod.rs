pub mod base;

use chrono::NaiveDate;

use crate::error::CollaboratorError;
use crate::models::ScrapedCandidate;

/// External source of candidate events. Results carry no id, category or
/// coordinates; the lifecycle controller decides what happens to them.
#[allow(async_fn_in_trait)]
pub trait Discoverer {
    async fn discover(&self) -> Result<Vec<ScrapedCandidate>, CollaboratorError>;
}

/// Cleans up a raw discovery batch: normalizes whitespace, drops untitled
/// entries and entries already in the past. Order is preserved.
pub fn prepare_candidates(raw: Vec<ScrapedCandidate>, today: NaiveDate) -> Vec<ScrapedCandidate> {
    let total = raw.len();
    let kept: Vec<ScrapedCandidate> = raw
        .into_iter()
        .map(base::normalize_candidate)
        .filter(|candidate| !candidate.title.is_empty())
        .filter(|candidate| !base::is_past(candidate, today))
        .collect();
    if kept.len() < total {
        tracing::debug!(dropped = total - kept.len(), "filtered discovery candidates");
    }
    kept
}
