//! Event lifecycle: the only place events and candidates move between the
//! approved, pending and scraped collections.
//!
//! Collaborator calls (classification, discovery) are awaited without holding
//! the state lock. Each transition re-checks the state once its call resolves
//! and applies all of its mutations under a single lock, so readers never see
//! an event in both collections or half-transitioned.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;

use crate::config::AppConfig;
use crate::db::EventSource;
use crate::error::{LifecycleError, ValidationError};
use crate::llm::Categorizer;
use crate::models::{
    placeholder_image_url, Candidate, CandidateId, Coords, Event, EventDraft, EventId,
    EventStatus,
};
use crate::scraping::{base, Discoverer};
use crate::taxonomy::Category;

#[derive(Debug, Clone, Copy)]
pub struct LifecycleSettings {
    /// Placed on promoted candidates, which arrive without coordinates.
    pub fallback_coords: Coords,
    pub collaborator_timeout: Duration,
}

impl LifecycleSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            fallback_coords: config.fallback_coords,
            collaborator_timeout: config.collaborator_timeout(),
        }
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventState {
    pub approved: Vec<Event>,
    pub pending: Vec<Event>,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The candidate collection now holds this many fresh entries.
    Replaced(usize),
    /// A later refresh started while this one was outstanding; its result was dropped.
    Superseded,
}

#[derive(Default)]
struct Inner {
    state: EventState,
    last_id: EventId,
    next_handle: u32,
    discovery_epoch: u64,
    approving: HashSet<EventId>,
}

impl Inner {
    /// Unix-millisecond ids, bumped past the last issued id when the clock
    /// has not moved.
    fn next_id(&mut self) -> Result<EventId, LifecycleError> {
        let floor = self
            .last_id
            .checked_add(1)
            .ok_or(LifecycleError::IdsExhausted(self.last_id))?;
        let id = Utc::now().timestamp_millis().max(floor);
        self.last_id = id;
        Ok(id)
    }

    /// `None` once the handle space is used up. The last representable
    /// handle is never issued, so a restored batch can always be advanced past.
    fn allocate_handle(&mut self) -> Option<CandidateId> {
        let following = self.next_handle.checked_add(1)?;
        let handle = CandidateId(self.next_handle);
        self.next_handle = following;
        Some(handle)
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears an approval's in-flight marker however the approval ends,
/// including when its future is dropped mid-classification.
struct ApprovalGuard<'a> {
    inner: &'a Mutex<Inner>,
    id: EventId,
}

impl Drop for ApprovalGuard<'_> {
    fn drop(&mut self) {
        lock(self.inner).approving.remove(&self.id);
    }
}

pub struct LifecycleController<C, D> {
    categorizer: C,
    discoverer: D,
    settings: LifecycleSettings,
    inner: Mutex<Inner>,
}

impl<C: Categorizer, D: Discoverer> LifecycleController<C, D> {
    pub fn new(categorizer: C, discoverer: D, settings: LifecycleSettings) -> Self {
        Self {
            categorizer,
            discoverer,
            settings,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Builds a controller from everything the source knows, partitioned by status.
    pub fn from_source<S: EventSource>(
        categorizer: C,
        discoverer: D,
        settings: LifecycleSettings,
        source: &S,
    ) -> anyhow::Result<Self> {
        let events = source.fetch_events()?;
        Ok(Self::new(categorizer, discoverer, settings).with_events(events))
    }

    /// Replaces the event collections. Later duplicates of an id are dropped.
    pub fn with_events(self, events: Vec<Event>) -> Self {
        {
            let mut inner = lock(&self.inner);
            let mut seen = HashSet::new();
            let mut approved = Vec::new();
            let mut pending = Vec::new();
            for event in events {
                if !seen.insert(event.id) {
                    tracing::warn!(event_id = event.id, "dropping duplicate event id");
                    continue;
                }
                match event.status {
                    EventStatus::Approved => approved.push(event),
                    EventStatus::Pending => pending.push(event),
                }
            }
            inner.last_id = seen.into_iter().max().unwrap_or(0).max(inner.last_id);
            inner.state.approved = approved;
            inner.state.pending = pending;
        }
        self
    }

    /// Restores a candidate batch saved by an earlier session. A candidate
    /// whose handle has no successor is dropped, since later handles could
    /// not be kept distinct from it.
    pub fn with_candidates(self, candidates: Vec<Candidate>) -> Self {
        {
            let mut inner = lock(&self.inner);
            let mut restored = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                match candidate.handle.0.checked_add(1) {
                    Some(following) => {
                        inner.next_handle = inner.next_handle.max(following);
                        restored.push(candidate);
                    }
                    None => {
                        tracing::warn!(
                            handle = %candidate.handle,
                            "dropping candidate with exhausted handle"
                        );
                    }
                }
            }
            inner.state.candidates = restored;
        }
        self
    }

    pub fn snapshot(&self) -> EventState {
        lock(&self.inner).state.clone()
    }

    pub fn approved(&self) -> Vec<Event> {
        lock(&self.inner).state.approved.clone()
    }

    pub fn pending(&self) -> Vec<Event> {
        lock(&self.inner).state.pending.clone()
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        lock(&self.inner).state.candidates.clone()
    }

    /// Approved then pending, the shape the event source hands back on load.
    pub fn all_events(&self) -> Vec<Event> {
        let inner = lock(&self.inner);
        inner
            .state
            .approved
            .iter()
            .chain(inner.state.pending.iter())
            .cloned()
            .collect()
    }

    /// Classifies a pending event and moves it to approved. The move happens
    /// only after classification resolves; a failed classification yields the
    /// sentinel category and the move still happens.
    pub async fn approve(&self, id: EventId) -> Result<Event, LifecycleError> {
        let (title, description) = {
            let mut inner = lock(&self.inner);
            let event = inner
                .state
                .pending
                .iter()
                .find(|event| event.id == id)
                .ok_or(LifecycleError::NotPending(id))?;
            let fields = (event.title.clone(), event.description.clone());
            if !inner.approving.insert(id) {
                return Err(LifecycleError::TransitionInFlight(id));
            }
            fields
        };
        let _guard = ApprovalGuard {
            inner: &self.inner,
            id,
        };

        let category = self.classify_or_sentinel(&title, &description).await;

        let mut inner = lock(&self.inner);
        let Some(pos) = inner.state.pending.iter().position(|event| event.id == id) else {
            tracing::info!(event_id = id, "event left pending while classifying, not approving");
            return Err(LifecycleError::NotPending(id));
        };
        let mut event = inner.state.pending.remove(pos);
        event.status = EventStatus::Approved;
        event.category = category;
        inner.state.approved.push(event.clone());
        tracing::info!(event_id = id, category = %category, "event approved");
        Ok(event)
    }

    /// Drops a pending event. Returns false when there was nothing to drop.
    pub fn reject(&self, id: EventId) -> bool {
        let mut inner = lock(&self.inner);
        let before = inner.state.pending.len();
        inner.state.pending.retain(|event| event.id != id);
        let removed = inner.state.pending.len() != before;
        if removed {
            tracing::info!(event_id = id, "pending event rejected");
        }
        removed
    }

    /// Validates an admin draft, classifies it and inserts it straight into
    /// approved (front of the list). Invalid drafts never reach the classifier.
    pub async fn add_manual(&self, draft: EventDraft) -> Result<Event, LifecycleError> {
        let valid = validate_draft(&draft)?;
        let category = self
            .classify_or_sentinel(&valid.title, &valid.description)
            .await;

        let mut inner = lock(&self.inner);
        let id = inner.next_id()?;
        let event = Event {
            id,
            title: valid.title,
            description: valid.description,
            date: valid.date,
            location: valid.location,
            image_url: placeholder_image_url(id),
            category,
            coords: valid.coords,
            status: EventStatus::Approved,
        };
        inner.state.approved.insert(0, event.clone());
        tracing::info!(event_id = id, category = %category, "manual event added");
        Ok(event)
    }

    /// Turns a scraped candidate into a pending event at the front of the
    /// pending list, with the sentinel category and fallback coordinates.
    pub fn promote_scraped(&self, handle: CandidateId) -> Result<Event, LifecycleError> {
        let mut inner = lock(&self.inner);
        let pos = inner
            .state
            .candidates
            .iter()
            .position(|candidate| candidate.handle == handle)
            .ok_or(LifecycleError::UnknownCandidate(handle))?;
        let id = inner.next_id()?;
        let candidate = inner.state.candidates.remove(pos);
        let event = Event {
            id,
            title: candidate.scraped.title,
            description: candidate.scraped.description,
            date: candidate.scraped.date,
            location: candidate.scraped.location,
            image_url: placeholder_image_url(id),
            category: Category::Uncategorized,
            coords: self.settings.fallback_coords,
            status: EventStatus::Pending,
        };
        inner.state.pending.insert(0, event.clone());
        tracing::info!(event_id = id, %handle, "candidate promoted to pending");
        Ok(event)
    }

    pub fn discard_scraped(&self, handle: CandidateId) -> bool {
        let mut inner = lock(&self.inner);
        let before = inner.state.candidates.len();
        inner
            .state
            .candidates
            .retain(|candidate| candidate.handle != handle);
        inner.state.candidates.len() != before
    }

    /// Replaces the whole candidate collection with a fresh discovery batch.
    /// Collaborator failure replaces it with an empty batch. If another
    /// refresh starts before this one resolves, this result is discarded.
    pub async fn refresh_candidates(&self) -> RefreshOutcome {
        let epoch = {
            let mut inner = lock(&self.inner);
            inner.discovery_epoch += 1;
            inner.discovery_epoch
        };

        let found = match tokio::time::timeout(
            self.settings.collaborator_timeout,
            self.discoverer.discover(),
        )
        .await
        {
            Ok(Ok(found)) => found,
            Ok(Err(err)) => {
                tracing::warn!("discovery failed, clearing candidates: {err}");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    timeout = ?self.settings.collaborator_timeout,
                    "discovery timed out, clearing candidates"
                );
                Vec::new()
            }
        };

        let mut inner = lock(&self.inner);
        if inner.discovery_epoch != epoch {
            tracing::info!(epoch, "discarding superseded discovery result");
            return RefreshOutcome::Superseded;
        }
        let mut candidates = Vec::with_capacity(found.len());
        for scraped in found {
            let Some(handle) = inner.allocate_handle() else {
                tracing::warn!(
                    kept = candidates.len(),
                    "candidate handles exhausted, truncating batch"
                );
                break;
            };
            candidates.push(Candidate { handle, scraped });
        }
        let count = candidates.len();
        inner.state.candidates = candidates;
        tracing::info!(count, "candidate collection replaced");
        RefreshOutcome::Replaced(count)
    }

    async fn classify_or_sentinel(&self, title: &str, description: &str) -> Category {
        match tokio::time::timeout(
            self.settings.collaborator_timeout,
            self.categorizer.classify(title, description),
        )
        .await
        {
            Ok(Ok(category)) => category,
            Ok(Err(err)) => {
                tracing::warn!(title, "classification failed, using sentinel: {err}");
                Category::Uncategorized
            }
            Err(_) => {
                tracing::warn!(
                    title,
                    timeout = ?self.settings.collaborator_timeout,
                    "classification timed out, using sentinel"
                );
                Category::Uncategorized
            }
        }
    }
}

/// A draft whose fields have all been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft {
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub coords: Coords,
}

pub fn validate_draft(draft: &EventDraft) -> Result<ValidDraft, ValidationError> {
    let title = required("title", &draft.title)?;
    let description = required("description", &draft.description)?;
    let date = required("date", &draft.date)?;
    let location = required("location", &draft.location)?;
    if base::parse_event_date(&date).is_none() {
        return Err(ValidationError::InvalidDate(date));
    }
    let lat = parse_coordinate("latitude", &draft.lat, 90.0)?;
    let lng = parse_coordinate("longitude", &draft.lng, 180.0)?;
    Ok(ValidDraft {
        title,
        description,
        date,
        location,
        coords: Coords { lat, lng },
    })
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Strict decimal parse: no NaN, no infinities, within +/- `limit`.
fn parse_coordinate(field: &'static str, raw: &str, limit: f64) -> Result<f64, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    let value: f64 = text.parse().map_err(|_| ValidationError::InvalidNumber {
        field,
        value: raw.to_string(),
    })?;
    if !value.is_finite() {
        return Err(ValidationError::InvalidNumber {
            field,
            value: raw.to_string(),
        });
    }
    if value.abs() > limit {
        return Err(ValidationError::OutOfRange { field, value });
    }
    Ok(value)
}
