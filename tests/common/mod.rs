#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use event_hunter_lib::error::CollaboratorError;
use event_hunter_lib::lifecycle::{LifecycleController, LifecycleSettings};
use event_hunter_lib::llm::Categorizer;
use event_hunter_lib::models::{placeholder_image_url, Coords, Event, EventStatus, ScrapedCandidate};
use event_hunter_lib::scraping::Discoverer;
use event_hunter_lib::taxonomy::Category;

pub type Reply<T> = (Duration, Result<T, String>);

/// Classifier answering per title, after an optional delay.
#[derive(Default)]
pub struct ScriptedCategorizer {
    replies: HashMap<String, Reply<Category>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedCategorizer {
    pub fn reply(mut self, title: &str, delay_ms: u64, reply: Result<Category, &str>) -> Self {
        self.replies.insert(
            title.to_string(),
            (
                Duration::from_millis(delay_ms),
                reply.map_err(str::to_string),
            ),
        );
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Categorizer for ScriptedCategorizer {
    async fn classify(
        &self,
        title: &str,
        _description: &str,
    ) -> Result<Category, CollaboratorError> {
        self.calls.lock().unwrap().push(title.to_string());
        let (delay, reply) = self
            .replies
            .get(title)
            .cloned()
            .unwrap_or((Duration::ZERO, Ok(Category::Fun)));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply.map_err(CollaboratorError::InvalidResponse)
    }
}

impl Categorizer for &ScriptedCategorizer {
    async fn classify(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Category, CollaboratorError> {
        (**self).classify(title, description).await
    }
}

/// Discovery returning queued batches in call order; empty once drained.
#[derive(Default)]
pub struct ScriptedDiscoverer {
    batches: Mutex<VecDeque<Reply<Vec<ScrapedCandidate>>>>,
}

impl ScriptedDiscoverer {
    pub fn batch(self, delay_ms: u64, reply: Result<Vec<ScrapedCandidate>, &str>) -> Self {
        self.batches.lock().unwrap().push_back((
            Duration::from_millis(delay_ms),
            reply.map_err(str::to_string),
        ));
        self
    }
}

impl Discoverer for ScriptedDiscoverer {
    async fn discover(&self) -> Result<Vec<ScrapedCandidate>, CollaboratorError> {
        let next = self.batches.lock().unwrap().pop_front();
        let (delay, reply) = next.unwrap_or((Duration::ZERO, Ok(Vec::new())));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply.map_err(CollaboratorError::Http)
    }
}

pub fn settings() -> LifecycleSettings {
    LifecycleSettings {
        fallback_coords: Coords {
            lat: 25.6751,
            lng: -100.3185,
        },
        collaborator_timeout: Duration::from_secs(2),
    }
}

pub fn controller(
    categorizer: ScriptedCategorizer,
    discoverer: ScriptedDiscoverer,
    events: Vec<Event>,
) -> LifecycleController<ScriptedCategorizer, ScriptedDiscoverer> {
    LifecycleController::new(categorizer, discoverer, settings()).with_events(events)
}

pub fn event(id: i64, title: &str, status: EventStatus, category: Category) -> Event {
    Event {
        id,
        title: title.to_string(),
        description: format!("{title} description"),
        date: "2030-05-01".to_string(),
        location: "Monterrey".to_string(),
        image_url: placeholder_image_url(id),
        category,
        coords: Coords {
            lat: 25.67,
            lng: -100.31,
        },
        status,
    }
}

pub fn pending(id: i64, title: &str) -> Event {
    event(id, title, EventStatus::Pending, Category::Uncategorized)
}

pub fn approved(id: i64, title: &str, category: Category) -> Event {
    event(id, title, EventStatus::Approved, category)
}

pub fn scraped(title: &str) -> ScrapedCandidate {
    ScrapedCandidate {
        title: title.to_string(),
        description: format!("{title} description"),
        date: "2030-06-01".to_string(),
        location: "Parque Fundidora".to_string(),
    }
}

pub fn ids(events: &[Event]) -> Vec<i64> {
    events.iter().map(|event| event.id).collect()
}
