use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::error::CollaboratorError;
use crate::models::ScrapedCandidate;
use crate::scraping::{self, base, Discoverer};
use crate::taxonomy::Category;

static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*(.*?)\s*```\s*$").expect("valid fence regex")
});

/// External classifier: picks one taxonomy member for a title/description.
#[allow(async_fn_in_trait)]
pub trait Categorizer {
    async fn classify(&self, title: &str, description: &str)
        -> Result<Category, CollaboratorError>;
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub region: String,
    pub discovery_count: u32,
    pub timezone: String,
}

impl GeminiSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            api_key: config.effective_api_key(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.clone(),
            timeout: config.collaborator_timeout(),
            region: config.discovery_region.clone(),
            discovery_count: config.discovery_count,
            timezone: config.timezone.clone(),
        }
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    settings: GeminiSettings,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct CategoryReply {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscoveryReply {
    #[serde(default)]
    events: Vec<ScrapedCandidate>,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Self {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!("falling back to default http client: {err}");
                Client::new()
            });
        Self { settings, client }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(GeminiSettings::from_config(config))
    }

    fn endpoint(&self) -> String {
        let model = self.settings.model.trim_start_matches("models/");
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Sends one JSON-mode generation request and returns the model's text.
    async fn generate(&self, prompt: &str, schema: Value) -> Result<String, CollaboratorError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(CollaboratorError::MissingApiKey)?;

        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    CollaboratorError::Timeout(self.settings.timeout)
                } else {
                    CollaboratorError::Http(err.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| CollaboratorError::Http(err.to_string()))?;

        if !status.is_success() {
            return Err(CollaboratorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|err| CollaboratorError::InvalidResponse(err.to_string()))?;
        response_text(&value).ok_or_else(|| {
            CollaboratorError::InvalidResponse("gemini response missing text".to_string())
        })
    }
}

impl Categorizer for GeminiClient {
    async fn classify(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Category, CollaboratorError> {
        let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "category": {
                    "type": "STRING",
                    "enum": labels,
                    "description": "The most appropriate category for the event.",
                },
            },
            "required": ["category"],
        });

        let text = self
            .generate(&build_classify_prompt(title, description), schema)
            .await?;
        let reply: CategoryReply = serde_json::from_str(strip_fences(&text))
            .map_err(|err| CollaboratorError::InvalidResponse(err.to_string()))?;
        let label = reply.category.unwrap_or_default();
        Category::from_label(&label).ok_or_else(|| {
            CollaboratorError::InvalidResponse(format!("category outside taxonomy: {label:?}"))
        })
    }
}

impl Discoverer for GeminiClient {
    async fn discover(&self) -> Result<Vec<ScrapedCandidate>, CollaboratorError> {
        let today = base::today_in(&self.settings.timezone);
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "events": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "title": { "type": "STRING" },
                            "description": { "type": "STRING" },
                            "date": { "type": "STRING" },
                            "location": { "type": "STRING" },
                        },
                        "required": ["title", "description", "date", "location"],
                    },
                },
            },
        });

        let prompt = build_discovery_prompt(
            &self.settings.region,
            self.settings.discovery_count,
            &today.format(base::DATE_FORMAT).to_string(),
        );
        let text = self.generate(&prompt, schema).await?;
        let reply: DiscoveryReply = serde_json::from_str(strip_fences(&text))
            .map_err(|err| CollaboratorError::InvalidResponse(err.to_string()))?;
        Ok(scraping::prepare_candidates(reply.events, today))
    }
}

fn build_classify_prompt(title: &str, description: &str) -> String {
    let categories = Category::ALL
        .iter()
        .map(|c| format!("- {}", c.label()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Based on the following event title and description, classify it into one of the specified categories.\n\nTitle: {title:?}\nDescription: {description:?}\n\nCategories:\n{categories}\n\nReturn only the JSON object with the category.\n"
    )
}

fn build_discovery_prompt(region: &str, count: u32, today: &str) -> String {
    format!(
        "Act as a web scraper. Find {count} potential upcoming events in {region}.\nProvide the event title, a short description (around 20-30 words), the date in YYYY-MM-DD format, and the location.\nReturn the data as a JSON object with an \"events\" array. Today is {today}; do not include events before that date.\nEnsure the events are varied and interesting.\n"
    )
}

fn response_text(value: &Value) -> Option<String> {
    let parts = value
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<String>();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn strip_fences(text: &str) -> &str {
    FENCE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
}
