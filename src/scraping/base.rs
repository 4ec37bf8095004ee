use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

use crate::models::ScrapedCandidate;
use crate::utils::clean_text;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_event_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).ok()
}

/// Calendar date "now" in the given zone, falling back to UTC for an unknown zone name.
pub fn today_in(timezone: &str) -> NaiveDate {
    match timezone.parse::<Tz>() {
        Ok(tz) => Utc::now().with_timezone(&tz).date_naive(),
        Err(err) => {
            tracing::warn!(timezone, "unknown timezone, using UTC: {err}");
            Utc::now().date_naive()
        }
    }
}

pub fn normalize_candidate(raw: ScrapedCandidate) -> ScrapedCandidate {
    ScrapedCandidate {
        title: clean_text(&raw.title),
        description: clean_text(&raw.description),
        date: clean_text(&raw.date),
        location: clean_text(&raw.location),
    }
}

/// A candidate is stale only when its date parses and lies before `today`.
pub fn is_past(candidate: &ScrapedCandidate, today: NaiveDate) -> bool {
    parse_event_date(&candidate.date).is_some_and(|date| date < today)
}
