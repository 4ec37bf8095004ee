//! Projection of event coordinates onto a fixed rectangular map of the region.

use serde::{Deserialize, Serialize};

use crate::models::{Coords, Event, EventId};
use crate::taxonomy::Category;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MapBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Default for MapBounds {
    /// Monterrey metropolitan area.
    fn default() -> Self {
        Self {
            min_lat: 25.4,
            max_lat: 25.9,
            min_lng: -100.6,
            max_lng: -100.0,
        }
    }
}

/// Position as percentages from the top-left corner of the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapPosition {
    pub top_pct: f64,
    pub left_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapMarker {
    pub id: EventId,
    pub title: String,
    pub location: String,
    pub category: Category,
    pub position: MapPosition,
    pub in_bounds: bool,
}

impl MapBounds {
    /// Finite, with each minimum strictly below its maximum. Anything else
    /// would divide by zero or flip the map in `project`.
    pub fn is_valid(&self) -> bool {
        [self.min_lat, self.max_lat, self.min_lng, self.max_lng]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lat < self.max_lat
            && self.min_lng < self.max_lng
    }

    pub fn project(&self, coords: Coords) -> MapPosition {
        MapPosition {
            top_pct: (self.max_lat - coords.lat) / (self.max_lat - self.min_lat) * 100.0,
            left_pct: (coords.lng - self.min_lng) / (self.max_lng - self.min_lng) * 100.0,
        }
    }

    pub fn contains(&self, coords: Coords) -> bool {
        (self.min_lat..=self.max_lat).contains(&coords.lat)
            && (self.min_lng..=self.max_lng).contains(&coords.lng)
    }

    /// One marker per event, in input order. Out-of-bounds events are kept and
    /// flagged; the renderer decides whether to clip them.
    pub fn markers<'a, I>(&self, events: I) -> Vec<MapMarker>
    where
        I: IntoIterator<Item = &'a Event>,
    {
        events
            .into_iter()
            .map(|event| MapMarker {
                id: event.id,
                title: event.title.clone(),
                location: event.location.clone(),
                category: event.category,
                position: self.project(event.coords),
                in_bounds: self.contains(event.coords),
            })
            .collect()
    }
}
