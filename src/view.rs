use std::{fmt, str::FromStr};

use crate::favorites::FavoriteSet;
use crate::models::Event;
use crate::taxonomy::{Category, UnknownCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    AllEvents,
    Map,
    FavoritesOnly,
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "all" | "all-events" | "list" => Ok(ViewMode::AllEvents),
            "map" => Ok(ViewMode::Map),
            "favorites" | "favorites-only" => Ok(ViewMode::FavoritesOnly),
            other => Err(format!("unknown view: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = UnknownCategory;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        input.parse().map(CategoryFilter::Only)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(category) => write!(f, "{category}"),
        }
    }
}

/// Events to display for the given selections, in approved-collection order.
///
/// `ViewMode::Map` filters exactly like `AllEvents`; the map is a rendering
/// choice only.
pub fn visible_events<'a>(
    approved: &'a [Event],
    favorites: &FavoriteSet,
    mode: ViewMode,
    filter: CategoryFilter,
) -> Vec<&'a Event> {
    approved
        .iter()
        .filter(|event| mode != ViewMode::FavoritesOnly || favorites.contains(event.id))
        .filter(|event| filter.matches(event.category))
        .collect()
}
