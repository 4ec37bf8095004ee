use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed set of event categories. `Uncategorized` is the sentinel used until
/// (or when) classification produces a real member.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Category {
    #[serde(rename = "Fun Hunters")]
    Fun,
    #[serde(rename = "Family Hunters")]
    Family,
    #[serde(rename = "Fashion Hunters")]
    Fashion,
    #[serde(rename = "Outdoor & Sports Hunter")]
    Sports,
    #[serde(rename = "Coolture Hunter")]
    Culture,
    #[serde(rename = "Wellness Hunter")]
    Wellness,
    #[serde(rename = "Networking Hunter")]
    Networking,
    #[serde(rename = "Xperience Hunter")]
    Xperience,
    #[default]
    #[serde(rename = "Uncategorized")]
    Uncategorized,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl Category {
    /// Taxonomy members offered to the classifier, sentinel excluded.
    pub const ALL: [Category; 8] = [
        Category::Fun,
        Category::Family,
        Category::Fashion,
        Category::Sports,
        Category::Culture,
        Category::Wellness,
        Category::Networking,
        Category::Xperience,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Fun => "Fun Hunters",
            Category::Family => "Family Hunters",
            Category::Fashion => "Fashion Hunters",
            Category::Sports => "Outdoor & Sports Hunter",
            Category::Culture => "Coolture Hunter",
            Category::Wellness => "Wellness Hunter",
            Category::Networking => "Networking Hunter",
            Category::Xperience => "Xperience Hunter",
            Category::Uncategorized => "Uncategorized",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Category::Fun => "fun",
            Category::Family => "family",
            Category::Fashion => "fashion",
            Category::Sports => "sports",
            Category::Culture => "culture",
            Category::Wellness => "wellness",
            Category::Networking => "networking",
            Category::Xperience => "xperience",
            Category::Uncategorized => "uncategorized",
        }
    }

    pub fn is_sentinel(self) -> bool {
        self == Category::Uncategorized
    }

    /// Exact label lookup, used when validating classifier output.
    pub fn from_label(label: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .chain(std::iter::once(Category::Uncategorized))
            .find(|category| category.label() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let needle = input.trim();
        Category::ALL
            .into_iter()
            .chain(std::iter::once(Category::Uncategorized))
            .find(|category| {
                category.label().eq_ignore_ascii_case(needle)
                    || category.key().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| UnknownCategory(input.to_string()))
    }
}
