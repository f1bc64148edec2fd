//! The closed set of post categories and the list-endpoint category filter.

use serde::{Deserialize, Serialize};

/// Content classification attached to every post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Technology,
    Lifestyle,
    Travel,
    Food,
    Health,
    Finance,
    Education,
    Entertainment,
}

/// A non-empty category filter value did not match the closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCategory;

impl std::fmt::Display for InvalidCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid category")
    }
}

impl std::error::Error for InvalidCategory {}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Technology,
        Category::Lifestyle,
        Category::Travel,
        Category::Food,
        Category::Health,
        Category::Finance,
        Category::Education,
        Category::Entertainment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technology => "TECHNOLOGY",
            Category::Lifestyle => "LIFESTYLE",
            Category::Travel => "TRAVEL",
            Category::Food => "FOOD",
            Category::Health => "HEALTH",
            Category::Finance => "FINANCE",
            Category::Education => "EDUCATION",
            Category::Entertainment => "ENTERTAINMENT",
        }
    }

    /// Case-insensitive lookup against the closed set.
    pub fn parse(input: &str) -> Option<Category> {
        let normalized = input.to_uppercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
    }

    /// Normalize a free-text category filter.
    ///
    /// Empty or absent input means "no filter" (matches everything). A
    /// non-empty value must name a known category; anything else is a
    /// terminal error, never a silent fall-through to "no filter".
    pub fn from_filter(input: Option<&str>) -> Result<Option<Category>, InvalidCategory> {
        match input.map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Category::parse(raw).map(Some).ok_or(InvalidCategory),
        }
    }
}
