use serde::{Deserialize, Serialize};
use std::fmt;

/// POI category. Closed set used for display filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Landmark,
    Church,
    Nature,
    Mountain,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Landmark,
        Category::Church,
        Category::Nature,
        Category::Mountain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Landmark => "landmark",
            Category::Church => "church",
            Category::Nature => "nature",
            Category::Mountain => "mountain",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deduplicated, scored, categorized POI ready for display filtering.
///
/// Never mutated after creation; a duplicate arrival replaces an entry only
/// when its score is strictly higher for the same identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPoint {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub category: Category,
    pub score: u32,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub url: Option<String>,
}

/// Per-cell progress of a fetch batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub completed: u64,
    pub failed: u64,
    pub total: u64,
}
