//! Result merger: exact containment filter, dedup by backend identifier,
//! popularity scoring, and rule-table classification.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::backend::RawResult;
use crate::geometry::{self, PolygonRings};
use crate::types::{Category, ClassifiedPoint};

/// Popularity score: a weighted sum over available signal fields, in order
/// of trust. Richer, better-verified entries score strictly higher than
/// sparser ones; equal inputs always score the same.
pub fn score_tags(tags: &HashMap<String, String>) -> u32 {
    let mut score = 0;
    if tags.contains_key("wikipedia") {
        score += 4;
    }
    if tags.contains_key("wikidata") {
        score += 3;
    }
    if tags.contains_key("heritage") {
        score += 2;
    }
    if matches!(
        tags.get("tourism").map(String::as_str),
        Some("attraction") | Some("museum")
    ) {
        score += 2;
    }
    if tags.contains_key("historic") || tags.contains_key("memorial") {
        score += 1;
    }
    if tags.get("amenity").map(String::as_str) == Some("place_of_worship") {
        score += 1;
    }
    if tags.get("natural").map(String::as_str) == Some("peak")
        || tags.get("tourism").map(String::as_str) == Some("viewpoint")
    {
        score += 1;
    }
    score
}

/// One classification rule: a tag key, an optional required value (`None`
/// means key presence alone matches), and the category it assigns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRule {
    pub key: String,
    pub value: Option<String>,
    pub category: Category,
}

impl TagRule {
    fn new(key: &str, value: Option<&str>, category: Category) -> Self {
        Self {
            key: key.to_string(),
            value: value.map(|v| v.to_string()),
            category,
        }
    }
}

/// Classification rule table, evaluated in order; first match wins.
///
/// The exclusion keywords are heuristic and locale-specific (tuned for
/// Polish-language backend text); callers targeting another locale should
/// supply their own table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierRules {
    pub rules: Vec<TagRule>,
    /// Name prefixes of administrative/index entries, excluded outright.
    pub excluded_name_prefixes: Vec<String>,
    /// Lowercase substrings of settlement-index text, excluded outright.
    pub excluded_text_patterns: Vec<String>,
}

static DEFAULT_RULES: Lazy<ClassifierRules> = Lazy::new(|| ClassifierRules {
    // Priority order: church > mountain > nature > landmark.
    rules: vec![
        TagRule::new("amenity", Some("place_of_worship"), Category::Church),
        TagRule::new("natural", Some("peak"), Category::Mountain),
        TagRule::new("tourism", Some("viewpoint"), Category::Nature),
        TagRule::new("natural", Some("spring"), Category::Nature),
        TagRule::new("tourism", Some("attraction"), Category::Landmark),
        TagRule::new("tourism", Some("museum"), Category::Landmark),
        TagRule::new("historic", None, Category::Landmark),
        TagRule::new("memorial", None, Category::Landmark),
    ],
    excluded_name_prefixes: vec![
        "Powiat ".to_string(),
        "Gmina ".to_string(),
        "Województwo ".to_string(),
    ],
    excluded_text_patterns: vec!["miejscowości".to_string()],
});

impl Default for ClassifierRules {
    fn default() -> Self {
        DEFAULT_RULES.clone()
    }
}

impl ClassifierRules {
    /// Administrative/boundary-only entries (index pages, unit listings)
    /// are excluded regardless of any other signal.
    pub fn is_administrative(&self, raw: &RawResult) -> bool {
        let name = match &raw.name {
            Some(name) => name,
            None => return false,
        };
        if self
            .excluded_name_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
        {
            return true;
        }
        let haystack = match &raw.description {
            Some(desc) => format!("{} {}", name, desc).to_lowercase(),
            None => name.to_lowercase(),
        };
        self.excluded_text_patterns
            .iter()
            .any(|pattern| haystack.contains(pattern.as_str()))
    }

    /// First matching rule wins; no match means the record is dropped.
    pub fn classify(&self, tags: &HashMap<String, String>) -> Option<Category> {
        for rule in &self.rules {
            match (&rule.value, tags.get(&rule.key)) {
                (Some(required), Some(actual)) if actual == required => {
                    return Some(rule.category)
                }
                (None, Some(_)) => return Some(rule.category),
                _ => {}
            }
        }
        None
    }
}

/// Merge raw results from all cells into the final classified list.
///
/// Points outside the exact region polygon are discarded (the tile grid
/// over-queries near the boundary), duplicates keep the strictly higher
/// score, and unclassifiable or administrative records are dropped. Output
/// is score-descending, ties broken by id, so the result is deterministic
/// for the same input multiset regardless of arrival order.
pub fn merge(
    raws: impl IntoIterator<Item = RawResult>,
    polygons: &[PolygonRings],
    rules: &ClassifierRules,
) -> Vec<ClassifiedPoint> {
    let mut seen: HashMap<String, ClassifiedPoint> = HashMap::new();

    for raw in raws {
        if !geometry::point_in_polygons(raw.lat, raw.lon, polygons) {
            continue;
        }
        if rules.is_administrative(&raw) {
            log::debug!("[merge] excluding administrative entry {}", raw.id);
            continue;
        }
        let name = match &raw.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => continue,
        };
        let category = match rules.classify(&raw.tags) {
            Some(category) => category,
            None => continue,
        };

        let point = ClassifiedPoint {
            id: raw.id.clone(),
            lat: raw.lat,
            lon: raw.lon,
            name,
            category,
            score: score_tags(&raw.tags),
            description: raw.description,
            thumbnail_url: raw.thumbnail_url,
            url: raw.tags.get("website").cloned(),
        };

        match seen.entry(raw.id) {
            Entry::Occupied(mut existing) => {
                if point.score > existing.get().score {
                    existing.insert(point);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(point);
            }
        }
    }

    let mut points: Vec<ClassifiedPoint> = seen.into_values().collect();
    points.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    log::info!("[merge] {} classified points", points.len());
    points
}
