//! Category filter/limiter: derives the displayed list from a cached,
//! unfiltered result set. Pure function of its inputs.

use std::collections::HashMap;

use crate::types::{Category, ClassifiedPoint};

/// Partition by category, keep only active categories, truncate each
/// partition to `per_category_cap` by score, and return the merged list
/// sorted score-descending (ties by id, for determinism).
pub fn filter_and_limit(
    points: &[ClassifiedPoint],
    active: &[Category],
    per_category_cap: usize,
) -> Vec<ClassifiedPoint> {
    let mut buckets: HashMap<Category, Vec<&ClassifiedPoint>> = HashMap::new();
    for point in points {
        if active.contains(&point.category) {
            buckets.entry(point.category).or_default().push(point);
        }
    }

    let mut merged = Vec::new();
    for (_, mut bucket) in buckets {
        bucket.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        merged.extend(bucket.into_iter().take(per_category_cap).cloned());
    }

    merged.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, category: Category, score: u32) -> ClassifiedPoint {
        ClassifiedPoint {
            id: id.to_string(),
            lat: 51.0,
            lon: 20.0,
            name: id.to_string(),
            category,
            score,
            description: None,
            thumbnail_url: None,
            url: None,
        }
    }

    fn churches() -> Vec<ClassifiedPoint> {
        vec![
            point("c1", Category::Church, 9),
            point("c2", Category::Church, 8),
            point("c3", Category::Church, 7),
            point("c4", Category::Church, 6),
            point("c5", Category::Church, 5),
        ]
    }

    #[test]
    fn keeps_only_the_top_entries_per_category() {
        let result = filter_and_limit(&churches(), &[Category::Church], 2);
        let ids: Vec<&str> = result.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2"]);
    }

    #[test]
    fn is_idempotent_for_identical_arguments() {
        let points = churches();
        let first = filter_and_limit(&points, &[Category::Church], 2);
        let second = filter_and_limit(&points, &[Category::Church], 2);
        assert_eq!(first, second);
    }

    #[test]
    fn inactive_categories_are_dropped() {
        let points = vec![
            point("c1", Category::Church, 9),
            point("m1", Category::Mountain, 8),
            point("l1", Category::Landmark, 7),
        ];
        let result = filter_and_limit(&points, &[Category::Mountain, Category::Landmark], 10);
        let ids: Vec<&str> = result.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["m1", "l1"]);
    }

    #[test]
    fn cap_applies_per_category_before_the_final_sort() {
        let points = vec![
            point("c1", Category::Church, 9),
            point("c2", Category::Church, 3),
            point("m1", Category::Mountain, 5),
            point("m2", Category::Mountain, 4),
        ];
        let result = filter_and_limit(
            &points,
            &[Category::Church, Category::Mountain],
            1,
        );
        let ids: Vec<&str> = result.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["c1", "m1"]);
    }

    #[test]
    fn empty_active_set_yields_nothing() {
        assert!(filter_and_limit(&churches(), &[], 10).is_empty());
    }
}
