//! Region catalog: polygon geometry plus a stable display name per region.
//!
//! Regions are loaded from a GeoJSON FeatureCollection (e.g. the Polish
//! voivodeship boundaries); each feature becomes one [`Region`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geometry::{self, BBox, PolygonRings, Ring};

/// The polygon (with possible holes) and identity for which POIs are
/// discovered. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    /// Stable cache key. Equal to the display name for 1:1 catalogs.
    pub key: String,
    pub name: String,
    /// MultiPolygon-like shape: each member is outer ring + holes.
    pub polygons: Vec<PolygonRings>,
    /// Derived box; `None` for degenerate geometry (no cells generated).
    pub bbox: Option<BBox>,
}

impl Region {
    pub fn new(name: impl Into<String>, polygons: Vec<PolygonRings>) -> Self {
        let name = name.into();
        let bbox = geometry::bounds_of(&polygons);
        Self {
            key: name.clone(),
            name,
            polygons,
            bbox,
        }
    }

    /// Exact containment test against the region geometry.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        geometry::point_in_polygons(lat, lon, &self.polygons)
    }
}

/// Display-name lookup over feature properties, in catalog precedence order.
fn feature_name(properties: Option<&Value>) -> Option<String> {
    let props = properties?;
    for key in ["name", "NAME_1", "woj"] {
        if let Some(name) = props.get(key).and_then(Value::as_str) {
            if !name.trim().is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

fn ring_from_value(value: &Value) -> Option<Ring> {
    let positions = value.as_array()?;
    let mut ring = Vec::with_capacity(positions.len());
    for pos in positions {
        let pair = pos.as_array()?;
        // GeoJSON positions are [lon, lat]; rings are stored (lat, lon).
        let lon = pair.first()?.as_f64()?;
        let lat = pair.get(1)?.as_f64()?;
        ring.push((lat, lon));
    }
    Some(ring)
}

fn polygon_from_value(value: &Value) -> Option<PolygonRings> {
    value.as_array()?.iter().map(ring_from_value).collect()
}

/// Ring extraction from a GeoJSON geometry object.
///
/// Unsupported or malformed geometry yields no polygons rather than failing.
pub fn rings_of(geometry: &Value) -> Vec<PolygonRings> {
    let kind = geometry.get("type").and_then(Value::as_str);
    let coords = geometry.get("coordinates");
    match (kind, coords) {
        (Some("Polygon"), Some(c)) => polygon_from_value(c).map(|p| vec![p]).unwrap_or_default(),
        (Some("MultiPolygon"), Some(c)) => c
            .as_array()
            .map(|polys| polys.iter().filter_map(polygon_from_value).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Parse a GeoJSON FeatureCollection into a name-sorted region catalog.
///
/// Features without a usable name or geometry are skipped with a warning.
pub fn regions_from_geojson(raw: &str) -> Result<Vec<Region>, serde_json::Error> {
    let doc: Value = serde_json::from_str(raw)?;
    let features = doc
        .get("features")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut regions = Vec::with_capacity(features.len());
    for feature in &features {
        let name = match feature_name(feature.get("properties")) {
            Some(name) => name,
            None => {
                log::warn!("[region] skipping feature without a usable name");
                continue;
            }
        };
        let polygons = feature.get("geometry").map(rings_of).unwrap_or_default();
        if polygons.is_empty() {
            log::warn!("[region] skipping feature '{}' without polygon geometry", name);
            continue;
        }
        regions.push(Region::new(name, polygons));
    }

    regions.sort_by(|a, b| a.name.cmp(&b.name));
    log::info!("[region] loaded {} regions", regions.len());
    Ok(regions)
}
