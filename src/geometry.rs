//! Polygon geometry: point-in-polygon with holes, bounding boxes.

use serde::{Deserialize, Serialize};

/// A closed ring of (lat, lon) vertices.
pub type Ring = Vec<(f64, f64)>;

/// One polygon: ring 0 is the outer boundary, rings 1.. are holes.
pub type PolygonRings = Vec<Ring>;

/// Axis-aligned bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self { south, west, north, east }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }
}

/// Ray-casting parity test for a single ring.
///
/// A point exactly on a ring edge has unspecified inclusion.
pub fn point_in_ring(lat: f64, lon: f64, ring: &[(f64, f64)]) -> bool {
    if ring.is_empty() {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (yi, xi) = ring[i];
        let (yj, xj) = ring[j];
        let crosses =
            (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Point-in-polygon over a MultiPolygon-like shape.
///
/// A point is inside when it falls within any polygon's outer ring and
/// inside none of that polygon's holes.
pub fn point_in_polygons(lat: f64, lon: f64, polygons: &[PolygonRings]) -> bool {
    for poly in polygons {
        let outer = match poly.first() {
            Some(ring) => ring,
            None => continue,
        };
        if !point_in_ring(lat, lon, outer) {
            continue;
        }
        let in_hole = poly[1..].iter().any(|hole| point_in_ring(lat, lon, hole));
        if !in_hole {
            return true;
        }
    }
    false
}

/// Bounding box over every ring vertex. `None` for degenerate geometry.
pub fn bounds_of(polygons: &[PolygonRings]) -> Option<BBox> {
    let mut south = 90.0_f64;
    let mut west = 180.0_f64;
    let mut north = -90.0_f64;
    let mut east = -180.0_f64;
    let mut seen = false;

    for poly in polygons {
        for ring in poly {
            for &(lat, lon) in ring {
                south = south.min(lat);
                north = north.max(lat);
                west = west.min(lon);
                east = east.max(lon);
                seen = true;
            }
        }
    }

    if seen {
        Some(BBox { south, west, north, east })
    } else {
        None
    }
}
