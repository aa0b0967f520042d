//! Cell sampler: covers a region's bounding box with backend-shaped query
//! cells (rectangular tiles for bbox backends, hex-packed radius centers for
//! radius backends).

use serde::{Deserialize, Serialize};

use crate::geometry::{self, BBox, PolygonRings};

/// Meters per degree of latitude, good enough for cell spacing.
const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Minimum retained hex centers before the radius is shrunk.
const MIN_HEX_CENTERS: usize = 24;

/// Multiplicative radius shrink applied per refinement pass.
const HEX_SHRINK_FACTOR: f64 = 0.75;

/// Upper bound on shrink-and-regenerate passes.
const MAX_REFINE_PASSES: usize = 4;

/// One unit of backend query coverage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    /// Radius query centered on a point.
    Around { lat: f64, lon: f64, radius_m: f64 },
    /// Bounding-box query.
    Rect {
        south: f64,
        west: f64,
        north: f64,
        east: f64,
    },
}

/// Which cell shape to generate, chosen by the backend's query shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SamplingStrategy {
    TileGrid { rows: u32, cols: u32 },
    HexGrid { radius_m: f64 },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        SamplingStrategy::TileGrid { rows: 4, cols: 3 }
    }
}

/// Cover the region with sampling cells. Deterministic for identical inputs;
/// degenerate geometry (no bbox) yields no cells.
pub fn sample_cells(
    bbox: Option<BBox>,
    polygons: &[PolygonRings],
    strategy: SamplingStrategy,
) -> Vec<Cell> {
    let bbox = match bbox {
        Some(b) => b,
        None => return Vec::new(),
    };
    match strategy {
        SamplingStrategy::TileGrid { rows, cols } => tile_grid(&bbox, rows, cols),
        SamplingStrategy::HexGrid { radius_m } => hex_grid(&bbox, polygons, radius_m),
    }
}

/// Partition the bounding box into a rows x cols grid of rectangular cells.
///
/// Every tile is queried regardless of polygon overlap; results near or
/// outside the true boundary are discarded later by the exact containment
/// filter in the merger.
pub fn tile_grid(bbox: &BBox, rows: u32, cols: u32) -> Vec<Cell> {
    if rows == 0 || cols == 0 {
        return Vec::new();
    }
    let d_lat = (bbox.north - bbox.south) / rows as f64;
    let d_lon = (bbox.east - bbox.west) / cols as f64;

    let mut cells = Vec::with_capacity((rows * cols) as usize);
    for r in 0..rows {
        for c in 0..cols {
            cells.push(Cell::Rect {
                south: bbox.south + r as f64 * d_lat,
                west: bbox.west + c as f64 * d_lon,
                north: bbox.south + (r + 1) as f64 * d_lat,
                east: bbox.west + (c + 1) as f64 * d_lon,
            });
        }
    }
    cells
}

/// Offset-row hexagonal packing of radius-query centers.
///
/// Horizontal spacing is `2 * radius * 0.8` (neighbouring circles overlap),
/// vertical spacing `sqrt(3) * radius`, with every other row offset by half
/// the horizontal spacing. A center is retained only when it falls inside
/// the polygon. Below [`MIN_HEX_CENTERS`] retained centers the radius is
/// shrunk by [`HEX_SHRINK_FACTOR`] and the grid regenerated, up to
/// [`MAX_REFINE_PASSES`] passes, so small or oddly-shaped regions still get
/// adequate coverage.
pub fn hex_grid(bbox: &BBox, polygons: &[PolygonRings], radius_m: f64) -> Vec<Cell> {
    if radius_m <= 0.0 {
        log::warn!("[sampler] non-positive hex radius {}", radius_m);
        return Vec::new();
    }

    let mut radius = radius_m;
    let mut cells = hex_pass(bbox, polygons, radius);
    for pass in 1..MAX_REFINE_PASSES {
        if cells.len() >= MIN_HEX_CENTERS {
            break;
        }
        radius *= HEX_SHRINK_FACTOR;
        let denser = hex_pass(bbox, polygons, radius);
        log::debug!(
            "[sampler] refine pass {}: radius {:.0}m, {} -> {} centers",
            pass,
            radius,
            cells.len(),
            denser.len()
        );
        if denser.len() > cells.len() {
            cells = denser;
        }
    }
    cells
}

fn hex_pass(bbox: &BBox, polygons: &[PolygonRings], radius_m: f64) -> Vec<Cell> {
    let h_spacing_m = 2.0 * radius_m * 0.8;
    let v_spacing_m = 3.0_f64.sqrt() * radius_m;

    let center_lat = (bbox.south + bbox.north) / 2.0;
    let d_lat = v_spacing_m / METERS_PER_DEG_LAT;
    let d_lon = h_spacing_m / (METERS_PER_DEG_LAT * center_lat.to_radians().cos());
    if d_lat <= 0.0 || d_lon <= 0.0 || !d_lat.is_finite() || !d_lon.is_finite() {
        return Vec::new();
    }

    let mut cells = Vec::new();
    let mut row: u32 = 0;
    let mut lat = bbox.south;
    while lat <= bbox.north {
        let offset = if row % 2 == 1 { d_lon / 2.0 } else { 0.0 };
        let mut lon = bbox.west + offset;
        while lon <= bbox.east {
            if geometry::point_in_polygons(lat, lon, polygons) {
                cells.push(Cell::Around {
                    lat,
                    lon,
                    radius_m,
                });
            }
            lon += d_lon;
        }
        lat += d_lat;
        row += 1;
    }
    cells
}
