//! Coordinate normalization.
//!
//! Drawings are stored and served in display order (`[lat, lng]`), the order
//! the map renderer expects. Interchange payloads (GeoJSON, the low-code host)
//! use `[lng, lat]`. Everything that crosses that boundary goes through
//! [`canonicalize`] and [`Coordinates::swap_axes`].
//!
//! Points have exactly one canonical shape: a flat pair. Inputs that wrap a
//! point in an extra array layer (`[[lng, lat]]`) are unwrapped here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::CoreError;
use crate::types::CoordPair;

// ---------------------------------------------------------------------------
// Geometry kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Point,
    Line,
    Polyline,
    Polygon,
}

const VALID_KINDS: &[&str] = &["point", "line", "polyline", "polygon"];

impl GeometryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Line => "line",
            Self::Polyline => "polyline",
            Self::Polygon => "polygon",
        }
    }
}

impl FromStr for GeometryKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "point" => Ok(Self::Point),
            "line" => Ok(Self::Line),
            "polyline" => Ok(Self::Polyline),
            "polygon" => Ok(Self::Polygon),
            _ => Err(CoreError::Validation(format!(
                "Invalid geometry type '{s}'. Must be one of: {}",
                VALID_KINDS.join(", ")
            ))),
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// Canonical drawing coordinates: a flat pair for points, a vertex list for
/// everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinates {
    Point(CoordPair),
    Path(Vec<CoordPair>),
}

impl Coordinates {
    /// All vertices as a slice. A point is a one-element slice.
    pub fn vertices(&self) -> &[CoordPair] {
        match self {
            Self::Point(p) => std::slice::from_ref(p),
            Self::Path(path) => path,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices().is_empty()
    }

    /// Swap the two axes of every pair, keeping the shape.
    pub fn swap_axes(&self) -> Self {
        match self {
            Self::Point(p) => Self::Point(swap_axes(*p)),
            Self::Path(path) => Self::Path(path.iter().copied().map(swap_axes).collect()),
        }
    }
}

/// Coordinates as they arrive from the outside, before canonicalization.
///
/// Accepts a flat pair, a vertex list, or a list of rings (GeoJSON polygon
/// nesting). Only the first ring of a multi-ring payload is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCoordinates {
    Pair(CoordPair),
    Path(Vec<CoordPair>),
    Rings(Vec<Vec<CoordPair>>),
}

impl From<Coordinates> for RawCoordinates {
    fn from(coords: Coordinates) -> Self {
        match coords {
            Coordinates::Point(p) => Self::Pair(p),
            Coordinates::Path(path) => Self::Path(path),
        }
    }
}

/// Axis order of an incoming payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CoordinateOrder {
    /// `[lat, lng]`, the display order.
    #[default]
    LatLng,
    /// `[lng, lat]`, the GeoJSON order.
    LngLat,
}

/// Swap a single pair: `[a, b]` becomes `[b, a]`.
pub fn swap_axes(pair: CoordPair) -> CoordPair {
    [pair[1], pair[0]]
}

/// Reduce raw input to the canonical shape for `kind`. Axis order is not
/// touched.
pub fn canonicalize(kind: GeometryKind, raw: RawCoordinates) -> Result<Coordinates, CoreError> {
    match kind {
        GeometryKind::Point => {
            let vertices = match raw {
                RawCoordinates::Pair(p) => return Ok(Coordinates::Point(p)),
                RawCoordinates::Path(path) => path,
                RawCoordinates::Rings(rings) => rings.into_iter().next().unwrap_or_default(),
            };
            if vertices.len() > 1 {
                tracing::warn!(
                    vertex_count = vertices.len(),
                    "Point geometry carried several vertices, keeping the first"
                );
            }
            vertices
                .first()
                .copied()
                .map(Coordinates::Point)
                .ok_or_else(|| {
                    CoreError::Validation("point geometry requires one coordinate pair".to_string())
                })
        }
        _ => match raw {
            RawCoordinates::Pair(p) => {
                tracing::warn!(kind = %kind, "Single pair given for a path geometry, promoting to a path");
                Ok(Coordinates::Path(vec![p]))
            }
            RawCoordinates::Path(path) => Ok(Coordinates::Path(path)),
            RawCoordinates::Rings(rings) => {
                if rings.len() > 1 {
                    tracing::warn!(ring_count = rings.len(), "Dropping inner rings, keeping the outer ring");
                }
                Ok(Coordinates::Path(rings.into_iter().next().unwrap_or_default()))
            }
        },
    }
}

/// Canonicalize and convert an incoming payload to display order.
pub fn to_display_order(
    kind: GeometryKind,
    raw: RawCoordinates,
    order: CoordinateOrder,
) -> Result<Coordinates, CoreError> {
    let coords = canonicalize(kind, raw)?;
    Ok(match order {
        CoordinateOrder::LatLng => coords,
        CoordinateOrder::LngLat => coords.swap_axes(),
    })
}

/// Convert display-order coordinates to storage/interchange order.
pub fn to_storage_order(coords: &Coordinates) -> Coordinates {
    coords.swap_axes()
}

/// Close a freehand ring by repeating the first vertex at the end.
///
/// Only paths with more than two vertices whose ends differ are changed.
pub fn close_ring(mut path: Vec<CoordPair>) -> Vec<CoordPair> {
    if path.len() > 2 {
        let first = path[0];
        if path.last() != Some(&first) {
            path.push(first);
        }
    }
    path
}

/// Render a drawing's geometry as a GeoJSON geometry object (`[lng, lat]`).
///
/// Polygons are emitted with a closed outer ring since GeoJSON requires it;
/// the stored vertex list is not modified.
pub fn to_geojson_geometry(kind: GeometryKind, coords: &Coordinates) -> serde_json::Value {
    let lng_lat = to_storage_order(coords);
    match (kind, lng_lat) {
        (GeometryKind::Point, Coordinates::Point(p)) => {
            json!({ "type": "Point", "coordinates": p })
        }
        (GeometryKind::Point, Coordinates::Path(path)) => {
            json!({ "type": "MultiPoint", "coordinates": path })
        }
        (GeometryKind::Polygon, coords) => {
            let ring = close_ring(coords.vertices().to_vec());
            json!({ "type": "Polygon", "coordinates": [ring] })
        }
        (_, coords) => {
            json!({ "type": "LineString", "coordinates": coords.vertices() })
        }
    }
}
