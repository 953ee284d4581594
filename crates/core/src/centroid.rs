//! Label anchors and map bounds.
//!
//! Anchors are bounding-box midpoints, not area centroids. Concave shapes can
//! place the anchor outside the drawn area; that is accepted.

use serde::Serialize;

use crate::drawing::Drawing;
use crate::geometry::{Coordinates, GeometryKind};
use crate::types::CoordPair;

/// Anchor returned for an empty path.
pub const SENTINEL: CoordPair = [0.0, 0.0];

/// Map center used when there is nothing to frame.
pub const DEFAULT_CENTER: CoordPair = [44.0682, -114.7420];

/// Fraction of the span added on each side when framing drawings.
const BOUNDS_PADDING: f64 = 0.1;

/// Midpoint of the per-axis min/max of `path`. Empty paths yield [`SENTINEL`].
pub fn bbox_center(path: &[CoordPair]) -> CoordPair {
    match extent(path.iter()) {
        Some(ext) => ext.center(),
        None => SENTINEL,
    }
}

/// Anchor for a drawing: the point itself, or the bbox midpoint of a path.
pub fn marker_position(kind: GeometryKind, coords: &Coordinates) -> CoordPair {
    match (kind, coords) {
        (_, Coordinates::Point(p)) => *p,
        (GeometryKind::Point, Coordinates::Path(path)) if !path.is_empty() => path[0],
        (_, Coordinates::Path(path)) => bbox_center(path),
    }
}

/// Whether `pair` is the empty-path sentinel.
pub fn is_sentinel(pair: CoordPair) -> bool {
    pair == SENTINEL
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Extent {
    min: CoordPair,
    max: CoordPair,
}

impl Extent {
    fn center(&self) -> CoordPair {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        ]
    }
}

fn extent<'a>(pairs: impl Iterator<Item = &'a CoordPair>) -> Option<Extent> {
    pairs.fold(None, |acc, p| {
        Some(match acc {
            None => Extent { min: *p, max: *p },
            Some(ext) => Extent {
                min: [ext.min[0].min(p[0]), ext.min[1].min(p[1])],
                max: [ext.max[0].max(p[0]), ext.max[1].max(p[1])],
            },
        })
    })
}

// ---------------------------------------------------------------------------
// Map bounds
// ---------------------------------------------------------------------------

/// Viewport that frames a set of drawings (display order, degrees).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub center: CoordPair,
    pub has_elements: bool,
}

impl MapBounds {
    /// Bounds collapsed on [`DEFAULT_CENTER`], used when nothing is drawn.
    pub fn empty() -> Self {
        Self {
            north: DEFAULT_CENTER[0],
            south: DEFAULT_CENTER[0],
            east: DEFAULT_CENTER[1],
            west: DEFAULT_CENTER[1],
            center: DEFAULT_CENTER,
            has_elements: false,
        }
    }

    /// Union bounding box of every vertex, padded by 10% of the span per axis.
    pub fn from_drawings<'a>(drawings: impl IntoIterator<Item = &'a Drawing>) -> Self {
        let ext = extent(
            drawings
                .into_iter()
                .flat_map(|d| d.coordinates.vertices().iter()),
        );

        let Some(ext) = ext else {
            return Self::empty();
        };

        let lat_pad = (ext.max[0] - ext.min[0]) * BOUNDS_PADDING;
        let lng_pad = (ext.max[1] - ext.min[1]) * BOUNDS_PADDING;

        let north = ext.max[0] + lat_pad;
        let south = ext.min[0] - lat_pad;
        let east = ext.max[1] + lng_pad;
        let west = ext.min[1] - lng_pad;

        Self {
            north,
            south,
            east,
            west,
            center: [(north + south) / 2.0, (east + west) / 2.0],
            has_elements: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::test_support::drawing_with;

    #[test]
    fn single_vertex_centroid_is_itself() {
        assert_eq!(bbox_center(&[[10.0, 20.0]]), [10.0, 20.0]);
    }

    #[test]
    fn empty_path_yields_sentinel() {
        let c = bbox_center(&[]);
        assert!(is_sentinel(c));
    }

    #[test]
    fn centroid_lies_within_bbox() {
        let path = [[1.0, 5.0], [3.0, -2.0], [-4.0, 7.5], [2.2, 0.0]];
        let [lat, lng] = bbox_center(&path);
        assert!((-4.0..=3.0).contains(&lat));
        assert!((-2.0..=7.5).contains(&lng));
        assert_eq!([lat, lng], [-0.5, 2.75]);
    }

    #[test]
    fn concave_shape_anchor_is_bbox_midpoint() {
        // An L shape: the midpoint falls in the notch, outside the polygon.
        let path = [[0.0, 0.0], [0.0, 4.0], [1.0, 4.0], [1.0, 1.0], [4.0, 1.0], [4.0, 0.0]];
        assert_eq!(bbox_center(&path), [2.0, 2.0]);
    }

    #[test]
    fn point_marker_is_the_point() {
        let coords = Coordinates::Point([44.1, -114.2]);
        assert_eq!(marker_position(GeometryKind::Point, &coords), [44.1, -114.2]);
    }

    #[test]
    fn path_marker_is_bbox_center() {
        let coords = Coordinates::Path(vec![[0.0, 0.0], [2.0, 4.0]]);
        assert_eq!(marker_position(GeometryKind::Line, &coords), [1.0, 2.0]);
    }

    // -- MapBounds ------------------------------------------------------------

    #[test]
    fn no_drawings_uses_default_center() {
        let bounds = MapBounds::from_drawings(std::iter::empty());
        assert!(!bounds.has_elements);
        assert_eq!(bounds.center, DEFAULT_CENTER);
        assert_eq!(bounds.north, bounds.south);
    }

    #[test]
    fn bounds_are_padded_by_ten_percent() {
        let a = drawing_with("a", GeometryKind::Point, Coordinates::Point([40.0, -110.0]));
        let b = drawing_with(
            "b",
            GeometryKind::Line,
            Coordinates::Path(vec![[50.0, -120.0], [45.0, -115.0]]),
        );
        let bounds = MapBounds::from_drawings([&a, &b]);

        assert!(bounds.has_elements);
        assert!((bounds.north - 51.0).abs() < 1e-9);
        assert!((bounds.south - 39.0).abs() < 1e-9);
        assert!((bounds.east - (-109.0)).abs() < 1e-9);
        assert!((bounds.west - (-121.0)).abs() < 1e-9);
        assert!((bounds.center[0] - 45.0).abs() < 1e-9);
        assert!((bounds.center[1] - (-115.0)).abs() < 1e-9);
    }

    #[test]
    fn drawings_without_vertices_count_as_empty() {
        let d = drawing_with("a", GeometryKind::Line, Coordinates::Path(vec![]));
        let bounds = MapBounds::from_drawings([&d]);
        assert!(!bounds.has_elements);
    }
}
