//! Geometry handed over by the feature provider
//!
//! Coordinates are plain lon/lat degrees; `x` is longitude and `y` latitude
//! throughout the crate.

use crate::classify::CategoryTag;

/// A lon/lat position in degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Center of the poster as returned by the geocoder
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// One road segment
#[derive(Clone, Debug, PartialEq)]
pub struct RoadFeature {
    pub tag: CategoryTag,
    pub path: Vec<Point>,
}

impl RoadFeature {
    pub fn new(tag: impl Into<CategoryTag>, path: Vec<Point>) -> Self {
        Self { tag: tag.into(), path }
    }
}

/// A water body or park: outer rings and holes, filled even-odd
#[derive(Clone, Debug, PartialEq)]
pub struct AreaFeature {
    pub rings: Vec<Vec<Point>>,
}

impl AreaFeature {
    pub fn new(rings: Vec<Vec<Point>>) -> Self {
        Self { rings }
    }
}

/// Everything fetched for one poster
#[derive(Clone, Debug, Default)]
pub struct MapData {
    pub roads: Vec<RoadFeature>,
    /// `None` when the fetch failed or returned nothing
    pub water: Option<Vec<AreaFeature>>,
    pub parks: Option<Vec<AreaFeature>>,
}

/// Axis-aligned extent of a set of points
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    pub min: Point,
    pub max: Point,
}

impl Extent {
    /// Extent of all finite points, or `None` if there are none
    pub fn of<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut extent: Option<Extent> = None;
        for p in points.into_iter().filter(|p| p.is_finite()) {
            extent = Some(match extent {
                None => Extent { min: *p, max: *p },
                Some(e) => e.include(*p),
            });
        }
        extent
    }

    fn include(self, p: Point) -> Self {
        Extent {
            min: Point::new(self.min.x.min(p.x), self.min.y.min(p.y)),
            max: Point::new(self.max.x.max(p.x), self.max.y.max(p.y)),
        }
    }

    pub fn union(self, other: Extent) -> Self {
        self.include(other.min).include(other.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_skips_non_finite_points() {
        let pts = [
            Point::new(1.0, 5.0),
            Point::new(f64::NAN, 0.0),
            Point::new(-2.0, 3.0),
        ];
        let e = Extent::of(&pts).unwrap();
        assert_eq!(e.min, Point::new(-2.0, 3.0));
        assert_eq!(e.max, Point::new(1.0, 5.0));
        assert!(Extent::of(&[] as &[Point]).is_none());
    }

    #[test]
    fn test_extent_union() {
        let a = Extent { min: Point::new(0.0, 0.0), max: Point::new(1.0, 1.0) };
        let b = Extent { min: Point::new(-1.0, 0.5), max: Point::new(0.5, 4.0) };
        let u = a.union(b);
        assert_eq!(u.min, Point::new(-1.0, 0.0));
        assert_eq!(u.max, Point::new(1.0, 4.0));
    }
}
