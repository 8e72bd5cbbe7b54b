//! Rasterization backend contract
//!
//! The compositor only talks to a [`Canvas`]. [`crate::raster::RasterCanvas`]
//! turns the calls into a PNG; [`RecordingCanvas`] keeps them as a log.

use image::Rgb;
use std::path::Path;
use thiserror::Error;

use crate::features::{AreaFeature, Extent, Point};
use crate::labels::{LabelSpec, PlotBounds};

/// Fill style for a polygon layer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FillStyle {
    pub color: Rgb<u8>,
    pub alpha: f32,
}

/// Stroke style for a line layer; `width` is in points
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineStyle {
    pub color: Rgb<u8>,
    pub width: f32,
    pub alpha: f32,
}

#[derive(Debug, Error)]
pub enum DrawError {
    #[error("malformed geometry: {0}")]
    MalformedGeometry(String),
    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),
    #[error("nothing was drawn")]
    EmptyScene,
    #[error("resolution must be at least 1 DPI")]
    ZeroDpi,
}

/// Draw calls the compositor issues, in issue order
pub trait Canvas {
    fn fill_background(&mut self, color: Rgb<u8>);

    /// Draw one polygon layer. The layer is rejected as a whole on failure.
    fn draw_polygons(&mut self, areas: &[AreaFeature], style: FillStyle) -> Result<(), DrawError>;

    /// Draw one line-collection layer. The layer is rejected as a whole on failure.
    fn draw_lines(&mut self, paths: &[&[Point]], style: LineStyle) -> Result<(), DrawError>;

    fn draw_text(&mut self, label: &LabelSpec);

    /// Extent of everything drawn so far, `None` if nothing was
    fn plot_bounds(&self) -> Option<PlotBounds>;

    fn save(&self, path: &Path, dpi: u32) -> Result<(), DrawError>;
}

/// Reject paths that cannot be stroked
pub fn validate_paths(paths: &[&[Point]]) -> Result<(), DrawError> {
    for (i, path) in paths.iter().enumerate() {
        if path.len() < 2 {
            return Err(DrawError::MalformedGeometry(format!(
                "line {} has {} point(s)",
                i,
                path.len()
            )));
        }
        if !path.iter().all(Point::is_finite) {
            return Err(DrawError::MalformedGeometry(format!(
                "line {} has non-finite coordinates",
                i
            )));
        }
    }
    Ok(())
}

/// Reject polygons that cannot be filled
pub fn validate_areas(areas: &[AreaFeature]) -> Result<(), DrawError> {
    for (i, area) in areas.iter().enumerate() {
        if area.rings.is_empty() {
            return Err(DrawError::MalformedGeometry(format!("polygon {} has no rings", i)));
        }
        for ring in &area.rings {
            if ring.len() < 3 {
                return Err(DrawError::MalformedGeometry(format!(
                    "polygon {} has a ring with {} point(s)",
                    i,
                    ring.len()
                )));
            }
            if !ring.iter().all(Point::is_finite) {
                return Err(DrawError::MalformedGeometry(format!(
                    "polygon {} has non-finite coordinates",
                    i
                )));
            }
        }
    }
    Ok(())
}

/// One accepted draw call
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    Background(Rgb<u8>),
    Polygons { count: usize, style: FillStyle },
    Lines { count: usize, style: LineStyle },
    Text(LabelSpec),
}

/// Canvas that records accepted draw calls instead of rasterizing them.
///
/// Validation matches the raster backend, so rejected layers never show up
/// in the log. Plot bounds are the plain extent of the recorded geometry.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub calls: Vec<DrawCall>,
    extent: Option<Extent>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    fn grow(&mut self, extent: Option<Extent>) {
        self.extent = match (self.extent, extent) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        };
    }
}

impl Canvas for RecordingCanvas {
    fn fill_background(&mut self, color: Rgb<u8>) {
        self.calls.push(DrawCall::Background(color));
    }

    fn draw_polygons(&mut self, areas: &[AreaFeature], style: FillStyle) -> Result<(), DrawError> {
        validate_areas(areas)?;
        self.grow(Extent::of(areas.iter().flat_map(|a| a.rings.iter().flatten())));
        self.calls.push(DrawCall::Polygons { count: areas.len(), style });
        Ok(())
    }

    fn draw_lines(&mut self, paths: &[&[Point]], style: LineStyle) -> Result<(), DrawError> {
        validate_paths(paths)?;
        self.grow(Extent::of(paths.iter().flat_map(|p| p.iter())));
        self.calls.push(DrawCall::Lines { count: paths.len(), style });
        Ok(())
    }

    fn draw_text(&mut self, label: &LabelSpec) {
        self.calls.push(DrawCall::Text(label.clone()));
    }

    fn plot_bounds(&self) -> Option<PlotBounds> {
        self.extent
            .map(|e| PlotBounds::new(e.min.x, e.max.x, e.min.y, e.max.y))
    }

    fn save(&self, _path: &Path, _dpi: u32) -> Result<(), DrawError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + 1.0, y),
            Point::new(x + 1.0, y + 1.0),
            Point::new(x, y + 1.0),
        ]
    }

    #[test]
    fn test_validate_paths() {
        let good = [Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        let short = [Point::new(0.0, 0.0)];
        let nan = [Point::new(0.0, 0.0), Point::new(f64::NAN, 1.0)];
        assert!(validate_paths(&[&good[..]]).is_ok());
        assert!(matches!(
            validate_paths(&[&good[..], &short[..]]),
            Err(DrawError::MalformedGeometry(_))
        ));
        assert!(validate_paths(&[&nan[..]]).is_err());
    }

    #[test]
    fn test_validate_areas() {
        assert!(validate_areas(&[AreaFeature::new(vec![square(0.0, 0.0)])]).is_ok());
        assert!(validate_areas(&[AreaFeature::new(vec![])]).is_err());
        assert!(validate_areas(&[AreaFeature::new(vec![square(0.0, 0.0)[..2].to_vec()])]).is_err());
    }

    #[test]
    fn test_recording_canvas_bounds_cover_all_layers() {
        let mut canvas = RecordingCanvas::new();
        assert!(canvas.plot_bounds().is_none());

        let style = FillStyle { color: Rgb([0, 0, 0]), alpha: 1.0 };
        canvas.draw_polygons(&[AreaFeature::new(vec![square(5.0, 5.0)])], style).unwrap();
        let road = [Point::new(-1.0, 2.0), Point::new(0.0, 3.0)];
        let line = LineStyle { color: Rgb([0, 0, 0]), width: 1.0, alpha: 1.0 };
        canvas.draw_lines(&[&road[..]], line).unwrap();

        assert_eq!(canvas.plot_bounds(), Some(PlotBounds::new(-1.0, 6.0, 2.0, 6.0)));
        assert_eq!(canvas.calls.len(), 2);
    }

    #[test]
    fn test_rejected_layer_is_not_recorded() {
        let mut canvas = RecordingCanvas::new();
        let bad = [Point::new(0.0, 0.0)];
        let line = LineStyle { color: Rgb([0, 0, 0]), width: 1.0, alpha: 1.0 };
        assert!(canvas.draw_lines(&[&bad[..]], line).is_err());
        assert!(canvas.calls.is_empty());
        assert!(canvas.plot_bounds().is_none());
    }
}
