//! Layer composition
//!
//! Decides what gets drawn and in what order: background, water, parks,
//! the six road buckets from least to most prominent, and finally the
//! roads that fit no bucket. Water, parks and individual buckets degrade
//! independently; one layer failing never stops the others.

use std::fmt;

use crate::canvas::{Canvas, FillStyle, LineStyle};
use crate::classify::{resolve_tag, RoadCategory};
use crate::features::{AreaFeature, MapData, Point, RoadFeature};
use crate::theme::Theme;

/// One composited pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerKind {
    Background,
    Water,
    Parks,
    Roads(RoadCategory),
    /// Roads whose resolved category is none of the named ones
    Remainder,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Background => write!(f, "background"),
            LayerKind::Water => write!(f, "water"),
            LayerKind::Parks => write!(f, "parks"),
            LayerKind::Roads(category) => write!(f, "{} roads", category),
            LayerKind::Remainder => write!(f, "other roads"),
        }
    }
}

/// What happened to a layer
#[derive(Clone, Debug, PartialEq)]
pub enum LayerOutcome {
    /// Drawn with this many features (zero for the background)
    Drawn { features: usize },
    /// No input for this layer
    Absent,
    /// The canvas rejected the layer; the render went on without it
    Skipped { reason: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayerReport {
    pub layer: LayerKind,
    pub outcome: LayerOutcome,
}

/// Per-layer outcomes in draw order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Composition {
    pub layers: Vec<LayerReport>,
}

impl Composition {
    pub fn outcome(&self, layer: LayerKind) -> Option<&LayerOutcome> {
        self.layers.iter().find(|r| r.layer == layer).map(|r| &r.outcome)
    }

    /// Number of road features that made it onto the canvas
    pub fn roads_drawn(&self) -> usize {
        self.layers
            .iter()
            .filter(|r| matches!(r.layer, LayerKind::Roads(_) | LayerKind::Remainder))
            .map(|r| match r.outcome {
                LayerOutcome::Drawn { features } => features,
                _ => 0,
            })
            .sum()
    }

    fn record(&mut self, layer: LayerKind, outcome: LayerOutcome) {
        self.layers.push(LayerReport { layer, outcome });
    }
}

/// Roads grouped by resolved category
#[derive(Debug, Default)]
pub struct RoadBuckets<'a> {
    named: [Vec<&'a RoadFeature>; 6],
    remainder: Vec<&'a RoadFeature>,
}

impl<'a> RoadBuckets<'a> {
    pub fn bucket(&self, category: RoadCategory) -> &[&'a RoadFeature] {
        &self.named[category.index()]
    }

    pub fn remainder(&self) -> &[&'a RoadFeature] {
        &self.remainder
    }

    /// Features across all buckets, remainder included
    pub fn len(&self) -> usize {
        self.named.iter().map(Vec::len).sum::<usize>() + self.remainder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Put every road in exactly one bucket, keyed by its resolved tag
pub fn partition_roads(roads: &[RoadFeature]) -> RoadBuckets<'_> {
    let mut buckets = RoadBuckets::default();
    for road in roads {
        match RoadCategory::parse(resolve_tag(&road.tag)) {
            Some(category) => buckets.named[category.index()].push(road),
            None => buckets.remainder.push(road),
        }
    }
    buckets
}

fn draw_area_layer<C: Canvas>(
    canvas: &mut C,
    areas: Option<&[AreaFeature]>,
    style: FillStyle,
) -> LayerOutcome {
    match areas {
        Some(areas) if !areas.is_empty() => match canvas.draw_polygons(areas, style) {
            Ok(()) => LayerOutcome::Drawn { features: areas.len() },
            Err(e) => LayerOutcome::Skipped { reason: e.to_string() },
        },
        _ => LayerOutcome::Absent,
    }
}

fn draw_road_layer<C: Canvas>(
    canvas: &mut C,
    roads: &[&RoadFeature],
    style: LineStyle,
) -> LayerOutcome {
    if roads.is_empty() {
        return LayerOutcome::Absent;
    }
    let paths: Vec<&[Point]> = roads.iter().map(|r| r.path.as_slice()).collect();
    match canvas.draw_lines(&paths, style) {
        Ok(()) => LayerOutcome::Drawn { features: roads.len() },
        Err(e) => LayerOutcome::Skipped { reason: e.to_string() },
    }
}

fn log_outcome(layer: LayerKind, outcome: &LayerOutcome) {
    match outcome {
        LayerOutcome::Drawn { features } if *features > 0 => {
            println!("    {}: {} feature(s)", layer, features);
        }
        LayerOutcome::Skipped { reason } => {
            println!("    {} skipped: {}", layer, reason);
        }
        _ => {}
    }
}

/// Draw all map layers onto `canvas` in poster order
pub fn compose<C: Canvas>(canvas: &mut C, theme: &Theme, data: &MapData) -> Composition {
    let mut composition = Composition::default();

    canvas.fill_background(theme.background);
    composition.record(LayerKind::Background, LayerOutcome::Drawn { features: 0 });

    let areas = [
        (LayerKind::Water, data.water.as_deref(), theme.water, theme.opacity.water),
        (LayerKind::Parks, data.parks.as_deref(), theme.parks, theme.opacity.parks),
    ];
    for (layer, features, color, alpha) in areas {
        if features.is_some_and(|f| !f.is_empty()) {
            println!("  - Drawing {}...", layer);
        }
        let outcome = draw_area_layer(canvas, features, FillStyle { color, alpha });
        log_outcome(layer, &outcome);
        composition.record(layer, outcome);
    }

    println!("  - Drawing roads...");
    let buckets = partition_roads(&data.roads);
    for category in RoadCategory::DRAW_ORDER {
        let (color, width) = theme.style_for(category.as_str());
        let style = LineStyle { color, width, alpha: theme.opacity.roads };
        let outcome = draw_road_layer(canvas, buckets.bucket(category), style);
        log_outcome(LayerKind::Roads(category), &outcome);
        composition.record(LayerKind::Roads(category), outcome);
    }

    let (color, width) = theme.default_style();
    let style = LineStyle { color, width, alpha: theme.opacity.remainder };
    let outcome = draw_road_layer(canvas, buckets.remainder(), style);
    log_outcome(LayerKind::Remainder, &outcome);
    composition.record(LayerKind::Remainder, outcome);

    composition
}
