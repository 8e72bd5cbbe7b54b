//! Label placement relative to the realized plot extent
//!
//! Positions are fractions of the final bounds, so labels stay put no
//! matter how far the road network reaches.

use image::Rgb;

use crate::features::LatLon;
use crate::theme::Theme;

/// Font sizes in points
pub const PRIMARY_FONT_SIZE: f32 = 72.0;
pub const SECONDARY_FONT_SIZE: f32 = 24.0;
pub const TERTIARY_FONT_SIZE: f32 = 28.0;

const PRIMARY_Y_FRACTION: f64 = 0.06;
const SECONDARY_Y_FRACTION: f64 = 0.03;
const TERTIARY_Y_FRACTION: f64 = 0.03;

/// Horizontal and vertical extent of the drawn scene, in data coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlotBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl PlotBounds {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self { x_min, x_max, y_min, y_max }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn center_x(&self) -> f64 {
        (self.x_min + self.x_max) / 2.0
    }
}

/// Which edge of the text box sits on the anchor point
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Bottom,
}

/// Text to draw and where; always horizontally centered on `x`
#[derive(Clone, Debug, PartialEq)]
pub struct LabelSpec {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: f32,
    pub color: Rgb<u8>,
    pub alpha: f32,
    pub bold: bool,
    pub v_align: VAlign,
}

/// Text content of the three poster labels
#[derive(Clone, Debug, PartialEq)]
pub struct LabelText {
    pub place: String,
    pub region: String,
    pub coords: LatLon,
}

/// `"{|lat|:.4}°{N|S}  {|lon|:.4}°{E|W}"`.
///
/// Latitude zero counts as north; longitude zero counts as east.
pub fn format_coordinates(coords: LatLon) -> String {
    let lat_dir = if coords.lat >= 0.0 { 'N' } else { 'S' };
    let lon_dir = if coords.lon < 0.0 { 'W' } else { 'E' };
    format!(
        "{:.4}°{}  {:.4}°{}",
        coords.lat.abs(),
        lat_dir,
        coords.lon.abs(),
        lon_dir
    )
}

/// Compute the place, coordinate and region labels for `bounds`.
///
/// Returns all three or, when `enabled` is false, none.
pub fn place_labels(
    bounds: &PlotBounds,
    text: &LabelText,
    theme: &Theme,
    enabled: bool,
) -> Vec<LabelSpec> {
    if !enabled {
        return Vec::new();
    }

    let x = bounds.center_x();
    let h = bounds.height();

    vec![
        LabelSpec {
            text: text.place.to_uppercase(),
            x,
            y: bounds.y_min + h * PRIMARY_Y_FRACTION,
            font_size: PRIMARY_FONT_SIZE,
            color: theme.text,
            alpha: 1.0,
            bold: true,
            v_align: VAlign::Bottom,
        },
        LabelSpec {
            text: format_coordinates(text.coords),
            x,
            y: bounds.y_min + h * SECONDARY_Y_FRACTION,
            font_size: SECONDARY_FONT_SIZE,
            color: theme.text,
            alpha: 0.7,
            bold: false,
            v_align: VAlign::Bottom,
        },
        LabelSpec {
            text: text.region.to_uppercase(),
            x,
            y: bounds.y_max - h * TERTIARY_Y_FRACTION,
            font_size: TERTIARY_FONT_SIZE,
            color: theme.text,
            alpha: 0.6,
            bold: false,
            v_align: VAlign::Top,
        },
    ]
}
