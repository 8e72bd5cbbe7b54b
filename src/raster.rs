//! Raster backend: display list in lon/lat, rasterized on save
//!
//! Draw calls are kept in data coordinates until `save`, so the plot bounds
//! (and with them the label anchors) reflect everything that was drawn.
//! Each layer is rasterized into its own coverage mask and composited once
//! at the layer's opacity, the way a line collection is painted as a whole.

use image::{ImageBuffer, Rgb, RgbImage};
use std::path::Path;

use crate::canvas::{validate_areas, validate_paths, Canvas, DrawError, FillStyle, LineStyle};
use crate::features::{AreaFeature, Extent, Point};
use crate::font;
use crate::labels::{LabelSpec, PlotBounds, VAlign};

/// Points per inch; line widths and font sizes are in points
const POINTS_PER_INCH: f64 = 72.0;
/// Cap height of the bitmap font relative to the font size
const CAP_HEIGHT: f64 = 0.72;
/// Half-span used when the drawn geometry has zero extent on an axis
const MIN_HALF_SPAN: f64 = 1e-4;

/// Poster geometry
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasConfig {
    /// Figure size in inches
    pub width_in: f64,
    pub height_in: f64,
    /// Empty border around the plot area, in inches
    pub pad_in: f64,
    /// Fraction of the data span added on each side of the plot bounds
    pub margin: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width_in: 18.0,
            height_in: 24.0,
            pad_in: 0.5,
            margin: 0.05,
        }
    }
}

enum Layer {
    Background(Rgb<u8>),
    Polygons { areas: Vec<AreaFeature>, style: FillStyle },
    Lines { paths: Vec<Vec<Point>>, style: LineStyle },
    Text(LabelSpec),
}

/// Canvas backed by an `image::RgbImage`
pub struct RasterCanvas {
    config: CanvasConfig,
    layers: Vec<Layer>,
    extent: Option<Extent>,
}

impl RasterCanvas {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            config,
            layers: Vec::new(),
            extent: None,
        }
    }

    fn grow(&mut self, extent: Option<Extent>) {
        self.extent = match (self.extent, extent) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        };
    }

    /// Pixel dimensions of the poster at `dpi`
    pub fn pixel_size(&self, dpi: u32) -> (u32, u32) {
        let dpi = dpi as f64;
        (
            (self.config.width_in * dpi).round().max(1.0) as u32,
            (self.config.height_in * dpi).round().max(1.0) as u32,
        )
    }

    /// Rasterize the display list
    pub fn render(&self, dpi: u32) -> Result<RgbImage, DrawError> {
        if dpi == 0 {
            return Err(DrawError::ZeroDpi);
        }
        let bounds = self.plot_bounds().ok_or(DrawError::EmptyScene)?;
        let (width, height) = self.pixel_size(dpi);
        let viewport = Viewport::fit(&bounds, width, height, self.config.pad_in * dpi as f64);
        let px_per_pt = dpi as f64 / POINTS_PER_INCH;

        let mut img: RgbImage = ImageBuffer::from_pixel(width, height, Rgb([0, 0, 0]));
        for layer in &self.layers {
            match layer {
                Layer::Background(color) => {
                    for pixel in img.pixels_mut() {
                        *pixel = *color;
                    }
                }
                Layer::Polygons { areas, style } => {
                    let mut mask = Mask::new(width, height);
                    for area in areas {
                        let rings: Vec<Vec<(f64, f64)>> = area
                            .rings
                            .iter()
                            .map(|ring| ring.iter().map(|p| viewport.to_px(*p)).collect())
                            .collect();
                        mask.fill_even_odd(&rings);
                    }
                    mask.composite(&mut img, style.color, style.alpha);
                }
                Layer::Lines { paths, style } => {
                    let mut mask = Mask::new(width, height);
                    let stroke = style.width as f64 * px_per_pt;
                    for path in paths {
                        for seg in path.windows(2) {
                            let a = viewport.to_px(seg[0]);
                            let b = viewport.to_px(seg[1]);
                            mask.stroke_segment(a, b, stroke);
                        }
                    }
                    mask.composite(&mut img, style.color, style.alpha);
                }
                Layer::Text(label) => {
                    let mut mask = Mask::new(width, height);
                    let cap_px = label.font_size as f64 * px_per_pt * CAP_HEIGHT;
                    let anchor = viewport.to_px(Point::new(label.x, label.y));
                    mask.draw_text(&label.text, anchor, cap_px, label.v_align, label.bold);
                    mask.composite(&mut img, label.color, label.alpha);
                }
            }
        }
        Ok(img)
    }
}

impl Default for RasterCanvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl Canvas for RasterCanvas {
    fn fill_background(&mut self, color: Rgb<u8>) {
        self.layers.push(Layer::Background(color));
    }

    fn draw_polygons(&mut self, areas: &[AreaFeature], style: FillStyle) -> Result<(), DrawError> {
        validate_areas(areas)?;
        self.grow(Extent::of(areas.iter().flat_map(|a| a.rings.iter().flatten())));
        self.layers.push(Layer::Polygons { areas: areas.to_vec(), style });
        Ok(())
    }

    fn draw_lines(&mut self, paths: &[&[Point]], style: LineStyle) -> Result<(), DrawError> {
        validate_paths(paths)?;
        self.grow(Extent::of(paths.iter().flat_map(|p| p.iter())));
        self.layers.push(Layer::Lines {
            paths: paths.iter().map(|p| p.to_vec()).collect(),
            style,
        });
        Ok(())
    }

    fn draw_text(&mut self, label: &LabelSpec) {
        self.layers.push(Layer::Text(label.clone()));
    }

    fn plot_bounds(&self) -> Option<PlotBounds> {
        let e = self.extent?;
        let pad = |lo: f64, hi: f64| {
            let half = ((hi - lo) / 2.0).max(MIN_HALF_SPAN);
            let mid = (lo + hi) / 2.0;
            let half = half * (1.0 + 2.0 * self.config.margin);
            (mid - half, mid + half)
        };
        let (x_min, x_max) = pad(e.min.x, e.max.x);
        let (y_min, y_max) = pad(e.min.y, e.max.y);
        Some(PlotBounds::new(x_min, x_max, y_min, y_max))
    }

    fn save(&self, path: &Path, dpi: u32) -> Result<(), DrawError> {
        let img = self.render(dpi)?;
        img.save(path)?;
        Ok(())
    }
}

/// Maps lon/lat into pixel space, keeping ground distances equal on both axes
#[derive(Clone, Copy, Debug, PartialEq)]
struct Viewport {
    x_min: f64,
    y_max: f64,
    sx: f64,
    sy: f64,
    ox: f64,
    oy: f64,
}

impl Viewport {
    fn fit(bounds: &PlotBounds, width: u32, height: u32, pad_px: f64) -> Self {
        let avail_w = (width as f64 - 2.0 * pad_px).max(1.0);
        let avail_h = (height as f64 - 2.0 * pad_px).max(1.0);

        // A degree of longitude shrinks with latitude
        let mid_lat = (bounds.y_min + bounds.y_max) / 2.0;
        let x_factor = mid_lat.clamp(-85.0, 85.0).to_radians().cos();

        let span_x = bounds.width() * x_factor;
        let span_y = bounds.height();
        let scale = (avail_w / span_x).min(avail_h / span_y);

        let sx = scale * x_factor;
        let sy = scale;
        Self {
            x_min: bounds.x_min,
            y_max: bounds.y_max,
            sx,
            sy,
            ox: pad_px + (avail_w - span_x * scale) / 2.0,
            oy: pad_px + (avail_h - span_y * scale) / 2.0,
        }
    }

    fn to_px(&self, p: Point) -> (f64, f64) {
        (
            self.ox + (p.x - self.x_min) * self.sx,
            self.oy + (self.y_max - p.y) * self.sy,
        )
    }
}

/// Per-pixel coverage in 0..=1
struct Mask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Mask {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    fn cover(&mut self, x: i64, y: i64, value: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        if value > self.data[idx] {
            self.data[idx] = value;
        }
    }

    /// Anti-aliased stroke of one segment with round ends
    fn stroke_segment(&mut self, a: (f64, f64), b: (f64, f64), width_px: f64) {
        let half = width_px.max(1.0) / 2.0;
        // Hairlines fade instead of shrinking below a pixel
        let intensity = width_px.min(1.0) as f32;
        let reach = half + 1.0;

        let x0 = (a.0.min(b.0) - reach).floor().max(0.0) as i64;
        let x1 = (a.0.max(b.0) + reach).ceil().min(self.width as f64) as i64;
        let y0 = (a.1.min(b.1) - reach).floor().max(0.0) as i64;
        let y1 = (a.1.max(b.1) + reach).ceil().min(self.height as f64) as i64;

        for y in y0..y1 {
            for x in x0..x1 {
                let d = distance_to_segment((x as f64 + 0.5, y as f64 + 0.5), a, b);
                let coverage = (half + 0.5 - d).clamp(0.0, 1.0) as f32;
                if coverage > 0.0 {
                    self.cover(x, y, coverage * intensity);
                }
            }
        }
    }

    /// Scanline fill of one polygon; rings are implicitly closed
    fn fill_even_odd(&mut self, rings: &[Vec<(f64, f64)>]) {
        let (mut y_lo, mut y_hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(_, y) in rings.iter().flatten() {
            y_lo = y_lo.min(y);
            y_hi = y_hi.max(y);
        }
        if !y_lo.is_finite() {
            return;
        }
        let row_start = (y_lo - 0.5).ceil().max(0.0) as i64;
        let row_end = (y_hi - 0.5).floor().min(self.height as f64 - 1.0) as i64;

        let mut crossings = Vec::new();
        for row in row_start..=row_end {
            let sy = row as f64 + 0.5;
            crossings.clear();
            for ring in rings {
                let n = ring.len();
                for i in 0..n {
                    let (ax, ay) = ring[i];
                    let (bx, by) = ring[(i + 1) % n];
                    if (ay <= sy) != (by <= sy) {
                        crossings.push(ax + (sy - ay) / (by - ay) * (bx - ax));
                    }
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for span in crossings.chunks_exact(2) {
                let start = (span[0] - 0.5).ceil().max(0.0) as i64;
                let end = (span[1] - 0.5).floor().min(self.width as f64 - 1.0) as i64;
                for x in start..=end {
                    self.cover(x, row, 1.0);
                }
            }
        }
    }

    /// Horizontally centered bitmap text anchored at `anchor`
    fn draw_text(&mut self, text: &str, anchor: (f64, f64), cap_px: f64, v_align: VAlign, bold: bool) {
        let cell = (cap_px / font::GLYPH_HEIGHT as f64).max(1.0);
        let total_w = font::text_width(text) as f64 * cell;
        let left = anchor.0 - total_w / 2.0;
        let top = match v_align {
            VAlign::Top => anchor.1,
            VAlign::Bottom => anchor.1 - font::GLYPH_HEIGHT as f64 * cell,
        };
        let thicken = if bold { cell * 0.35 } else { 0.0 };

        for (i, ch) in text.chars().enumerate() {
            let Some(bits) = font::glyph(ch) else {
                continue;
            };
            let gx = left + (i as u32 * font::ADVANCE) as f64 * cell;
            for row in 0..font::GLYPH_HEIGHT {
                for col in 0..font::GLYPH_WIDTH {
                    if font::is_set(bits, col, row) {
                        let x = gx + col as f64 * cell;
                        let y = top + row as f64 * cell;
                        self.fill_rect(x, y, x + cell + thicken, y + cell);
                    }
                }
            }
        }
    }

    fn fill_rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        let xs = x0.round() as i64;
        let xe = x1.round() as i64;
        let ys = y0.round() as i64;
        let ye = y1.round() as i64;
        for y in ys..ye {
            for x in xs..xe {
                self.cover(x, y, 1.0);
            }
        }
    }

    fn composite(&self, img: &mut RgbImage, color: Rgb<u8>, alpha: f32) {
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let coverage = self.data[y as usize * self.width as usize + x as usize];
            if coverage > 0.0 {
                *pixel = blend(*pixel, color, coverage * alpha);
            }
        }
    }
}

fn distance_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

/// Alpha-blend `over` onto `base`
fn blend(base: Rgb<u8>, over: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let alpha = alpha.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 * (1.0 - alpha) + b as f32 * alpha).round() as u8;
    Rgb([mix(base[0], over[0]), mix(base[1], over[1]), mix(base[2], over[2])])
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: Rgb<u8> = Rgb([10, 20, 30]);
    const INK: Rgb<u8> = Rgb([250, 250, 250]);

    fn small_canvas() -> RasterCanvas {
        RasterCanvas::new(CanvasConfig {
            width_in: 2.0,
            height_in: 2.0,
            pad_in: 0.0,
            margin: 0.0,
        })
    }

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + size, y0),
            Point::new(x0 + size, y0 + size),
            Point::new(x0, y0 + size),
        ]
    }

    #[test]
    fn test_blend() {
        assert_eq!(blend(Rgb([0, 0, 0]), Rgb([200, 100, 50]), 1.0), Rgb([200, 100, 50]));
        assert_eq!(blend(Rgb([0, 0, 0]), Rgb([200, 100, 50]), 0.0), Rgb([0, 0, 0]));
        assert_eq!(blend(Rgb([0, 0, 0]), Rgb([200, 100, 50]), 0.5), Rgb([100, 50, 25]));
    }

    #[test]
    fn test_distance_to_segment() {
        assert!((distance_to_segment((0.0, 1.0), (-1.0, 0.0), (1.0, 0.0)) - 1.0).abs() < 1e-12);
        assert!((distance_to_segment((3.0, 4.0), (0.0, 0.0), (0.0, 0.0)) - 5.0).abs() < 1e-12);
        assert!((distance_to_segment((2.0, 0.0), (-1.0, 0.0), (1.0, 0.0)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_plot_bounds_add_margin() {
        let mut canvas = RasterCanvas::default();
        let road = [Point::new(0.0, 0.0), Point::new(10.0, 20.0)];
        let style = LineStyle { color: INK, width: 1.0, alpha: 1.0 };
        canvas.draw_lines(&[&road[..]], style).unwrap();

        let b = canvas.plot_bounds().unwrap();
        assert!((b.x_min - -0.5).abs() < 1e-9);
        assert!((b.x_max - 10.5).abs() < 1e-9);
        assert!((b.y_min - -1.0).abs() < 1e-9);
        assert!((b.y_max - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_size_follows_dpi() {
        let canvas = RasterCanvas::default();
        assert_eq!(canvas.pixel_size(150), (2700, 3600));
        assert_eq!(canvas.pixel_size(10), (180, 240));
    }

    #[test]
    fn test_empty_scene_cannot_render() {
        let mut canvas = small_canvas();
        canvas.fill_background(BG);
        assert!(matches!(canvas.render(10), Err(DrawError::EmptyScene)));
    }

    #[test]
    fn test_zero_dpi_is_rejected() {
        let mut canvas = small_canvas();
        canvas.fill_background(BG);
        let road = [Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        canvas.draw_lines(&[&road[..]], LineStyle { color: INK, width: 1.0, alpha: 1.0 }).unwrap();
        assert!(matches!(canvas.render(0), Err(DrawError::ZeroDpi)));
        assert!(canvas.render(10).is_ok());
    }

    #[test]
    fn test_polygon_fill_and_hole() {
        let mut canvas = small_canvas();
        canvas.fill_background(BG);
        let area = AreaFeature::new(vec![square(0.0, 0.0, 1.0), square(0.25, 0.25, 0.5)]);
        canvas
            .draw_polygons(&[area], FillStyle { color: INK, alpha: 1.0 })
            .unwrap();

        let img = canvas.render(50).unwrap();
        let (w, h) = img.dimensions();
        assert_eq!((w, h), (100, 100));
        // Ring between outer square and hole is filled, the hole is not
        assert_eq!(*img.get_pixel(5, h / 2), INK);
        assert_eq!(*img.get_pixel(w / 2, h / 2), BG);
    }

    #[test]
    fn test_line_layer_is_composited_at_opacity() {
        let mut canvas = small_canvas();
        canvas.fill_background(Rgb([0, 0, 0]));
        let road = [Point::new(0.0, 0.0), Point::new(0.0, 1.0)];
        let other = [Point::new(-1.0, 0.5), Point::new(1.0, 0.5)];
        canvas
            .draw_lines(
                &[&road[..], &other[..]],
                LineStyle { color: Rgb([200, 200, 200]), width: 10.0, alpha: 0.5 },
            )
            .unwrap();

        let img = canvas.render(50).unwrap();
        // Where both lines cross the layer is still blended once
        assert_eq!(*img.get_pixel(50, 50), Rgb([100, 100, 100]));
        assert_eq!(*img.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_text_is_drawn_above_bottom_anchor() {
        let mut canvas = small_canvas();
        canvas.fill_background(BG);
        let road = [Point::new(0.0, 0.0), Point::new(0.0, 1.0)];
        canvas
            .draw_lines(&[&road[..]], LineStyle { color: BG, width: 0.1, alpha: 1.0 })
            .unwrap();
        canvas.draw_text(&LabelSpec {
            text: "I".to_string(),
            x: 0.0,
            y: 0.5,
            font_size: 36.0,
            color: INK,
            alpha: 1.0,
            bold: false,
            v_align: VAlign::Bottom,
        });

        let img = canvas.render(50).unwrap();
        // The stem of "I" sits just above the anchor row, never below it
        assert_eq!(*img.get_pixel(50, 45), INK);
        assert_eq!(*img.get_pixel(50, 55), BG);
    }
}
