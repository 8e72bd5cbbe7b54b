//! Poster theme: the fixed "Tech Minimalist" palette
//!
//! Colors and line widths per road category, with a `default` entry that
//! every lookup falls back to. The theme is a plain value handed to each
//! stage of the pipeline; nothing reads it from global state.

use image::Rgb;
use std::collections::HashMap;

/// Key of the fallback entry every style table carries
pub const DEFAULT_KEY: &str = "default";

/// A lookup table keyed by road category name with a mandatory fallback
#[derive(Clone, Debug, PartialEq)]
pub struct StyleTable<T: Copy> {
    entries: HashMap<String, T>,
}

impl<T: Copy> StyleTable<T> {
    /// Create a table whose `default` entry is `fallback`
    pub fn new(fallback: T) -> Self {
        let mut entries = HashMap::new();
        entries.insert(DEFAULT_KEY.to_string(), fallback);
        Self { entries }
    }

    /// Register a value for a category (builder style)
    pub fn with(mut self, category: &str, value: T) -> Self {
        self.entries.insert(category.to_string(), value);
        self
    }

    /// Value for `category`, or the `default` entry
    pub fn get(&self, category: &str) -> T {
        self.entries
            .get(category)
            .copied()
            .unwrap_or_else(|| self.fallback())
    }

    pub fn fallback(&self) -> T {
        // `new` inserts the key and `with` can only overwrite it
        self.entries[DEFAULT_KEY]
    }

    /// Registered category names, including `default`
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Opacity applied to each kind of layer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerOpacity {
    pub water: f32,
    pub parks: f32,
    pub roads: f32,
    /// Roads whose category is not one of the named buckets
    pub remainder: f32,
}

/// Immutable visual style for a poster
#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
    pub name: &'static str,
    pub background: Rgb<u8>,
    pub water: Rgb<u8>,
    pub parks: Rgb<u8>,
    pub road_colors: StyleTable<Rgb<u8>>,
    /// Line widths in points
    pub road_widths: StyleTable<f32>,
    pub text: Rgb<u8>,
    pub text_secondary: Rgb<u8>,
    pub opacity: LayerOpacity,
}

impl Theme {
    /// Dark navy background with cyan roads
    pub fn tech_minimalist() -> Self {
        Self {
            name: "Tech Minimalist",
            background: Rgb([0x0d, 0x1b, 0x2a]), // Deep navy
            water: Rgb([0x1b, 0x49, 0x65]),      // Teal
            parks: Rgb([0x1e, 0x3a, 0x2f]),      // Dark forest green
            road_colors: StyleTable::new(Rgb([0x01, 0x4f, 0x86]))
                .with("motorway", Rgb([0x00, 0xd4, 0xff])) // Bright cyan
                .with("trunk", Rgb([0x00, 0xc4, 0xec]))
                .with("primary", Rgb([0x00, 0xb4, 0xd8]))
                .with("secondary", Rgb([0x00, 0x96, 0xc7]))
                .with("tertiary", Rgb([0x00, 0x77, 0xb6]))
                .with("residential", Rgb([0x02, 0x3e, 0x8a])),
            road_widths: StyleTable::new(0.2)
                .with("motorway", 2.5)
                .with("trunk", 2.0)
                .with("primary", 1.5)
                .with("secondary", 1.2)
                .with("tertiary", 0.8)
                .with("residential", 0.3),
            text: Rgb([0xe0, 0xfb, 0xfc]), // Light cyan
            text_secondary: Rgb([0x1b, 0x49, 0x65]),
            opacity: LayerOpacity {
                water: 0.8,
                parks: 0.6,
                roads: 0.9,
                remainder: 0.7,
            },
        }
    }

    /// Color and width for a road category, falling back to `default`
    pub fn style_for(&self, category: &str) -> (Rgb<u8>, f32) {
        (self.road_colors.get(category), self.road_widths.get(category))
    }

    /// Style used for roads outside the named buckets
    pub fn default_style(&self) -> (Rgb<u8>, f32) {
        (self.road_colors.fallback(), self.road_widths.fallback())
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::tech_minimalist()
    }
}
