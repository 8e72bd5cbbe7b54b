//! Road classification
//!
//! A road segment can carry one category or several at once. Resolution
//! always picks a single canonical name so the segment gets one style and
//! lands in one draw bucket.

use std::fmt;

use crate::theme::DEFAULT_KEY;

/// Category tag as delivered by the feature provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CategoryTag {
    Single(String),
    /// Several simultaneous classifications, in provider order
    Multi(Vec<String>),
}

impl CategoryTag {
    /// Parse an OSM `highway` value; `;` separates multiple values
    pub fn from_osm(value: &str) -> Self {
        if value.contains(';') {
            CategoryTag::Multi(
                value
                    .split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )
        } else {
            CategoryTag::Single(value.trim().to_string())
        }
    }
}

impl From<&str> for CategoryTag {
    fn from(value: &str) -> Self {
        CategoryTag::Single(value.to_string())
    }
}

impl From<Vec<&str>> for CategoryTag {
    fn from(values: Vec<&str>) -> Self {
        CategoryTag::Multi(values.into_iter().map(String::from).collect())
    }
}

/// Resolve a tag to one category name.
///
/// Lists resolve to their first element and everything after it is ignored:
/// `[motorway, bridge]` is a motorway and `[bridge, motorway]` is a bridge.
/// An empty list resolves to `default`.
pub fn resolve_tag(tag: &CategoryTag) -> &str {
    match tag {
        CategoryTag::Single(name) => name.as_str(),
        CategoryTag::Multi(names) => names.first().map(String::as_str).unwrap_or(DEFAULT_KEY),
    }
}

/// The named road categories, least prominent first
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoadCategory {
    Residential,
    Tertiary,
    Secondary,
    Primary,
    Trunk,
    Motorway,
}

impl RoadCategory {
    /// Draw order: every bucket is painted before the next one starts
    pub const DRAW_ORDER: [RoadCategory; 6] = [
        RoadCategory::Residential,
        RoadCategory::Tertiary,
        RoadCategory::Secondary,
        RoadCategory::Primary,
        RoadCategory::Trunk,
        RoadCategory::Motorway,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoadCategory::Residential => "residential",
            RoadCategory::Tertiary => "tertiary",
            RoadCategory::Secondary => "secondary",
            RoadCategory::Primary => "primary",
            RoadCategory::Trunk => "trunk",
            RoadCategory::Motorway => "motorway",
        }
    }

    /// Exact-name match against the six named categories
    pub fn parse(name: &str) -> Option<Self> {
        Self::DRAW_ORDER.iter().copied().find(|c| c.as_str() == name)
    }

    /// Position in the draw order
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for RoadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tag_resolves_to_itself() {
        assert_eq!(resolve_tag(&"residential".into()), "residential");
        assert_eq!(resolve_tag(&"track".into()), "track");
    }

    #[test]
    fn test_multi_tag_takes_first_element() {
        assert_eq!(resolve_tag(&vec!["motorway", "bridge"].into()), "motorway");
        assert_eq!(resolve_tag(&vec!["bridge", "motorway"].into()), "bridge");
    }

    #[test]
    fn test_empty_multi_tag_resolves_to_default() {
        assert_eq!(resolve_tag(&CategoryTag::Multi(Vec::new())), DEFAULT_KEY);
    }

    #[test]
    fn test_osm_value_parsing() {
        assert_eq!(CategoryTag::from_osm("primary"), CategoryTag::Single("primary".into()));
        assert_eq!(
            CategoryTag::from_osm("primary; service"),
            CategoryTag::Multi(vec!["primary".into(), "service".into()])
        );
    }

    #[test]
    fn test_draw_order_is_ascending_prominence() {
        let names: Vec<_> = RoadCategory::DRAW_ORDER.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            ["residential", "tertiary", "secondary", "primary", "trunk", "motorway"]
        );
        for (i, category) in RoadCategory::DRAW_ORDER.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
        assert!(RoadCategory::Motorway > RoadCategory::Trunk);
    }

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(RoadCategory::parse("trunk"), Some(RoadCategory::Trunk));
        assert_eq!(RoadCategory::parse("trunk_link"), None);
        assert_eq!(RoadCategory::parse("Trunk"), None);
        assert_eq!(RoadCategory::parse(DEFAULT_KEY), None);
    }
}
