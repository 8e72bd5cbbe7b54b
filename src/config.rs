//! Run configuration
//!
//! `PosterConfig` is what a single render needs once the command line has
//! been resolved; `ProviderConfig` points the HTTP providers at their
//! servers.

use std::path::PathBuf;

/// Configuration for the HTTP providers
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderConfig {
    /// Base URL of the Nominatim server
    pub nominatim_url: String,
    /// Base URL of the Overpass API server (without `/interpreter`)
    pub overpass_url: String,
    /// Request timeout in seconds, also sent to Overpass as the query timeout
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            overpass_url: "https://overpass-api.de/api".to_string(),
            timeout_secs: 180,
            user_agent: format!("map_poster/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Everything needed to produce one poster
#[derive(Clone, Debug, PartialEq)]
pub struct PosterConfig {
    /// Place name passed to the geocoder
    pub place: String,
    /// Large label at the bottom
    pub label: String,
    /// Small label at the top
    pub region: String,
    pub radius_km: u32,
    pub output: PathBuf,
    pub dpi: u32,
    pub show_labels: bool,
}

impl PosterConfig {
    /// Build a config for `place`, deriving labels and output path from it.
    ///
    /// `"San Jose, California, USA"` gives label `San Jose`, region
    /// `California` and output `san_jose_poster.png`.
    pub fn for_place(place: &str) -> Self {
        let parts: Vec<&str> = place.split(',').map(str::trim).collect();
        let label = parts[0].to_string();
        let region = parts.get(1).map(|s| s.to_string()).unwrap_or_default();
        Self {
            place: place.to_string(),
            output: default_output(&label),
            label,
            region,
            radius_km: 20,
            dpi: 150,
            show_labels: true,
        }
    }
}

/// `<label>_poster.png` with the label lower-cased, spaces as underscores
/// and apostrophes removed
pub fn default_output(label: &str) -> PathBuf {
    let safe_name = label.to_lowercase().replace(' ', "_").replace('\'', "");
    PathBuf::from(format!("{}_poster.png", safe_name))
}
