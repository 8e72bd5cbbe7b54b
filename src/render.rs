//! Poster generation: geocode, fetch, compose, label, save
//!
//! Only two things abort a run: the place cannot be found, or there is no
//! street network to draw. Water and parks are best-effort.

use thiserror::Error;

use crate::canvas::{Canvas, DrawError};
use crate::compose::{compose, Composition};
use crate::config::PosterConfig;
use crate::features::{AreaFeature, LatLon, MapData};
use crate::labels::{place_labels, LabelText};
use crate::provider::{FeatureProvider, Geocoder, ProviderError};
use crate::theme::Theme;

/// Conditions that end a run without a poster
#[derive(Debug, Error)]
pub enum PosterError {
    #[error("could not find location: {place}")]
    LocationNotFound {
        place: String,
        #[source]
        source: ProviderError,
    },
    #[error("failed to fetch street network: {0}")]
    RoadFetch(#[source] ProviderError),
    #[error("no streets found within {radius_km} km")]
    NoRoads { radius_km: u32 },
    #[error("failed to set up provider: {0}")]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Draw(#[from] DrawError),
}

/// Outcome of a successful run
#[derive(Clone, Debug, PartialEq)]
pub struct Poster {
    pub center: LatLon,
    pub composition: Composition,
    /// Number of labels drawn
    pub labels: usize,
}

/// Geocode `place`, mapping any failure to `LocationNotFound`
pub fn geocode_place<G: Geocoder>(geocoder: &G, place: &str) -> Result<LatLon, PosterError> {
    println!("Geocoding '{}'...", place);
    let center = geocoder
        .geocode(place)
        .map_err(|source| PosterError::LocationNotFound {
            place: place.to_string(),
            source,
        })?;
    println!("  Found: {:.4}, {:.4}", center.lat, center.lon);
    Ok(center)
}

fn optional_layer(
    name: &str,
    result: Result<Vec<AreaFeature>, ProviderError>,
) -> Option<Vec<AreaFeature>> {
    match result {
        Ok(features) if !features.is_empty() => Some(features),
        Ok(_) => {
            println!("    no {} found", name);
            None
        }
        Err(e) => {
            println!("    {} unavailable: {}", name, e);
            None
        }
    }
}

/// Fetch roads (required) and water and parks (optional)
pub fn fetch_map_data<P: FeatureProvider>(
    provider: &P,
    center: LatLon,
    radius_km: u32,
) -> Result<MapData, PosterError> {
    println!("Fetching map data for {}km radius...", radius_km);
    let radius_m = radius_km as f64 * 1000.0;

    println!("  - Street network...");
    let roads = provider
        .fetch_roads(center, radius_m)
        .map_err(PosterError::RoadFetch)?;
    if roads.is_empty() {
        return Err(PosterError::NoRoads { radius_km });
    }
    println!("    {} road segments", roads.len());

    println!("  - Water features...");
    let water = optional_layer("water features", provider.fetch_water(center, radius_m));

    println!("  - Parks and green spaces...");
    let parks = optional_layer("parks", provider.fetch_parks(center, radius_m));

    Ok(MapData { roads, water, parks })
}

/// Compose the map layers and then the labels onto `canvas`.
///
/// Labels are placed against the bounds the canvas reports after all
/// geometry is down.
pub fn render_poster<C: Canvas>(
    canvas: &mut C,
    theme: &Theme,
    data: &MapData,
    text: &LabelText,
    show_labels: bool,
) -> (Composition, usize) {
    println!("Rendering poster...");
    let composition = compose(canvas, theme, data);

    let mut drawn = 0;
    if let Some(bounds) = canvas.plot_bounds() {
        let labels = place_labels(&bounds, text, theme, show_labels);
        if !labels.is_empty() {
            println!("  - Adding labels...");
        }
        for label in labels {
            canvas.draw_text(&label);
            drawn += 1;
        }
    }
    (composition, drawn)
}

/// Run the whole pipeline and write the image to `config.output`
pub fn generate_poster<G, P, C>(
    geocoder: &G,
    provider: &P,
    canvas: &mut C,
    theme: &Theme,
    config: &PosterConfig,
) -> Result<Poster, PosterError>
where
    G: Geocoder,
    P: FeatureProvider,
    C: Canvas,
{
    let center = geocode_place(geocoder, &config.place)?;
    let data = fetch_map_data(provider, center, config.radius_km)?;

    let text = LabelText {
        place: config.label.clone(),
        region: config.region.clone(),
        coords: center,
    };
    let (composition, labels) = render_poster(canvas, theme, &data, &text, config.show_labels);

    println!("  - Saving to {}...", config.output.display());
    canvas.save(&config.output, config.dpi)?;
    println!("Done! Saved to {}", config.output.display());

    Ok(Poster { center, composition, labels })
}
