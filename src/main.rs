use clap::Parser;
use std::path::PathBuf;
use std::process;

use map_poster::config::{default_output, PosterConfig, ProviderConfig};
use map_poster::provider::{NominatimGeocoder, OverpassProvider};
use map_poster::raster::RasterCanvas;
use map_poster::render::{generate_poster, PosterError};
use map_poster::theme::Theme;

#[derive(Parser, Debug)]
#[command(name = "map_poster")]
#[command(about = "Generate minimalist map posters of any city")]
struct Args {
    /// City name (e.g., "San Jose, California, USA" or "Paris, France")
    city: String,

    /// City label for poster (default: extracted from city name)
    #[arg(long)]
    label: Option<String>,

    /// Region/state/country label for top of poster (default: extracted from city name)
    #[arg(long)]
    region: Option<String>,

    /// Radius in kilometers from city center
    #[arg(long, default_value = "20")]
    radius: u32,

    /// Output filename (default: <city>_poster.png)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Resolution in DPI (use 300 for print)
    #[arg(long, default_value = "150", value_parser = clap::value_parser!(u32).range(1..=1200))]
    dpi: u32,

    /// Omit city name and coordinates
    #[arg(long)]
    no_labels: bool,

    /// Nominatim server used for geocoding
    #[arg(long)]
    nominatim_url: Option<String>,

    /// Overpass API server used for map data
    #[arg(long)]
    overpass_url: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "180")]
    timeout: u64,
}

impl Args {
    fn poster_config(&self) -> PosterConfig {
        let mut config = PosterConfig::for_place(&self.city);
        if let Some(label) = &self.label {
            config.label = label.clone();
            config.output = default_output(label);
        }
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        config.radius_km = self.radius;
        config.dpi = self.dpi;
        config.show_labels = !self.no_labels;
        config
    }

    fn provider_config(&self) -> ProviderConfig {
        let mut config = ProviderConfig {
            timeout_secs: self.timeout,
            ..ProviderConfig::default()
        };
        if let Some(url) = &self.nominatim_url {
            config.nominatim_url = url.clone();
        }
        if let Some(url) = &self.overpass_url {
            config.overpass_url = url.clone();
        }
        config
    }
}

fn run(config: &PosterConfig, providers: &ProviderConfig, theme: &Theme) -> Result<(), PosterError> {
    let geocoder = NominatimGeocoder::new(providers)?;
    let provider = OverpassProvider::new(providers)?;
    let mut canvas = RasterCanvas::default();

    let poster = generate_poster(&geocoder, &provider, &mut canvas, theme, config)?;

    println!("\nPoster specifications:");
    println!("  - City: {}", config.label);
    println!("  - Center: {:.4}, {:.4}", poster.center.lat, poster.center.lon);
    println!("  - Radius: {} km", config.radius_km);
    println!("  - Roads drawn: {}", poster.composition.roads_drawn());
    println!("  - Resolution: {} DPI", config.dpi);
    println!("  - Theme: {} (dark + cyan)", theme.name);
    Ok(())
}

fn main() {
    let args = Args::parse();
    let config = args.poster_config();
    let providers = args.provider_config();
    let theme = Theme::tech_minimalist();

    println!("\n{}", "=".repeat(50));
    println!("  MAP POSTER GENERATOR");
    println!("  {} Theme", theme.name);
    println!("{}\n", "=".repeat(50));

    if let Err(e) = run(&config, &providers, &theme) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let args = Args::parse_from(["map_poster", "San Jose, California, USA"]);
        let config = args.poster_config();
        assert_eq!(config.label, "San Jose");
        assert_eq!(config.region, "California");
        assert_eq!(config.radius_km, 20);
        assert_eq!(config.dpi, 150);
        assert_eq!(config.output, PathBuf::from("san_jose_poster.png"));
        assert!(config.show_labels);
        assert_eq!(args.provider_config().timeout_secs, 180);
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "map_poster",
            "Paris, France",
            "--label",
            "Ville Lumiere",
            "--region",
            "Ile-de-France",
            "--radius",
            "5",
            "--dpi",
            "300",
            "--no-labels",
            "--overpass-url",
            "http://localhost:12345/api",
        ]);
        let config = args.poster_config();
        assert_eq!(config.place, "Paris, France");
        assert_eq!(config.label, "Ville Lumiere");
        assert_eq!(config.region, "Ile-de-France");
        assert_eq!(config.output, PathBuf::from("ville_lumiere_poster.png"));
        assert_eq!(config.radius_km, 5);
        assert_eq!(config.dpi, 300);
        assert!(!config.show_labels);
        assert_eq!(args.provider_config().overpass_url, "http://localhost:12345/api");
    }

    #[test]
    fn test_explicit_output_wins() {
        let args = Args::parse_from(["map_poster", "Oslo", "--label", "Kristiania", "--output", "out.png"]);
        assert_eq!(args.poster_config().output, PathBuf::from("out.png"));
    }

    #[test]
    fn test_dpi_out_of_range_is_rejected() {
        assert!(Args::try_parse_from(["map_poster", "Oslo", "--dpi", "0"]).is_err());
        assert!(Args::try_parse_from(["map_poster", "Oslo", "--dpi", "5000"]).is_err());
        let args = Args::try_parse_from(["map_poster", "Oslo", "--dpi", "1200"]).expect("upper bound is valid");
        assert_eq!(args.dpi, 1200);
    }
}
