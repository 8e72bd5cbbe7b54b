//! Geocoding and map-feature providers
//!
//! [`Geocoder`] and [`FeatureProvider`] are the seams the renderer depends
//! on. The HTTP implementations talk to Nominatim and the Overpass API with
//! a blocking client; each call is made once and never retried.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::classify::CategoryTag;
use crate::config::ProviderConfig;
use crate::features::{AreaFeature, LatLon, Point, RoadFeature};

/// Errors that can occur while talking to a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("could not find location: {0}")]
    LocationNotFound(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API error: status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
}

/// Resolves a place name to coordinates
pub trait Geocoder {
    fn geocode(&self, name: &str) -> Result<LatLon, ProviderError>;
}

/// Fetches map features within `radius_m` meters of `center`
pub trait FeatureProvider {
    fn fetch_roads(&self, center: LatLon, radius_m: f64) -> Result<Vec<RoadFeature>, ProviderError>;
    fn fetch_water(&self, center: LatLon, radius_m: f64) -> Result<Vec<AreaFeature>, ProviderError>;
    fn fetch_parks(&self, center: LatLon, radius_m: f64) -> Result<Vec<AreaFeature>, ProviderError>;
}

fn build_client(config: &ProviderConfig) -> Result<reqwest::blocking::Client, ProviderError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(client)
}

fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    Err(ProviderError::Api { status, body })
}

#[derive(Deserialize, Debug)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Nominatim search API client
pub struct NominatimGeocoder {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl NominatimGeocoder {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: config.nominatim_url.trim_end_matches('/').to_string(),
            client: build_client(config)?,
        })
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, name: &str) -> Result<LatLon, ProviderError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", name), ("format", "json"), ("limit", "1")])
            .send()?;
        let places: Vec<NominatimPlace> = check_status(response)?.json()?;
        parse_place(name, &places)
    }
}

fn parse_place(name: &str, places: &[NominatimPlace]) -> Result<LatLon, ProviderError> {
    let place = places
        .first()
        .ok_or_else(|| ProviderError::LocationNotFound(name.to_string()))?;
    let lat: f64 = place
        .lat
        .parse()
        .map_err(|_| ProviderError::Parse(format!("bad latitude {:?}", place.lat)))?;
    let lon: f64 = place
        .lon
        .parse()
        .map_err(|_| ProviderError::Parse(format!("bad longitude {:?}", place.lon)))?;
    Ok(LatLon::new(lat, lon))
}

/// Overpass API response, requested with `out geom`
#[derive(Deserialize, Debug, Default)]
struct OverpassResponse {
    /// Set when the query failed on the server; the elements are then partial
    #[serde(default)]
    remark: Option<String>,
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Deserialize, Debug)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    tags: HashMap<String, String>,
    /// Node positions of a way; entries are null when outside the query area
    #[serde(default)]
    geometry: Vec<Option<OverpassPoint>>,
    #[serde(default)]
    members: Vec<OverpassMember>,
}

#[derive(Deserialize, Debug)]
struct OverpassMember {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    geometry: Vec<Option<OverpassPoint>>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
struct OverpassPoint {
    lat: f64,
    lon: f64,
}

fn to_path(geometry: &[Option<OverpassPoint>]) -> Vec<Point> {
    geometry
        .iter()
        .flatten()
        .map(|p| Point::new(p.lon, p.lat))
        .collect()
}

/// Overpass API client
pub struct OverpassProvider {
    base_url: String,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl OverpassProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: config.overpass_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            client: build_client(config)?,
        })
    }

    fn query(&self, body: &str) -> Result<OverpassResponse, ProviderError> {
        let url = format!("{}/interpreter", self.base_url);
        let response = self.client.post(&url).form(&[("data", body)]).send()?;
        let text = check_status(response)?.text()?;
        parse_response(&text)
    }

    fn fetch_areas(
        &self,
        selector: &str,
        center: LatLon,
        radius_m: f64,
    ) -> Result<Vec<AreaFeature>, ProviderError> {
        let around = around_filter(center, radius_m);
        let body = format!(
            "[out:json][timeout:{t}];(way{s}{a};relation{s}{a};);out geom;",
            t = self.timeout_secs,
            s = selector,
            a = around
        );
        let (areas, discarded) = areas_from_response(&self.query(&body)?);
        if discarded > 0 {
            println!("  - Discarded {} unclosed outlines for {}", discarded, selector);
        }
        Ok(areas)
    }
}

/// Decode an Overpass reply. Overpass answers a timed-out or out-of-memory
/// query with status 200 and a `runtime error` remark, so that is an error
/// here even though the HTTP exchange succeeded.
fn parse_response(text: &str) -> Result<OverpassResponse, ProviderError> {
    let response: OverpassResponse =
        serde_json::from_str(text).map_err(|e| ProviderError::Parse(e.to_string()))?;
    match &response.remark {
        Some(remark) if remark.trim_start().starts_with("runtime error") => Err(ProviderError::Api {
            status: 200,
            body: remark.clone(),
        }),
        _ => Ok(response),
    }
}

fn around_filter(center: LatLon, radius_m: f64) -> String {
    format!("(around:{:.0},{},{})", radius_m, center.lat, center.lon)
}

impl FeatureProvider for OverpassProvider {
    fn fetch_roads(&self, center: LatLon, radius_m: f64) -> Result<Vec<RoadFeature>, ProviderError> {
        let body = format!(
            "[out:json][timeout:{}];way[\"highway\"]{};out geom;",
            self.timeout_secs,
            around_filter(center, radius_m)
        );
        Ok(roads_from_response(&self.query(&body)?))
    }

    fn fetch_water(&self, center: LatLon, radius_m: f64) -> Result<Vec<AreaFeature>, ProviderError> {
        self.fetch_areas("[\"natural\"=\"water\"]", center, radius_m)
    }

    fn fetch_parks(&self, center: LatLon, radius_m: f64) -> Result<Vec<AreaFeature>, ProviderError> {
        self.fetch_areas("[\"leisure\"=\"park\"]", center, radius_m)
    }
}

fn roads_from_response(response: &OverpassResponse) -> Vec<RoadFeature> {
    response
        .elements
        .iter()
        .filter(|e| e.kind == "way")
        .filter_map(|e| {
            let highway = e.tags.get("highway")?;
            let path = to_path(&e.geometry);
            (path.len() >= 2).then(|| RoadFeature::new(CategoryTag::from_osm(highway), path))
        })
        .collect()
}

/// Closed ways and assembled relations, plus the number of elements that
/// produced no ring
fn areas_from_response(response: &OverpassResponse) -> (Vec<AreaFeature>, usize) {
    let mut areas = Vec::new();
    let mut discarded = 0;
    for element in &response.elements {
        let rings = match element.kind.as_str() {
            "way" => {
                let ring = to_path(&element.geometry);
                if is_closed(&ring) {
                    vec![ring]
                } else {
                    Vec::new()
                }
            }
            "relation" => {
                let parts: Vec<Vec<Point>> = element
                    .members
                    .iter()
                    .filter(|m| m.kind == "way" && (m.role == "outer" || m.role == "inner"))
                    .map(|m| to_path(&m.geometry))
                    .filter(|p| p.len() >= 2)
                    .collect();
                assemble_rings(parts)
            }
            _ => continue,
        };
        if rings.is_empty() {
            discarded += 1;
        } else {
            areas.push(AreaFeature::new(rings));
        }
    }
    (areas, discarded)
}

fn is_closed(ring: &[Point]) -> bool {
    ring.len() >= 4 && ring.first() == ring.last()
}

/// Join multipolygon member ways end-to-end into closed rings.
///
/// Even-odd filling makes the outer/inner roles irrelevant once the rings
/// are closed. Chains that never close are dropped.
fn assemble_rings(mut parts: Vec<Vec<Point>>) -> Vec<Vec<Point>> {
    let mut rings = Vec::new();
    while let Some(mut chain) = parts.pop() {
        while !is_closed(&chain) {
            let Some(tail) = chain.last().copied() else {
                break;
            };
            let next = parts.iter().position(|p| p.first() == Some(&tail) || p.last() == Some(&tail));
            let Some(idx) = next else {
                break;
            };
            let mut part = parts.swap_remove(idx);
            if part.first() != Some(&tail) {
                part.reverse();
            }
            chain.extend(part.into_iter().skip(1));
        }
        if is_closed(&chain) {
            rings.push(chain);
        }
    }
    rings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> OverpassResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_place() {
        let places = vec![NominatimPlace { lat: "-33.8688".into(), lon: "151.2093".into() }];
        assert_eq!(parse_place("Sydney", &places).unwrap(), LatLon::new(-33.8688, 151.2093));
        assert!(matches!(
            parse_place("Nowhere", &[]),
            Err(ProviderError::LocationNotFound(_))
        ));
        let bad = vec![NominatimPlace { lat: "north".into(), lon: "0".into() }];
        assert!(matches!(parse_place("x", &bad), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn test_roads_from_response() {
        let response = parse(
            r#"{"elements": [
                {"type": "way", "id": 1, "tags": {"highway": "primary"},
                 "geometry": [{"lat": 1.0, "lon": 2.0}, {"lat": 1.5, "lon": 2.5}]},
                {"type": "way", "id": 2, "tags": {"highway": "motorway;trunk"},
                 "geometry": [{"lat": 0.0, "lon": 0.0}, null, {"lat": 0.1, "lon": 0.1}]},
                {"type": "way", "id": 3, "tags": {"highway": "track"},
                 "geometry": [{"lat": 0.0, "lon": 0.0}]},
                {"type": "way", "id": 4, "tags": {"building": "yes"},
                 "geometry": [{"lat": 0.0, "lon": 0.0}, {"lat": 0.1, "lon": 0.1}]},
                {"type": "node", "id": 5, "lat": 0.0, "lon": 0.0}
            ]}"#,
        );
        let roads = roads_from_response(&response);
        assert_eq!(roads.len(), 2);
        assert_eq!(roads[0].tag, CategoryTag::Single("primary".into()));
        assert_eq!(roads[0].path, vec![Point::new(2.0, 1.0), Point::new(2.5, 1.5)]);
        assert_eq!(
            roads[1].tag,
            CategoryTag::Multi(vec!["motorway".into(), "trunk".into()])
        );
        assert_eq!(roads[1].path.len(), 2);
    }

    #[test]
    fn test_timed_out_query_is_an_error() {
        let text = r#"{
            "remark": "runtime error: Query timed out in \"query\" at line 1 after 181 seconds.",
            "elements": [
                {"type": "way", "id": 1, "tags": {"highway": "primary"},
                 "geometry": [{"lat": 1.0, "lon": 2.0}, {"lat": 1.5, "lon": 2.5}]}
            ]}"#;
        match parse_response(text) {
            Err(ProviderError::Api { status, body }) => {
                assert_eq!(status, 200);
                assert!(body.contains("timed out"));
            }
            other => panic!("expected API error, got {:?}", other.map(|r| r.elements.len())),
        }
    }

    #[test]
    fn test_informational_remark_is_accepted() {
        let text = r#"{"remark": "note: results truncated to bbox", "elements": [
            {"type": "way", "tags": {"highway": "residential"},
             "geometry": [{"lat": 0.0, "lon": 0.0}, {"lat": 0.1, "lon": 0.1}]}
        ]}"#;
        let response = parse_response(text).unwrap();
        assert_eq!(roads_from_response(&response).len(), 1);
        assert!(matches!(parse_response("not json"), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn test_closed_way_becomes_area() {
        let response = parse(
            r#"{"elements": [
                {"type": "way", "tags": {"natural": "water"}, "geometry": [
                    {"lat": 0, "lon": 0}, {"lat": 0, "lon": 1},
                    {"lat": 1, "lon": 1}, {"lat": 0, "lon": 0}]},
                {"type": "way", "tags": {"natural": "water"}, "geometry": [
                    {"lat": 0, "lon": 0}, {"lat": 0, "lon": 1}, {"lat": 1, "lon": 1}]}
            ]}"#,
        );
        let (areas, discarded) = areas_from_response(&response);
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].rings[0].len(), 4);
        assert_eq!(discarded, 1);
    }

    #[test]
    fn test_relation_members_are_joined_into_rings() {
        let response = parse(
            r#"{"elements": [
                {"type": "relation", "tags": {"leisure": "park"}, "members": [
                    {"type": "way", "role": "outer", "geometry": [
                        {"lat": 0, "lon": 0}, {"lat": 0, "lon": 2}]},
                    {"type": "way", "role": "outer", "geometry": [
                        {"lat": 2, "lon": 0}, {"lat": 2, "lon": 2}, {"lat": 0, "lon": 2}]},
                    {"type": "way", "role": "outer", "geometry": [
                        {"lat": 2, "lon": 0}, {"lat": 0, "lon": 0}]},
                    {"type": "node", "role": "label"}
                ]}
            ]}"#,
        );
        let (areas, discarded) = areas_from_response(&response);
        assert_eq!(areas.len(), 1);
        assert_eq!(discarded, 0);
        let ring = &areas[0].rings[0];
        assert!(is_closed(ring));
        assert_eq!(ring.len(), 5);
    }

    #[test]
    fn test_unclosable_chain_is_dropped() {
        let parts = vec![vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]];
        assert!(assemble_rings(parts).is_empty());
    }

    #[test]
    fn test_around_filter() {
        let filter = around_filter(LatLon::new(48.8566, 2.3522), 20_000.0);
        assert_eq!(filter, "(around:20000,48.8566,2.3522)");
    }
}
