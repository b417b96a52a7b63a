//! Google Maps web service client.
//!
//! Geocoding and Directions are one-shot lookups whose failures go back
//! to the caller. The Roads endpoints back `RoadsApi` and are consumed
//! best-effort by `speed_limit`.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::config::MapsConfig;
use crate::error::{NavError, Result};
use crate::geo::LatLng;
use crate::maneuver::ManeuverKind;
use crate::polyline;
use crate::route::{Route, RouteStep};
use crate::speed_limit::RoadsApi;

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";
const NEAREST_ROADS_URL: &str = "https://roads.googleapis.com/v1/nearestRoads";
const SNAP_TO_ROADS_URL: &str = "https://roads.googleapis.com/v1/snapToRoads";
const SPEED_LIMITS_URL: &str = "https://roads.googleapis.com/v1/speedLimits";

const STATUS_OK: &str = "OK";

pub struct GoogleMapsClient {
    http: Client,
    config: MapsConfig,
}

impl GoogleMapsClient {
    pub fn new(config: MapsConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &MapsConfig {
        &self.config
    }

    /// Resolve a free-text address to coordinates.
    pub async fn geocode(&self, address: &str) -> Result<LatLng> {
        let address = address.trim();
        if address.is_empty() {
            return Err(NavError::InvalidInput("empty address".into()));
        }
        let key = self.config.require_api_key()?;
        let url = geocode_url(address, self.config.country_bias.as_deref(), key)?;

        let body = self.get_text(url).await?;
        let location = parse_geocode(&body)?;
        info!("geocoded {address:?} to {:.5},{:.5}", location.lat, location.lng);
        Ok(location)
    }

    /// Compute a driving route between two points.
    pub async fn directions(&self, origin: LatLng, destination: LatLng) -> Result<Route> {
        let key = self.config.require_api_key()?;
        let url = directions_url(&origin, &destination, key)?;

        let body = self.get_text(url).await?;
        let route = parse_directions(&body)?;
        info!(
            "route: {} steps, {} overview points",
            route.steps.len(),
            route.overview.len()
        );
        Ok(route)
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        debug!("GET {}", url.path());
        let text = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }
}

#[async_trait]
impl RoadsApi for GoogleMapsClient {
    fn has_credentials(&self) -> bool {
        self.config.has_api_key()
    }

    async fn nearest_roads(&self, points: &[LatLng]) -> Result<Vec<String>> {
        let url = roads_points_url(NEAREST_ROADS_URL, "points", points, &self.config.api_key)?;
        parse_place_ids(&self.get_text(url).await?)
    }

    async fn snap_to_roads(&self, path: &[LatLng]) -> Result<Vec<String>> {
        let url = roads_points_url(SNAP_TO_ROADS_URL, "path", path, &self.config.api_key)?;
        parse_place_ids(&self.get_text(url).await?)
    }

    async fn speed_limits(&self, place_ids: &[String]) -> Result<Vec<f64>> {
        let url = speed_limits_url(place_ids, &self.config.api_key)?;
        parse_speed_limits(&self.get_text(url).await?)
    }
}

// URL construction

fn build_url(base: &str, params: &[(&str, String)]) -> Result<Url> {
    Url::parse_with_params(base, params).map_err(|e| NavError::InvalidInput(e.to_string()))
}

fn latlng_param(p: &LatLng) -> String {
    format!("{},{}", p.lat, p.lng)
}

fn geocode_url(address: &str, country_bias: Option<&str>, key: &str) -> Result<Url> {
    let mut params = vec![("address", address.to_string())];
    if let Some(country) = country_bias {
        params.push(("components", format!("country:{country}")));
    }
    params.push(("key", key.to_string()));
    build_url(GEOCODE_URL, &params)
}

fn directions_url(origin: &LatLng, destination: &LatLng, key: &str) -> Result<Url> {
    build_url(
        DIRECTIONS_URL,
        &[
            ("origin", latlng_param(origin)),
            ("destination", latlng_param(destination)),
            ("mode", "driving".to_string()),
            ("key", key.to_string()),
        ],
    )
}

fn roads_points_url(base: &str, param: &str, points: &[LatLng], key: &str) -> Result<Url> {
    let joined = points.iter().map(latlng_param).collect::<Vec<_>>().join("|");
    build_url(base, &[(param, joined), ("key", key.to_string())])
}

fn speed_limits_url(place_ids: &[String], key: &str) -> Result<Url> {
    let mut params: Vec<(&str, String)> =
        place_ids.iter().map(|id| ("placeId", id.clone())).collect();
    params.push(("units", "MPH".to_string()));
    params.push(("key", key.to_string()));
    build_url(SPEED_LIMITS_URL, &params)
}

// Response models

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    overview_polyline: EncodedPolyline,
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct EncodedPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    #[serde(default)]
    steps: Vec<DirectionsStep>,
}

#[derive(Debug, Deserialize)]
struct DirectionsStep {
    end_location: LatLng,
    #[serde(default)]
    html_instructions: String,
    distance: Option<TextValue>,
    maneuver: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnappedPointsResponse {
    #[serde(default)]
    snapped_points: Vec<SnappedPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnappedPoint {
    place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeedLimitsResponse {
    #[serde(default)]
    speed_limits: Vec<SpeedLimitEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeedLimitEntry {
    speed_limit: Option<f64>,
}

// Response parsing

fn parse_geocode(body: &str) -> Result<LatLng> {
    let response: GeocodeResponse = serde_json::from_str(body)?;
    match response.results.first() {
        Some(first) if response.status == STATUS_OK => Ok(first.geometry.location),
        _ => {
            warn!("geocoding status {}", response.status);
            Err(NavError::Geocoding { status: response.status })
        }
    }
}

fn parse_directions(body: &str) -> Result<Route> {
    let response: DirectionsResponse = serde_json::from_str(body)?;
    if response.status != STATUS_OK {
        warn!("directions status {}", response.status);
        return Err(NavError::Directions { status: response.status });
    }

    let route = response.routes.into_iter().next().ok_or(NavError::EmptyRoute)?;
    let overview = polyline::decode(&route.overview_polyline.points)?;
    let steps: Vec<RouteStep> = route
        .legs
        .into_iter()
        .flat_map(|leg| leg.steps)
        .map(|s| RouteStep {
            end_location: s.end_location,
            instruction_markup: s.html_instructions,
            distance_m: s.distance.map(|d| d.value).unwrap_or(0.0),
            maneuver: ManeuverKind::from_tag(s.maneuver.as_deref()),
        })
        .collect();

    if steps.is_empty() {
        return Err(NavError::EmptyRoute);
    }
    Ok(Route::new(overview, steps))
}

fn parse_place_ids(body: &str) -> Result<Vec<String>> {
    let response: SnappedPointsResponse = serde_json::from_str(body)?;
    Ok(response
        .snapped_points
        .into_iter()
        .filter_map(|p| p.place_id)
        .collect())
}

fn parse_speed_limits(body: &str) -> Result<Vec<f64>> {
    let response: SpeedLimitsResponse = serde_json::from_str(body)?;
    Ok(response
        .speed_limits
        .into_iter()
        .filter_map(|l| l.speed_limit)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(url: &Url) -> Vec<(String, String)> {
        url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
    }

    #[test]
    fn geocode_url_with_bias() {
        let url = geocode_url("서울시청", Some("KR"), "k").unwrap();
        assert_eq!(url.host_str(), Some("maps.googleapis.com"));
        assert_eq!(
            query(&url),
            vec![
                ("address".into(), "서울시청".into()),
                ("components".into(), "country:KR".into()),
                ("key".into(), "k".into()),
            ]
        );
    }

    #[test]
    fn geocode_url_without_bias() {
        let url = geocode_url("1 Main St", None, "k").unwrap();
        assert!(!url.as_str().contains("components"));
    }

    #[test]
    fn directions_url_is_driving() {
        let origin = LatLng::new(37.5, 127.0);
        let url = directions_url(&origin, &LatLng::new(37.6, 127.1), "k").unwrap();
        let q = query(&url);
        assert!(q.contains(&("origin".into(), "37.5,127".into())));
        assert!(q.contains(&("destination".into(), "37.6,127.1".into())));
        assert!(q.contains(&("mode".into(), "driving".into())));
    }

    #[test]
    fn roads_points_are_pipe_joined() {
        let pts = [LatLng::new(1.0, 2.0), LatLng::new(3.5, 4.0)];
        let url = roads_points_url(NEAREST_ROADS_URL, "points", &pts, "k").unwrap();
        assert_eq!(url.path(), "/v1/nearestRoads");
        assert_eq!(query(&url)[0], ("points".into(), "1,2|3.5,4".into()));
    }

    #[test]
    fn speed_limits_repeat_place_id() {
        let url = speed_limits_url(&["a".into(), "b".into()], "k").unwrap();
        assert_eq!(
            query(&url),
            vec![
                ("placeId".into(), "a".into()),
                ("placeId".into(), "b".into()),
                ("units".into(), "MPH".into()),
                ("key".into(), "k".into()),
            ]
        );
    }

    #[test]
    fn geocode_ok_takes_first_result() {
        let body = r#"{
            "status": "OK",
            "results": [
                {"geometry": {"location": {"lat": 37.5663, "lng": 126.9779}}},
                {"geometry": {"location": {"lat": 0.0, "lng": 0.0}}}
            ]
        }"#;
        let loc = parse_geocode(body).unwrap();
        assert!((loc.lat - 37.5663).abs() < 1e-9);
        assert!((loc.lng - 126.9779).abs() < 1e-9);
    }

    #[test]
    fn geocode_non_ok_keeps_status() {
        let err = parse_geocode(r#"{"status": "ZERO_RESULTS", "results": []}"#).unwrap_err();
        match err {
            NavError::Geocoding { status } => assert_eq!(status, "ZERO_RESULTS"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn geocode_garbage_is_json_error() {
        assert!(matches!(parse_geocode("<html>"), Err(NavError::Json(_))));
    }

    const DIRECTIONS_OK: &str = r#"{
        "status": "OK",
        "routes": [{
            "overview_polyline": {"points": "_p~iF~ps|U_ulLnnqC_mqNvxq`@"},
            "legs": [
                {"steps": [
                    {
                        "end_location": {"lat": 37.51, "lng": 127.0},
                        "html_instructions": "Head <b>north</b> toward <b>Teheran-ro</b>",
                        "distance": {"text": "0.2 mi", "value": 320}
                    },
                    {
                        "end_location": {"lat": 37.52, "lng": 127.01},
                        "html_instructions": "Turn <b>right</b> onto <b>Teheran-ro</b>",
                        "distance": {"text": "1.1 mi", "value": 1800},
                        "maneuver": "turn-right"
                    }
                ]},
                {"steps": [
                    {
                        "end_location": {"lat": 37.53, "lng": 127.02},
                        "html_instructions": "Take the ramp",
                        "distance": {"text": "500 ft", "value": 150},
                        "maneuver": "ramp-left"
                    }
                ]}
            ]
        }]
    }"#;

    #[test]
    fn directions_flattens_legs() {
        let route = parse_directions(DIRECTIONS_OK).unwrap();
        assert_eq!(route.overview.len(), 3);
        assert_eq!(route.steps.len(), 3);
        assert_eq!(route.steps[0].maneuver, ManeuverKind::Straight);
        assert_eq!(route.steps[1].maneuver, ManeuverKind::TurnRight);
        assert_eq!(route.steps[2].maneuver, ManeuverKind::RampLeft);
        assert_eq!(route.steps[1].distance_m, 1800.0);
        assert_eq!(route.steps[1].road_name().as_deref(), Some("Teheran-ro"));
    }

    #[test]
    fn directions_non_ok_keeps_status() {
        let err = parse_directions(r#"{"status": "REQUEST_DENIED", "routes": []}"#).unwrap_err();
        assert_eq!(err.to_string(), "directions failed: REQUEST_DENIED");
    }

    #[test]
    fn directions_ok_without_routes() {
        let err = parse_directions(r#"{"status": "OK", "routes": []}"#).unwrap_err();
        assert!(matches!(err, NavError::EmptyRoute));
    }

    #[test]
    fn place_ids_skip_missing() {
        let body = r#"{"snappedPoints": [
            {"location": {"latitude": 1, "longitude": 2}, "originalIndex": 0, "placeId": "p1"},
            {"location": {"latitude": 1, "longitude": 2}, "originalIndex": 1},
            {"location": {"latitude": 1, "longitude": 2}, "originalIndex": 2, "placeId": "p1"}
        ]}"#;
        assert_eq!(parse_place_ids(body).unwrap(), vec!["p1", "p1"]);
        assert!(parse_place_ids("{}").unwrap().is_empty());
    }

    #[test]
    fn speed_limits_in_order() {
        let body = r#"{"speedLimits": [
            {"placeId": "p1", "speedLimit": 35, "units": "MPH"},
            {"placeId": "p2", "speedLimit": 55.5, "units": "MPH"}
        ]}"#;
        assert_eq!(parse_speed_limits(body).unwrap(), vec![35.0, 55.5]);
    }

    #[test]
    fn client_without_key_reports_no_credentials() {
        let client = GoogleMapsClient::new(MapsConfig::default()).unwrap();
        assert!(!client.has_credentials());
    }
}
