//! GPX 1.1 export of routes and replay of recorded drives.
//!
//! Wraps the `gpx` crate. A route exports as a GPX route built from its
//! overview line, with one waypoint per step end carrying the maneuver
//! tag as its symbol. A recorded track reads back as a position stream
//! that can be fed to a session.

use std::io::Read;

use geo_types::Point;
use gpx::{Gpx, GpxVersion, Waypoint};

use crate::error::{NavError, Result};
use crate::geo::{LatLng, Position};
use crate::instruction;
use crate::route::Route;

const CREATOR: &str = "hudnav";

fn waypoint(p: &LatLng) -> Waypoint {
    Waypoint::new(Point::new(p.lng, p.lat))
}

/// Serialize a route to GPX.
pub fn export_route(route: &Route, name: Option<&str>) -> Result<Vec<u8>> {
    let mut gpx_route = gpx::Route::default();
    gpx_route.name = name.map(str::to_string);
    gpx_route.points = route.overview.iter().map(waypoint).collect();

    let waypoints = route
        .steps
        .iter()
        .map(|step| {
            let mut wp = waypoint(&step.end_location);
            let text = instruction::plain_text(&step.instruction_markup);
            wp.name = (!text.is_empty()).then_some(text);
            wp.symbol = Some(step.maneuver.tag().to_string());
            wp
        })
        .collect();

    let doc = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.to_string()),
        waypoints,
        routes: vec![gpx_route],
        ..Default::default()
    };

    let mut out = Vec::new();
    gpx::write(&doc, &mut out).map_err(|e| NavError::Gpx(format!("GPX write error: {e}")))?;
    Ok(out)
}

/// Read every track point of a GPX file, in order, as positions.
///
/// Multiple tracks and segments are concatenated.
pub fn read_track_positions<R: Read>(reader: R) -> Result<Vec<Position>> {
    let doc = gpx::read(reader).map_err(|e| NavError::Gpx(format!("GPX parse error: {e}")))?;

    Ok(doc
        .tracks
        .iter()
        .flat_map(|t| t.segments.iter())
        .flat_map(|seg| seg.points.iter())
        .map(|wp| Position::new(wp.point().y(), wp.point().x()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maneuver::ManeuverKind;
    use crate::route::RouteStep;

    const DRIVE_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"
     xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Morning drive</name>
    <trkseg>
      <trkpt lat="37.0000" lon="127.0000"></trkpt>
      <trkpt lat="37.0050" lon="127.0000"></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="37.0095" lon="127.0000"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    fn route() -> Route {
        Route::new(
            vec![LatLng::new(37.0, 127.0), LatLng::new(37.01, 127.0), LatLng::new(37.01, 127.01)],
            vec![
                RouteStep {
                    end_location: LatLng::new(37.01, 127.0),
                    instruction_markup: "Head <b>north</b>".into(),
                    distance_m: 1112.0,
                    maneuver: ManeuverKind::Straight,
                },
                RouteStep {
                    end_location: LatLng::new(37.01, 127.01),
                    instruction_markup: "Turn <b>right</b> onto <b>Main St</b>".into(),
                    distance_m: 888.0,
                    maneuver: ManeuverKind::TurnRight,
                },
            ],
        )
    }

    #[test]
    fn read_drive_concatenates_segments() {
        let positions = read_track_positions(DRIVE_GPX.as_bytes()).unwrap();
        assert_eq!(positions.len(), 3);
        assert!((positions[2].coords.lat - 37.0095).abs() < 1e-9);
        assert!((positions[2].coords.lng - 127.0).abs() < 1e-9);
        assert_eq!(positions[0].speed_mps, None);
    }

    #[test]
    fn read_invalid_xml_returns_error() {
        assert!(matches!(read_track_positions(&b"not xml"[..]), Err(NavError::Gpx(_))));
    }

    #[test]
    fn exported_route_reads_back() {
        let bytes = export_route(&route(), Some("To Main St")).unwrap();
        let doc = gpx::read(bytes.as_slice()).unwrap();

        assert_eq!(doc.routes.len(), 1);
        assert_eq!(doc.routes[0].name.as_deref(), Some("To Main St"));
        assert_eq!(doc.routes[0].points.len(), 3);

        assert_eq!(doc.waypoints.len(), 2);
        assert_eq!(doc.waypoints[1].name.as_deref(), Some("Turn right onto Main St"));
        assert_eq!(doc.waypoints[1].symbol.as_deref(), Some("turn-right"));
        assert!((doc.waypoints[1].point().x() - 127.01).abs() < 1e-9);
    }
}
