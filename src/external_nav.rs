//! Links that hand the destination to an external navigation app.

use serde::Serialize;

use crate::config::Platform;
use crate::geo::LatLng;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalNavLinks {
    /// Native app scheme to try first, when the platform has one.
    pub app: Option<String>,
    /// Universal web link, also the fallback if the app link fails.
    pub web: String,
}

/// Driving-directions links to `destination`.
pub fn directions_links(destination: &LatLng, platform: Platform) -> ExternalNavLinks {
    let LatLng { lat, lng } = *destination;
    let web = format!(
        "https://www.google.com/maps/dir/?api=1&destination={lat},{lng}&travelmode=driving"
    );
    let app = match platform {
        Platform::Ios => Some(format!(
            "comgooglemaps://?daddr={lat},{lng}&directionsmode=driving"
        )),
        // Android resolves the web link to the installed app itself
        Platform::Android => None,
    };

    ExternalNavLinks { app, web }
}
