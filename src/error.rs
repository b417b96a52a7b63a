//! Error taxonomy for lookups and session setup.
//!
//! Only one-shot, user-facing operations return these. Background
//! speed-limit lookups never surface an error; see `speed_limit`.

pub type Result<T> = std::result::Result<T, NavError>;

#[derive(Debug, thiserror::Error)]
pub enum NavError {
    /// Location access was refused by the user.
    #[error("location permission denied")]
    PermissionDenied,

    #[error("no Google Maps API key configured")]
    MissingApiKey,

    /// Geocoding returned a status other than `OK`.
    #[error("geocoding failed: {status}")]
    Geocoding { status: String },

    /// Directions returned a status other than `OK`.
    #[error("directions failed: {status}")]
    Directions { status: String },

    #[error("directions response contained no route")]
    EmptyRoute,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GPX error: {0}")]
    Gpx(String),
}
