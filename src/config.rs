//! API keys and tuning constants.
//!
//! Keys resolve in order: explicit environment variable, bundled
//! extras shipped with the app, empty. Resolution takes a lookup closure
//! so nothing below `from_process_env` touches the process environment.

use serde::{Deserialize, Serialize};

use crate::error::{NavError, Result};

/// Environment variable holding the web-service key.
pub const MAPS_KEY_ENV: &str = "GOOGLE_MAPS_KEY";
pub const ANDROID_KEY_ENV: &str = "ANDROID_GMAPS_KEY";
pub const IOS_KEY_ENV: &str = "IOS_GMAPS_KEY";

/// Values bundled into the app at build time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundledExtras {
    #[serde(default)]
    pub google_maps_key: Option<String>,
    #[serde(default)]
    pub android_maps_key: Option<String>,
    #[serde(default)]
    pub ios_maps_key: Option<String>,
}

impl BundledExtras {
    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Android,
    Ios,
}

/// Resolved Google Maps configuration.
#[derive(Debug, Clone)]
pub struct MapsConfig {
    /// Key for Geocoding, Directions and Roads web services.
    pub api_key: String,
    android_sdk_key: Option<String>,
    ios_sdk_key: Option<String>,
    /// ISO country code used to bias geocoding, e.g. "KR" or "US".
    pub country_bias: Option<String>,
    pub timeout_secs: u64,
}

impl MapsConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

    /// Resolve keys from an environment lookup and bundled extras.
    pub fn resolve<F>(env: F, extras: &BundledExtras) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let api_key = non_empty(env(MAPS_KEY_ENV))
            .or_else(|| non_empty(extras.google_maps_key.clone()))
            .unwrap_or_default();
        let android_sdk_key =
            non_empty(env(ANDROID_KEY_ENV)).or_else(|| non_empty(extras.android_maps_key.clone()));
        let ios_sdk_key =
            non_empty(env(IOS_KEY_ENV)).or_else(|| non_empty(extras.ios_maps_key.clone()));

        Self {
            api_key,
            android_sdk_key,
            ios_sdk_key,
            ..Self::default()
        }
    }

    /// Resolve from the real process environment.
    pub fn from_process_env(extras: &BundledExtras) -> Self {
        Self::resolve(|name| std::env::var(name).ok(), extras)
    }

    pub fn with_country_bias(mut self, country: impl Into<String>) -> Self {
        let country = country.into();
        self.country_bias = (!country.is_empty()).then_some(country);
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn require_api_key(&self) -> Result<&str> {
        if self.has_api_key() {
            Ok(&self.api_key)
        } else {
            Err(NavError::MissingApiKey)
        }
    }

    /// Map SDK key for a platform, reusing the web key when no separate
    /// key was configured.
    pub fn sdk_key(&self, platform: Platform) -> &str {
        let specific = match platform {
            Platform::Android => self.android_sdk_key.as_deref(),
            Platform::Ios => self.ios_sdk_key.as_deref(),
        };
        specific.unwrap_or(&self.api_key)
    }
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            android_sdk_key: None,
            ios_sdk_key: None,
            country_bias: None,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Numeric knobs for tracking and polling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavTuning {
    /// Distance to a step end at which the step counts as reached.
    pub arrival_threshold_m: f64,
    /// Minimum gap between two speed-limit lookups.
    pub speed_limit_min_interval_ms: u64,
    /// Speed-limit poll timer period.
    pub speed_limit_poll_ms: u64,
    pub over_limit_tolerance_mph: u32,
    /// Probe grid spacing for roads lookups.
    pub probe_offset_m: f64,
    /// Hand-off snapshots older than this are treated as absent. See
    /// `hud_max_age_ms` for the value actually applied.
    pub snapshot_max_age_ms: u64,
}

impl NavTuning {
    /// Staleness window for HUD readers.
    ///
    /// A stationary session republishes only on the poll timer, so the
    /// window is never shorter than one and a half poll periods.
    pub fn hud_max_age_ms(&self) -> u64 {
        let poll = self.speed_limit_poll_ms;
        self.snapshot_max_age_ms.max(poll.saturating_add(poll / 2))
    }
}

impl Default for NavTuning {
    fn default() -> Self {
        Self {
            arrival_threshold_m: 120.0,
            speed_limit_min_interval_ms: 8_000,
            speed_limit_poll_ms: 10_000,
            over_limit_tolerance_mph: 3,
            probe_offset_m: 35.0,
            snapshot_max_age_ms: 15_000,
        }
    }
}
