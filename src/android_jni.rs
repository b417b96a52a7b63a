//! JNI bindings for the Android app.
//!
//! Each public function here corresponds to an `external fun` declaration
//! in RustBridge.kt. The function names follow JNI naming conventions:
//! Java_<package>_<class>_<method> with dots replaced by underscores.
//!
//! Data crosses the boundary as JSON strings. Failures are logged and
//! returned to Kotlin as `null`.

use jni::objects::{JClass, JString};
use jni::sys::{jdouble, jint, jstring};
use jni::JNIEnv;
use log::error;
use serde::Serialize;

use crate::advisory::AdvisoryPair;
use crate::config::NavTuning;
use crate::error::{NavError, Result};
use crate::geo::LatLng;
use crate::route::{Route, RouteStep};
use crate::tracker::track_step;

/// Result of one stateless HUD update. The app keeps `next_index` and
/// passes it back as the prior index on the next fix.
#[derive(Debug, Serialize)]
struct HudUpdate {
    index: usize,
    next_index: usize,
    distance_m: f64,
    arrived: bool,
    advisory: AdvisoryPair,
}

fn hud_update_json(steps_json: &str, prior_index: i32, lat: f64, lng: f64) -> Result<String> {
    let steps: Vec<RouteStep> = serde_json::from_str(steps_json)?;
    let prior = usize::try_from(prior_index).unwrap_or(0);
    let threshold = NavTuning::default().arrival_threshold_m;

    let progress = track_step(&LatLng::new(lat, lng), &steps, prior, threshold)
        .ok_or_else(|| NavError::InvalidInput("empty step list".into()))?;

    let update = HudUpdate {
        index: progress.index,
        next_index: progress.next_index(),
        distance_m: progress.distance_to_step_end_m,
        arrived: progress.arrived(),
        advisory: progress.advisory,
    };
    Ok(serde_json::to_string(&update)?)
}

fn decode_polyline_json(encoded: &str) -> Result<String> {
    Ok(serde_json::to_string(&crate::polyline::decode(encoded)?)?)
}

fn export_route_gpx(route_json: &str) -> Result<String> {
    let route: Route = serde_json::from_str(route_json)?;
    let bytes = crate::gpx::export_route(&route, None)?;
    String::from_utf8(bytes).map_err(|e| NavError::Gpx(e.to_string()))
}

fn read_string(env: &mut JNIEnv, input: &JString) -> Option<String> {
    match env.get_string(input) {
        Ok(s) => Some(s.into()),
        Err(e) => {
            error!("failed to read Java string: {e}");
            None
        }
    }
}

fn to_jstring(env: &mut JNIEnv, value: Result<String>) -> jstring {
    let value = match value {
        Ok(v) => v,
        Err(e) => {
            error!("bridge call failed: {e}");
            return std::ptr::null_mut();
        }
    };
    match env.new_string(value) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            error!("failed to create Java string: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Returns the library version.
/// Maps to: RustBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_hudnav_app_RustBridge_version(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    to_jstring(&mut env, Ok(crate::VERSION.to_string()))
}

/// Routes `log` output to logcat. Safe to call more than once.
/// Maps to: RustBridge.initLogging()
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_hudnav_app_RustBridge_initLogging(
    _env: JNIEnv,
    _class: JClass,
) {
    #[cfg(target_os = "android")]
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag("hudnav"),
    );
}

/// Maps to: RustBridge.decodePolyline(encoded: String) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_hudnav_app_RustBridge_decodePolyline(
    mut env: JNIEnv,
    _class: JClass,
    encoded: JString,
) -> jstring {
    let Some(encoded) = read_string(&mut env, &encoded) else {
        return std::ptr::null_mut();
    };
    let result = decode_polyline_json(&encoded);
    to_jstring(&mut env, result)
}

/// Maps to: RustBridge.hudUpdate(stepsJson: String, priorIndex: Int,
/// lat: Double, lng: Double) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_hudnav_app_RustBridge_hudUpdate(
    mut env: JNIEnv,
    _class: JClass,
    steps_json: JString,
    prior_index: jint,
    lat: jdouble,
    lng: jdouble,
) -> jstring {
    let Some(steps_json) = read_string(&mut env, &steps_json) else {
        return std::ptr::null_mut();
    };
    let result = hud_update_json(&steps_json, prior_index, lat, lng);
    to_jstring(&mut env, result)
}

/// Maps to: RustBridge.exportRouteGpx(routeJson: String) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_hudnav_app_RustBridge_exportRouteGpx(
    mut env: JNIEnv,
    _class: JClass,
    route_json: JString,
) -> jstring {
    let Some(route_json) = read_string(&mut env, &route_json) else {
        return std::ptr::null_mut();
    };
    let result = export_route_gpx(&route_json);
    to_jstring(&mut env, result)
}
