pub mod advisory;
pub mod android_jni;
pub mod config;
pub mod error;
pub mod external_nav;
pub mod geo;
pub mod google;
pub mod gpx;
pub mod handoff;
pub mod instruction;
pub mod maneuver;
pub mod polyline;
pub mod route;
pub mod session;
pub mod speed;
pub mod speed_limit;
pub mod tracker;

pub use error::{NavError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
