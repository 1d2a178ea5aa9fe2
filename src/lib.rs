//! StrideBeat: activity-driven music playback for a wrist-worn ESP32-C3.
//!
//! The accelerometer feeds a rolling-variance classifier; confirmed activity
//! changes pick a playlist, buttons override it, and a worker thread applies
//! the result to a DFPlayer Mini while an SSD1306 shows the status.
//!
//! Everything outside [`drivers`] is target independent and tested on the
//! host; the bus-facing drivers only build for ESP-IDF.

pub mod arbiter;
pub mod classifier;
pub mod config;
pub mod director;
pub mod drivers;
pub mod error;
pub mod events;
pub mod input;
pub mod runtime;
pub mod status;
pub mod tasks;
pub mod window;

pub use arbiter::{Arbiter, PlaybackDecision};
pub use config::Settings;
pub use runtime::{Runtime, Shutdown};
