//! Side-by-side stereo video streamer for head-mounted displays.
//!
//! One incoming video stream is duplicated, scaled and composited into two
//! letterboxed eye views rendered full-screen on a matching display output,
//! with optional mirror windows and an optional recording branch. Per-eye
//! placement, scale and horizontal offset are retuned live from the keyboard
//! without restarting the graph.

pub mod app;
pub mod compositor;
pub mod config;
pub mod display;
pub mod graph;
pub mod inhibit;
pub mod pipeline;
pub mod registry;

pub use app::StereoApp;
