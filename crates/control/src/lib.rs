//! Driver-facing control layer for one vehicle
//!
//! This crate provides:
//! - Steering filter with speed-adaptive range
//! - Haptic aggregation and a timed rumble sink
//! - The per-tick vehicle controller and its configuration

pub mod config;
pub mod haptics;
pub mod rumble;
pub mod steering;
pub mod vehicle;

pub use config::*;
pub use haptics::*;
pub use rumble::*;
pub use steering::*;
pub use vehicle::*;
