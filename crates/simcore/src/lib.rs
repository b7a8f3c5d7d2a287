//! Shared simulation core for the vehicle layer
//!
//! This crate provides:
//! - Value types exchanged with the physics engine and the haptic device
//! - The `Model` lifecycle trait and per-tick `SimContext`
//! - Small interpolation helpers used by every stage of the tick
//! - The configuration error type

pub mod error;
pub mod math;
pub mod traits;

pub use error::ConfigError;
pub use math::*;
pub use traits::*;
