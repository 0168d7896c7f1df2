//! # DreamCast Common Library
//!
//! Shared code for the DreamCast player crates including:
//! - Event types (PlayerEvent enum)
//! - Story records and ambience types
//! - Gain ramp definitions and calculations
//! - Configuration file resolution
//! - Time formatting helpers

pub mod config;
pub mod error;
pub mod events;
pub mod ramp;
pub mod story;
pub mod time;

pub use error::{Error, Result};
pub use ramp::Ramp;
pub use story::{AmbienceType, Story};
