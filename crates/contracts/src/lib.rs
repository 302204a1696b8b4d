//! # Contracts
//!
//! Frozen interface contracts between the simulator bridge and the driving stack.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Units
//! - Positions in metres, headings/bearings in degrees at the boundary
//! - Steering angles in the engine's steering unit scaled by its max steering
//! - Time is a monotonic offset (`Duration`) from an arbitrary origin

mod config;
mod control;
mod error;
mod image;
mod state;
mod world;

pub use config::*;
pub use control::ControlVector;
pub use error::*;
pub use image::RgbImage;
pub use state::{GpsState, SimulatorState, Vector3};
pub use world::World;
