//! # Bridge
//!
//! Simulator bridge: world adapter and engine factory.
//!
//! Responsibilities:
//! - Build the engine configuration (vehicle, cameras, rendering backend, done-conditions)
//! - Construct and reset the engine through an `EngineFactory`
//! - Translate engine state into `SimulatorState` and stack outputs into a `ControlVector`
//! - Capture and center-crop camera frames
//! - Provide a kinematic engine for headless runs and tests
//! - Drive a `World` at a fixed frame cadence

pub mod clock;
pub mod controls;
pub mod engine;
pub mod error;
pub mod factory;
pub mod kinematic;
pub mod runner;
pub mod sensor;
pub mod world;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use contracts::{BridgeConfig, ControlVector, RgbImage, SimulatorState, World};
pub use controls::ControlMapping;
pub use engine::{
    CameraSpec, DoneConditions, EngineConfig, EngineFactory, RenderTarget, RenderedFrame,
    SimEngine, StepOutcome, TerminationCause, VehicleSnapshot, VehicleSpec,
};
pub use error::{BridgeError, Result};
pub use factory::{Bridge, ROAD_CAMERA, WIDE_CAMERA};
pub use kinematic::{FaultConfig, KinematicEngine, KinematicFactory};
pub use runner::{ControlCommand, Controller, DriveLoop, RunStats, SpeedController, StepReport};
pub use sensor::{CpuCamera, GpuCamera, ImageBackend, ImageSensor};
pub use world::{DriveWorld, WorldSettings};
