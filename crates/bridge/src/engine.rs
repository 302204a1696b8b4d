//! Simulation engine abstraction
//!
//! Defines traits for driving an external simulation engine, supporting a real
//! engine binding and the in-process kinematic engine behind one interface.

use std::collections::BTreeMap;

use contracts::{ControlVector, RgbImage, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Engine construction parameters
///
/// Typed counterpart of the engine's configuration dictionary. Produced by
/// [`Bridge::engine_config`](crate::Bridge::engine_config).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Open an on-screen render window
    pub use_render: bool,

    /// Ego vehicle settings
    pub vehicle_config: VehicleSpec,

    /// Camera name -> camera parameters
    pub sensors: BTreeMap<String, CameraSpec>,

    /// Keep rendered images in device memory
    pub image_on_cuda: bool,

    /// Observations are images rather than state vectors
    pub image_observation: bool,

    /// On-screen panels to draw; empty disables the HUD
    pub interface_panel: Vec<String>,

    /// Episode termination policy
    #[serde(flatten)]
    pub done: DoneConditions,
}

/// Ego vehicle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    /// Allow negative speed
    pub enable_reverse: bool,

    /// Camera feeding the image observation
    pub image_source: String,

    /// Spawn offset along the lane (m)
    pub spawn_longitude: f64,
}

/// Which events end an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DoneConditions {
    pub out_of_route_done: bool,
    pub on_continuous_line_done: bool,
    pub crash_vehicle_done: bool,
    pub crash_object_done: bool,
}

/// Camera parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSpec {
    /// Sensor name, e.g. "rgb_road"
    pub name: String,

    /// Render width (px)
    pub width: u32,

    /// Render height (px)
    pub height: u32,

    /// Field of view (deg)
    pub fov_deg: f64,

    /// Mount position relative to the vehicle (m)
    pub position: Vector3,
}

/// Snapshot of the ego vehicle, in engine units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleSnapshot {
    /// World-frame velocity (m/s)
    pub velocity: [f64; 2],

    /// World-frame position (m)
    pub position: [f64; 2],

    /// Heading (rad)
    pub heading_theta: f64,

    /// Current steering in [-1, 1]
    pub steering: f64,

    /// Steering capability the normalised steering is relative to
    pub max_steering: f64,
}

/// Why an episode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCause {
    Horizon,
    OutOfRoute,
    Crash,
    Scripted,
}

/// Result of one engine step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepOutcome {
    /// Episode ended; the caller should reset
    pub terminated: bool,

    /// Reason, when terminated
    pub cause: Option<TerminationCause>,
}

impl StepOutcome {
    pub fn running() -> Self {
        Self::default()
    }

    pub fn terminated(cause: TerminationCause) -> Self {
        Self {
            terminated: true,
            cause: Some(cause),
        }
    }
}

/// Where the engine should leave a rendered frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// Read back to host memory
    Host,
    /// Keep in device memory
    Device,
}

/// Frame still resident in device memory
pub trait DeviceBuffer: Send {
    /// Frame width (px)
    fn width(&self) -> u32;

    /// Frame height (px)
    fn height(&self) -> u32;

    /// Copy to host memory as RGB8
    fn download(&self) -> Result<RgbImage>;
}

/// Raw output of a render pass
pub enum RenderedFrame {
    /// RGBA8 screenshot of the display region
    HostRgba {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },

    /// Frame left on the device
    Device(Box<dyn DeviceBuffer>),
}

impl RenderedFrame {
    /// Normalise to a host RGB8 image, whatever memory the frame lives in
    pub fn into_rgb(self) -> Result<RgbImage> {
        match self {
            RenderedFrame::HostRgba {
                width,
                height,
                data,
            } => Ok(RgbImage::from_rgba(width, height, &data)?),
            RenderedFrame::Device(buffer) => buffer.download(),
        }
    }
}

impl std::fmt::Debug for RenderedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderedFrame::HostRgba { width, height, .. } => f
                .debug_struct("HostRgba")
                .field("width", width)
                .field("height", height)
                .finish_non_exhaustive(),
            RenderedFrame::Device(buffer) => f
                .debug_struct("Device")
                .field("width", &buffer.width())
                .field("height", &buffer.height())
                .finish(),
        }
    }
}

/// Simulation engine trait
///
/// Abstracts one running engine instance: stepping, resetting, vehicle state
/// and camera rendering. Implementations own physics and rendering.
pub trait SimEngine: Send {
    /// Start a new episode
    fn reset(&mut self) -> Result<()>;

    /// Advance one step with the given action
    fn step(&mut self, action: ControlVector) -> Result<StepOutcome>;

    /// Current ego vehicle state
    fn vehicle(&self) -> VehicleSnapshot;

    /// Render one camera
    ///
    /// # Arguments
    /// * `camera` - Camera parameters, as registered in `EngineConfig::sensors`
    /// * `target` - Host readback or device-resident output
    fn render(&mut self, camera: &CameraSpec, target: RenderTarget) -> Result<RenderedFrame>;
}

/// Engine constructor
///
/// Separates capability probing (done before the config is built) from
/// construction.
pub trait EngineFactory {
    /// Engine type produced
    type Engine: SimEngine;

    /// Whether device-resident images are available on this host
    fn supports_device_images(&self) -> bool;

    /// Construct an engine; it is not yet reset
    fn create(&self, config: &EngineConfig) -> Result<Self::Engine>;
}
