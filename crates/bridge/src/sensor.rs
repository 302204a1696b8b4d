//! Camera sensors
//!
//! 两种图像后端：CPU 回读 与 GPU 常驻。后端在构建时选定一次，不在每次采集时判断。

use contracts::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::engine::{CameraSpec, RenderTarget, SimEngine};
use crate::error::{BridgeError, Result};

/// 图像后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageBackend {
    /// 显示区域截图回读到内存
    Cpu,
    /// 图像常驻显存，采集时下载
    Gpu,
}

impl ImageBackend {
    fn render_target(self) -> RenderTarget {
        match self {
            ImageBackend::Cpu => RenderTarget::Host,
            ImageBackend::Gpu => RenderTarget::Device,
        }
    }
}

/// 相机能力接口
///
/// `perceive` 总是返回 RGB8 主机图像，无论引擎把帧放在哪里。
pub trait ImageSensor: Send {
    /// 相机参数
    fn spec(&self) -> &CameraSpec;

    /// 图像后端
    fn backend(&self) -> ImageBackend;

    /// 渲染并返回一帧
    fn perceive(&mut self, engine: &mut dyn SimEngine) -> Result<RgbImage>;
}

/// CPU 回读相机
#[derive(Debug, Clone)]
pub struct CpuCamera {
    spec: CameraSpec,
}

impl CpuCamera {
    pub fn new(spec: CameraSpec) -> Self {
        Self { spec }
    }
}

impl ImageSensor for CpuCamera {
    fn spec(&self) -> &CameraSpec {
        &self.spec
    }

    fn backend(&self) -> ImageBackend {
        ImageBackend::Cpu
    }

    fn perceive(&mut self, engine: &mut dyn SimEngine) -> Result<RgbImage> {
        capture(&self.spec, ImageBackend::Cpu, engine)
    }
}

/// GPU 常驻相机
#[derive(Debug, Clone)]
pub struct GpuCamera {
    spec: CameraSpec,
}

impl GpuCamera {
    pub fn new(spec: CameraSpec) -> Self {
        Self { spec }
    }
}

impl ImageSensor for GpuCamera {
    fn spec(&self) -> &CameraSpec {
        &self.spec
    }

    fn backend(&self) -> ImageBackend {
        ImageBackend::Gpu
    }

    fn perceive(&mut self, engine: &mut dyn SimEngine) -> Result<RgbImage> {
        capture(&self.spec, ImageBackend::Gpu, engine)
    }
}

/// 根据后端构建相机
pub fn build_sensor(spec: CameraSpec, backend: ImageBackend) -> Box<dyn ImageSensor> {
    match backend {
        ImageBackend::Cpu => Box::new(CpuCamera::new(spec)),
        ImageBackend::Gpu => Box::new(GpuCamera::new(spec)),
    }
}

fn capture(spec: &CameraSpec, backend: ImageBackend, engine: &mut dyn SimEngine) -> Result<RgbImage> {
    let frame = engine.render(spec, backend.render_target())?;
    trace!(sensor = %spec.name, ?backend, ?frame, "frame rendered");

    let image = frame.into_rgb().map_err(|e| match e {
        BridgeError::Contract(inner) => BridgeError::capture(&spec.name, inner.to_string()),
        other => other,
    })?;

    if image.width != spec.width || image.height != spec.height {
        return Err(BridgeError::capture(
            &spec.name,
            format!(
                "expected {}x{} frame, got {}x{}",
                spec.width, spec.height, image.width, image.height
            ),
        ));
    }

    Ok(image)
}
