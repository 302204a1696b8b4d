//! RgbImage - camera frame buffer
//!
//! 相机帧统一为 RGB8、行优先、无 padding。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Bytes per RGB pixel
const RGB_CHANNELS: usize = 3;
/// Bytes per RGBA pixel
const RGBA_CHANNELS: usize = 4;

/// RGB8 图像 (row-major, height x width x 3)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbImage {
    /// 图像宽度
    pub width: u32,

    /// 图像高度
    pub height: u32,

    /// 原始像素数据
    pub data: Bytes,
}

impl RgbImage {
    /// Wrap an RGB8 buffer, checking its length against the dimensions.
    pub fn new(width: u32, height: u32, data: impl Into<Bytes>) -> Result<Self, ContractError> {
        let data = data.into();
        let expected = width as usize * height as usize * RGB_CHANNELS;
        if data.len() != expected {
            return Err(ContractError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build from an RGBA8 readback, dropping the alpha channel.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Self, ContractError> {
        let expected = width as usize * height as usize * RGBA_CHANNELS;
        if rgba.len() != expected {
            return Err(ContractError::BufferSize {
                expected,
                actual: rgba.len(),
            });
        }

        let mut rgb = Vec::with_capacity(width as usize * height as usize * RGB_CHANNELS);
        for px in rgba.chunks_exact(RGBA_CHANNELS) {
            rgb.extend_from_slice(&px[..RGB_CHANNELS]);
        }

        Ok(Self {
            width,
            height,
            data: Bytes::from(rgb),
        })
    }

    /// Pixel at column `x`, row `y`
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * RGB_CHANNELS;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Cut the centered `target_width` x `target_height` region.
    ///
    /// Offsets are `(src - target) / 2` per axis, truncating, so for odd
    /// leftovers the extra row/column stays at the bottom/right.
    pub fn crop_center(&self, target_width: u32, target_height: u32) -> Result<Self, ContractError> {
        if target_width > self.width || target_height > self.height {
            return Err(ContractError::CropOutOfBounds {
                width: self.width,
                height: self.height,
                target_width,
                target_height,
            });
        }

        let off_x = ((self.width - target_width) / 2) as usize;
        let off_y = ((self.height - target_height) / 2) as usize;
        let src_stride = self.width as usize * RGB_CHANNELS;
        let row_len = target_width as usize * RGB_CHANNELS;

        let mut out = Vec::with_capacity(row_len * target_height as usize);
        for row in off_y..off_y + target_height as usize {
            let start = row * src_stride + off_x * RGB_CHANNELS;
            out.extend_from_slice(&self.data[start..start + row_len]);
        }

        Ok(Self {
            width: target_width,
            height: target_height,
            data: Bytes::from(out),
        })
    }
}
