// 该文件是 Linzhi （林芝） 项目的一部分。
// src/input/transform.rs - ImageNet 输入变换
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{DynamicImage, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

use crate::frame::{FrameError, NormalizedNchwFrame, RGB_CHANNELS};

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
/// 裁剪前先缩放到的边长
pub const RESNET_RESIZE: u32 = 256;

#[derive(Error, Debug)]
pub enum TransformError {
  #[error("图像为空: {width}x{height}")]
  EmptyImage { width: u32, height: u32 },
  #[error("裁剪尺寸 {crop_width}x{crop_height} 大于缩放尺寸 {resize}")]
  CropLargerThanResize {
    crop_width: u32,
    crop_height: u32,
    resize: u32,
  },
  #[error("帧错误: {0}")]
  Frame(#[from] FrameError),
}

/// 缩放、中心裁剪、按通道归一化，输出 W x H 的 NCHW 帧。
///
/// 缩放不保持宽高比，与训练时的预处理保持一致。
#[derive(Debug, Clone)]
pub struct ImageNetTransform<const W: u32, const H: u32> {
  resize: u32,
  mean: [f32; 3],
  std: [f32; 3],
  filter: FilterType,
}

impl<const W: u32, const H: u32> Default for ImageNetTransform<W, H> {
  fn default() -> Self {
    Self {
      resize: RESNET_RESIZE,
      mean: IMAGENET_MEAN,
      std: IMAGENET_STD,
      filter: FilterType::Triangle,
    }
  }
}

impl<const W: u32, const H: u32> ImageNetTransform<W, H> {
  pub fn with_resize(mut self, resize: u32) -> Self {
    self.resize = resize;
    self
  }

  pub fn transform_dynamic(
    &self,
    image: &DynamicImage,
  ) -> Result<NormalizedNchwFrame<W, H>, TransformError> {
    self.transform(&image.to_rgb8())
  }

  pub fn transform(&self, image: &RgbImage) -> Result<NormalizedNchwFrame<W, H>, TransformError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      return Err(TransformError::EmptyImage { width, height });
    }
    if W > self.resize || H > self.resize {
      return Err(TransformError::CropLargerThanResize {
        crop_width: W,
        crop_height: H,
        resize: self.resize,
      });
    }

    debug!(
      "图像变换: {}x{} -> {}x{} -> {}x{}",
      width, height, self.resize, self.resize, W, H
    );
    let resized = image::imageops::resize(image, self.resize, self.resize, self.filter);
    let left = (self.resize - W) / 2;
    let top = (self.resize - H) / 2;
    let cropped = image::imageops::crop_imm(&resized, left, top, W, H).to_image();

    let plane = (W as usize) * (H as usize);
    let mut data = vec![0f32; RGB_CHANNELS * plane];
    for (x, y, pixel) in cropped.enumerate_pixels() {
      let offset = (y as usize) * (W as usize) + (x as usize);
      for c in 0..RGB_CHANNELS {
        let value = pixel[c] as f32 / 255.0;
        data[c * plane + offset] = (value - self.mean[c]) / self.std[c];
      }
    }

    Ok(NormalizedNchwFrame::try_from(data)?)
  }
}
