// 该文件是 Linzhi （林芝） 项目的一部分。
// src/frame.rs - 归一化 NCHW 帧定义
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

use thiserror::Error;

use crate::input::AsNchwTensor;

pub const RGB_CHANNELS: usize = 3;

/// ResNet50 v1.5 的输入帧：3x224x224
pub type ResNetFrame = NormalizedNchwFrame<224, 224>;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 按通道优先 (C, H, W) 存放的 32 位浮点帧，数值已经归一化
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedNchwFrame<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> NormalizedNchwFrame<W, H> {
  pub const LEN: usize = RGB_CHANNELS * (W as usize) * (H as usize);

  /// 取出 (c, y, x) 处的数值
  pub fn at(&self, c: usize, y: usize, x: usize) -> f32 {
    self.data[c * (H as usize) * (W as usize) + y * (W as usize) + x]
  }
}

impl<const W: u32, const H: u32> TryFrom<Vec<f32>> for NormalizedNchwFrame<W, H> {
  type Error = FrameError;

  fn try_from(data: Vec<f32>) -> Result<Self, Self::Error> {
    if data.len() != Self::LEN {
      return Err(FrameError::LengthMismatch {
        expected: Self::LEN,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> Default for NormalizedNchwFrame<W, H> {
  fn default() -> Self {
    let data = vec![0f32; Self::LEN].into_boxed_slice();
    Self { data }
  }
}

impl<const W: u32, const H: u32> AsNchwTensor for NormalizedNchwFrame<W, H> {
  fn as_nchw(&self) -> &[f32] {
    &self.data
  }

  fn shape(&self) -> [usize; 4] {
    [1, RGB_CHANNELS, H as usize, W as usize]
  }
}
