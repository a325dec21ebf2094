// 该文件是 Linzhi （林芝） 项目的一部分。
// src/input.rs - 图像输入
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

use crate::{FromUrl, frame::NormalizedNchwFrame};

/// 可以直接作为 NCHW 浮点张量送入推理引擎的数据
pub trait AsNchwTensor {
  fn as_nchw(&self) -> &[f32];
  fn shape(&self) -> [usize; 4];
}

/// 可按下标随机读取样本的数据来源，基准测试需要先取第一张图做预热
pub trait SampleSource<F> {
  type Error;

  fn name(&self) -> &str;
  fn is_labeled(&self) -> bool;
  fn len(&self) -> usize;
  fn sample(&self, index: usize) -> Result<Sample<F>, Self::Error>;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// 一个输入样本：显示名称、可选的真实标签以及变换后的帧
#[derive(Debug, Clone)]
pub struct Sample<F> {
  pub name: String,
  pub label: Option<String>,
  pub frame: F,
}

pub mod transform;
pub use self::transform::{ImageNetTransform, TransformError};

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(feature = "read_image_file")]
mod image_collection;
#[cfg(feature = "read_image_file")]
pub use self::image_collection::{
  CollectionImage, ImageCollection, ImageCollectionError, ImageCollectionInput,
  label_from_file_name,
};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("图像文件输入错误: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "read_image_file")]
  #[error("图像集合输入错误: {0}")]
  ImageCollectionError(#[from] ImageCollectionError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum InputWrapper<const W: u32, const H: u32> {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput<W, H>),
  #[cfg(feature = "read_image_file")]
  ImageCollection(ImageCollectionInput<W, H>),
}

impl<const W: u32, const H: u32> FromUrl for InputWrapper<W, H> {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::<W, H>::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
      if url.scheme() == ImageCollectionInput::<W, H>::SCHEME {
        let input = ImageCollectionInput::from_url(url)?;
        return Ok(InputWrapper::ImageCollection(input));
      }
    }
    Err(InputError::SchemeMismatch)
  }
}

impl<const W: u32, const H: u32> InputWrapper<W, H> {
  pub fn into_nchw(self) -> InputWrapperNchwIter<W, H> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => InputWrapperNchwIter::ReadImageFile(input.into_nchw()),
      #[cfg(feature = "read_image_file")]
      InputWrapper::ImageCollection(input) => {
        InputWrapperNchwIter::ImageCollection(input.into_nchw())
      }
    }
  }
}

impl<const W: u32, const H: u32> SampleSource<NormalizedNchwFrame<W, H>> for InputWrapper<W, H> {
  type Error = InputError;

  fn name(&self) -> &str {
    match *self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(ref input) => input.name(),
      #[cfg(feature = "read_image_file")]
      InputWrapper::ImageCollection(ref input) => input.name(),
    }
  }

  fn is_labeled(&self) -> bool {
    match *self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(_) => false,
      #[cfg(feature = "read_image_file")]
      InputWrapper::ImageCollection(ref input) => input.is_labeled(),
    }
  }

  fn len(&self) -> usize {
    match *self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(ref input) => input.len(),
      #[cfg(feature = "read_image_file")]
      InputWrapper::ImageCollection(ref input) => input.len(),
    }
  }

  fn sample(&self, index: usize) -> Result<Sample<NormalizedNchwFrame<W, H>>, Self::Error> {
    match *self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(ref input) => Ok(input.sample(index)?),
      #[cfg(feature = "read_image_file")]
      InputWrapper::ImageCollection(ref input) => Ok(input.sample(index)?),
    }
  }
}

pub enum InputWrapperNchwIter<const W: u32, const H: u32> {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(self::read_image_file::ImageFileInputNchw<W, H>),
  #[cfg(feature = "read_image_file")]
  ImageCollection(self::image_collection::ImageCollectionInputNchw<W, H>),
}

impl<const W: u32, const H: u32> Iterator for InputWrapperNchwIter<W, H> {
  type Item = Result<Sample<NormalizedNchwFrame<W, H>>, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    match *self {
      #[cfg(feature = "read_image_file")]
      InputWrapperNchwIter::ReadImageFile(ref mut input) => {
        input.next().map(|r| r.map_err(InputError::from))
      }
      #[cfg(feature = "read_image_file")]
      InputWrapperNchwIter::ImageCollection(ref mut input) => {
        input.next().map(|r| r.map_err(InputError::from))
      }
    }
  }
}
