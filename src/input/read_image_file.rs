// 该文件是 Linzhi （林芝） 项目的一部分。
// src/input/read_image_file.rs - 单张图像文件输入
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

use std::path::Path;

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::NormalizedNchwFrame,
  input::{ImageNetTransform, Sample, TransformError},
  url_path,
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("图像变换错误: {0}")]
  TransformError(#[from] TransformError),
  #[error("样本下标越界: {0}")]
  OutOfRange(usize),
}

pub struct ImageFileInput<const W: u32, const H: u32> {
  name: String,
  image: RgbImage,
  transform: ImageNetTransform<W, H>,
}

impl<const W: u32, const H: u32> FromUrlWithScheme for ImageFileInput<W, H> {
  const SCHEME: &'static str = "image";
}

impl<const W: u32, const H: u32> FromUrl for ImageFileInput<W, H> {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch);
    }

    let path = url_path(url);
    Self::open(path)
  }
}

impl<const W: u32, const H: u32> ImageFileInput<W, H> {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    info!("读取图像文件: {}", path.display());
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| path.display().to_string());
    Ok(Self::from_image(name, image.to_rgb8()))
  }

  pub fn from_image(name: impl Into<String>, image: RgbImage) -> Self {
    ImageFileInput {
      name: name.into(),
      image,
      transform: ImageNetTransform::default(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn len(&self) -> usize {
    1
  }

  pub fn is_empty(&self) -> bool {
    false
  }

  pub fn sample(
    &self,
    index: usize,
  ) -> Result<Sample<NormalizedNchwFrame<W, H>>, ImageFileInputError> {
    if index != 0 {
      return Err(ImageFileInputError::OutOfRange(index));
    }
    let frame = self.transform.transform(&self.image)?;
    Ok(Sample {
      name: self.name.clone(),
      label: None,
      frame,
    })
  }

  pub fn into_nchw(self) -> ImageFileInputNchw<W, H> {
    ImageFileInputNchw {
      inner: Some(self),
    }
  }
}

pub struct ImageFileInputNchw<const W: u32, const H: u32> {
  inner: Option<ImageFileInput<W, H>>,
}

impl<const W: u32, const H: u32> Iterator for ImageFileInputNchw<W, H> {
  type Item = Result<Sample<NormalizedNchwFrame<W, H>>, ImageFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.inner.take().map(|input| input.sample(0))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn test_single_image_yields_one_sample() {
    let image = RgbImage::from_pixel(32, 48, Rgb([1, 2, 3]));
    let input = ImageFileInput::<224, 224>::from_image("cat.png", image);
    let mut iter = input.into_nchw();
    let sample = iter.next().unwrap().unwrap();
    assert_eq!(sample.name, "cat.png");
    assert!(sample.label.is_none());
    assert!(iter.next().is_none());
  }

  #[test]
  fn test_open_from_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dog.png");
    RgbImage::from_pixel(8, 8, Rgb([200, 100, 0]))
      .save(&path)
      .unwrap();
    let url = Url::from_file_path(&path).unwrap();
    let url = Url::parse(&url.as_str().replacen("file:", "image:", 1)).unwrap();
    let input = ImageFileInput::<224, 224>::from_url(&url).unwrap();
    assert_eq!(input.name(), "dog.png");
    assert_eq!(input.len(), 1);
  }

  #[test]
  fn test_scheme_mismatch() {
    let url = Url::parse("video:///tmp/a.png").unwrap();
    assert!(matches!(
      ImageFileInput::<224, 224>::from_url(&url),
      Err(ImageFileInputError::SchemeMismatch)
    ));
  }
}
