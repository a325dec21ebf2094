// 该文件是 Linzhi （林芝） 项目的一部分。
// src/input/image_collection.rs - 图像集合输入
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

use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::NormalizedNchwFrame,
  input::{ImageNetTransform, Sample, TransformError},
  model::{ImageNetLabel, WithLabel},
  url_path,
};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum ImageCollectionError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("不是文件: {0}")]
  NotAFile(PathBuf),
  #[error("不是目录: {0}")]
  NotADirectory(PathBuf),
  #[error("图像已存在于集合中: {0}")]
  Duplicate(PathBuf),
  #[error("文件名中没有有效的类别编号: {0}")]
  MissingLabel(String),
  #[error("样本下标越界: {0}")]
  OutOfRange(usize),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("图像变换错误: {0}")]
  TransformError(#[from] TransformError),
}

/// 由 `<类别编号>_<任意>` 形式的文件名得到 ImageNet 标签
pub fn label_from_file_name(name: &str) -> Option<String> {
  let (index, _) = name.split_once('_')?;
  let id = index.parse::<u32>().ok()?;
  ImageNetLabel::try_from_label_id(id).map(|label| label.to_label_str())
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionImage {
  pub path: PathBuf,
  pub name: String,
  pub label: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
  name: String,
  images: Vec<CollectionImage>,
  labeled: bool,
}

impl ImageCollection {
  pub fn new(name: impl Into<String>, labeled: bool) -> Self {
    ImageCollection {
      name: name.into(),
      images: Vec::new(),
      labeled,
    }
  }

  /// 读取目录下所有图像文件，按路径排序
  pub fn from_directory(
    directory: impl AsRef<Path>,
    name: Option<String>,
    labeled: bool,
  ) -> Result<Self, ImageCollectionError> {
    let directory = directory.as_ref();
    if !directory.is_dir() {
      return Err(ImageCollectionError::NotADirectory(directory.to_path_buf()));
    }

    let name = name.unwrap_or_else(|| {
      directory
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| directory.display().to_string())
    });

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory)? {
      let path = entry?.path();
      let is_image = path
        .extension()
        .map(|ext| {
          let ext = ext.to_string_lossy().to_ascii_lowercase();
          IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false);
      if path.is_file() && is_image {
        paths.push(path);
      }
    }
    paths.sort();

    let mut collection = ImageCollection::new(name, labeled);
    for path in paths {
      match collection.add_image(&path) {
        Ok(image) => debug!("加入图像: {} ({:?})", image.name, image.label),
        Err(ImageCollectionError::MissingLabel(name)) => {
          warn!("跳过没有类别编号的图像: {}", name);
        }
        Err(e) => return Err(e),
      }
    }

    info!(
      "图像集合 {} 读取完成，共 {} 张图像",
      collection.name,
      collection.len()
    );
    Ok(collection)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn is_labeled(&self) -> bool {
    self.labeled
  }

  pub fn images(&self) -> &[CollectionImage] {
    &self.images
  }

  pub fn len(&self) -> usize {
    self.images.len()
  }

  pub fn is_empty(&self) -> bool {
    self.images.is_empty()
  }

  pub fn contains(&self, path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    self.images.iter().any(|image| image.path == path)
  }

  /// 加入一张图像，显示名称冲突时追加 ` (n)` 后缀
  pub fn add_image(
    &mut self,
    path: impl AsRef<Path>,
  ) -> Result<&CollectionImage, ImageCollectionError> {
    let path = path.as_ref();
    if !path.is_file() {
      return Err(ImageCollectionError::NotAFile(path.to_path_buf()));
    }
    if self.contains(path) {
      return Err(ImageCollectionError::Duplicate(path.to_path_buf()));
    }

    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    let label = if self.labeled {
      Some(
        label_from_file_name(&file_name)
          .ok_or_else(|| ImageCollectionError::MissingLabel(file_name.clone()))?,
      )
    } else {
      None
    };

    let name = self.unique_name(&file_name);
    self.images.push(CollectionImage {
      path: path.to_path_buf(),
      name,
      label,
    });
    let index = self.images.len() - 1;
    Ok(&self.images[index])
  }

  /// 移除一张图像，不存在时什么也不做
  pub fn remove_image(&mut self, path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    let before = self.images.len();
    self.images.retain(|image| image.path != path);
    before != self.images.len()
  }

  fn has_name(&self, name: &str) -> bool {
    self.images.iter().any(|image| image.name == name)
  }

  fn unique_name(&self, name: &str) -> String {
    if !self.has_name(name) {
      return name.to_string();
    }

    let base = name.split('(').next().unwrap_or(name).trim_end();
    let mut count = 1usize;
    loop {
      let candidate = format!("{} ({})", base, count);
      if !self.has_name(&candidate) {
        return candidate;
      }
      count += 1;
    }
  }
}

pub struct ImageCollectionInput<const W: u32, const H: u32> {
  collection: ImageCollection,
  transform: ImageNetTransform<W, H>,
}

impl<const W: u32, const H: u32> FromUrlWithScheme for ImageCollectionInput<W, H> {
  const SCHEME: &'static str = "collection";
}

impl<const W: u32, const H: u32> FromUrl for ImageCollectionInput<W, H> {
  type Error = ImageCollectionError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageCollectionError::SchemeMismatch);
    }

    let labeled = url
      .query_pairs()
      .any(|(k, v)| k == "labeled" && v != "false");
    let name = url
      .query_pairs()
      .find(|(k, _)| k == "name")
      .map(|(_, v)| v.into_owned());

    let collection = ImageCollection::from_directory(url_path(url), name, labeled)?;
    Ok(Self::from_collection(collection))
  }
}

impl<const W: u32, const H: u32> ImageCollectionInput<W, H> {
  pub fn from_collection(collection: ImageCollection) -> Self {
    ImageCollectionInput {
      collection,
      transform: ImageNetTransform::default(),
    }
  }

  pub fn collection(&self) -> &ImageCollection {
    &self.collection
  }

  pub fn name(&self) -> &str {
    self.collection.name()
  }

  pub fn is_labeled(&self) -> bool {
    self.collection.is_labeled()
  }

  pub fn len(&self) -> usize {
    self.collection.len()
  }

  pub fn is_empty(&self) -> bool {
    self.collection.is_empty()
  }

  /// 解码并变换第 `index` 张图像
  pub fn sample(
    &self,
    index: usize,
  ) -> Result<Sample<NormalizedNchwFrame<W, H>>, ImageCollectionError> {
    let image = self
      .collection
      .images
      .get(index)
      .ok_or(ImageCollectionError::OutOfRange(index))?;
    let decoded = ImageReader::open(&image.path)?
      .with_guessed_format()?
      .decode()?;
    let frame = self.transform.transform_dynamic(&decoded)?;
    Ok(Sample {
      name: image.name.clone(),
      label: image.label.clone(),
      frame,
    })
  }

  pub fn into_nchw(self) -> ImageCollectionInputNchw<W, H> {
    ImageCollectionInputNchw {
      inner: self,
      index: 0,
    }
  }
}

pub struct ImageCollectionInputNchw<const W: u32, const H: u32> {
  inner: ImageCollectionInput<W, H>,
  index: usize,
}

impl<const W: u32, const H: u32> Iterator for ImageCollectionInputNchw<W, H> {
  type Item = Result<Sample<NormalizedNchwFrame<W, H>>, ImageCollectionError>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.index >= self.inner.len() {
      return None;
    }
    let sample = self.inner.sample(self.index);
    self.index += 1;
    Some(sample)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  fn write_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(4, 4, Rgb([9, 9, 9])).save(&path).unwrap();
    path
  }

  #[test]
  fn test_label_from_file_name() {
    assert_eq!(label_from_file_name("0_fish.jpg").as_deref(), Some("tench"));
    assert_eq!(
      label_from_file_name("207_dog.png").as_deref(),
      Some("golden retriever")
    );
    assert_eq!(label_from_file_name("1000_x.png"), None);
    assert_eq!(label_from_file_name("cat.png"), None);
    assert_eq!(label_from_file_name("abc_cat.png"), None);
  }

  #[test]
  fn test_add_image_rules() {
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("sub");
    std::fs::create_dir(&sub).unwrap();
    let a = write_image(dir.path(), "cat.png");
    let b = write_image(&sub, "cat.png");

    let mut collection = ImageCollection::new("pets", false);
    assert_eq!(collection.add_image(&a).unwrap().name, "cat.png");
    assert!(matches!(
      collection.add_image(&a),
      Err(ImageCollectionError::Duplicate(_))
    ));
    assert!(matches!(
      collection.add_image(dir.path()),
      Err(ImageCollectionError::NotAFile(_))
    ));
    assert_eq!(collection.add_image(&b).unwrap().name, "cat.png (1)");
    assert_eq!(collection.len(), 2);
  }

  #[test]
  fn test_unique_name_counts_up() {
    let dir = tempfile::tempdir().unwrap();
    let mut collection = ImageCollection::new("pets", false);
    for i in 0..3 {
      let sub = dir.path().join(i.to_string());
      std::fs::create_dir(&sub).unwrap();
      let path = write_image(&sub, "cat.png");
      collection.add_image(&path).unwrap();
    }
    let names: Vec<_> = collection.images().iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["cat.png", "cat.png (1)", "cat.png (2)"]);
  }

  #[test]
  fn test_remove_missing_image_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_image(dir.path(), "a.png");
    let mut collection = ImageCollection::new("c", false);
    collection.add_image(&a).unwrap();
    assert!(!collection.remove_image(dir.path().join("missing.png")));
    assert_eq!(collection.len(), 1);
    assert!(collection.remove_image(&a));
    assert!(collection.is_empty());
  }

  #[test]
  fn test_labeled_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "281_cat.png");
    write_image(dir.path(), "0_fish.jpg");
    write_image(dir.path(), "unlabeled.png");
    std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

    let collection =
      ImageCollection::from_directory(dir.path(), Some("ground".to_string()), true).unwrap();
    assert_eq!(collection.name(), "ground");
    assert!(collection.is_labeled());
    let labels: Vec<_> = collection
      .images()
      .iter()
      .map(|i| (i.name.as_str(), i.label.as_deref()))
      .collect();
    assert_eq!(
      labels,
      vec![("0_fish.jpg", Some("tench")), ("281_cat.png", Some("tabby"))]
    );
  }

  #[test]
  fn test_collection_input_iterates_in_order() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "b.png");
    write_image(dir.path(), "a.png");
    let collection = ImageCollection::from_directory(dir.path(), None, false).unwrap();
    let input = ImageCollectionInput::<224, 224>::from_collection(collection);
    let names: Vec<_> = input
      .into_nchw()
      .map(|s| s.unwrap().name)
      .collect();
    assert_eq!(names, vec!["a.png", "b.png"]);
  }
}
