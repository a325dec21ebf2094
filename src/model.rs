// 该文件是 Linzhi （林芝） 项目的一部分。
// src/model.rs - 模型
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

use std::sync::Arc;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
  /// 显示名称，基准测试以此区分模型
  fn name(&self) -> &str;
}

impl<M: Model> Model for &M {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }

  fn name(&self) -> &str {
    (**self).name()
  }
}

impl<M: Model> Model for Arc<M> {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.as_ref().infer(input)
  }

  fn name(&self) -> &str {
    self.as_ref().name()
  }
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  /// 编号越界时返回 `None`
  fn try_from_label_id(id: u32) -> Option<Self>;
  fn to_label_id(&self) -> u32;
}

/// 模型结构，决定输出后处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
  Resnet50v15,
}

impl ModelType {
  pub fn output_transform(&self) -> OutputTransform {
    match self {
      ModelType::Resnet50v15 => OutputTransform::ImageNet1000AppliedSoftmax,
    }
  }
}

mod label;
pub use self::label::{IMAGENET_CLASS_COUNT, ImageNetLabel, imagenet_labels};

pub mod postprocess;
pub use self::postprocess::{OutputTransform, softmax};

pub mod catalog;
pub use self::catalog::{DEFAULT_MODEL_NAME, ModelAsset, ModelAssets};

mod classifier;
pub use self::classifier::{Classifier, ClassifierError};
