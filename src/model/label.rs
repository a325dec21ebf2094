// 该文件是 Linzhi （林芝） 项目的一部分。
// src/model/label.rs - ImageNet 标签
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

use std::sync::LazyLock;

use crate::model::WithLabel;

/// ImageNet 类别数
pub const IMAGENET_CLASS_COUNT: usize = 1000;

static IMAGENET_LABELS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
  include_str!("../../labels/imagenet.txt")
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty())
    .collect()
});

/// 全部 ImageNet 标签，按类别编号排列
pub fn imagenet_labels() -> &'static [&'static str] {
  &IMAGENET_LABELS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageNetLabel(u32);

impl ImageNetLabel {
  pub fn from_label_str(label: &str) -> Option<Self> {
    imagenet_labels()
      .iter()
      .position(|l| *l == label)
      .map(|id| ImageNetLabel(id as u32))
  }
}

impl WithLabel for ImageNetLabel {
  fn to_label_str(&self) -> String {
    imagenet_labels()
      .get(self.0 as usize)
      .map(|label| label.to_string())
      .unwrap_or_else(|| format!("#{}", self.0))
  }

  fn try_from_label_id(id: u32) -> Option<Self> {
    ((id as usize) < imagenet_labels().len()).then_some(ImageNetLabel(id))
  }

  fn to_label_id(&self) -> u32 {
    self.0
  }
}
