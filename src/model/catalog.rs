// 该文件是 Linzhi （林芝） 项目的一部分。
// src/model/catalog.rs - 模型文件目录
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

use tracing::{debug, info};

use crate::model::ModelType;

/// 没有选中模型时的显示名称
pub const DEFAULT_MODEL_NAME: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelAsset {
  /// 不含扩展名的文件名
  pub stem: &'static str,
  pub name: &'static str,
  pub model_type: ModelType,
  /// 文件名后面还带有 `_<soc>` 后缀
  pub soc_suffixed: bool,
}

const fn asset(stem: &'static str, name: &'static str, soc_suffixed: bool) -> ModelAsset {
  ModelAsset {
    stem,
    name,
    model_type: ModelType::Resnet50v15,
    soc_suffixed,
  }
}

pub static MODEL_ASSETS: [ModelAsset; 7] = [
  asset("resnet50v15_htp_int8", "Resnet50v1.5 (HTP, Int8)", true),
  asset("resnet50v15_htp_int16", "Resnet50v1.5 (HTP, Int16)", true),
  asset("resnet50v15_htp_int16int4", "Resnet50v1.5 (HTP, Int16Int4)", true),
  asset("resnet50v15_htp_int8int4", "Resnet50v1.5 (HTP, Int8Int4)", true),
  asset("resnet50v15_xnnpack_fp32", "Resnet50v1.5 (CPU, FP32)", false),
  asset("resnet50v15_xnnpack_int8", "Resnet50v1.5 (CPU, Int8)", false),
  asset("resnet50v15_custom_fp32", "Resnet50v1.5 (Custom, FP32)", false),
];

impl ModelAsset {
  pub fn matches_stem(&self, stem: &str) -> bool {
    if self.soc_suffixed {
      // htp_int8 不能匹配 htp_int8int4_xxx，后缀必须以下划线开头
      stem
        .strip_prefix(self.stem)
        .and_then(|rest| rest.strip_prefix('_'))
        .map(|soc| !soc.is_empty())
        .unwrap_or(false)
    } else {
      stem == self.stem
    }
  }
}

fn file_stem(path: &Path) -> Option<String> {
  path
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
}

pub fn find_by_path(path: impl AsRef<Path>) -> Option<&'static ModelAsset> {
  let stem = file_stem(path.as_ref())?;
  MODEL_ASSETS.iter().find(|asset| asset.matches_stem(&stem))
}

pub fn find_by_name(name: &str) -> Option<&'static ModelAsset> {
  MODEL_ASSETS.iter().find(|asset| asset.name == name)
}

/// 模型文件的显示名称，未知文件使用文件名
pub fn model_name(path: impl AsRef<Path>) -> String {
  let path = path.as_ref();
  if path.as_os_str() == DEFAULT_MODEL_NAME {
    return DEFAULT_MODEL_NAME.to_string();
  }
  match find_by_path(path) {
    Some(asset) => asset.name.to_string(),
    None => path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
  }
}

/// 某个目录中存在的模型文件
#[derive(Debug, Clone, Default)]
pub struct ModelAssets {
  found: Vec<(PathBuf, &'static ModelAsset)>,
}

impl ModelAssets {
  pub fn scan(directory: impl AsRef<Path>) -> std::io::Result<Self> {
    let directory = directory.as_ref();
    let mut found = Vec::new();
    for entry in std::fs::read_dir(directory)? {
      let path = entry?.path();
      if !path.is_file() {
        continue;
      }
      if let Some(asset) = find_by_path(&path) {
        debug!("发现模型文件: {} ({})", path.display(), asset.name);
        found.push((path, asset));
      }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    info!("目录 {} 中共有 {} 个模型", directory.display(), found.len());
    Ok(ModelAssets { found })
  }

  /// 显示名称列表，没有模型时只有 "None"
  pub fn names(&self) -> Vec<String> {
    if self.found.is_empty() {
      return vec![DEFAULT_MODEL_NAME.to_string()];
    }
    let mut names: Vec<String> = Vec::with_capacity(self.found.len());
    for (_, asset) in &self.found {
      if !names.iter().any(|n| n == asset.name) {
        names.push(asset.name.to_string());
      }
    }
    names
  }

  pub fn path_of(&self, name: &str) -> Option<&Path> {
    self
      .found
      .iter()
      .find(|(_, asset)| asset.name == name)
      .map(|(path, _)| path.as_path())
  }
}
