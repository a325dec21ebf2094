// 该文件是 Linzhi （林芝） 项目的一部分。
// src/details.rs - 推理结果与耗时
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

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 未填充位置使用的标签
pub const NONE_LABEL: &str = "None";
const NANOS_PER_MILLI: u64 = 1_000_000;
/// 小于该毫秒数时以毫秒显示，否则以秒显示
const MILLIS_DISPLAY_LIMIT: u64 = 500;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DetailsError {
  #[error("结果数量不能为负数: {0}")]
  NegativeCount(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
  pub label: String,
  pub confidence: f32,
}

impl ClassificationResult {
  pub fn new(label: impl Into<String>, confidence: f32) -> Self {
    ClassificationResult {
      label: label.into(),
      confidence,
    }
  }
}

impl Default for ClassificationResult {
  fn default() -> Self {
    ClassificationResult::new(NONE_LABEL, 0.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelInputType {
  /// 连续的照片流
  Video,
  /// 单次拍摄
  #[default]
  Photo,
  /// 集合中可替换的图像
  Image,
}

/// 某种输入类型下最近一次推理的结果和耗时
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelDetails {
  input_type: ModelInputType,
  results: Vec<ClassificationResult>,
  latency_nanos: Option<u64>,
}

impl ModelDetails {
  pub fn new(input_type: ModelInputType) -> Self {
    ModelDetails {
      input_type,
      results: Vec::new(),
      latency_nanos: None,
    }
  }

  pub fn input_type(&self) -> ModelInputType {
    self.input_type
  }

  pub fn results(&self) -> &[ClassificationResult] {
    &self.results
  }

  /// 按置信度降序排序后替换已有结果
  pub fn set_results(&mut self, mut results: Vec<ClassificationResult>) {
    results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    self.results = results;
  }

  /// 返回恰好 `count` 个结果，不足时用默认值补齐
  pub fn top(&self, count: usize) -> Vec<ClassificationResult> {
    let mut top: Vec<_> = self.results.iter().take(count).cloned().collect();
    top.resize_with(count, ClassificationResult::default);
    top
  }

  pub fn top_results(&self, count: i64) -> Result<Vec<ClassificationResult>, DetailsError> {
    if count < 0 {
      return Err(DetailsError::NegativeCount(count));
    }
    Ok(self.top(count as usize))
  }

  pub fn latency_nanos(&self) -> Option<u64> {
    self.latency_nanos
  }

  /// 设置耗时，传入 `None` 时保留原值
  pub fn set_latency_nanos(&mut self, latency: Option<u64>) {
    if let Some(latency) = latency {
      self.latency_nanos = Some(latency);
    }
  }

  pub fn latency_millis(&self) -> Option<u64> {
    self.latency_nanos.map(|n| n / NANOS_PER_MILLI)
  }

  pub fn latency_nanos_string(&self) -> String {
    match self.latency_nanos {
      Some(nanos) => format!("{} ns", nanos),
      None => "N/A".to_string(),
    }
  }

  pub fn latency_string(&self) -> String {
    match self.latency_millis() {
      Some(millis) if millis < MILLIS_DISPLAY_LIMIT => format!("{} ms", millis),
      Some(millis) => format!("{:.3} s", millis as f64 / 1000.0),
      None => "N/A".to_string(),
    }
  }

  /// 用 `other` 的结果和耗时覆盖自身，输入类型保持不变
  pub fn update(&mut self, other: &ModelDetails) {
    self.results = other.results.clone();
    self.latency_nanos = other.latency_nanos;
  }

  /// 只填充自身为空的字段
  pub fn merge(&mut self, other: &ModelDetails) {
    if self.results.is_empty() {
      self.results = other.results.clone();
    }
    if self.latency_nanos.is_none() {
      self.latency_nanos = other.latency_nanos;
    }
  }

  pub fn combine(&self, other: &ModelDetails) -> ModelDetails {
    let mut combined = self.clone();
    combined.merge(other);
    combined
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn details(results: &[(&str, f32)], latency: Option<u64>) -> ModelDetails {
    let mut d = ModelDetails::new(ModelInputType::Image);
    d.set_results(
      results
        .iter()
        .map(|(l, c)| ClassificationResult::new(*l, *c))
        .collect(),
    );
    d.set_latency_nanos(latency);
    d
  }

  #[test]
  fn test_set_results_sorts_descending() {
    let d = details(&[("a", 0.1), ("b", 0.7), ("c", 0.2)], None);
    let labels: Vec<_> = d.results().iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["b", "c", "a"]);
  }

  #[test]
  fn test_top_results_pads_with_default() {
    let d = details(&[("a", 0.6), ("b", 0.4)], None);
    let top = d.top_results(5).unwrap();
    assert_eq!(top.len(), 5);
    assert_eq!(top[0], ClassificationResult::new("a", 0.6));
    assert_eq!(top[1], ClassificationResult::new("b", 0.4));
    for r in &top[2..] {
      assert_eq!(r, &ClassificationResult::default());
      assert_eq!(r.label, "None");
    }
    assert!(d.top_results(0).unwrap().is_empty());
    assert_eq!(d.top_results(-1), Err(DetailsError::NegativeCount(-1)));
  }

  #[test]
  fn test_latency_none_is_ignored() {
    let mut d = details(&[], Some(42));
    d.set_latency_nanos(None);
    assert_eq!(d.latency_nanos(), Some(42));
  }

  #[test]
  fn test_latency_strings() {
    assert_eq!(details(&[], None).latency_string(), "N/A");
    assert_eq!(details(&[], None).latency_nanos_string(), "N/A");
    let d = details(&[], Some(12_345_678));
    assert_eq!(d.latency_millis(), Some(12));
    assert_eq!(d.latency_string(), "12 ms");
    assert_eq!(d.latency_nanos_string(), "12345678 ns");
    assert_eq!(details(&[], Some(1_500_000_000)).latency_string(), "1.500 s");
  }

  #[test]
  fn test_update_is_idempotent() {
    let other = details(&[("x", 0.9), ("y", 0.1)], Some(10));
    let mut once = details(&[("z", 0.3)], None);
    once.update(&other);
    let mut twice = once.clone();
    twice.update(&other);
    assert_eq!(once, twice);
    assert_eq!(once, other);
  }

  #[test]
  fn test_update_merge_combine() {
    let full = details(&[("x", 0.9)], Some(10));
    let empty = ModelDetails::new(ModelInputType::Image);

    let mut merged = empty.clone();
    merged.merge(&full);
    assert_eq!(merged, full);

    let mut kept = details(&[("y", 0.5)], None);
    kept.merge(&full);
    assert_eq!(kept.results()[0].label, "y");
    assert_eq!(kept.latency_nanos(), Some(10));

    let mut updated = details(&[("y", 0.5)], Some(3));
    updated.update(&empty);
    assert!(updated.results().is_empty());
    assert_eq!(updated.latency_nanos(), None);

    let combined = details(&[("y", 0.5)], None).combine(&full);
    assert_eq!(combined.results()[0].label, "y");
    assert_eq!(combined.latency_nanos(), Some(10));
  }

  #[test]
  fn test_update_keeps_input_type() {
    let mut photo = ModelDetails::new(ModelInputType::Photo);
    photo.update(&details(&[("x", 0.9)], Some(7)));
    assert_eq!(photo.input_type(), ModelInputType::Photo);
    assert_eq!(photo.results()[0].label, "x");
    assert_eq!(photo.latency_nanos(), Some(7));
  }
}
