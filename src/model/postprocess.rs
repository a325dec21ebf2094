// 该文件是 Linzhi （林芝） 项目的一部分。
// src/model/postprocess.rs - 分类输出后处理
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

use tracing::debug;

use crate::{
  details::ClassificationResult,
  model::label::{IMAGENET_CLASS_COUNT, imagenet_labels},
};

/// 数值稳定的 softmax，先减去最大值
///
/// NaN 按负无穷处理。存在正无穷时，概率由所有正无穷项平分；
/// 全部为负无穷时返回均匀分布。
pub fn softmax(values: &[f32]) -> Vec<f32> {
  if values.is_empty() {
    return Vec::new();
  }
  let values: Vec<f32> = values
    .iter()
    .map(|v| if v.is_nan() { f32::NEG_INFINITY } else { *v })
    .collect();
  let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);

  if max == f32::INFINITY {
    let count = values.iter().filter(|v| **v == f32::INFINITY).count();
    debug!("softmax 输入含 {} 个正无穷", count);
    let mass = 1.0 / count as f32;
    return values
      .iter()
      .map(|v| if *v == f32::INFINITY { mass } else { 0.0 })
      .collect();
  }
  if max == f32::NEG_INFINITY {
    return vec![1.0 / values.len() as f32; values.len()];
  }

  let exps: Vec<f32> = values.iter().map(|v| (v - max).exp()).collect();
  let sum: f32 = exps.iter().sum();
  exps.into_iter().map(|v| v / sum).collect()
}

/// 原始输出到分类结果的变换
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTransform {
  /// 直接使用模型输出的分数
  ImageNet1000,
  /// 先做 softmax 再配对标签
  ImageNet1000AppliedSoftmax,
}

impl OutputTransform {
  /// 只使用前 1000 个输出，按位置配对标签，结果不排序
  pub fn apply(&self, output: &[f32]) -> Vec<ClassificationResult> {
    let used = &output[..output.len().min(IMAGENET_CLASS_COUNT)];
    if used.len() < output.len() {
      debug!("输出长度 {} 超过类别数，截断为 {}", output.len(), used.len());
    }

    let scores = match self {
      OutputTransform::ImageNet1000 => used.to_vec(),
      OutputTransform::ImageNet1000AppliedSoftmax => softmax(used),
    };

    scores
      .into_iter()
      .zip(imagenet_labels())
      .map(|(confidence, label)| ClassificationResult::new(*label, confidence))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_softmax_sums_to_one() {
    let probs = softmax(&[1.0, 2.0, 3.0, 4.0, -2.5]);
    let sum: f32 = probs.iter().sum();
    assert!((sum - 1.0).abs() < 1e-5);
    assert!(probs.iter().all(|p| 0.0 < *p && *p < 1.0));

    let probs = softmax(&[1.0, 2.0, 3.0, 1000.0]);
    assert!(probs.iter().all(|p| p.is_finite() && *p >= 0.0));
    assert!(probs[3] > 0.99);
  }

  #[test]
  fn test_softmax_of_non_finite() {
    assert_eq!(softmax(&[f32::INFINITY, 0.0, 1.0]), vec![1.0, 0.0, 0.0]);
    assert_eq!(
      softmax(&[f32::INFINITY, f32::NAN, f32::INFINITY]),
      vec![0.5, 0.0, 0.5]
    );
    assert_eq!(softmax(&[f32::NAN, 2.0]), vec![0.0, 1.0]);
    assert_eq!(
      softmax(&[f32::NEG_INFINITY, f32::NAN]),
      vec![0.5, 0.5]
    );
  }

  #[test]
  fn test_softmax_of_empty() {
    assert!(softmax(&[]).is_empty());
  }

  #[test]
  fn test_truncates_to_1000() {
    let output: Vec<f32> = (0..1001).map(|i| i as f32).collect();
    let results = OutputTransform::ImageNet1000.apply(&output);
    assert_eq!(results.len(), 1000);
    assert_eq!(results[999].label, "toilet tissue");
    assert_eq!(results[999].confidence, 999.0);
  }

  #[test]
  fn test_short_output_is_not_padded() {
    let results = OutputTransform::ImageNet1000.apply(&[0.5, 0.25]);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].label, "tench");
    assert_eq!(results[1].label, "goldfish");
  }

  #[test]
  fn test_applied_softmax() {
    let results = OutputTransform::ImageNet1000AppliedSoftmax.apply(&[0.0, 0.0]);
    assert!((results[0].confidence - 0.5).abs() < 1e-6);
    assert!(OutputTransform::ImageNet1000AppliedSoftmax.apply(&[]).is_empty());

    let results = OutputTransform::ImageNet1000AppliedSoftmax.apply(&[0.0, f32::INFINITY]);
    assert!(results.iter().all(|r| r.confidence.is_finite()));
    assert_eq!(results[1].confidence, 1.0);
  }
}
