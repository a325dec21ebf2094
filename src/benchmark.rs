// 该文件是 Linzhi （林芝） 项目的一部分。
// src/benchmark.rs - 基准测试统计
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

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::details::ModelDetails;

/// 计算 top-5 准确率时取的结果数
pub const TOP_K: usize = 5;
const REPORT_FILE_PREFIX: &str = "ImageInference_Benchmark_";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BenchmarkError {
  #[error("推理结果缺少耗时")]
  MissingLatency,
}

#[derive(Error, Debug)]
pub enum ReportError {
  #[error("序列化错误: {0}")]
  SerdeError(#[from] serde_json::Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 流式的平均值、最小值、最大值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AverageMinMax {
  pub average: i64,
  pub min: i64,
  pub max: i64,
  pub count: u64,
}

impl Default for AverageMinMax {
  fn default() -> Self {
    AverageMinMax {
      average: 0,
      min: i64::MAX,
      max: i64::MIN,
      count: 0,
    }
  }
}

impl AverageMinMax {
  pub fn add(&mut self, value: i64) {
    let n = self.count as i128;
    self.average = ((self.average as i128 * n + value as i128) / (n + 1)) as i64;
    self.min = self.min.min(value);
    self.max = self.max.max(value);
    self.count += 1;
  }
}

/// 一个 (集合, 模型) 组合的统计结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkDetails {
  pub collection_name: String,
  pub model_name: String,
  pub evaluation_time_nano: AverageMinMax,
  pub top1: f32,
  pub top5: f32,
  pub labeled: bool,
}

impl BenchmarkDetails {
  pub fn new(collection_name: impl Into<String>, model_name: impl Into<String>) -> Self {
    BenchmarkDetails {
      collection_name: collection_name.into(),
      model_name: model_name.into(),
      evaluation_time_nano: AverageMinMax::default(),
      top1: 0.0,
      top5: 0.0,
      labeled: false,
    }
  }

  pub fn count(&self) -> u64 {
    self.evaluation_time_nano.count
  }

  /// 只统计耗时
  pub fn add_sample(&mut self, details: &ModelDetails) -> Result<(), BenchmarkError> {
    let latency = details
      .latency_nanos()
      .ok_or(BenchmarkError::MissingLatency)?;
    self.evaluation_time_nano.add(i64::try_from(latency).unwrap_or(i64::MAX));
    Ok(())
  }

  /// 统计耗时以及 top-1 / top-5 准确率
  pub fn add_labeled_sample(
    &mut self,
    details: &ModelDetails,
    label: &str,
  ) -> Result<(), BenchmarkError> {
    if details.latency_nanos().is_none() {
      return Err(BenchmarkError::MissingLatency);
    }

    let top = details.top(TOP_K);
    let hit1 = if top[0].label == label { 1.0 } else { 0.0 };
    let hit5 = if top.iter().any(|r| r.label == label) {
      1.0
    } else {
      0.0
    };
    debug!("标签 {}: top1 {}, top5 {}", label, hit1, hit5);

    let n = self.count() as f32;
    self.labeled = true;
    self.top1 = (self.top1 * n + hit1) / (n + 1.0);
    self.top5 = (self.top5 * n + hit5) / (n + 1.0);
    self.add_sample(details)
  }
}

/// 以 (集合名, 模型名) 为键保存统计结果
#[derive(Debug, Clone, Default)]
pub struct BenchmarkRegistry {
  details: BTreeMap<String, BTreeMap<String, BenchmarkDetails>>,
}

impl BenchmarkRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// 取出统计结果，不存在时创建
  pub fn entry(&mut self, collection: &str, model: &str) -> &mut BenchmarkDetails {
    self
      .details
      .entry(collection.to_string())
      .or_default()
      .entry(model.to_string())
      .or_insert_with(|| BenchmarkDetails::new(collection, model))
  }

  pub fn get(&self, collection: &str, model: &str) -> Option<&BenchmarkDetails> {
    self.details.get(collection)?.get(model)
  }

  /// 某个集合下所有模型的报告
  pub fn report(&self, collection: &str) -> BenchmarkReport {
    BenchmarkReport {
      models: self.details.get(collection).cloned().unwrap_or_default(),
    }
  }
}

/// 模型名到统计结果的映射
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenchmarkReport {
  pub models: BTreeMap<String, BenchmarkDetails>,
}

impl BenchmarkReport {
  pub fn to_json(&self) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  pub fn is_empty(&self) -> bool {
    self.models.is_empty()
  }
}

/// `ImageInference_Benchmark_<yyyy-MM-dd_HH-mm>.json`
pub fn report_file_name<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
  Tz::Offset: std::fmt::Display,
{
  format!(
    "{}{}.json",
    REPORT_FILE_PREFIX,
    time.format("%Y-%m-%d_%H-%M")
  )
}
