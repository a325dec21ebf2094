// 该文件是 Linzhi （林芝） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::{
  path::PathBuf,
  sync::atomic::{AtomicU32, Ordering},
};

use chrono::{Datelike, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  details::{ClassificationResult, ModelDetails, ModelInputType},
  input::Sample,
  output::{Render, top_count},
  url_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("序列化错误: {0}")]
  SerdeError(#[from] serde_json::Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Record<'a> {
  name: &'a str,
  label: Option<&'a str>,
  input_type: ModelInputType,
  evaluation_time_nano: Option<u64>,
  results: Vec<ClassificationResult>,
}

/// 每个结果写一个 JSON 文件到 `<目录>/<年>/<月>/<日>/`
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  top: usize,
  frame_counter: AtomicU32,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(url_path(uri)),
      top: top_count(uri),
      frame_counter: AtomicU32::new(0),
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u32 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed) + 1
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.json",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl<F> Render<Sample<F>, ModelDetails> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &Sample<F>, result: &ModelDetails) -> Result<(), Self::Error> {
    let path = self.frame_path()?;
    let record = Record {
      name: &frame.name,
      label: frame.label.as_deref(),
      input_type: result.input_type(),
      evaluation_time_nano: result.latency_nanos(),
      results: result.top(self.top),
    };
    std::fs::write(&path, serde_json::to_string_pretty(&record)?)?;
    debug!("记录写入: {}", path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn collect_records(dir: &std::path::Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
      let path = entry.unwrap().path();
      if path.is_dir() {
        found.extend(collect_records(&path));
      } else {
        found.push(path);
      }
    }
    found
  }

  #[test]
  fn test_writes_dated_json_records() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}?top=2", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();

    let mut details = ModelDetails::new(ModelInputType::Image);
    details.set_results(vec![
      ClassificationResult::new("tabby", 0.8),
      ClassificationResult::new("tiger cat", 0.15),
      ClassificationResult::new("lynx", 0.05),
    ]);
    details.set_latency_nanos(Some(1234));
    let sample = Sample {
      name: "cat.png".to_string(),
      label: Some("tabby".to_string()),
      frame: (),
    };
    output.render_result(&sample, &details).unwrap();
    output.render_result(&sample, &details).unwrap();

    let records = collect_records(dir.path());
    assert_eq!(records.len(), 2);
    let text = std::fs::read_to_string(&records[0]).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["name"], "cat.png");
    assert_eq!(value["label"], "tabby");
    assert_eq!(value["inputType"], "Image");
    assert_eq!(value["evaluationTimeNano"], 1234);
    assert_eq!(value["results"].as_array().unwrap().len(), 2);
    assert_eq!(value["results"][0]["label"], "tabby");
  }
}
