// 该文件是 Linzhi （林芝） 项目的一部分。
// src/output/report.rs - 基准测试报告输出
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

use std::path::PathBuf;

use chrono::Local;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  benchmark::{BenchmarkReport, ReportError, report_file_name},
  url_path,
};

/// 写基准测试报告：路径以 `.json` 结尾时直接写入该文件，否则在该目录下按时间命名
#[derive(Debug, Clone)]
pub struct ReportOutput {
  path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
#[error("URI 方案不匹配")]
pub struct ReportSchemeMismatch;

impl FromUrlWithScheme for ReportOutput {
  const SCHEME: &'static str = "report";
}

impl FromUrl for ReportOutput {
  type Error = ReportSchemeMismatch;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReportSchemeMismatch);
    }
    Ok(ReportOutput::new(url_path(url)))
  }
}

impl ReportOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    ReportOutput { path: path.into() }
  }

  pub fn target(&self) -> PathBuf {
    let is_file = self
      .path
      .extension()
      .map(|ext| ext.eq_ignore_ascii_case("json"))
      .unwrap_or(false);
    if is_file {
      self.path.clone()
    } else {
      self.path.join(report_file_name(&Local::now()))
    }
  }

  pub fn write(&self, report: &BenchmarkReport) -> Result<PathBuf, ReportError> {
    let target = self.target();
    if let Some(parent) = target.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)?;
      }
    }
    std::fs::write(&target, report.to_json()?)?;
    info!("基准测试报告已写入: {}", target.display());
    Ok(target)
  }
}
