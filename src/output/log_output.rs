// 该文件是 Linzhi （林芝） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  details::ModelDetails,
  input::Sample,
  output::{Render, top_count},
};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 把前几个分类结果写到日志
#[derive(Debug, Clone)]
pub struct LogOutput {
  top: usize,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch);
    }
    Ok(LogOutput {
      top: top_count(url),
    })
  }
}

impl<F> Render<Sample<F>, ModelDetails> for LogOutput {
  type Error = LogOutputError;

  fn render_result(&self, frame: &Sample<F>, result: &ModelDetails) -> Result<(), Self::Error> {
    match &frame.label {
      Some(label) => info!(
        "{} (标签: {}) 推理耗时: {}",
        frame.name,
        label,
        result.latency_string()
      ),
      None => info!("{} 推理耗时: {}", frame.name, result.latency_string()),
    }
    for (rank, item) in result.top(self.top).iter().enumerate() {
      info!("  #{} {}: {:.4}", rank + 1, item.label, item.confidence);
    }
    Ok(())
  }
}
