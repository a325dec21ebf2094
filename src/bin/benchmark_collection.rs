// 该文件是 Linzhi （林芝） 项目的一部分。
// src/bin/benchmark_collection.rs - 图像集合基准测试
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

use std::{sync::Arc, thread, time::Duration};

use anyhow::Result;
use clap::Parser;
use url::Url;

use linzhi::{
  FromUrl,
  benchmark::BenchmarkRegistry,
  details::ModelInputType,
  engine::EngineWrapper,
  input::{InputWrapper, SampleSource},
  model::Classifier,
  output::{OutputWrapper, ReportOutput},
  state::{ActiveModel, Cancellation, RunGuard, presentation},
  task::{BenchmarkTask, DEFAULT_WARMUP, Task},
};
use tracing::{info, warn};

/// Linzhi 图像集合基准测试
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型文件，缺省时不运行
  #[arg(long, value_name = "MODEL")]
  pub model: Option<Url>,
  /// 图像集合，例如 collection:///images?labeled
  #[arg(long, value_name = "COLLECTION")]
  pub input: Option<Url>,
  /// 每张图像的结果输出
  #[arg(long, value_name = "OUTPUT", default_value = "log://?top=1")]
  pub output: Url,
  /// 报告输出，例如 report:///tmp/reports
  #[arg(long, value_name = "REPORT")]
  pub report: Option<Url>,
  /// 预热次数
  #[arg(long, default_value_t = DEFAULT_WARMUP)]
  pub warmup: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let cancellation = Cancellation::new();
  let handler_cancellation = cancellation.clone();
  ctrlc::set_handler(move || {
    info!("收到中断信号，取消基准测试...");
    handler_cancellation.cancel();
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;

  let active = ActiveModel::default();
  if let Some(url) = &args.model {
    info!("模型文件路径: {}", url);
    let model: Classifier<EngineWrapper> =
      Classifier::from_url(url)?.with_input_type(ModelInputType::Image);
    active.replace(model);
  }
  let input = match &args.input {
    Some(url) => {
      info!("图像集合: {}", url);
      Some(InputWrapper::<224, 224>::from_url(url)?)
    }
    None => None,
  };
  let collection = input.as_ref().map(|i| i.name().to_string());
  let output = OutputWrapper::from_url(&args.output)?;

  let guard = RunGuard::new();
  let mut registry = BenchmarkRegistry::new();
  let state = BenchmarkTask::new(&guard, &mut registry)
    .with_warmup(args.warmup)
    .with_cancellation(cancellation)
    .run_task(input, active.snapshot(), output)?;

  let view = presentation(state, ModelInputType::Image);
  info!("基准测试结束: {}", view.message);

  if let (Some(url), Some(collection)) = (&args.report, collection) {
    let report = registry.report(&collection);
    if report.is_empty() {
      warn!("没有可写入的报告");
    } else {
      ReportOutput::from_url(url)?.write(&report)?;
    }
  }
  if let Some(model) = active.clear().and_then(Arc::into_inner) {
    model.unload();
  }

  Ok(())
}
