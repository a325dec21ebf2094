// 该文件是 Linzhi （林芝） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 重复推理耗时测试
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use linzhi::{
  FromUrl,
  details::ModelInputType,
  engine::EngineWrapper,
  input::InputWrapper,
  model::Classifier,
  output::OutputWrapper,
  task::{RepeatShotTask, Task},
};
use tracing::info;

/// Linzhi 重复推理耗时测试
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型文件
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "log://?top=1")]
  pub output: Url,
  /// 推理次数
  #[arg(long, default_value_t = 1000)]
  pub repeat: usize,
  /// 不计入统计的前几次推理
  #[arg(long, default_value_t = 2)]
  pub warmup: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::<224, 224>::from_url(&args.input)?;
  let model: Classifier<EngineWrapper> =
    Classifier::from_url(&args.model)?.with_input_type(ModelInputType::Photo);
  let output = OutputWrapper::from_url(&args.output)?;

  let benchmark = RepeatShotTask::default()
    .with_repeat(args.repeat)
    .with_warmup(args.warmup)
    .run_task(input.into_nchw(), &model, output)?;
  info!("{}", serde_json::to_string_pretty(&benchmark)?);
  model.unload();

  Ok(())
}
