// 该文件是 Linzhi （林芝） 项目的一部分。
// src/bin/simple_continueshot.rs - 连续图像分类
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

use std::{thread, time::Duration};

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
  state::Cancellation,
  task::{ContinuousTask, Task},
};
use tracing::{info, warn};

/// Linzhi 连续图像分类
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型文件
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 collection:///images
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,
  /// 处理的帧数，缺省时处理全部输入
  #[arg(long, value_name = "N")]
  pub frame_number: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let cancellation = Cancellation::new();
  let handler_cancellation = cancellation.clone();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    handler_cancellation.cancel();
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;

  let input = InputWrapper::<224, 224>::from_url(&args.input)?;
  let model: Classifier<EngineWrapper> =
    Classifier::from_url(&args.model)?.with_input_type(ModelInputType::Video);
  let output = OutputWrapper::from_url(&args.output)?;

  let frames = ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .with_cancellation(cancellation)
    .run_task(input.into_nchw(), &model, output)?;
  info!("共处理 {} 帧", frames);
  model.unload();

  Ok(())
}
