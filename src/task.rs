// 该文件是 Linzhi （林芝） 项目的一部分。
// src/task.rs - 推理任务
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

use std::time::Instant;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
  benchmark::{BenchmarkDetails, BenchmarkRegistry},
  details::ModelDetails,
  input::{Sample, SampleSource},
  model::Model,
  output::Render,
  state::{Cancellation, ModelState, RunGuard},
};

/// 基准测试默认的预热次数
pub const DEFAULT_WARMUP: usize = 25;
const DEFAULT_REPEAT: usize = 1000;
const DEFAULT_REPEAT_WARMUP: usize = 2;

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("没有输入帧")]
  NoInputFrame,
  #[error("已有任务正在运行")]
  AlreadyRunning,
}

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

pub struct OneShotTask;

impl<
  F,
  IE: std::error::Error + Sync + Send + 'static,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<Sample<F>, IE>>,
  M: Model<Input = F, Output = ModelDetails, Error = ME>,
  O: Render<Sample<F>, ModelDetails, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Output = ModelDetails;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let sample = input.next().ok_or(TaskError::NoInputFrame)??;
    info!("输入帧 {} 获取成功，开始推理...", sample.name);
    let result = model.infer(&sample.frame)?;
    info!("推理完成，耗时: {}", result.latency_string());
    let now = Instant::now();
    output.render_result(&sample, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(result)
  }
}

/// 对同一帧重复推理，统计耗时；前 `warmup` 次不计入统计
#[derive(Debug)]
pub struct RepeatShotTask {
  repeat: usize,
  warmup: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    RepeatShotTask {
      repeat: DEFAULT_REPEAT,
      warmup: DEFAULT_REPEAT_WARMUP,
    }
  }
}

impl RepeatShotTask {
  pub fn with_repeat(mut self, repeat: usize) -> Self {
    self.repeat = repeat;
    self
  }

  pub fn with_warmup(mut self, warmup: usize) -> Self {
    self.warmup = warmup;
    self
  }
}

impl<
  F,
  IE: std::error::Error + Sync + Send + 'static,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<Sample<F>, IE>>,
  M: Model<Input = F, Output = ModelDetails, Error = ME>,
  O: Render<Sample<F>, ModelDetails, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Output = BenchmarkDetails;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let sample = input.next().ok_or(TaskError::NoInputFrame)??;
    info!("输入帧 {} 获取成功，开始推理...", sample.name);

    let mut benchmark = BenchmarkDetails::new(sample.name.as_str(), model.name());
    for i in 0..self.repeat {
      let result = model.infer(&sample.frame)?;
      info!("({})推理完成，耗时: {}", i, result.latency_string());
      output.render_result(&sample, &result)?;
      if i >= self.warmup {
        benchmark.add_sample(&result)?;
      }
    }

    let stats = &benchmark.evaluation_time_nano;
    if stats.count > 0 {
      warn!(
        "平均推理时间: {} ns, 最短: {} ns, 最长: {} ns, 次数: {}",
        stats.average, stats.min, stats.max, stats.count
      );
    } else {
      warn!("没有计入统计的推理");
    }

    Ok(benchmark)
  }
}

/// 连续处理输入中的每一帧，直到输入结束、达到帧数或收到取消信号
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  cancellation: Cancellation,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
    self.cancellation = cancellation;
    self
  }
}

impl<
  F,
  IE: std::error::Error + Sync + Send + 'static,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<Sample<F>, IE>>,
  M: Model<Input = F, Output = ModelDetails, Error = ME>,
  O: Render<Sample<F>, ModelDetails, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Output = usize;
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");

    let mut frame_index = 0;
    let mut now = Instant::now();
    for sample in input {
      if self.cancellation.is_cancelled() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
      let sample = sample?;
      frame_index += 1;
      info!("处理第 {} 帧图像: {}", frame_index, sample.name);
      let result = model.infer(&sample.frame)?;
      let elapsed_a = now.elapsed();
      output.render_result(&sample, &result)?;
      let elapsed_b = now.elapsed();
      now = Instant::now();
      info!(
        "推理完成，耗时: {} ({:.2?} / {:.2?})",
        result.latency_string(),
        elapsed_a,
        elapsed_b
      );
      if self.frame_number.map(|n| frame_index >= n).unwrap_or(false) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
    }

    info!("任务完成，共处理 {} 帧", frame_index);
    Ok(frame_index)
  }
}

/// 在一个图像集合上对一个模型做基准测试
///
/// 没有模型或集合为空时不进入运行状态；运行时先在第一张图像上预热，
/// 再按顺序推理每张图像，结果累计到 (集合, 模型) 对应的统计中。
/// 推理、解码或输出失败都以 `Failed` 结束，已运行时返回 [`TaskError::AlreadyRunning`]。
pub struct BenchmarkTask<'a> {
  guard: &'a RunGuard,
  registry: &'a mut BenchmarkRegistry,
  cancellation: Cancellation,
  warmup: usize,
}

impl<'a> BenchmarkTask<'a> {
  pub fn new(guard: &'a RunGuard, registry: &'a mut BenchmarkRegistry) -> Self {
    BenchmarkTask {
      guard,
      registry,
      cancellation: Cancellation::default(),
      warmup: DEFAULT_WARMUP,
    }
  }

  pub fn with_warmup(mut self, warmup: usize) -> Self {
    self.warmup = warmup;
    self
  }

  pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
    self.cancellation = cancellation;
    self
  }

  fn finish_early(&self, state: ModelState) -> Result<ModelState, anyhow::Error> {
    if self.guard.reject(state) {
      warn!("基准测试未开始: {:?}", state);
      Ok(state)
    } else {
      Err(TaskError::AlreadyRunning.into())
    }
  }

  fn run_samples<F, S, M, O>(&mut self, source: &S, model: &M, output: &O) -> ModelState
  where
    S: SampleSource<F>,
    S::Error: std::fmt::Display,
    M: Model<Input = F, Output = ModelDetails>,
    M::Error: std::fmt::Display,
    O: Render<Sample<F>, ModelDetails>,
    O::Error: std::fmt::Display,
  {
    let first = match source.sample(0) {
      Ok(sample) => sample,
      Err(e) => {
        error!("读取第一张图像失败: {}", e);
        return ModelState::Failed;
      }
    };

    info!("预热 {} 次: {}", self.warmup, first.name);
    for _ in 0..self.warmup {
      if self.cancellation.is_cancelled() {
        return ModelState::Cancelled;
      }
      if let Err(e) = model.infer(&first.frame) {
        error!("预热推理失败: {}", e);
        return ModelState::Failed;
      }
    }

    let labeled = source.is_labeled();
    let total = source.len();
    let details = self.registry.entry(source.name(), model.name());
    for index in 0..total {
      if self.cancellation.is_cancelled() {
        warn!("基准测试被取消，已完成 {}/{}", index, total);
        return ModelState::Cancelled;
      }

      let sample = match source.sample(index) {
        Ok(sample) => sample,
        Err(e) => {
          error!("读取第 {} 张图像失败: {}", index, e);
          return ModelState::Failed;
        }
      };
      let result = match model.infer(&sample.frame) {
        Ok(result) => result,
        Err(e) => {
          error!("推理 {} 失败: {}", sample.name, e);
          return ModelState::Failed;
        }
      };

      let folded = match (labeled, sample.label.as_deref()) {
        (true, Some(label)) => details.add_labeled_sample(&result, label),
        _ => details.add_sample(&result),
      };
      if let Err(e) = folded {
        error!("统计 {} 失败: {}", sample.name, e);
        return ModelState::Failed;
      }
      if let Err(e) = output.render_result(&sample, &result) {
        error!("输出 {} 失败: {}", sample.name, e);
        return ModelState::Failed;
      }
      info!(
        "({}/{}) {}: {}",
        index + 1,
        total,
        sample.name,
        result.latency_string()
      );
    }

    ModelState::Success
  }
}

impl<'a, F, S, M, O> Task<Option<S>, Option<M>, O> for BenchmarkTask<'a>
where
  S: SampleSource<F>,
  S::Error: std::fmt::Display,
  M: Model<Input = F, Output = ModelDetails>,
  M::Error: std::fmt::Display,
  O: Render<Sample<F>, ModelDetails>,
  O::Error: std::fmt::Display,
{
  type Output = ModelState;
  type Error = anyhow::Error;

  fn run_task(
    mut self,
    input: Option<S>,
    model: Option<M>,
    output: O,
  ) -> Result<Self::Output, Self::Error> {
    let Some(model) = model else {
      return self.finish_early(ModelState::NoModelSelected);
    };
    let source = match input {
      Some(source) if !source.is_empty() => source,
      _ => return self.finish_early(ModelState::NoDataSelected),
    };

    let guard = self.guard;
    let permit = guard.try_start().ok_or(TaskError::AlreadyRunning)?;
    self.cancellation.reset();
    info!(
      "开始基准测试: 集合 {} ({} 张), 模型 {}",
      source.name(),
      source.len(),
      model.name()
    );
    let state = self.run_samples(&source, &model, &output);
    Ok(permit.finish(state))
  }
}
