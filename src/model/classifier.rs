// 该文件是 Linzhi （林芝） 项目的一部分。
// src/model/classifier.rs - 图像分类模型
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

use std::{marker::PhantomData, sync::Mutex, time::Instant};

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl,
  details::{ModelDetails, ModelInputType},
  engine::{Engine, EngineError, EngineWrapper},
  frame::ResNetFrame,
  input::AsNchwTensor,
  model::{Model, ModelType, catalog},
  url_path,
};

#[derive(Error, Debug)]
pub enum ClassifierError {
  #[error("推理引擎错误: {0}")]
  Engine(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("推理引擎在上一次推理中崩溃")]
  Poisoned,
}

/// 一个已加载的分类模型，推理在引擎锁内串行执行
pub struct Classifier<E, Frame = ResNetFrame> {
  name: String,
  model_type: ModelType,
  input_type: ModelInputType,
  engine: Mutex<E>,
  _phantom: PhantomData<Frame>,
}

impl<E: Engine, Frame: AsNchwTensor> Classifier<E, Frame> {
  pub fn new(name: impl Into<String>, model_type: ModelType, engine: E) -> Self {
    Classifier {
      name: name.into(),
      model_type,
      input_type: ModelInputType::default(),
      engine: Mutex::new(engine),
      _phantom: PhantomData,
    }
  }

  pub fn with_input_type(mut self, input_type: ModelInputType) -> Self {
    self.input_type = input_type;
    self
  }

  pub fn input_type(&self) -> ModelInputType {
    self.input_type
  }

  /// 执行一次前向推理，返回原始输出和推理耗时（纳秒），耗时只包含引擎调用
  pub fn forward(&self, frame: &Frame) -> Result<(Vec<f32>, u64), ClassifierError> {
    let mut engine = self.engine.lock().map_err(|_| ClassifierError::Poisoned)?;
    let shape = frame.shape();
    let start = Instant::now();
    let output = engine
      .forward(frame.as_nchw(), &shape)
      .map_err(|e| ClassifierError::Engine(Box::new(e)))?;
    let elapsed = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
    debug!("前向推理完成，输出长度 {}, 耗时 {} ns", output.len(), elapsed);
    Ok((output, elapsed))
  }

  /// 以 `details` 为基础推理一帧，返回更新后的副本
  pub fn run(&self, frame: &Frame, details: &ModelDetails) -> Result<ModelDetails, ClassifierError> {
    let mut updated = details.clone();
    let result = self.infer(frame)?;
    updated.update(&result);
    Ok(updated)
  }

  /// 释放模型句柄
  pub fn unload(self) {
    info!("卸载模型: {}", self.name);
  }
}

impl<E: Engine, Frame: AsNchwTensor> Model for Classifier<E, Frame> {
  type Input = Frame;
  type Output = ModelDetails;
  type Error = ClassifierError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let (output, elapsed) = self.forward(input)?;
    let results = self.model_type.output_transform().apply(&output);

    let mut details = ModelDetails::new(self.input_type);
    details.set_results(results);
    details.set_latency_nanos(Some(elapsed));
    Ok(details)
  }

  fn name(&self) -> &str {
    &self.name
  }
}

impl<Frame: AsNchwTensor> FromUrl for Classifier<EngineWrapper, Frame> {
  type Error = EngineError;

  /// 根据模型 URL 选择引擎，并从模型目录中查找显示名称
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let path = url_path(url);
    let name = catalog::model_name(&path);
    let model_type = catalog::find_by_path(&path)
      .map(|asset| asset.model_type)
      .unwrap_or(ModelType::Resnet50v15);
    let engine = EngineWrapper::from_url(url)?;
    info!("模型 {} 已加载", name);
    Ok(Classifier::new(name, model_type, engine))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::details::ClassificationResult;

  #[derive(Debug, Error)]
  #[error("fake engine failure")]
  struct FakeError;

  struct FakeEngine {
    output: Vec<f32>,
    fail: bool,
  }

  impl Engine for FakeEngine {
    type Error = FakeError;

    fn forward(&mut self, input: &[f32], shape: &[usize; 4]) -> Result<Vec<f32>, Self::Error> {
      assert_eq!(input.len(), shape.iter().product::<usize>());
      if self.fail {
        return Err(FakeError);
      }
      Ok(self.output.clone())
    }
  }

  fn classifier(output: Vec<f32>, fail: bool) -> Classifier<FakeEngine> {
    Classifier::new(
      "fake",
      ModelType::Resnet50v15,
      FakeEngine { output, fail },
    )
    .with_input_type(ModelInputType::Image)
  }

  #[test]
  fn test_infer_ranks_softmax_results() {
    let mut output = vec![0.0f32; 1000];
    output[281] = 10.0;
    output[0] = 5.0;
    let model = classifier(output, false);
    let details = model.infer(&ResNetFrame::default()).unwrap();

    assert_eq!(details.input_type(), ModelInputType::Image);
    assert_eq!(details.results().len(), 1000);
    assert_eq!(details.results()[0].label, "tabby");
    assert_eq!(details.results()[1].label, "tench");
    let sum: f32 = details.results().iter().map(|r| r.confidence).sum();
    assert!((sum - 1.0).abs() < 1e-3);
    assert!(details.latency_nanos().is_some());
  }

  #[test]
  fn test_run_updates_copy() {
    let model = classifier(vec![1.0, 2.0], false);
    let mut previous = ModelDetails::new(ModelInputType::Photo);
    previous.set_results(vec![ClassificationResult::new("old", 1.0)]);
    let updated = model.run(&ResNetFrame::default(), &previous).unwrap();
    assert_eq!(previous.results()[0].label, "old");
    assert_eq!(updated.results()[0].label, "goldfish");
    assert_eq!(updated.input_type(), ModelInputType::Photo);
    assert!(updated.latency_nanos().is_some());
  }

  #[test]
  fn test_engine_failure() {
    let model = classifier(vec![], true);
    assert!(matches!(
      model.infer(&ResNetFrame::default()),
      Err(ClassifierError::Engine(_))
    ));
    model.unload();
  }
}
