// 该文件是 Linzhi （林芝） 项目的一部分。
// tests/pipeline.rs - 端到端流程测试
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

use std::path::Path;

use image::{Rgb, RgbImage};
use linzhi::{
  FromUrl,
  benchmark::BenchmarkRegistry,
  details::ModelInputType,
  engine::Engine,
  input::{InputWrapper, SampleSource},
  model::{Classifier, Model, ModelType},
  output::{OutputWrapper, ReportOutput},
  state::{ActiveModel, ModelState, RunGuard},
  task::{BenchmarkTask, OneShotTask, Task},
};

/// 根据图像红色通道的均值输出类别：偏红为 tabby (281)，否则为 tench (0)
struct ColorEngine;

#[derive(Debug, thiserror::Error)]
#[error("unreachable")]
struct ColorEngineError;

impl Engine for ColorEngine {
  type Error = ColorEngineError;

  fn forward(&mut self, input: &[f32], shape: &[usize; 4]) -> Result<Vec<f32>, Self::Error> {
    let plane = shape[2] * shape[3];
    let red: f32 = input[..plane].iter().sum::<f32>() / plane as f32;
    let mut logits = vec![0.0f32; 1001];
    if red > 0.0 {
      logits[281] = 8.0;
      logits[282] = 4.0;
    } else {
      logits[0] = 8.0;
      logits[1] = 4.0;
    }
    Ok(logits)
  }
}

fn classifier(name: &str) -> Classifier<ColorEngine> {
  Classifier::new(name, ModelType::Resnet50v15, ColorEngine).with_input_type(ModelInputType::Image)
}

fn write_image(dir: &Path, name: &str, color: [u8; 3]) {
  RgbImage::from_pixel(320, 240, Rgb(color))
    .save(dir.join(name))
    .unwrap();
}

fn scheme_url(scheme: &str, path: &Path, query: &str) -> url::Url {
  url::Url::parse(&format!("{}://{}{}", scheme, path.display(), query)).unwrap()
}

#[test]
fn classify_single_image() {
  let dir = tempfile::tempdir().unwrap();
  write_image(dir.path(), "red.png", [250, 10, 10]);

  let input =
    InputWrapper::<224, 224>::from_url(&scheme_url("image", &dir.path().join("red.png"), ""))
      .unwrap();
  let output = OutputWrapper::from_url(&url::Url::parse("log://").unwrap()).unwrap();
  let details = OneShotTask
    .run_task(input.into_nchw(), classifier("color"), output)
    .unwrap();

  let top = details.top_results(5).unwrap();
  assert_eq!(top[0].label, "tabby");
  assert_eq!(top[1].label, "tiger cat");
  assert!(top[0].confidence > 0.9);
  assert_eq!(details.results().len(), 1000);
}

#[test]
fn benchmark_labeled_collection_and_write_report() {
  let dir = tempfile::tempdir().unwrap();
  let images = dir.path().join("images");
  std::fs::create_dir(&images).unwrap();
  write_image(&images, "281_red.png", [250, 10, 10]);
  write_image(&images, "0_blue.png", [10, 10, 250]);
  write_image(&images, "282_red.png", [240, 20, 20]);
  write_image(&images, "5_blue.png", [0, 0, 200]);

  let input = InputWrapper::<224, 224>::from_url(&scheme_url(
    "collection",
    &images,
    "?labeled&name=pets",
  ))
  .unwrap();
  assert_eq!(input.name(), "pets");
  assert!(input.is_labeled());
  assert_eq!(input.len(), 4);

  let active = ActiveModel::new(Some(classifier("Resnet50v1.5 (CPU, FP32)")));
  let guard = RunGuard::new();
  let mut registry = BenchmarkRegistry::new();
  let output = OutputWrapper::from_url(&url::Url::parse("log://?top=2").unwrap()).unwrap();
  let state = BenchmarkTask::new(&guard, &mut registry)
    .with_warmup(2)
    .run_task(Some(input), active.snapshot(), output)
    .unwrap();
  assert_eq!(state, ModelState::Success);

  let details = registry.get("pets", "Resnet50v1.5 (CPU, FP32)").unwrap();
  assert_eq!(details.count(), 4);
  assert!(details.labeled);
  // 0_blue 与 281_red 排名 0 命中，282_red 排名 1 命中，5_blue 未命中
  assert!((details.top1 - 0.5).abs() < 1e-6);
  assert!((details.top5 - 0.75).abs() < 1e-6);
  assert!(details.evaluation_time_nano.min <= details.evaluation_time_nano.max);

  let report_dir = dir.path().join("reports");
  let path = ReportOutput::new(&report_dir)
    .write(&registry.report("pets"))
    .unwrap();
  let value: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
  let record = &value["Resnet50v1.5 (CPU, FP32)"];
  assert_eq!(record["collectionName"], "pets");
  assert_eq!(record["evaluationTimeNano"]["count"], 4);
  assert_eq!(record["labeled"], true);
}

#[test]
fn switching_models_keeps_in_flight_snapshot() {
  let active = ActiveModel::new(Some(classifier("first")));
  let in_flight = active.snapshot().unwrap();
  active.replace(classifier("second"));

  let frame = linzhi::frame::ResNetFrame::default();
  assert_eq!(in_flight.name(), "first");
  assert!(in_flight.infer(&frame).is_ok());
  assert_eq!(active.snapshot().unwrap().name(), "second");
}

/// 需要真实模型：LINZHI_TEST_MODEL=onnx:///path/resnet50v15_xnnpack_fp32.onnx
///
/// 设置 LINZHI_TEST_EXPECTED_TOP1 后同时校验 top-1 标签，
/// 例如先运行一次记录日志中的 top-1，再固定下来。
#[cfg(any(feature = "ort_engine", feature = "rknpu_engine"))]
#[test]
#[ignore]
fn real_model_classifies_red_image() {
  use linzhi::engine::EngineWrapper;

  let model_url = std::env::var("LINZHI_TEST_MODEL").expect("LINZHI_TEST_MODEL 未设置");
  let model: Classifier<EngineWrapper> =
    Classifier::from_url(&url::Url::parse(&model_url).unwrap()).unwrap();

  let dir = tempfile::tempdir().unwrap();
  write_image(dir.path(), "red.png", [220, 20, 20]);
  let input =
    InputWrapper::<224, 224>::from_url(&scheme_url("image", &dir.path().join("red.png"), ""))
      .unwrap();
  let output = OutputWrapper::from_url(&url::Url::parse("log://").unwrap()).unwrap();
  let details = OneShotTask.run_task(input.into_nchw(), &model, output).unwrap();

  let top = details.top_results(5).unwrap();
  let sum: f32 = details.results().iter().map(|r| r.confidence).sum();
  assert!((sum - 1.0).abs() < 1e-3);
  assert!(top[0].confidence >= top[4].confidence);
  assert!(details.latency_nanos().unwrap() > 0);
  if let Ok(expected) = std::env::var("LINZHI_TEST_EXPECTED_TOP1") {
    assert_eq!(top[0].label, expected);
  }
  model.unload();
}
