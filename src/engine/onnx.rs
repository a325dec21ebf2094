// 该文件是 Linzhi （林芝） 项目的一部分。
// src/engine/onnx.rs - ONNX Runtime 推理引擎
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

use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::TensorRef,
};
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  engine::{Engine, EngineError},
  url_path,
};

const DEFAULT_INTRA_THREADS: usize = 4;

impl From<ort::Error> for EngineError {
  fn from(err: ort::Error) -> Self {
    EngineError::Backend(err.to_string())
  }
}

pub struct OnnxEngineBuilder {
  model_path: PathBuf,
  threads: usize,
}

impl FromUrlWithScheme for OnnxEngineBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxEngineBuilder {
  type Error = EngineError;

  /// `onnx:///path/model.onnx?threads=2`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(EngineError::SchemeMismatch);
    }

    let threads = url
      .query_pairs()
      .find(|(k, _)| k == "threads")
      .and_then(|(_, v)| v.parse().ok())
      .unwrap_or(DEFAULT_INTRA_THREADS);

    Ok(OnnxEngineBuilder {
      model_path: PathBuf::from(url_path(url)),
      threads,
    })
  }
}

impl OnnxEngineBuilder {
  pub fn build(self) -> Result<OnnxEngine, EngineError> {
    if !self.model_path.is_file() {
      return Err(EngineError::NotFound(self.model_path));
    }

    info!("加载模型文件: {}", self.model_path.display());
    let size = std::fs::metadata(&self.model_path)?.len();
    debug!("模型文件大小: {:.2} MB", size as f64 / (1024.0 * 1024.0));

    let session = Session::builder()?
      .with_optimization_level(GraphOptimizationLevel::Level3)?
      .with_intra_threads(self.threads)?
      .commit_from_file(&self.model_path)
      .map_err(|e| EngineError::CorruptArtifact(format!("{}: {}", self.model_path.display(), e)))?;

    let input_name = session
      .inputs
      .first()
      .map(|input| input.name.clone())
      .ok_or_else(|| EngineError::CorruptArtifact("模型没有输入".to_string()))?;
    for (i, input) in session.inputs.iter().enumerate() {
      debug!("模型输入 {}: {} ({:?})", i, input.name, input.input_type);
    }
    info!("模型加载完成");

    Ok(OnnxEngine {
      session,
      input_name,
    })
  }
}

pub struct OnnxEngine {
  session: Session,
  input_name: String,
}

impl Engine for OnnxEngine {
  type Error = EngineError;

  fn forward(&mut self, input: &[f32], shape: &[usize; 4]) -> Result<Vec<f32>, Self::Error> {
    // 直接借用输入数据，不复制
    let tensor = TensorRef::from_array_view((shape.to_vec(), input))?;
    let outputs = self
      .session
      .run(ort::inputs![self.input_name.as_str() => tensor])?;
    let (_, data) = outputs[0].try_extract_tensor::<f32>()?;
    Ok(data.to_vec())
  }
}
