// 该文件是 Linzhi （林芝） 项目的一部分。
// src/engine.rs - 推理引擎适配
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

use thiserror::Error;
use tracing::error;

use crate::FromUrl;

/// 推理引擎：接收一个 NCHW 浮点张量，执行一次前向推理，返回第一个输出
///
/// 模型句柄由实现者持有，随值一起释放。
pub trait Engine {
  type Error: std::error::Error + Send + Sync + 'static;

  fn forward(&mut self, input: &[f32], shape: &[usize; 4]) -> Result<Vec<f32>, Self::Error>;
}

#[derive(Error, Debug)]
pub enum EngineError {
  #[error("模型文件不存在: {0}")]
  NotFound(PathBuf),
  #[error("模型文件无效: {0}")]
  CorruptArtifact(String),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("推理引擎 {0} 未编译")]
  EngineUnavailable(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("推理引擎错误: {0}")]
  Backend(String),
}

#[cfg(feature = "rknpu_engine")]
mod rknn;
#[cfg(feature = "rknpu_engine")]
pub use self::rknn::{RknnEngine, RknnEngineBuilder};

#[cfg(feature = "ort_engine")]
mod onnx;
#[cfg(feature = "ort_engine")]
pub use self::onnx::{OnnxEngine, OnnxEngineBuilder};

/// 按模型 URL 方案选择的推理引擎
pub enum EngineWrapper {
  #[cfg(feature = "rknpu_engine")]
  Rknn(RknnEngine),
  #[cfg(feature = "ort_engine")]
  Onnx(OnnxEngine),
}

impl FromUrl for EngineWrapper {
  type Error = EngineError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "rknpu_engine")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == RknnEngineBuilder::SCHEME {
        let engine = RknnEngineBuilder::from_url(url)?.build()?;
        return Ok(EngineWrapper::Rknn(engine));
      }
    }
    #[cfg(feature = "ort_engine")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == OnnxEngineBuilder::SCHEME {
        let engine = OnnxEngineBuilder::from_url(url)?.build()?;
        return Ok(EngineWrapper::Onnx(engine));
      }
    }

    match url.scheme() {
      "rknn" | "onnx" => {
        error!("推理引擎 {} 未编译，请启用对应的 feature", url.scheme());
        Err(EngineError::EngineUnavailable(url.scheme().to_string()))
      }
      _ => Err(EngineError::SchemeMismatch),
    }
  }
}

impl Engine for EngineWrapper {
  type Error = EngineError;

  fn forward(&mut self, input: &[f32], shape: &[usize; 4]) -> Result<Vec<f32>, Self::Error> {
    match *self {
      #[cfg(feature = "rknpu_engine")]
      EngineWrapper::Rknn(ref mut engine) => engine.forward(input, shape),
      #[cfg(feature = "ort_engine")]
      EngineWrapper::Onnx(ref mut engine) => engine.forward(input, shape),
    }
  }
}
