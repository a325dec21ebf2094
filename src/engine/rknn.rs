// 该文件是 Linzhi （林芝） 项目的一部分。
// src/engine/rknn.rs - RKNN NPU 推理引擎
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

use rknpu::{Context, InitFlags, TensorType};
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  engine::{Engine, EngineError},
  url_path,
};

const RKNN_NUM_INPUTS: u32 = 1;

impl From<rknpu::Error> for EngineError {
  fn from(err: rknpu::Error) -> Self {
    EngineError::Backend(err.to_string())
  }
}

pub struct RknnEngineBuilder {
  model_path: PathBuf,
  flags: InitFlags,
}

impl FromUrlWithScheme for RknnEngineBuilder {
  const SCHEME: &'static str = "rknn";
}

impl FromUrl for RknnEngineBuilder {
  type Error = EngineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(EngineError::SchemeMismatch);
    }

    Ok(RknnEngineBuilder {
      model_path: PathBuf::from(url_path(url)),
      flags: InitFlags::default(),
    })
  }
}

impl RknnEngineBuilder {
  pub fn build(self) -> Result<RknnEngine, EngineError> {
    if !self.model_path.is_file() {
      return Err(EngineError::NotFound(self.model_path));
    }

    info!("加载模型文件: {}", self.model_path.display());
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文");
    let context = Context::new(&model_data, self.flags)
      .map_err(|e| EngineError::CorruptArtifact(format!("{}: {}", self.model_path.display(), e)))?;

    match context.sdk_version() {
      Ok(version) => {
        if let Ok(api_ver) = version.api_version() {
          debug!("模型 API 版本: {}", api_ver);
        }
        if let Ok(drv_ver) = version.driver_version() {
          debug!("模型驱动版本: {}", drv_ver);
        }
      }
      Err(e) => {
        error!("查询 SDK 版本失败: {}", e);
        return Err(EngineError::CorruptArtifact(format!("无法查询 SDK 版本: {}", e)));
      }
    }

    let num_inputs = context.num_inputs()?;
    let num_outputs = context.num_outputs()?;
    if num_inputs != RKNN_NUM_INPUTS {
      error!(
        "预期模型输入数量为 {}, 实际为 {}",
        RKNN_NUM_INPUTS, num_inputs
      );
      return Err(EngineError::CorruptArtifact(format!(
        "预期模型输入数量为 {}, 实际为 {}",
        RKNN_NUM_INPUTS, num_inputs
      )));
    }
    debug!("模型输入数量: {}, 输出数量: {}", num_inputs, num_outputs);
    info!("模型加载完成");

    Ok(RknnEngine { context })
  }
}

pub struct RknnEngine {
  context: Context,
}

impl Engine for RknnEngine {
  type Error = EngineError;

  fn forward(&mut self, input: &[f32], shape: &[usize; 4]) -> Result<Vec<f32>, Self::Error> {
    debug!("设置模型输入: {:?}", shape);
    let bytes: Vec<u8> = input.iter().flat_map(|v| v.to_ne_bytes()).collect();
    self
      .context
      .set_input(0, &bytes, rknpu::TensorFormat::NCHW, TensorType::Float32)?;

    debug!("执行模型推理");
    self.context.run()?;

    let output = self.context.get_outputs()?;
    let data = output.get_f32(0)?;
    Ok(data.to_vec())
  }
}
