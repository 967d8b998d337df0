// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/model.rs - 推理后端
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

use image::RgbImage;
use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::{ClassNameTable, Detection},
};

/// 推理后端的输出：原始检测结果与类别名称表
#[derive(Debug, Clone, Default)]
pub struct Inference {
  pub detections: Vec<Detection>,
  pub class_names: ClassNameTable,
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("推理资源耗尽: {0}")]
  ResourceExhausted(String),
  #[error("模型推理错误: {0}")]
  InferenceFailure(String),
}

pub trait Model: Send + Sync {
  fn infer(&self, image: &RgbImage) -> Result<Inference, ModelError>;
}

/// 后端错误信息是否表示内存耗尽
pub fn is_out_of_memory(message: &str) -> bool {
  let message = message.to_lowercase();
  ["out of memory", "malloc", "alloc fail"]
    .iter()
    .any(|needle| message.contains(needle))
}

mod replay;
pub use self::replay::{ReplayModel, ReplayModelError};

#[cfg(feature = "model_yolo26")]
mod yolo26;
#[cfg(feature = "model_yolo26")]
pub use self::yolo26::{Yolo26, Yolo26Builder, Yolo26Error};

#[derive(Error, Debug)]
pub enum ModelLoadError {
  #[error("回放模型错误: {0}")]
  ReplayModelError(#[from] ReplayModelError),
  #[cfg(feature = "model_yolo26")]
  #[error("YOLO26 模型错误: {0}")]
  Yolo26Error(#[from] Yolo26Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum ModelWrapper {
  Replay(ReplayModel),
  #[cfg(feature = "model_yolo26")]
  Yolo26(Yolo26),
}

impl FromUrl for ModelWrapper {
  type Error = ModelLoadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ReplayModel::SCHEME => Ok(ModelWrapper::Replay(ReplayModel::from_url(url)?)),
      #[cfg(feature = "model_yolo26")]
      Yolo26Builder::SCHEME => Ok(ModelWrapper::Yolo26(Yolo26Builder::from_url(url)?.build()?)),
      scheme => Err(ModelLoadError::SchemeMismatch(scheme.to_string())),
    }
  }
}

impl Model for ModelWrapper {
  fn infer(&self, image: &RgbImage) -> Result<Inference, ModelError> {
    match self {
      ModelWrapper::Replay(model) => model.infer(image),
      #[cfg(feature = "model_yolo26")]
      ModelWrapper::Yolo26(model) => model.infer(image),
    }
  }
}
