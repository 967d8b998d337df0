// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/model/replay.rs - 回放固定检测结果的推理后端
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
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::{ClassNameTable, Detection},
  model::{Inference, Model, ModelError},
};

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 回放文件格式
#[derive(Debug, Clone, Deserialize)]
struct ReplayFile {
  class_names: ClassNameTable,
  #[serde(default)]
  detections: Vec<Detection>,
}

/// 对每张图像都返回同一组检测结果，用于演示与测试
#[derive(Debug, Clone)]
pub struct ReplayModel {
  class_names: ClassNameTable,
  detections: Vec<Detection>,
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ReplayModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayModelError::SchemeMismatch);
    }

    info!("加载回放文件: {}", url.path());
    let data = std::fs::read(url.path())?;
    let ReplayFile {
      class_names,
      detections,
    } = serde_json::from_slice(&data)?;
    debug!(
      "回放文件包含 {} 个类别, {} 个检测",
      class_names.len(),
      detections.len()
    );

    Ok(Self::new(class_names, detections))
  }
}

impl ReplayModel {
  pub fn new(class_names: ClassNameTable, detections: Vec<Detection>) -> Self {
    Self {
      class_names,
      detections,
    }
  }
}

impl Model for ReplayModel {
  fn infer(&self, image: &RgbImage) -> Result<Inference, ModelError> {
    let (w, h) = (image.width() as f32, image.height() as f32);
    let detections = self
      .detections
      .iter()
      .map(|det| Detection {
        bbox: det.bbox.clamp_to(w, h),
        ..*det
      })
      .collect();

    Ok(Inference {
      detections,
      class_names: self.class_names.clone(),
    })
  }
}
