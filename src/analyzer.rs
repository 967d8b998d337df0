// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/analyzer.rs - 单张图像的完整处理流程
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
use tracing::{debug, info, warn};

use crate::{
  input::{self, DEFAULT_MAX_SIDE, InputError},
  metadata::{MetadataError, MetadataSource},
  model::{Model, ModelError},
  output::{
    draw::Draw,
    encode::{EncodeError, encode_jpeg_base64},
  },
  reduce::{ReduceConfig, reduce},
  response::{AnalysisResponse, ErrorKind, ErrorResponse},
  summary::summarize,
};

#[derive(Error, Debug)]
pub enum AnalyzeError {
  #[error("Invalid input: {0}")]
  BadInput(String),
  #[error("Server out of memory. Try a smaller image or contact admin. ({0})")]
  ResourceExhausted(String),
  #[error("Model inference error: {0}")]
  InferenceFailure(String),
  #[error("Internal error: {0}")]
  InternalFailure(String),
}

impl AnalyzeError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      AnalyzeError::BadInput(_) => ErrorKind::BadRequest,
      AnalyzeError::ResourceExhausted(_) => ErrorKind::ServerOverloaded,
      AnalyzeError::InferenceFailure(_) => ErrorKind::ProcessingFailed,
      AnalyzeError::InternalFailure(_) => ErrorKind::Internal,
    }
  }

  pub fn to_response(&self) -> ErrorResponse {
    ErrorResponse {
      error: self.to_string(),
      kind: self.kind(),
    }
  }
}

impl From<InputError> for AnalyzeError {
  fn from(err: InputError) -> Self {
    AnalyzeError::BadInput(err.to_string())
  }
}

impl From<ModelError> for AnalyzeError {
  fn from(err: ModelError) -> Self {
    match err {
      ModelError::ResourceExhausted(msg) => AnalyzeError::ResourceExhausted(msg),
      ModelError::InferenceFailure(msg) => AnalyzeError::InferenceFailure(msg),
    }
  }
}

impl From<MetadataError> for AnalyzeError {
  fn from(err: MetadataError) -> Self {
    AnalyzeError::InternalFailure(format!("species metadata: {}", err))
  }
}

impl From<EncodeError> for AnalyzeError {
  fn from(err: EncodeError) -> Self {
    AnalyzeError::InternalFailure(err.to_string())
  }
}

/// 一次分析的结果：响应与标注后的图像
pub struct Analysis {
  pub response: AnalysisResponse,
  pub annotated: RgbImage,
}

pub struct Analyzer {
  model: Box<dyn Model>,
  draw: Draw,
  metadata: MetadataSource,
  config: ReduceConfig,
  max_side: u32,
}

impl Analyzer {
  pub fn new(model: Box<dyn Model>, draw: Draw, metadata: MetadataSource) -> Self {
    Self {
      model,
      draw,
      metadata,
      config: ReduceConfig::default(),
      max_side: DEFAULT_MAX_SIDE,
    }
  }

  pub fn config(mut self, config: ReduceConfig) -> Self {
    self.config = config;
    self
  }

  pub fn max_side(mut self, max_side: u32) -> Self {
    self.max_side = max_side;
    self
  }

  /// 解码上传的图像并完成分析
  pub fn analyze(&self, bytes: &[u8]) -> Result<AnalysisResponse, AnalyzeError> {
    let image = input::decode_image(bytes, self.max_side)?;
    Ok(self.analyze_image(&image)?.response)
  }

  pub fn analyze_image(&self, image: &RgbImage) -> Result<Analysis, AnalyzeError> {
    let now = std::time::Instant::now();
    let inference = self.model.infer(image).inspect_err(|e| {
      warn!("推理失败: {}", e);
    })?;
    debug!(
      "推理完成, 原始检测数量: {}, 耗时: {:.2?}",
      inference.detections.len(),
      now.elapsed()
    );

    let retained = reduce(&inference.detections, &self.config);
    let metadata = self.metadata.load()?;
    let summary = summarize(&retained, &inference.class_names, &metadata);

    let annotated = self.draw.annotate(image, &summary.detections);
    let encoded = encode_jpeg_base64(&annotated)?;

    if summary.is_empty() {
      warn!("未检测到目标");
    } else {
      info!(
        "检测到 {} 个目标: {:?}, 总耗时: {:.2?}",
        summary.detections.len(),
        summary.counts,
        now.elapsed()
      );
    }

    Ok(Analysis {
      response: AnalysisResponse::new(summary, encoded),
      annotated,
    })
  }
}
