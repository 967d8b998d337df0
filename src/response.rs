// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/response.rs - 响应结构
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

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::summary::{LabeledDetection, Summary};

pub const NO_DETECTION_WARNING: &str =
  "No insects detected or model is unsure. Try another image or check image quality.";

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
  pub count: BTreeMap<String, usize>,
  pub names: Vec<String>,
  pub details: BTreeMap<String, Value>,
  pub detections: Vec<LabeledDetection>,
  /// base64 编码的 JPEG 标注图像
  pub image: String,
  pub warning: Option<String>,
}

impl AnalysisResponse {
  pub fn new(summary: Summary, image: String) -> Self {
    let warning = summary
      .is_empty()
      .then(|| NO_DETECTION_WARNING.to_string());

    Self {
      count: summary.counts,
      names: summary.names,
      details: summary.details,
      detections: summary.detections,
      image,
      warning,
    }
  }
}

/// 错误分类，用于选择 HTTP 状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  BadRequest,
  ServerOverloaded,
  ProcessingFailed,
  Internal,
}

impl ErrorKind {
  pub fn status_code(&self) -> u16 {
    match self {
      ErrorKind::BadRequest => 400,
      ErrorKind::ServerOverloaded => 503,
      ErrorKind::ProcessingFailed => 500,
      ErrorKind::Internal => 500,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
  pub error: String,
  pub kind: ErrorKind,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn empty_summary_carries_warning() {
    let response = AnalysisResponse::new(Summary::default(), String::new());
    assert_eq!(response.warning.as_deref(), Some(NO_DETECTION_WARNING));

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["count"], json!({}));
    assert_eq!(value["names"], json!([]));
  }

  #[test]
  fn error_kind_serializes_in_snake_case() {
    let response = ErrorResponse {
      error: "boom".into(),
      kind: ErrorKind::ServerOverloaded,
    };
    assert_eq!(
      serde_json::to_value(&response).unwrap(),
      json!({ "error": "boom", "kind": "server_overloaded" })
    );
  }
}
