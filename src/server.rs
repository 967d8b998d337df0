// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/server.rs - HTTP 接口
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

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
  http::StatusCode,
  response::{Html, IntoResponse, Response},
  routing::get,
};
use tracing::{error, info, warn};

use crate::{
  analyzer::{AnalyzeError, Analyzer},
  response::AnalysisResponse,
};

pub const DEFAULT_BODY_LIMIT: usize = 16 * 1024 * 1024;
const IMAGE_FIELD: &str = "image";
const INDEX_HTML: &str = include_str!("../assets/index.html");

impl IntoResponse for AnalyzeError {
  fn into_response(self) -> Response {
    let status = StatusCode::from_u16(self.kind().status_code())
      .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(self.to_response())).into_response()
  }
}

pub fn router(analyzer: Arc<Analyzer>, body_limit: usize) -> Router {
  Router::new()
    .route("/", get(index_handler).post(upload_handler))
    .route("/health", get(health_handler))
    .layer(DefaultBodyLimit::max(body_limit))
    .with_state(analyzer)
}

async fn index_handler() -> Html<&'static str> {
  Html(INDEX_HTML)
}

async fn health_handler() -> &'static str {
  "ok"
}

async fn upload_handler(
  State(analyzer): State<Arc<Analyzer>>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResponse>, AnalyzeError> {
  let mut multipart = multipart.map_err(|e| {
    warn!("请求不是有效的 multipart 表单: {}", e);
    AnalyzeError::BadInput("No image uploaded".to_string())
  })?;

  let bytes = read_image_field(&mut multipart).await?;
  info!("收到上传图像: {} 字节", bytes.len());

  // 推理为 CPU 密集型任务
  let result = tokio::task::spawn_blocking(move || analyzer.analyze(&bytes))
    .await
    .map_err(|e| {
      error!("分析任务异常退出: {}", e);
      AnalyzeError::InternalFailure(e.to_string())
    })?;

  match result {
    Ok(response) => Ok(Json(response)),
    Err(e) => {
      warn!("请求处理失败: {}", e);
      Err(e)
    }
  }
}

async fn read_image_field(multipart: &mut Multipart) -> Result<Vec<u8>, AnalyzeError> {
  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| AnalyzeError::BadInput(format!("Multipart error: {}", e)))?
  {
    if field.name() == Some(IMAGE_FIELD) {
      let data = field
        .bytes()
        .await
        .map_err(|e| AnalyzeError::BadInput(format!("Failed to read image: {}", e)))?;
      return Ok(data.to_vec());
    }
  }

  Err(AnalyzeError::BadInput("No image uploaded".to_string()))
}
