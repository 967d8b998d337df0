// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/bin/serve.rs - 昆虫识别 HTTP 服务
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

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use url::Url;

use kunchong::{
  FromUrl,
  analyzer::Analyzer,
  input::DEFAULT_MAX_SIDE,
  metadata::MetadataSource,
  model::ModelWrapper,
  output::draw::Draw,
  reduce::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_OVERLAP_THRESHOLD, ReduceConfig},
  server::{DEFAULT_BODY_LIMIT, router},
};
use tracing::info;

/// Kunchong 服务参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址，例如 yolo26:///models/insects.rknn?labels=/models/labels.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 物种信息 JSON 文件
  #[arg(long, default_value = "species_info.json", value_name = "FILE")]
  pub metadata: PathBuf,
  /// 监听地址
  #[arg(long, default_value = "127.0.0.1:5000", value_name = "ADDR")]
  pub bind: SocketAddr,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,
  /// 重叠 IoU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_OVERLAP_THRESHOLD, value_name = "THRESHOLD")]
  pub overlap: f32,
  /// 图像最长边上限
  #[arg(long, default_value_t = DEFAULT_MAX_SIDE, value_name = "PIXELS")]
  pub max_side: u32,
  /// 请求体大小上限（字节）
  #[arg(long, default_value_t = DEFAULT_BODY_LIMIT, value_name = "BYTES")]
  pub body_limit: usize,
  /// 标注字体文件，默认使用内嵌字体
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型地址: {}", args.model);
  info!("物种信息: {}", args.metadata.display());
  info!("置信度阈值: {}, 重叠阈值: {}", args.confidence, args.overlap);

  let model = ModelWrapper::from_url(&args.model)?;
  let draw = match &args.font {
    Some(path) => Draw::with_font_file(path)?,
    None => Draw::new()?,
  };

  let analyzer = Analyzer::new(
    Box::new(model),
    draw,
    MetadataSource::File(args.metadata.clone()),
  )
  .config(ReduceConfig {
    confidence_threshold: args.confidence,
    overlap_threshold: args.overlap,
  })
  .max_side(args.max_side);

  let app = router(Arc::new(analyzer), args.body_limit);
  let listener = tokio::net::TcpListener::bind(args.bind).await?;
  info!("服务已启动: http://{}", listener.local_addr()?);

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!("收到中断信号，准备退出...");
    })
    .await?;

  Ok(())
}
