// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图像识别
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use kunchong::{
  FromUrl,
  analyzer::Analyzer,
  input::ImageFileInput,
  metadata::MetadataSource,
  model::ModelWrapper,
  output::{OutputWrapper, draw::Draw},
  reduce::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_OVERLAP_THRESHOLD, ReduceConfig},
  task::{OneShotTask, Task},
};
use tracing::info;

/// Kunchong 单张图像识别
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 image:///data/bee.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，例如 image:///data/bee-annotated.jpg
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 物种信息 JSON 文件
  #[arg(long, default_value = "species_info.json", value_name = "FILE")]
  pub metadata: PathBuf,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,
  /// 重叠 IoU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_OVERLAP_THRESHOLD, value_name = "THRESHOLD")]
  pub overlap: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型地址: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = ImageFileInput::from_url(&args.input)?;
  let model = ModelWrapper::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let analyzer = Analyzer::new(
    Box::new(model),
    Draw::new()?,
    MetadataSource::File(args.metadata),
  )
  .config(ReduceConfig {
    confidence_threshold: args.confidence,
    overlap_threshold: args.overlap,
  });

  let mut response = OneShotTask::default().run_task(input, &analyzer, output)?;
  // 标注图像已写入输出，不再打印 base64 内容
  response.image.clear();
  println!("{}", serde_json::to_string_pretty(&response)?);

  Ok(())
}
