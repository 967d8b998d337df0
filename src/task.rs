// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/task.rs - 命令行任务
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

use tracing::info;

use crate::{
  analyzer::Analyzer,
  input,
  output::Render,
  response::AnalysisResponse,
};

pub trait Task<I, O>: Sized {
  type Error;
  fn run_task(
    self,
    input: I,
    analyzer: &Analyzer,
    output: O,
  ) -> Result<AnalysisResponse, Self::Error>;
}

/// 读取一帧图像，分析并输出标注结果
#[derive(Debug, Clone, Copy)]
pub struct OneShotTask {
  max_side: u32,
}

impl Default for OneShotTask {
  fn default() -> Self {
    Self {
      max_side: input::DEFAULT_MAX_SIDE,
    }
  }
}

impl OneShotTask {
  pub fn with_max_side(mut self, max_side: u32) -> Self {
    self.max_side = max_side;
    self
  }
}

impl<
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Vec<u8>>,
  O: Render<Error = RE>,
> Task<I, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    analyzer: &Analyzer,
    output: O,
  ) -> Result<AnalysisResponse, Self::Error> {
    info!("开始任务...");
    let bytes = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    let image = input::decode_image(&bytes, self.max_side)?;
    info!("输入帧获取成功: {}x{}, 开始分析...", image.width(), image.height());

    let now = std::time::Instant::now();
    let analysis = analyzer.analyze_image(&image)?;
    info!("分析完成，耗时: {:.2?}", now.elapsed());

    output.render(&analysis.annotated)?;
    info!("渲染完成");

    Ok(analysis.response)
  }
}
