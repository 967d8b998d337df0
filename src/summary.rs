// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/summary.rs - 计数汇总与物种信息关联
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

use crate::{
  detection::{BBox, ClassNameTable, Detection},
  metadata::SpeciesMetadata,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledDetection {
  pub name: String,
  pub class_id: u32,
  pub confidence: f32,
  pub bbox: BBox,
}

impl LabeledDetection {
  /// 标注文本，例如 `bee (0.93)`
  pub fn label(&self) -> String {
    format!("{} ({:.2})", self.name, self.confidence)
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
  pub counts: BTreeMap<String, usize>,
  /// 按首次保留的顺序排列的物种名称
  pub names: Vec<String>,
  pub details: BTreeMap<String, Value>,
  pub detections: Vec<LabeledDetection>,
}

impl Summary {
  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }
}

pub fn summarize(
  retained: &[Detection],
  class_names: &ClassNameTable,
  metadata: &SpeciesMetadata,
) -> Summary {
  let mut summary = Summary::default();

  for det in retained {
    let name = class_names.name_of(det.class_id).to_string();

    let count = summary.counts.entry(name.clone()).or_insert(0);
    if *count == 0 {
      summary.names.push(name.clone());
      summary
        .details
        .insert(name.clone(), metadata.lookup(&name));
    }
    *count += 1;

    summary.detections.push(LabeledDetection {
      name,
      class_id: det.class_id,
      confidence: det.confidence,
      bbox: det.bbox,
    });
  }

  summary
}
