// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// tests/scenarios.rs - 端到端场景测试
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

use image::{Rgb, RgbImage};
use kunchong::{
  FromUrl,
  analyzer::Analyzer,
  detection::{BBox, ClassNameTable, Detection},
  metadata::{MetadataSource, SpeciesMetadata},
  model::{Model, ModelWrapper, ReplayModel},
  output::draw::Draw,
  reduce::{ReduceConfig, reduce},
  response::NO_DETECTION_WARNING,
  summary::summarize,
};
use serde_json::json;
use url::Url;

fn class_names() -> ClassNameTable {
  ["Coccinella septempunctata", "Aphis gossypii"].into_iter().collect()
}

#[test]
fn heavily_overlapping_duplicate_is_suppressed() {
  let raw = [
    Detection::new(BBox::new(0.0, 0.0, 10.0, 10.0), 0, 0.9),
    Detection::new(BBox::new(1.0, 1.0, 10.0, 10.0), 0, 0.8),
  ];
  let retained = reduce(&raw, &ReduceConfig::default());
  assert_eq!(retained.len(), 1);
  assert_eq!(retained[0].confidence, 0.9);
}

#[test]
fn separate_insects_are_both_counted() {
  let raw = [
    Detection::new(BBox::new(0.0, 0.0, 10.0, 10.0), 0, 0.9),
    Detection::new(BBox::new(50.0, 50.0, 60.0, 60.0), 1, 0.85),
  ];
  let retained = reduce(&raw, &ReduceConfig::default());
  let summary = summarize(&retained, &class_names(), &SpeciesMetadata::default());

  assert_eq!(summary.counts.len(), 2);
  assert_eq!(summary.counts["Coccinella septempunctata"], 1);
  assert_eq!(summary.counts["Aphis gossypii"], 1);
}

#[test]
fn empty_inference_returns_original_image_with_warning() {
  let analyzer = Analyzer::new(
    Box::new(ReplayModel::new(class_names(), Vec::new())),
    Draw::new().unwrap(),
    MetadataSource::Static(SpeciesMetadata::default()),
  );
  let image = RgbImage::from_pixel(33, 17, Rgb([200, 180, 20]));
  let analysis = analyzer.analyze_image(&image).unwrap();

  assert!(analysis.response.count.is_empty());
  assert!(analysis.response.detections.is_empty());
  assert_eq!(analysis.response.warning.as_deref(), Some(NO_DETECTION_WARNING));
  assert_eq!(analysis.annotated, image);
}

#[test]
fn low_confidence_detection_never_survives() {
  let raw = [Detection::new(BBox::new(0.0, 0.0, 10.0, 10.0), 0, 0.29)];
  let config = ReduceConfig {
    confidence_threshold: 0.3,
    overlap_threshold: 1.0,
  };
  assert!(reduce(&raw, &config).is_empty());
}

#[test]
fn species_without_metadata_gets_empty_record() {
  let metadata = SpeciesMetadata::from_value(json!({
    "Coccinella septempunctata": { "diet": "aphids" }
  }))
  .unwrap();
  let retained = [Detection::new(BBox::new(0.0, 0.0, 10.0, 10.0), 1, 0.7)];
  let summary = summarize(&retained, &class_names(), &metadata);
  assert_eq!(summary.details["Aphis gossypii"], json!({}));
}

#[test]
fn replay_backend_is_selected_by_scheme() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("replay.json");
  std::fs::write(
    &path,
    r#"{ "class_names": ["bee"], "detections": [ { "bbox": [1, 1, 5, 5], "class_id": 0, "confidence": 0.5 } ] }"#,
  )
  .unwrap();

  let url = Url::parse(&format!("replay://{}", path.display())).unwrap();
  let model = ModelWrapper::from_url(&url).unwrap();
  let inference = model.infer(&RgbImage::new(8, 8)).unwrap();
  assert_eq!(inference.detections.len(), 1);
  assert_eq!(inference.class_names.name_of(0), "bee");
}
