// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/detection.rs - 检测结果定义
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

use serde::{Deserialize, Serialize};

const UNKNOWN_CLASS_NAME: &str = "unknown";

/// 像素坐标下的轴对齐边框 [x_min, y_min, x_max, y_max]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
  pub x1: f32,
  pub y1: f32,
  pub x2: f32,
  pub y2: f32,
}

impl From<[f32; 4]> for BBox {
  fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
    Self { x1, y1, x2, y2 }
  }
}

impl From<BBox> for [f32; 4] {
  fn from(bbox: BBox) -> Self {
    [bbox.x1, bbox.y1, bbox.x2, bbox.y2]
  }
}

impl BBox {
  pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
    Self { x1, y1, x2, y2 }
  }

  pub fn width(&self) -> f32 {
    self.x2 - self.x1
  }

  pub fn height(&self) -> f32 {
    self.y2 - self.y1
  }

  pub fn area(&self) -> f32 {
    self.width() * self.height()
  }

  /// 坐标有限且未反转（允许零面积）
  pub fn is_well_formed(&self) -> bool {
    [self.x1, self.y1, self.x2, self.y2]
      .iter()
      .all(|v| v.is_finite())
      && self.x1 <= self.x2
      && self.y1 <= self.y2
  }

  /// 交并比。并集面积不为正时返回 0，不会出现除零。
  pub fn iou(&self, other: &BBox) -> f32 {
    let x1 = self.x1.max(other.x1);
    let y1 = self.y1.max(other.y1);
    let x2 = self.x2.min(other.x2);
    let y2 = self.y2.min(other.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = self.area() + other.area() - intersection;

    if union > 0.0 {
      intersection / union
    } else {
      0.0
    }
  }

  /// 裁剪到图像范围内
  pub fn clamp_to(&self, width: f32, height: f32) -> BBox {
    BBox {
      x1: self.x1.clamp(0.0, width),
      y1: self.y1.clamp(0.0, height),
      x2: self.x2.clamp(0.0, width),
      y2: self.y2.clamp(0.0, height),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub bbox: BBox,
  pub class_id: u32,
  pub confidence: f32,
}

impl Detection {
  pub fn new(bbox: BBox, class_id: u32, confidence: f32) -> Self {
    Self {
      bbox,
      class_id,
      confidence,
    }
  }

  pub fn is_well_formed(&self) -> bool {
    !self.confidence.is_nan() && self.bbox.is_well_formed()
  }
}

/// 类别编号到名称的映射，由推理后端提供
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassNameTable {
  names: Vec<String>,
}

impl ClassNameTable {
  pub fn new(names: Vec<String>) -> Self {
    Self { names }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn get(&self, class_id: u32) -> Option<&str> {
    self.names.get(class_id as usize).map(String::as_str)
  }

  pub fn name_of(&self, class_id: u32) -> &str {
    self.get(class_id).unwrap_or(UNKNOWN_CLASS_NAME)
  }
}

impl<S: Into<String>> FromIterator<S> for ClassNameTable {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self {
      names: iter.into_iter().map(Into::into).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn iou_of_nested_boxes() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(1.0, 1.0, 10.0, 10.0);
    assert!((a.iou(&b) - 0.81).abs() < 1e-6);
    assert!((b.iou(&a) - 0.81).abs() < 1e-6);
  }

  #[test]
  fn iou_of_disjoint_boxes_is_zero() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(50.0, 50.0, 60.0, 60.0);
    assert_eq!(a.iou(&b), 0.0);
  }

  #[test]
  fn iou_of_touching_boxes_is_zero() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(10.0, 0.0, 20.0, 10.0);
    assert_eq!(a.iou(&b), 0.0);
  }

  #[test]
  fn iou_of_degenerate_boxes_is_zero() {
    let point = BBox::new(5.0, 5.0, 5.0, 5.0);
    let line = BBox::new(0.0, 5.0, 10.0, 5.0);
    assert_eq!(point.iou(&point), 0.0);
    assert_eq!(point.iou(&line), 0.0);
    assert_eq!(line.iou(&BBox::new(0.0, 0.0, 10.0, 10.0)), 0.0);
  }

  #[test]
  fn iou_with_itself_is_one() {
    let a = BBox::new(3.0, 4.0, 17.5, 9.25);
    assert_eq!(a.iou(&a), 1.0);
  }

  #[test]
  fn inverted_or_nan_boxes_are_malformed() {
    assert!(!BBox::new(10.0, 0.0, 0.0, 10.0).is_well_formed());
    assert!(!BBox::new(0.0, f32::NAN, 10.0, 10.0).is_well_formed());
    assert!(!Detection::new(BBox::new(0.0, 0.0, 1.0, 1.0), 0, f32::NAN).is_well_formed());
    assert!(BBox::new(1.0, 1.0, 1.0, 1.0).is_well_formed());
  }

  #[test]
  fn unknown_class_id_has_fallback_name() {
    let names: ClassNameTable = ["bee", "ant"].into_iter().collect();
    assert_eq!(names.name_of(1), "ant");
    assert_eq!(names.name_of(7), "unknown");
    assert_eq!(names.get(7), None);
  }

  #[test]
  fn detection_json_uses_corner_array() {
    let det: Detection =
      serde_json::from_str(r#"{"bbox":[1,2,3,4],"class_id":2,"confidence":0.5}"#).unwrap();
    assert_eq!(det.bbox, BBox::new(1.0, 2.0, 3.0, 4.0));
    assert_eq!(det.class_id, 2);
  }
}
