// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/reduce.rs - 检测结果筛选与重叠抑制
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

use tracing::debug;

use crate::detection::Detection;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;
pub const DEFAULT_OVERLAP_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReduceConfig {
  /// 置信度阈值，低于该值的检测被丢弃
  pub confidence_threshold: f32,
  /// 两个保留检测之间允许的最大 IoU
  pub overlap_threshold: f32,
}

impl Default for ReduceConfig {
  fn default() -> Self {
    Self {
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
    }
  }
}

/// 置信度过滤。格式错误的检测（NaN 置信度、反转或非有限的边框）视为未通过。
pub fn filter_by_confidence(raw: &[Detection], threshold: f32) -> Vec<Detection> {
  raw
    .iter()
    .filter(|det| {
      if !det.is_well_formed() {
        debug!("丢弃格式错误的检测: {:?}", det);
        return false;
      }
      det.confidence >= threshold
    })
    .copied()
    .collect()
}

/// 按置信度降序排列；稳定排序，置信度相同时保持输入顺序。
pub fn sort_by_confidence_descending(mut detections: Vec<Detection>) -> Vec<Detection> {
  detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
  detections
}

/// 贪心重叠抑制，输入需已按置信度降序排列。
/// 候选与所有已保留检测的 IoU 都不超过阈值时才被保留，被抑制的检测直接丢弃。
pub fn suppress_overlaps(sorted: &[Detection], overlap_threshold: f32) -> Vec<Detection> {
  let mut retained: Vec<Detection> = Vec::with_capacity(sorted.len());

  for candidate in sorted {
    let keep = retained
      .iter()
      .all(|kept| kept.bbox.iou(&candidate.bbox) <= overlap_threshold);
    if keep {
      retained.push(*candidate);
    }
  }

  retained
}

pub fn reduce(raw: &[Detection], config: &ReduceConfig) -> Vec<Detection> {
  let filtered = filter_by_confidence(raw, config.confidence_threshold);
  debug!("置信度过滤: {} -> {}", raw.len(), filtered.len());

  let sorted = sort_by_confidence_descending(filtered);
  let retained = suppress_overlaps(&sorted, config.overlap_threshold);
  debug!("重叠抑制: {} -> {}", sorted.len(), retained.len());

  retained
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detection::BBox;
  use proptest::prelude::*;

  fn det(bbox: [f32; 4], class_id: u32, confidence: f32) -> Detection {
    Detection::new(BBox::from(bbox), class_id, confidence)
  }

  #[test]
  fn overlapping_lower_confidence_box_is_suppressed() {
    let raw = [
      det([0.0, 0.0, 10.0, 10.0], 0, 0.9),
      det([1.0, 1.0, 10.0, 10.0], 0, 0.8),
    ];
    let retained = reduce(&raw, &ReduceConfig::default());
    assert_eq!(retained, vec![raw[0]]);
  }

  #[test]
  fn disjoint_boxes_both_survive() {
    let raw = [
      det([0.0, 0.0, 10.0, 10.0], 0, 0.9),
      det([50.0, 50.0, 60.0, 60.0], 1, 0.85),
    ];
    let retained = reduce(&raw, &ReduceConfig::default());
    assert_eq!(retained, raw.to_vec());
  }

  #[test]
  fn empty_input_gives_empty_set() {
    assert!(reduce(&[], &ReduceConfig::default()).is_empty());
  }

  #[test]
  fn below_threshold_is_excluded_regardless_of_overlap() {
    let raw = [
      det([0.0, 0.0, 10.0, 10.0], 0, 0.29),
      det([100.0, 100.0, 110.0, 110.0], 0, 0.29),
    ];
    assert!(filter_by_confidence(&raw, 0.3).is_empty());
    assert!(reduce(&raw, &ReduceConfig::default()).is_empty());
  }

  #[test]
  fn threshold_is_inclusive() {
    let raw = [det([0.0, 0.0, 10.0, 10.0], 0, 0.3)];
    assert_eq!(filter_by_confidence(&raw, 0.3).len(), 1);
  }

  #[test]
  fn iou_exactly_at_threshold_is_kept() {
    // 交集 50，并集 150 -> IoU = 1/3
    let raw = [
      det([0.0, 0.0, 10.0, 10.0], 0, 0.9),
      det([5.0, 0.0, 15.0, 10.0], 0, 0.8),
    ];
    let iou = raw[0].bbox.iou(&raw[1].bbox);
    assert_eq!(suppress_overlaps(&raw, iou).len(), 2);
    assert_eq!(suppress_overlaps(&raw, iou - 1e-6).len(), 1);
  }

  #[test]
  fn suppression_ignores_class() {
    let raw = [
      det([0.0, 0.0, 10.0, 10.0], 0, 0.9),
      det([0.0, 0.0, 10.0, 10.0], 3, 0.8),
    ];
    assert_eq!(reduce(&raw, &ReduceConfig::default()).len(), 1);
  }

  #[test]
  fn ties_keep_input_order() {
    let raw = vec![
      det([0.0, 0.0, 10.0, 10.0], 0, 0.5),
      det([20.0, 0.0, 30.0, 10.0], 1, 0.7),
      det([1.0, 1.0, 10.0, 10.0], 2, 0.5),
    ];
    let sorted = sort_by_confidence_descending(raw.clone());
    assert_eq!(sorted, vec![raw[1], raw[0], raw[2]]);
    // 置信度相同时先出现的检测优先保留
    let retained = suppress_overlaps(&sorted, 0.5);
    assert_eq!(retained, vec![raw[1], raw[0]]);
  }

  #[test]
  fn malformed_detections_are_dropped() {
    let raw = [
      det([10.0, 0.0, 0.0, 10.0], 0, 0.9),
      det([0.0, 0.0, 10.0, 10.0], 0, f32::NAN),
      det([0.0, 0.0, f32::INFINITY, 10.0], 0, 0.9),
      det([0.0, 0.0, 10.0, 10.0], 1, 0.4),
    ];
    assert_eq!(reduce(&raw, &ReduceConfig::default()), vec![raw[3]]);
  }

  #[test]
  fn zero_area_boxes_never_suppress() {
    let raw = [
      det([5.0, 5.0, 5.0, 5.0], 0, 0.9),
      det([5.0, 5.0, 5.0, 5.0], 0, 0.8),
    ];
    assert_eq!(reduce(&raw, &ReduceConfig::default()).len(), 2);
  }

  fn arb_detection() -> impl Strategy<Value = Detection> {
    (0.0f32..100.0, 0.0f32..100.0, 0.0f32..50.0, 0.0f32..50.0, 0u32..4, 0.0f32..=1.0).prop_map(
      |(x, y, w, h, class_id, confidence)| det([x, y, x + w, y + h], class_id, confidence),
    )
  }

  fn arb_config() -> impl Strategy<Value = ReduceConfig> {
    (0.0f32..=1.0, 0.0f32..=1.0).prop_map(|(confidence_threshold, overlap_threshold)| {
      ReduceConfig {
        confidence_threshold,
        overlap_threshold,
      }
    })
  }

  proptest! {
    #[test]
    fn retained_is_subset_of_filtered_and_raw(
      raw in prop::collection::vec(arb_detection(), 0..24),
      config in arb_config(),
    ) {
      let filtered = filter_by_confidence(&raw, config.confidence_threshold);
      let retained = reduce(&raw, &config);
      prop_assert!(retained.len() <= filtered.len());
      for r in &retained {
        prop_assert!(filtered.contains(r));
        prop_assert!(raw.contains(r));
        prop_assert!(r.confidence >= config.confidence_threshold);
      }
    }

    #[test]
    fn no_two_survivors_overlap_beyond_threshold(
      raw in prop::collection::vec(arb_detection(), 0..24),
      config in arb_config(),
    ) {
      let retained = reduce(&raw, &config);
      for (i, a) in retained.iter().enumerate() {
        for b in &retained[i + 1..] {
          prop_assert!(a.bbox.iou(&b.bbox) <= config.overlap_threshold);
        }
      }
    }

    #[test]
    fn retained_is_confidence_descending(
      raw in prop::collection::vec(arb_detection(), 0..24),
      config in arb_config(),
    ) {
      let retained = reduce(&raw, &config);
      for pair in retained.windows(2) {
        prop_assert!(pair[0].confidence >= pair[1].confidence);
      }
    }

    #[test]
    fn iou_is_symmetric_and_bounded(a in arb_detection(), b in arb_detection()) {
      let ab = a.bbox.iou(&b.bbox);
      prop_assert_eq!(ab, b.bbox.iou(&a.bbox));
      prop_assert!((0.0..=1.0).contains(&ab));
    }

    #[test]
    fn iou_with_itself_is_one_for_non_degenerate(a in arb_detection()) {
      prop_assume!(a.bbox.area() > 0.0);
      prop_assert_eq!(a.bbox.iou(&a.bbox), 1.0);
    }

    #[test]
    fn reduce_is_idempotent(
      raw in prop::collection::vec(arb_detection(), 0..24),
      config in arb_config(),
    ) {
      let once = reduce(&raw, &config);
      let twice = reduce(&once, &config);
      prop_assert_eq!(once, twice);
    }

    // 贪心抑制在一般情况下并不单调（被抑制的检测不再抑制其他候选），
    // 但在不超过三个检测时放宽重叠阈值不会减少保留数量。
    #[test]
    fn looser_overlap_never_retains_fewer_for_small_sets(
      raw in prop::collection::vec(arb_detection(), 0..=3),
      low in 0.0f32..=1.0,
      delta in 0.0f32..=1.0,
    ) {
      let high = (low + delta).min(1.0);
      let tight = ReduceConfig { confidence_threshold: 0.0, overlap_threshold: low };
      let loose = ReduceConfig { confidence_threshold: 0.0, overlap_threshold: high };
      prop_assert!(reduce(&raw, &loose).len() >= reduce(&raw, &tight).len());
    }
  }
}
