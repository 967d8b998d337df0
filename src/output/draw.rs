// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontArc, InvalidFont, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;

use crate::summary::LabeledDetection;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_PADDING: i32 = 2;
const BOX_THICKNESS: i32 = 3;
const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const TEXT_COLOR: [u8; 3] = [255, 255, 255];

static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/font.ttf");

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("字体文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  InvalidFont(#[from] InvalidFont),
}

#[derive(Clone)]
pub struct Draw {
  font: FontArc,
  font_size: f32,
  box_thickness: i32,
  box_color: [u8; 3],
}

impl Draw {
  /// 使用内嵌字体
  pub fn new() -> Result<Self, DrawError> {
    Ok(Self::with_font(FontArc::try_from_slice(EMBEDDED_FONT)?))
  }

  pub fn with_font_file<P: AsRef<Path>>(path: P) -> Result<Self, DrawError> {
    let data = std::fs::read(path)?;
    Ok(Self::with_font(FontArc::try_from_vec(data)?))
  }

  fn with_font(font: FontArc) -> Self {
    Self {
      font,
      font_size: LABEL_FONT_SIZE,
      box_thickness: BOX_THICKNESS,
      box_color: BOX_COLOR,
    }
  }

  pub fn font_size(mut self, font_size: f32) -> Self {
    self.font_size = font_size;
    self
  }

  /// 返回带标注的图像副本，输入图像不变
  pub fn annotate(&self, image: &RgbImage, detections: &[LabeledDetection]) -> RgbImage {
    let mut canvas = image.clone();
    for det in detections {
      self.draw_bbox_with_label(&mut canvas, det);
    }
    canvas
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, det: &LabeledDetection) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = (det.bbox.x1.floor() as i32).clamp(0, w - 1);
    let y_min = (det.bbox.y1.floor() as i32).clamp(0, h - 1);
    let x_max = (det.bbox.x2.ceil() as i32).clamp(0, w - 1);
    let y_max = (det.bbox.y2.ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let color = Rgb(self.box_color);
    for t in 0..self.box_thickness {
      let width = x_max - x_min + 1 - 2 * t;
      let height = y_max - y_min + 1 - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    let label = det.label();
    let scale = PxScale::from(self.font_size);
    let (text_w, text_h) = text_size(scale, &self.font, &label);
    let label_w = (text_w as i32 + 2 * LABEL_PADDING).min(w - x_min);
    let label_h = text_h as i32 + 2 * LABEL_PADDING;

    // 标签锚定在边框左上角，空间不足时放进框内
    let label_y = if y_min >= label_h { y_min - label_h } else { y_min };

    if label_w > 0 && label_h > 0 {
      let rect = Rect::at(x_min, label_y).of_size(label_w as u32, label_h as u32);
      draw_filled_rect_mut(image, rect, color);
      draw_text_mut(
        image,
        Rgb(TEXT_COLOR),
        x_min + LABEL_PADDING,
        label_y + LABEL_PADDING,
        scale,
        &self.font,
        &label,
      );
    }
  }
}
