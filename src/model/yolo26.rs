// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/model/yolo26.rs - 基于 RKNPU 的 YOLO26 推理后端
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

use std::sync::Mutex;

use image::{RgbImage, imageops::FilterType};
use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::{BBox, ClassNameTable, Detection},
  model::{Inference, Model, ModelError, is_out_of_memory},
};

const YOLO26_NUM_INPUTS: u32 = 1;
const YOLO26_NUM_OUTPUTS: u32 = 6;
const YOLO26_DEFAULT_CLASS_NUM: usize = 80;
const YOLO26_INPUT_W: u32 = 640;
const YOLO26_INPUT_H: u32 = 640;
const YOLO26_HEAD_SIZES: [(usize, usize); 3] = [(80, 80), (40, 40), (20, 20)];
const YOLO26_STRIDES: [f32; 3] = [8.0, 16.0, 32.0];
// 仅用于限制候选数量，最终阈值由 reduce 决定
const YOLO26_CANDIDATE_THRESH: f32 = 0.05;

#[derive(Error, Debug)]
pub enum Yolo26Error {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("RKNN 错误: {0}")]
  RknnError(#[from] rknpu::Error),
  #[error("标签文件错误: {0}")]
  LabelsError(#[from] serde_json::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl Yolo26Error {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    Yolo26Error::ModelInvalid(msg.to_string(), e)
  }
}

pub struct Yolo26 {
  context: Mutex<Context>,
  class_names: ClassNameTable,
  num_classes: usize,
}

pub struct Yolo26Builder {
  model_path: String,
  labels_path: Option<String>,
  flags: InitFlags,
}

impl FromUrlWithScheme for Yolo26Builder {
  const SCHEME: &'static str = "yolo26";
}

impl FromUrl for Yolo26Builder {
  type Error = Yolo26Error;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(Yolo26Error::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let labels_path = url
      .query_pairs()
      .find(|(k, _)| k == "labels")
      .map(|(_, v)| v.into_owned());

    Ok(Yolo26Builder {
      model_path: url.path().to_string(),
      labels_path,
      flags: InitFlags::default(),
    })
  }
}

impl Yolo26Builder {
  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }

  pub fn build(self) -> Result<Yolo26, Yolo26Error> {
    let class_names: ClassNameTable = match &self.labels_path {
      Some(path) => {
        info!("加载标签文件: {}", path);
        serde_json::from_slice(&std::fs::read(path)?)?
      }
      None => ClassNameTable::default(),
    };

    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文");
    let context = Context::new(&model_data, self.flags)?;

    let num_inputs = context
      .num_inputs()
      .map_err(|e| Yolo26Error::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| Yolo26Error::invalid("无法获取输出数量", e))?;

    if num_inputs != YOLO26_NUM_INPUTS || num_outputs != YOLO26_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        YOLO26_NUM_INPUTS, YOLO26_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", msg);
      return Err(Yolo26Error::invalid(&msg, rknpu::Error::InvalidModel));
    }

    // 没有标签文件时使用类别编号作为名称
    let class_names = if class_names.is_empty() {
      (0..YOLO26_DEFAULT_CLASS_NUM).map(|i| i.to_string()).collect()
    } else {
      class_names
    };
    let num_classes = class_names.len();
    info!("模型加载完成, 类别数量: {}", num_classes);

    Ok(Yolo26 {
      context: Mutex::new(context),
      class_names,
      num_classes,
    })
  }
}

fn map_rknn_error(e: rknpu::Error) -> ModelError {
  let message = e.to_string();
  if is_out_of_memory(&message) {
    ModelError::ResourceExhausted(message)
  } else {
    ModelError::InferenceFailure(message)
  }
}

/// 根据张量大小匹配回归和分类输出
fn match_reg_cls_tensors<'a>(
  tensor1: &'a [f32],
  tensor2: &'a [f32],
  reg_expected: usize,
  cls_expected: usize,
) -> Option<(&'a [f32], &'a [f32])> {
  if tensor1.len() == reg_expected && tensor2.len() == cls_expected {
    Some((tensor1, tensor2))
  } else if tensor1.len() == cls_expected && tensor2.len() == reg_expected {
    Some((tensor2, tensor1))
  } else {
    None
  }
}

impl Yolo26 {
  fn postprocess(&self, output: &rknpu::Output, scale_x: f32, scale_y: f32) -> Vec<Detection> {
    let mut detections = Vec::new();
    let (input_w, input_h) = (YOLO26_INPUT_W as f32, YOLO26_INPUT_H as f32);

    for (head_idx, (&(map_h, map_w), stride)) in
      YOLO26_HEAD_SIZES.iter().zip(YOLO26_STRIDES).enumerate()
    {
      let spatial = map_h * map_w;
      let (reg, cls) = match (output.get_f32(head_idx * 2), output.get_f32(head_idx * 2 + 1)) {
        (Ok(t1), Ok(t2)) => {
          match match_reg_cls_tensors(t1, t2, 4 * spatial, self.num_classes * spatial) {
            Some(tensors) => tensors,
            None => {
              error!("检测头 {}: 输出大小不匹配", head_idx);
              continue;
            }
          }
        }
        _ => {
          error!("获取检测头 {} 的输出失败", head_idx);
          continue;
        }
      };

      for h in 0..map_h {
        for w in 0..map_w {
          let idx = h * map_w + w;

          let (logit, class_id) = (0..self.num_classes)
            .map(|c| (cls[c * spatial + idx], c as u32))
            .fold((f32::MIN, 0), |best, cur| if cur.0 > best.0 { cur } else { best });
          let confidence = sigmoid(logit);
          if confidence <= YOLO26_CANDIDATE_THRESH {
            continue;
          }

          let grid_x = (w as f32) + 0.5;
          let grid_y = (h as f32) + 0.5;
          let bbox = BBox {
            x1: ((grid_x - reg[idx]) * stride).clamp(0.0, input_w) * scale_x,
            y1: ((grid_y - reg[spatial + idx]) * stride).clamp(0.0, input_h) * scale_y,
            x2: ((grid_x + reg[2 * spatial + idx]) * stride).clamp(0.0, input_w) * scale_x,
            y2: ((grid_y + reg[3 * spatial + idx]) * stride).clamp(0.0, input_h) * scale_y,
          };

          detections.push(Detection {
            bbox,
            class_id,
            confidence,
          });
        }
      }
    }

    debug!("YOLO26 候选检测数量: {}", detections.len());
    detections
  }
}

impl Model for Yolo26 {
  fn infer(&self, image: &RgbImage) -> Result<Inference, ModelError> {
    let scale_x = image.width() as f32 / YOLO26_INPUT_W as f32;
    let scale_y = image.height() as f32 / YOLO26_INPUT_H as f32;
    let input = image::imageops::resize(
      image,
      YOLO26_INPUT_W,
      YOLO26_INPUT_H,
      FilterType::Triangle,
    );

    let context = self
      .context
      .lock()
      .map_err(|_| ModelError::InferenceFailure("RKNN 上下文锁已失效".to_string()))?;

    debug!("设置模型输入");
    context
      .set_input(0, input.as_raw(), TensorFormat::NHWC, TensorType::UInt8)
      .map_err(map_rknn_error)?;

    debug!("执行模型推理");
    context.run().map_err(map_rknn_error)?;

    let output = context.get_outputs().map_err(map_rknn_error)?;

    Ok(Inference {
      detections: self.postprocess(&output, scale_x, scale_y),
      class_names: self.class_names.clone(),
    })
  }
}

fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}
