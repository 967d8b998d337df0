// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/input.rs - 图像输入与解码
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

use image::{RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_MAX_SIDE: u32 = 640;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Empty image data")]
  Empty,
  #[error("Image decoding error: {0}")]
  DecodeError(#[from] image::ImageError),
}

/// 解码上传的图像数据，转换为 RGB，并按比例缩小到不超过 `max_side`。
pub fn decode_image(bytes: &[u8], max_side: u32) -> Result<RgbImage, InputError> {
  if bytes.is_empty() {
    return Err(InputError::Empty);
  }

  let image = image::load_from_memory(bytes)?.to_rgb8();
  debug!("图像解码完成: {}x{}", image.width(), image.height());
  Ok(thumbnail(image, max_side))
}

/// 保持宽高比缩小图像，不会放大
pub fn thumbnail(image: RgbImage, max_side: u32) -> RgbImage {
  let (width, height) = image.dimensions();
  if max_side == 0 || (width <= max_side && height <= max_side) {
    return image;
  }

  let scale = f64::from(max_side) / f64::from(width.max(height));
  let new_width = ((f64::from(width) * scale).round() as u32).clamp(1, max_side);
  let new_height = ((f64::from(height) * scale).round() as u32).clamp(1, max_side);
  debug!(
    "缩放图像: {}x{} -> {}x{}",
    width, height, new_width, new_height
  );

  image::imageops::resize(&image, new_width, new_height, FilterType::Lanczos3)
}

mod read_image_file;
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};
