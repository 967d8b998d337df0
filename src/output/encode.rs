// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/output/encode.rs - 标注图像编码
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

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{ImageFormat, RgbImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
  #[error("图像编码错误: {0}")]
  ImageError(#[from] image::ImageError),
}

pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, EncodeError> {
  let mut buf = Cursor::new(Vec::new());
  image.write_to(&mut buf, ImageFormat::Jpeg)?;
  Ok(buf.into_inner())
}

/// JPEG 编码后转为 base64 文本，便于放入 JSON 响应
pub fn encode_jpeg_base64(image: &RgbImage) -> Result<String, EncodeError> {
  let jpeg = encode_jpeg(image)?;
  Ok(STANDARD.encode(jpeg))
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn encoded_image_decodes_back_to_same_size() {
    let image = RgbImage::from_pixel(40, 30, Rgb([120, 60, 200]));
    let text = encode_jpeg_base64(&image).unwrap();

    let jpeg = STANDARD.decode(text).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (40, 30));
  }
}
