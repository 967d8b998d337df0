// 该文件是 Kunchong （昆虫识别） 项目的一部分。
// src/metadata.rs - 物种信息查询
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

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum MetadataError {
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON error: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("species metadata must be a JSON object, found {0}")]
  NotAnObject(&'static str),
}

/// 物种名称到描述信息的只读映射
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesMetadata {
  entries: Map<String, Value>,
}

impl SpeciesMetadata {
  pub fn from_value(value: Value) -> Result<Self, MetadataError> {
    match value {
      Value::Object(entries) => Ok(Self { entries }),
      Value::Null => Err(MetadataError::NotAnObject("null")),
      Value::Bool(_) => Err(MetadataError::NotAnObject("boolean")),
      Value::Number(_) => Err(MetadataError::NotAnObject("number")),
      Value::String(_) => Err(MetadataError::NotAnObject("string")),
      Value::Array(_) => Err(MetadataError::NotAnObject("array")),
    }
  }

  pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, MetadataError> {
    Self::from_value(serde_json::from_reader(reader)?)
  }

  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MetadataError> {
    let file = std::fs::File::open(path.as_ref())?;
    let metadata = Self::from_reader(std::io::BufReader::new(file))?;
    debug!(
      "加载物种信息: {} 条 ({})",
      metadata.entries.len(),
      path.as_ref().display()
    );
    Ok(metadata)
  }

  /// 查询物种信息，缺失时返回空对象
  pub fn lookup(&self, name: &str) -> Value {
    self
      .entries
      .get(name)
      .cloned()
      .unwrap_or_else(|| Value::Object(Map::new()))
  }
}

/// 物种信息来源，每次请求重新读取
#[derive(Debug, Clone)]
pub enum MetadataSource {
  File(PathBuf),
  Static(SpeciesMetadata),
}

impl MetadataSource {
  pub fn load(&self) -> Result<SpeciesMetadata, MetadataError> {
    match self {
      MetadataSource::File(path) => SpeciesMetadata::load(path),
      MetadataSource::Static(metadata) => Ok(metadata.clone()),
    }
  }
}
