//! 范围/实体标识
//! 规范字符串形式为 "type:id"，仅在第一个 ':' 处分割。
//! id 本身不允许包含 ':'（否则字符串形式无法无损往返，解析时直接拒绝）。

use super::types::{EntityType, ScopeType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 标识解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("missing ':' separator in {0:?}")]
    MissingSeparator(String),

    #[error("unknown scope type: {0:?}")]
    UnknownScopeType(String),

    #[error("unknown entity type: {0:?}")]
    UnknownEntityType(String),

    #[error("id must not contain ':': {0:?}")]
    ColonInId(String),
}

/// 授权范围标识（scope_type + scope_id）
/// 按值比较/散列，可作为 map key 使用
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId {
    pub scope_type: ScopeType,
    pub scope_id: String,
}

impl ScopeId {
    pub fn new(scope_type: ScopeType, scope_id: impl Into<String>) -> Self {
        Self {
            scope_type,
            scope_id: scope_id.into(),
        }
    }

    /// 全局范围。scope_id 固定为 "*"
    pub fn global() -> Self {
        Self::new(ScopeType::Global, "*")
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope_type.as_str(), self.scope_id)
    }
}

impl FromStr for ScopeId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (type_part, id_part) = s
            .split_once(':')
            .ok_or_else(|| IdParseError::MissingSeparator(s.to_string()))?;
        let scope_type = ScopeType::parse(type_part)
            .ok_or_else(|| IdParseError::UnknownScopeType(type_part.to_string()))?;
        if id_part.contains(':') {
            return Err(IdParseError::ColonInId(id_part.to_string()));
        }
        Ok(Self::new(scope_type, id_part))
    }
}

/// 实体标识（entity_type + entity_id）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl ObjectId {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type.as_str(), self.entity_id)
    }
}

impl FromStr for ObjectId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (type_part, id_part) = s
            .split_once(':')
            .ok_or_else(|| IdParseError::MissingSeparator(s.to_string()))?;
        let entity_type = EntityType::parse(type_part)
            .ok_or_else(|| IdParseError::UnknownEntityType(type_part.to_string()))?;
        if id_part.contains(':') {
            return Err(IdParseError::ColonInId(id_part.to_string()));
        }
        Ok(Self::new(entity_type, id_part))
    }
}
