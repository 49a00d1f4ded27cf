//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 文档合成与元数据校验的错误集中在此，宿主的文档端点据此返回失败响应；
//! - 错误码遵循 `asyncapi.<语义>`，与 `spark-channels` 的 `channel.<语义>` 并列。

use thiserror::Error;

/// 文档合成失败。
///
/// # 教案式说明
/// - **意图 (Why)**：合成是纯函数，失败只可能来自输入快照本身的不一致；
/// - **契约 (What)**：
///   - 经由 `ChannelRegistry` 注册的快照不会触发 [`SynthesisError::SchemaNameCollision`]，
///     注册表已在入口处拒绝冲突；手工构造的快照仍可能出现；
///   - 出错时不会产出部分文档。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SynthesisError {
    /// 两个结构不同的 Schema 使用了同一个组件名。
    #[error("two different schemas are registered under component name `{name}`")]
    SchemaNameCollision { name: String },

    /// 3.x 文档中两个仍然生效的操作使用了同一个操作 ID。
    #[error("operation id `{operation_id}` is used by more than one channel operation")]
    OperationIdCollision { operation_id: String },

    /// 模型 Schema 既不是 JSON 对象也不是布尔值。
    #[error("schema for component `{name}` is not a valid JSON Schema: {reason}")]
    Schema { name: String, reason: String },
}

impl SynthesisError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            SynthesisError::SchemaNameCollision { .. } => "asyncapi.synthesis.schema_collision",
            SynthesisError::OperationIdCollision { .. } => "asyncapi.synthesis.operation_collision",
            SynthesisError::Schema { .. } => "asyncapi.synthesis.schema",
        }
    }
}

/// 元数据字段校验失败，由对应的设置方法同步返回。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid `{field}`: {reason}")]
pub struct ValidationError {
    /// 出错的字段名（文档中的键名）。
    pub field: &'static str,
    /// 面向人的原因描述。
    pub reason: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        "asyncapi.validation"
    }
}
