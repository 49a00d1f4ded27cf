//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中声明通道注册、发送与传输边界上的错误，调用方可以用 `?` 直接传播；
//! - 每个错误都提供稳定的 `code()`，遵循 `<域>.<语义>` 命名，便于日志与告警归类。
//!
//! ## 设计要求（What）
//! - 全部错误派生 `thiserror::Error`，消息面向排障人员；
//! - 传输层错误以 `source` 形式保留，不做翻译，也不附带重试建议。

use thiserror::Error;

/// 传输层报告的错误。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// 传输层拒绝了请求，例如重复绑定或目标不存在。
    #[error("transport rejected the request: {reason}")]
    Rejected { reason: String },
    /// 传输层已关闭或尚未挂载。
    #[error("transport is closed")]
    Closed,
    /// 底层 I/O 故障。
    #[error("transport i/o failure: {0}")]
    Io(String),
}

impl TransportError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::Rejected { .. } => "channel.transport.rejected",
            TransportError::Closed => "channel.transport.closed",
            TransportError::Io(_) => "channel.transport.io",
        }
    }
}

/// 注册阶段的错误，出现时应中止应用启动。
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// 事件名为空。
    #[error("channel event name must not be empty")]
    EmptyEvent,

    /// 处理器名称为空，文档无法生成操作 ID。
    #[error("handler for event `{event}` must carry a non-empty name")]
    EmptyHandlerName { event: String },

    /// 两个结构不同的模型使用了同一个名称。
    ///
    /// 先注册的模型保留，后注册的通道被拒绝。
    #[error("schema model `{name}` is already registered with a different schema")]
    ModelNameCollision { name: String },

    /// 由 Rust 类型推导出的 Schema 无法转换为 JSON。
    #[error("schema for model `{name}` cannot be converted to JSON")]
    ModelSchema {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// 传输层拒绝绑定回调。
    #[error("transport refused to bind handler for event `{event}`")]
    Binding {
        event: String,
        #[source]
        source: TransportError,
    },
}

impl RegistrationError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            RegistrationError::EmptyEvent => "channel.registration.empty_event",
            RegistrationError::EmptyHandlerName { .. } => "channel.registration.empty_handler_name",
            RegistrationError::ModelNameCollision { .. } => "channel.registration.model_collision",
            RegistrationError::ModelSchema { .. } => "channel.registration.model_schema",
            RegistrationError::Binding { .. } => "channel.registration.binding",
        }
    }
}

/// 发送失败，错误回到调用发送器的处理器自身的错误路径。
#[derive(Debug, Error)]
pub enum EmitError {
    /// 负载无法序列化为 JSON。
    #[error("failed to serialize payload for event `{event}`")]
    Serialize {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    /// 传输层发送失败。
    #[error("transport failed to send event `{event}`")]
    Transport {
        event: String,
        #[source]
        source: TransportError,
    },
}

impl EmitError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            EmitError::Serialize { .. } => "channel.emit.serialize",
            EmitError::Transport { .. } => "channel.emit.transport",
        }
    }
}

/// 事件处理器返回的错误。
#[derive(Debug, Error)]
pub enum HandlerError {
    /// 入站负载无法解码为声明的模型。
    #[error("payload for event `{event}` does not match its model")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    /// 业务处理失败。
    #[error("handler failed: {0}")]
    Failed(String),
}

impl HandlerError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            HandlerError::InvalidPayload { .. } => "channel.handler.invalid_payload",
            HandlerError::Failed(_) => "channel.handler.failed",
        }
    }
}
