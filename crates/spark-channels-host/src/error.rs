//! # error 模块说明
//!
//! 宿主层把下游 crate 的错误统一包装为 [`HostError`]，应用启动代码只需处理一个类型；
//! `code()` 直接透传下游的稳定错误码。

use spark_asyncapi::{SynthesisError, ValidationError};
use spark_channels::{RegistrationError, TransportError};
use thiserror::Error;

/// CORS 配置解析失败。
#[derive(Debug, Error)]
pub enum CorsError {
    /// `allow_origin_regex` 无法编译。
    #[error("invalid CORS origin regex `{pattern}`")]
    InvalidOriginRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl CorsError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            CorsError::InvalidOriginRegex { .. } => "host.cors.invalid_regex",
        }
    }
}

/// 宿主层错误。
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("failed to synthesize asyncapi document")]
    Synthesis(#[from] SynthesisError),

    #[error("invalid document metadata")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Cors(#[from] CorsError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// 文档无法序列化为 JSON。
    #[error("failed to serialize asyncapi document")]
    Serialize(#[source] serde_json::Error),

    /// 配置文本无法解析。
    #[error("invalid channel host configuration")]
    Config(#[from] toml::de::Error),

    /// 路由路径已被占用。
    #[error("route `{path}` is already registered")]
    DuplicateRoute { path: String },
}

impl HostError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            HostError::Registration(error) => error.code(),
            HostError::Synthesis(error) => error.code(),
            HostError::Validation(error) => error.code(),
            HostError::Cors(error) => error.code(),
            HostError::Transport(error) => error.code(),
            HostError::Serialize(_) => "host.document.serialize",
            HostError::Config(_) => "host.config",
            HostError::DuplicateRoute { .. } => "host.route.duplicate",
        }
    }
}
