#![doc = r#"
# spark-asyncapi

## 设计动机（Why）
- 把 `spark-channels` 注册表快照转换为 AsyncAPI 文档，供宿主以 JSON 资源形式对外提供；
- 同时支持 2.4.0（通道内嵌 `publish`/`subscribe`）与 3.0.0（通道与操作分离）两种方言。

## 核心契约（What）
- [`synthesize`] 是纯函数：同一快照与元数据产出逐字节一致的 JSON；
- 组件去重按模型名进行，同名不同构返回 [`SynthesisError::SchemaNameCollision`]；
- [`DocumentCache`] 负责记忆化，只有显式 [`DocumentCache::reset`] 才会触发重新合成。

## 实现策略（How）
- 文档类型全部基于 `serde` 派生，缺失字段省略而非输出 `null`；
- 元数据中的 URI 与邮箱字段在设置时由 [`validate_uri`] / [`validate_email`] 校验。
"#]

mod cache;
mod document;
mod error;
mod metadata;
mod synth;
mod validate;

pub use cache::DocumentCache;
pub use document::{
    ASYNCAPI_V2, ASYNCAPI_V3, Action, ChannelItemV2, ChannelV3, Components, Contact, DocumentV2,
    DocumentV3, ExternalDocs, InfoV2, InfoV3, License, Message, OperationV2, OperationV3,
    Reference, Server, ServerV3, SpecificationDocument, Tag,
};
pub use error::{SynthesisError, ValidationError};
pub use metadata::{DEFAULT_CONTENT_TYPE, DocumentMetadata, derive_document_id};
pub use synth::{DialectVersion, INBOUND_MESSAGE_KEY, OUTBOUND_MESSAGE_KEY, synthesize};
pub use validate::{validate_email, validate_uri};
