//! AsyncAPI 文档模型。
//!
//! # 教案式说明
//! - **意图（Why）**：2.4.0 与 3.0.0 的结构差异是“形状”上的，不只是字段改名，因此两种方言各自
//!   拥有顶层文档类型，叶子节点（消息、联系人、许可证、标签）共享；
//! - **逻辑（How）**：全部类型只派生 `Serialize`，可选字段统一 `skip_serializing_if`，
//!   映射使用 `BTreeMap`，保证同一输入的序列化结果逐字节一致；
//! - **契约（What）**：缺失的字段在 JSON 中被省略，不会输出 `null`。

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// 2.x 方言的版本号。
pub const ASYNCAPI_V2: &str = "2.4.0";
/// 3.x 方言的版本号。
pub const ASYNCAPI_V3: &str = "3.0.0";

/// 联系人信息。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// 许可证信息。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct License {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl License {
    /// 仅以名称构造许可证。
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
        }
    }
}

/// 外部文档链接。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExternalDocs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
}

/// 文档标签。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
}

impl Tag {
    /// 仅以名称构造标签。
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            external_docs: None,
        }
    }
}

/// 服务器定义，`url` 形态（2.x）。
///
/// 3.x 文档会把 `url` 拆分为 `host` 与 `pathname`，见 [`ServerV3::from`]。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub url: String,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Server {
    /// 以地址与协议构造服务器。
    pub fn new(url: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            protocol: protocol.into(),
            protocol_version: None,
            description: None,
        }
    }
}

/// 3.x 的服务器定义。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerV3 {
    pub host: String,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pathname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&Server> for ServerV3 {
    /// 去掉协议前缀后，以第一个 `/` 为界拆分主机与路径。
    fn from(server: &Server) -> Self {
        let without_scheme = server
            .url
            .split_once("://")
            .map_or(server.url.as_str(), |(_, rest)| rest);
        let (host, pathname) = match without_scheme.find('/') {
            Some(index) if index + 1 < without_scheme.len() => (
                &without_scheme[..index],
                Some(without_scheme[index..].to_owned()),
            ),
            Some(index) => (&without_scheme[..index], None),
            None => (without_scheme, None),
        };
        Self {
            host: host.to_owned(),
            protocol: server.protocol.clone(),
            pathname,
            protocol_version: server.protocol_version.clone(),
            description: server.description.clone(),
        }
    }
}

/// `$ref` 引用对象。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reference {
    #[serde(rename = "$ref")]
    pub reference: String,
}

impl Reference {
    /// 以引用路径构造。
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}

/// 消息定义，两种方言共用。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// 组件集合，目前只包含 `schemas`。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Components {
    pub schemas: BTreeMap<String, Value>,
}

/// 2.x 文档的 `info`。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoV2 {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

/// 2.x 的操作（`publish` / `subscribe`）。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationV2 {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub message: Message,
}

/// 2.x 的通道条目。
///
/// # 教案式说明
/// - **意图（Why）**：同一事件名上的处理器与发送器需要落在同一个通道对象里；
/// - **契约（What）**：[`merge_from`](Self::merge_from) 是逐字段合并：后者存在的字段覆盖前者，
///   后者缺失的字段保留前者的值。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChannelItemV2 {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<OperationV2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<OperationV2>,
}

impl ChannelItemV2 {
    /// 以后应用者优先的规则合并另一个条目。
    pub fn merge_from(&mut self, later: ChannelItemV2) {
        if later.publish.is_some() {
            self.publish = later.publish;
        }
        if later.subscribe.is_some() {
            self.subscribe = later.subscribe;
        }
    }
}

/// AsyncAPI 2.4.0 文档。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentV2 {
    pub asyncapi: String,
    pub id: String,
    pub info: InfoV2,
    pub servers: BTreeMap<String, Server>,
    pub default_content_type: String,
    pub channels: BTreeMap<String, ChannelItemV2>,
    pub components: Components,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
}

/// 3.x 文档的 `info`，标签与外部文档从顶层移入此处。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoV3 {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
}

/// 3.x 的通道：只承载地址与消息定义。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChannelV3 {
    pub address: String,
    pub messages: BTreeMap<String, Message>,
}

impl ChannelV3 {
    /// 以地址构造空通道。
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            messages: BTreeMap::new(),
        }
    }
}

/// 3.x 操作的动作。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// 客户端发往应用（入站处理器）。
    Send,
    /// 应用发往客户端（出站发送器）。
    Receive,
}

/// 3.x 的操作，通过引用指向通道与消息。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OperationV3 {
    pub action: Action,
    pub channel: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<Reference>,
}

/// AsyncAPI 3.0.0 文档。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentV3 {
    pub asyncapi: String,
    pub id: String,
    pub info: InfoV3,
    pub servers: BTreeMap<String, ServerV3>,
    pub default_content_type: String,
    pub channels: BTreeMap<String, ChannelV3>,
    pub operations: BTreeMap<String, OperationV3>,
    pub components: Components,
}

/// 合成结果，按方言区分；序列化时不带外层标签。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SpecificationDocument {
    V2(DocumentV2),
    V3(DocumentV3),
}

impl SpecificationDocument {
    /// 文档声明的 AsyncAPI 版本号。
    pub fn asyncapi_version(&self) -> &str {
        match self {
            SpecificationDocument::V2(document) => &document.asyncapi,
            SpecificationDocument::V3(document) => &document.asyncapi,
        }
    }

    /// 文档标识。
    pub fn id(&self) -> &str {
        match self {
            SpecificationDocument::V2(document) => &document.id,
            SpecificationDocument::V3(document) => &document.id,
        }
    }

    /// 全部通道键，按字典序排列。
    pub fn channel_names(&self) -> Vec<&str> {
        match self {
            SpecificationDocument::V2(document) => {
                document.channels.keys().map(String::as_str).collect()
            }
            SpecificationDocument::V3(document) => {
                document.channels.keys().map(String::as_str).collect()
            }
        }
    }

    /// 组件集合。
    pub fn components(&self) -> &Components {
        match self {
            SpecificationDocument::V2(document) => &document.components,
            SpecificationDocument::V3(document) => &document.components,
        }
    }

    /// 转换为 JSON 值。
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// 序列化为紧凑 JSON 文本。
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
