//! 通道宿主配置。
//!
//! 配置以 TOML 表达，全部字段可省略：
//!
//! ```toml
//! mount_location = "/sio"
//! socketio_path = "socket.io"
//! asyncapi_url = "/sio/docs"
//! dialect = "v3"
//!
//! [servers.production]
//! url = "wss://cats.example.com/sio"
//! protocol = "wss"
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use spark_asyncapi::{DialectVersion, Server};

use crate::error::HostError;

/// 文档路由在 `asyncapi_url` 下的文件名。
pub const DOCUMENT_FILE_NAME: &str = "asyncapi.json";

/// 配置文件中的服务器定义。
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub url: String,
    pub protocol: String,
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<&ServerConfig> for Server {
    fn from(config: &ServerConfig) -> Self {
        Server {
            url: config.url.clone(),
            protocol: config.protocol.clone(),
            protocol_version: config.protocol_version.clone(),
            description: config.description.clone(),
        }
    }
}

/// 通道宿主的全部可调参数。
///
/// # 教案式说明
/// - **意图（Why）**：挂载位置、文档路径、文档方言等在部署间差异较大，集中到一个可反序列化的结构；
/// - **契约（What）**：
///   - 缺省值：挂载 `/sio`，传输子路径 `socket.io`，文档根 `/sio/docs`，方言 `v2`，监控客户端开启；
///   - `asyncapi_url` 为空字符串时视为关闭文档路由（TOML 无法表达 `null`）；
///   - `version` 覆盖宿主应用的版本，`document_id` 覆盖推导出的文档标识。
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelHostConfig {
    pub mount_location: String,
    pub socketio_path: String,
    pub asyncapi_url: Option<String>,
    pub version: Option<String>,
    pub document_id: Option<String>,
    pub dialect: DialectVersion,
    pub servers: BTreeMap<String, ServerConfig>,
    pub monitor_clients: bool,
}

impl Default for ChannelHostConfig {
    fn default() -> Self {
        Self {
            mount_location: "/sio".to_owned(),
            socketio_path: "socket.io".to_owned(),
            asyncapi_url: Some("/sio/docs".to_owned()),
            version: None,
            document_id: None,
            dialect: DialectVersion::V2,
            servers: BTreeMap::new(),
            monitor_clients: true,
        }
    }
}

impl ChannelHostConfig {
    /// 解析 TOML 文本。
    pub fn from_toml_str(source: &str) -> Result<Self, HostError> {
        Ok(toml::from_str(source)?)
    }

    /// 文档路由的完整路径；未启用时返回 `None`。
    pub fn document_route(&self) -> Option<String> {
        let base = self.asyncapi_url.as_deref()?.trim_end_matches('/');
        if base.is_empty() && self.asyncapi_url.as_deref() != Some("/") {
            return None;
        }
        Some(format!("{base}/{DOCUMENT_FILE_NAME}"))
    }

    /// 转换为文档使用的服务器映射。
    pub fn document_servers(&self) -> BTreeMap<String, Server> {
        self.servers
            .iter()
            .map(|(name, server)| (name.clone(), Server::from(server)))
            .collect()
    }
}
