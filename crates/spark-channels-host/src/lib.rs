#![doc = r#"
# spark-channels-host

## 设计动机（Why）
- 把通道注册表、AsyncAPI 文档与实时传输层接入宿主 Web 框架，应用只需面对 [`ChannelHost`] 一个门面；
- 宿主框架本身以 [`HostFramework`] trait 抽象，HTTP 与挂载细节不进入本 crate。

## 核心契约（What）
- [`ChannelHost::attach`] 固定启动顺序：CORS 推导 → 构造传输层 → 注册文档路由 → 挂载；
- 文档端点返回首次请求时合成并缓存的文档，显式 [`ChannelHost::reset_asyncapi`] 后重新合成；
- 房间、会话与断开等传输层操作以同名方法逐项转发。

## 实现策略（How）
- 配置通过 [`ChannelHostConfig::from_toml_str`] 从 TOML 读取；
- [`telemetry::install`] 安装 `tracing-subscriber`，日志级别由 `RUST_LOG` 控制。
"#]

mod app;
mod config;
mod cors;
mod error;
mod host;
pub mod telemetry;

pub use app::{CorsOptions, DocumentEndpoint, HostApp, HostFramework, Middleware, MountPoint};
pub use config::{ChannelHostConfig, DOCUMENT_FILE_NAME, ServerConfig};
pub use cors::{OriginMatcher, OriginPolicy, resolve_origin_policy};
pub use error::{CorsError, HostError};
pub use host::{CONNECT_EVENT, ChannelHost, TransportSettings};
pub use telemetry::TelemetryError;
