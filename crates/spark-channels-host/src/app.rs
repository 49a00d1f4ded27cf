//! 宿主 Web 框架的接入边界。
//!
//! # 教案式说明
//! - **意图（Why）**：通道宿主只需要宿主框架提供四样东西：应用元数据（标题/版本/描述）、
//!   已配置的中间件链、挂载子应用的能力、注册文档路由的能力；HTTP 细节全部留在框架一侧；
//! - **逻辑（How）**：以 [`HostFramework`] trait 描述这一边界，[`HostApp`] 是一个只做记录的实现，
//!   测试与嵌入式场景可以直接使用；
//! - **契约（What）**：路由路径区分大小写，重复注册返回 [`HostError::DuplicateRoute`]。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::HostError;

/// 宿主框架中 CORS 中间件的配置。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CorsOptions {
    /// 允许的来源列表，`["*"]` 表示全部允许。
    pub allow_origins: Vec<String>,
    /// 来源匹配正则，列表为空时生效。
    pub allow_origin_regex: Option<String>,
    /// 是否允许携带凭据。
    pub allow_credentials: bool,
}

impl CorsOptions {
    /// 以来源列表构造。
    pub fn with_origins<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow_origins: origins.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// 以来源正则构造。
    pub fn with_origin_regex(pattern: impl Into<String>) -> Self {
        Self {
            allow_origin_regex: Some(pattern.into()),
            ..Self::default()
        }
    }
}

/// 宿主中间件链中的一项。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Middleware {
    /// CORS 中间件。
    Cors(CorsOptions),
    /// 其他中间件，仅保留名称。
    Other(String),
}

/// 文档路由背后的内容提供者。
pub trait DocumentEndpoint: Send + Sync + 'static {
    /// 渲染文档 JSON。
    fn render_json(&self) -> Result<String, HostError>;
}

/// 宿主框架需要向通道宿主暴露的能力。
///
/// # 教案式说明
/// - **意图（Why）**：把“读取应用元数据与中间件”“挂载传输层”“注册文档路由”收敛为一个可替换的边界；
/// - **契约（What）**：
///   - `title` / `version` / `description` 作为文档元数据的缺省值；
///   - `middleware` 按配置顺序返回，允许为空；
///   - `mount` 把传输层挂到 `location`，`socketio_path` 为传输层在该位置下使用的子路径；
///   - `register_document_route` 把 `path` 绑定到文档提供者，冲突时返回错误。
pub trait HostFramework {
    fn title(&self) -> &str;

    fn version(&self) -> &str;

    fn description(&self) -> Option<&str>;

    fn middleware(&self) -> &[Middleware];

    fn mount(&mut self, location: &str, socketio_path: &str);

    fn register_document_route(
        &mut self,
        path: &str,
        endpoint: Arc<dyn DocumentEndpoint>,
    ) -> Result<(), HostError>;
}

/// 挂载记录。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MountPoint {
    pub location: String,
    pub socketio_path: String,
}

/// 只做记录的 [`HostFramework`] 实现。
///
/// # 教案级注释
/// - **目标 (Why)**：在不依赖具体 Web 框架的情况下完整走通“挂载 → 注册路由 → 请求文档”流程；
/// - **设计要点 (How)**：路由表使用 `BTreeMap<String, Arc<dyn DocumentEndpoint>>`，遍历顺序稳定，
///   便于断言与文档输出；
/// - **契约 (What)**：[`serve`](Self::serve) 模拟一次 GET 请求，路径未注册时返回 `None`。
pub struct HostApp {
    title: String,
    version: String,
    description: Option<String>,
    middleware: Vec<Middleware>,
    mounts: Vec<MountPoint>,
    routes: BTreeMap<String, Arc<dyn DocumentEndpoint>>,
}

impl fmt::Debug for HostApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostApp")
            .field("title", &self.title)
            .field("version", &self.version)
            .field("middleware", &self.middleware)
            .field("mounts", &self.mounts)
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HostApp {
    /// 以标题与版本创建应用。
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            description: None,
            middleware: Vec::new(),
            mounts: Vec::new(),
            routes: BTreeMap::new(),
        }
    }

    /// 设置描述。
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 追加中间件。
    #[must_use]
    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// 已挂载的子应用。
    pub fn mounts(&self) -> &[MountPoint] {
        &self.mounts
    }

    /// 已注册的路由路径。
    pub fn route_paths(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }

    /// 请求指定路径的文档。
    pub fn serve(&self, path: &str) -> Option<Result<String, HostError>> {
        self.routes.get(path).map(|endpoint| endpoint.render_json())
    }
}

impl HostFramework for HostApp {
    fn title(&self) -> &str {
        &self.title
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn middleware(&self) -> &[Middleware] {
        &self.middleware
    }

    fn mount(&mut self, location: &str, socketio_path: &str) {
        self.mounts.push(MountPoint {
            location: location.to_owned(),
            socketio_path: socketio_path.to_owned(),
        });
    }

    fn register_document_route(
        &mut self,
        path: &str,
        endpoint: Arc<dyn DocumentEndpoint>,
    ) -> Result<(), HostError> {
        if self.routes.contains_key(path) {
            return Err(HostError::DuplicateRoute {
                path: path.to_owned(),
            });
        }
        self.routes.insert(path.to_owned(), endpoint);
        Ok(())
    }
}
