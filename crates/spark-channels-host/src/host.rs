use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use spark_asyncapi::{
    DialectVersion, DocumentCache, DocumentMetadata, SpecificationDocument, synthesize,
};
use spark_channels::{
    ChannelOptions, ChannelRegistry, EmitterDescriptor, EmitterOptions, Emitter, HandlerDescriptor,
    HandlerError, HandlerResult, ModelRef, SchemaModel, SessionId, Transport, TransportControl,
    TransportError, handler_fn,
};

use crate::app::{DocumentEndpoint, HostFramework};
use crate::config::ChannelHostConfig;
use crate::cors::{OriginPolicy, resolve_origin_policy};
use crate::error::HostError;

/// 传输层连接事件名。
pub const CONNECT_EVENT: &str = "connect";

/// 构造传输层时交给调用方的参数。
#[derive(Clone, Debug)]
pub struct TransportSettings {
    /// 由宿主 CORS 配置推导出的来源策略。
    pub cors_allowed_origins: OriginPolicy,
    /// 传输层在挂载位置下的子路径。
    pub socketio_path: String,
    /// 是否监控客户端连接状态。
    pub monitor_clients: bool,
}

/// 文档端点共享的状态：注册表、元数据与缓存。
struct DocumentState {
    registry: RwLock<ChannelRegistry>,
    metadata: DocumentMetadata,
    dialect: DialectVersion,
    cache: DocumentCache,
}

impl DocumentState {
    fn document(&self) -> Result<Arc<SpecificationDocument>, HostError> {
        self.cache.get_or_try_init(|| {
            let snapshot = self.registry.read().snapshot();
            synthesize(&snapshot, &self.metadata, self.dialect).map_err(HostError::from)
        })
    }

    fn warn_if_late(&self, event: &str) {
        if self.cache.is_populated() {
            tracing::warn!(
                event,
                "channel registered after the asyncapi document was generated; call reset_asyncapi to include it"
            );
        }
    }
}

impl DocumentEndpoint for DocumentState {
    fn render_json(&self) -> Result<String, HostError> {
        self.document()?.to_json().map_err(HostError::Serialize)
    }
}

/// 应用级通道宿主：注册入口、文档端点与传输层转发的门面。
///
/// # 教案级注释
/// - **目标 (Why)**
///   - 应用只与一个对象打交道：注册处理器/发送器、提供文档、操作房间与会话；
///   - 把“CORS 推导 → 构造传输层 → 注册文档路由 → 挂载”的启动顺序固定下来。
/// - **设计要点 (How)**
///   - 注册表与文档缓存放在 `Arc<DocumentState>` 中，文档路由与宿主共享同一份状态；
///   - 注册表由 `parking_lot::RwLock` 保护：注册取写锁，合成取读锁拿快照后立即释放；
///   - [`TransportControl`] 的每个操作都以同名方法显式转发。
/// - **契约 (What)**
///   - 文档在首次请求时合成并缓存；之后成功的注册只记录告警，需调用
///     [`reset_asyncapi`](Self::reset_asyncapi) 才会出现在文档中；
///   - 注册失败返回 [`HostError::Registration`]，调用方应中止启动。
pub struct ChannelHost<T> {
    transport: Arc<T>,
    documents: Arc<DocumentState>,
    document_route: Option<String>,
    origin_policy: OriginPolicy,
}

impl<T> fmt::Debug for ChannelHost<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelHost")
            .field("registry", &*self.documents.registry.read())
            .field("dialect", &self.documents.dialect)
            .field("document_route", &self.document_route)
            .field("origin_policy", &self.origin_policy)
            .finish()
    }
}

impl<T> ChannelHost<T>
where
    T: Transport + TransportControl,
{
    /// 把通道宿主接入宿主框架。
    ///
    /// # 教案级注释
    /// - **执行逻辑 (How)**
    ///   1. 从中间件链推导来源策略（缺省为空列表）；
    ///   2. 调用 `make_transport` 构造传输层；
    ///   3. 组装文档元数据：宿主标题/描述，`config.version` 优先于宿主版本，`config.document_id` 优先于推导值；
    ///   4. 注册文档路由（若启用），再把传输层挂载到 `mount_location`。
    /// - **错误 (What)**：CORS 正则非法、文档标识非法或路由冲突时返回错误，宿主框架状态可能已部分修改。
    pub fn attach<A, F>(
        app: &mut A,
        config: ChannelHostConfig,
        make_transport: F,
    ) -> Result<Self, HostError>
    where
        A: HostFramework + ?Sized,
        F: FnOnce(TransportSettings) -> T,
    {
        let origin_policy = resolve_origin_policy(app.middleware(), OriginPolicy::default())?;
        let transport = Arc::new(make_transport(TransportSettings {
            cors_allowed_origins: origin_policy.clone(),
            socketio_path: config.socketio_path.clone(),
            monitor_clients: config.monitor_clients,
        }));

        let version = config
            .version
            .clone()
            .unwrap_or_else(|| app.version().to_owned());
        let mut metadata = DocumentMetadata::new(app.title(), version)
            .maybe_description(app.description().map(str::to_owned))
            .servers(config.document_servers());
        if let Some(id) = &config.document_id {
            metadata = metadata.id(id.clone())?;
        }

        let documents = Arc::new(DocumentState {
            registry: RwLock::new(ChannelRegistry::new(
                Arc::clone(&transport) as Arc<dyn Transport>
            )),
            metadata,
            dialect: config.dialect,
            cache: DocumentCache::new(),
        });

        let document_route = config.document_route();
        if let Some(route) = &document_route {
            app.register_document_route(route, Arc::clone(&documents) as Arc<dyn DocumentEndpoint>)?;
        }
        app.mount(&config.mount_location, &config.socketio_path);

        tracing::info!(
            mount = config.mount_location.as_str(),
            document_route = document_route.as_deref(),
            dialect = config.dialect.asyncapi_version(),
            "channel host attached"
        );
        Ok(Self {
            transport,
            documents,
            document_route,
            origin_policy,
        })
    }

    /// 注册一个以原始 JSON 接收负载的处理器。
    pub fn on<F, Fut>(
        &mut self,
        event: impl Into<String>,
        handler_name: impl Into<String>,
        options: ChannelOptions,
        handler: F,
    ) -> Result<(), HostError>
    where
        F: Fn(SessionId, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let descriptor = HandlerDescriptor::new(event, handler_name, options);
        self.register(descriptor, handler_fn(handler))
    }

    /// 注册一个带类型负载的处理器。
    ///
    /// # 教案式说明
    /// - **逻辑（How）**：模型由 `schemars` 从 `M` 推导；入站 JSON 先经 `serde` 解码为 `M` 再交给处理器；
    /// - **契约（What）**：解码失败返回 [`HandlerError::InvalidPayload`] 并记录告警，处理器不会被调用。
    pub fn on_model<M, F, Fut>(
        &mut self,
        event: impl Into<String>,
        handler_name: impl Into<String>,
        options: ChannelOptions,
        handler: F,
    ) -> Result<(), HostError>
    where
        M: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(SessionId, M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let event = event.into();
        let descriptor = HandlerDescriptor::new(event.clone(), handler_name, options)
            .with_model(SchemaModel::of::<M>()?.into_ref());

        let handler = Arc::new(handler);
        let event_name: Arc<str> = Arc::from(event);
        let typed = handler_fn(move |sid, payload| {
            let handler = Arc::clone(&handler);
            let event = Arc::clone(&event_name);
            async move {
                let decoded = serde_json::from_value::<M>(payload).map_err(|source| {
                    tracing::warn!(event = &*event, sid = sid.as_str(), error = %source, "rejected channel payload");
                    HandlerError::InvalidPayload {
                        event: event.to_string(),
                        source,
                    }
                })?;
                handler(sid, decoded).await
            }
        });
        self.register(descriptor, typed)
    }

    /// 绑定连接事件；该事件不进入文档。
    pub fn on_connect<F, Fut>(&mut self, handler: F) -> Result<(), HostError>
    where
        F: Fn(SessionId, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.transport
            .bind_handler(CONNECT_EVENT, handler_fn(handler))
            .map_err(|source| {
                HostError::Registration(spark_channels::RegistrationError::Binding {
                    event: CONNECT_EVENT.to_owned(),
                    source,
                })
            })
    }

    /// 注册出站发送器。
    pub fn create_emitter<P: Serialize>(
        &mut self,
        event: impl Into<String>,
        model: ModelRef,
        options: EmitterOptions,
    ) -> Result<Emitter<P>, HostError> {
        let descriptor = EmitterDescriptor::new(event, model, options);
        let event = descriptor.event().to_owned();
        let emitter = self.documents.registry.write().create_emitter(descriptor)?;
        self.documents.warn_if_late(&event);
        Ok(emitter)
    }

    /// 注册出站发送器，模型由 `P` 推导。
    pub fn create_model_emitter<P: Serialize + JsonSchema>(
        &mut self,
        event: impl Into<String>,
        options: EmitterOptions,
    ) -> Result<Emitter<P>, HostError> {
        self.create_emitter(event, SchemaModel::of::<P>()?.into_ref(), options)
    }

    fn register(
        &mut self,
        descriptor: HandlerDescriptor,
        handler: spark_channels::EventHandler,
    ) -> Result<(), HostError> {
        let event = descriptor.event().to_owned();
        self.documents
            .registry
            .write()
            .register_handler(descriptor, handler)?;
        self.documents.warn_if_late(&event);
        Ok(())
    }

    /// 返回（必要时合成）文档。
    pub fn asyncapi(&self) -> Result<Arc<SpecificationDocument>, HostError> {
        self.documents.document()
    }

    /// 文档的 JSON 文本。
    pub fn asyncapi_json(&self) -> Result<String, HostError> {
        self.documents.render_json()
    }

    /// 丢弃缓存，下一次请求重新合成。
    pub fn reset_asyncapi(&self) {
        self.documents.cache.reset();
    }

    /// 文档路由路径；未启用时为 `None`。
    pub fn document_route(&self) -> Option<&str> {
        self.document_route.as_deref()
    }

    /// 交给传输层的来源策略。
    pub fn origin_policy(&self) -> &OriginPolicy {
        &self.origin_policy
    }

    /// 传输层句柄。
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub async fn enter_room(
        &self,
        sid: &SessionId,
        room: &str,
        namespace: Option<&str>,
    ) -> Result<(), TransportError> {
        self.transport.enter_room(sid, room, namespace).await
    }

    pub async fn leave_room(
        &self,
        sid: &SessionId,
        room: &str,
        namespace: Option<&str>,
    ) -> Result<(), TransportError> {
        self.transport.leave_room(sid, room, namespace).await
    }

    pub async fn close_room(&self, room: &str, namespace: Option<&str>) -> Result<(), TransportError> {
        self.transport.close_room(room, namespace).await
    }

    pub fn rooms(&self, sid: &SessionId, namespace: Option<&str>) -> Vec<String> {
        self.transport.rooms(sid, namespace)
    }

    pub async fn get_session(&self, sid: &SessionId) -> Result<Option<Value>, TransportError> {
        self.transport.get_session(sid).await
    }

    pub async fn save_session(&self, sid: &SessionId, session: Value) -> Result<(), TransportError> {
        self.transport.save_session(sid, session).await
    }

    pub async fn disconnect(
        &self,
        sid: &SessionId,
        namespace: Option<&str>,
    ) -> Result<(), TransportError> {
        self.transport.disconnect(sid, namespace).await
    }

    /// 在传输层运行时上启动后台任务。
    pub fn start_background_task<F>(&self, task: F) -> Result<(), TransportError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.transport.start_background_task(Box::pin(task))
    }

    pub async fn sleep(&self, duration: Duration) {
        self.transport.sleep(duration).await;
    }
}
