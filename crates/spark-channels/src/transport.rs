//! 实时传输层的最小委托边界。
//!
//! # 教案式说明
//! - **意图（Why）**：通道层不实现连接、房间或线协议，只调用传输层的“绑定回调”和“发送”两个原语；
//!   其余生命周期操作以显式枚举的 [`TransportControl`] 逐项转发，边界可审计、可单独测试；
//! - **逻辑（How）**：[`Transport`] 与 [`TransportControl`] 均为对象安全的 `async-trait`，
//!   注册表以 `Arc<dyn Transport>` 持有传输层；
//! - **契约（What）**：传输层返回的错误原样向上传播，本层不做重试或翻译。

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::{HandlerError, TransportError};

/// 连接会话标识。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(Arc<str>);

impl SessionId {
    /// 由字符串构造会话标识。
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// 字符串视图。
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// 处理器的执行结果：可选的确认（ack）负载。
pub type HandlerResult = Result<Option<Value>, HandlerError>;

/// 对象安全的事件处理器。
pub type EventHandler = Arc<dyn Fn(SessionId, Value) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// 将异步闭包包装为 [`EventHandler`]。
pub fn handler_fn<F, Fut>(handler: F) -> EventHandler
where
    F: Fn(SessionId, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |sid, payload| Box::pin(handler(sid, payload)))
}

/// 单次发送的传输层参数。
///
/// 全部字段缺省时表示广播给命名空间内的全部连接。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// 目标房间或会话。
    pub to: Option<String>,
    /// 需要跳过的会话。
    pub skip_sid: Option<SessionId>,
    /// 命名空间。
    pub namespace: Option<String>,
}

impl SendOptions {
    /// 指定目标房间或会话。
    #[must_use]
    pub fn to(mut self, target: impl Into<String>) -> Self {
        self.to = Some(target.into());
        self
    }

    /// 指定跳过的会话。
    #[must_use]
    pub fn skip_sid(mut self, sid: SessionId) -> Self {
        self.skip_sid = Some(sid);
        self
    }

    /// 指定命名空间。
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// 通道层消费的传输原语。
///
/// # 教案式说明
/// - **意图（Why）**：注册与文档保持同步，每个登记到文档里的处理器都必须同时绑定到传输层；
/// - **契约（What）**：
///   - `bind_handler` 在注册阶段同步调用，拒绝绑定时返回 [`TransportError`]；
///   - `send` 负责把已投影的负载交给连接，错误不经翻译直接返回；
///   - 实现必须满足 `Send + Sync + 'static`，可在多个发送器间共享。
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// 将回调绑定到事件名。
    fn bind_handler(&self, event: &str, handler: EventHandler) -> Result<(), TransportError>;

    /// 发送一条事件消息。
    async fn send(
        &self,
        event: &str,
        payload: Value,
        options: SendOptions,
    ) -> Result<(), TransportError>;
}

/// 宿主逐项转发的传输层生命周期操作。
///
/// 该列表即全部转发面，新增操作必须显式追加到这里。
#[async_trait]
pub trait TransportControl: Send + Sync + 'static {
    /// 让会话加入房间。
    async fn enter_room(
        &self,
        sid: &SessionId,
        room: &str,
        namespace: Option<&str>,
    ) -> Result<(), TransportError>;

    /// 让会话离开房间。
    async fn leave_room(
        &self,
        sid: &SessionId,
        room: &str,
        namespace: Option<&str>,
    ) -> Result<(), TransportError>;

    /// 关闭房间并移出全部成员。
    async fn close_room(&self, room: &str, namespace: Option<&str>) -> Result<(), TransportError>;

    /// 查询会话所在的房间。
    fn rooms(&self, sid: &SessionId, namespace: Option<&str>) -> Vec<String>;

    /// 读取会话数据。
    async fn get_session(&self, sid: &SessionId) -> Result<Option<Value>, TransportError>;

    /// 保存会话数据。
    async fn save_session(&self, sid: &SessionId, session: Value) -> Result<(), TransportError>;

    /// 断开会话。
    async fn disconnect(&self, sid: &SessionId, namespace: Option<&str>)
    -> Result<(), TransportError>;

    /// 在传输层所在的运行时上启动后台任务。
    ///
    /// 任务的调度与取消由传输层负责；传输层已关闭时返回 [`TransportError::Closed`]。
    fn start_background_task(&self, task: BoxFuture<'static, ()>) -> Result<(), TransportError>;

    /// 以传输层运行时的计时器挂起当前任务。
    async fn sleep(&self, duration: Duration);
}
