//! 进程内传输层替身，供单元测试与集成测试使用。
//!
//! 需要在依赖中开启 `test-util` 特性；本 crate 自身的测试默认可用。

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::TransportError;
use crate::transport::{
    EventHandler, HandlerResult, SendOptions, SessionId, Transport, TransportControl,
};

/// 被 [`MemoryTransport`] 记录下来的一次发送。
#[derive(Clone, Debug, PartialEq)]
pub struct SentMessage {
    pub event: String,
    pub payload: Value,
    pub options: SendOptions,
}

#[derive(Default)]
struct State {
    handlers: Vec<(String, EventHandler)>,
    sent: Vec<SentMessage>,
    rooms: BTreeMap<(SessionId, String), BTreeSet<String>>,
    sessions: BTreeMap<SessionId, Value>,
    disconnected: Vec<SessionId>,
    background_tasks: Vec<BoxFuture<'static, ()>>,
    slept: Vec<Duration>,
    reject_bindings: Option<String>,
    closed: bool,
}

/// 记录全部调用的内存传输层。
///
/// # 教案式说明
/// - **意图（Why）**：在不启动真实连接的前提下验证“注册 → 绑定 → 分发 → 发送”链路；
/// - **逻辑（How）**：状态集中在一把 `parking_lot::Mutex` 中，锁内只做拷贝，
///   处理器在锁外执行，避免处理器内部再次发送时死锁；
/// - **契约（What）**：同一事件可被多次绑定，[`dispatch`](Self::dispatch) 调用最后一次绑定的处理器。
#[derive(Default)]
pub struct MemoryTransport {
    state: Mutex<State>,
}

const DEFAULT_NAMESPACE: &str = "/";

impl MemoryTransport {
    /// 创建空传输层。
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后的全部绑定请求都将以给定原因被拒绝。
    pub fn reject_bindings(&self, reason: impl Into<String>) {
        self.state.lock().reject_bindings = Some(reason.into());
    }

    /// 模拟传输层关闭，之后的发送返回 [`TransportError::Closed`]。
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    /// 已绑定的事件名，按绑定顺序排列。
    pub fn bound_events(&self) -> Vec<String> {
        self.state
            .lock()
            .handlers
            .iter()
            .map(|(event, _)| event.clone())
            .collect()
    }

    /// 已发送的全部消息。
    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().sent.clone()
    }

    /// 已断开的会话。
    pub fn disconnected(&self) -> Vec<SessionId> {
        self.state.lock().disconnected.clone()
    }

    /// 尚未运行的后台任务数量。
    pub fn pending_background_tasks(&self) -> usize {
        self.state.lock().background_tasks.len()
    }

    /// 依次运行全部挂起的后台任务，返回运行的数量。
    ///
    /// 任务在锁外执行，任务内部可以再次调度新的后台任务，新任务留待下一次调用。
    pub async fn run_background_tasks(&self) -> usize {
        let tasks = std::mem::take(&mut self.state.lock().background_tasks);
        let count = tasks.len();
        for task in tasks {
            task.await;
        }
        count
    }

    /// 全部 `sleep` 调用请求的时长。
    pub fn slept(&self) -> Vec<Duration> {
        self.state.lock().slept.clone()
    }

    /// 模拟一条入站消息；事件未绑定时返回 `None`。
    pub async fn dispatch(
        &self,
        event: &str,
        sid: impl Into<SessionId>,
        payload: Value,
    ) -> Option<HandlerResult> {
        let handler = self
            .state
            .lock()
            .handlers
            .iter()
            .rev()
            .find(|(bound, _)| bound == event)
            .map(|(_, handler)| handler.clone())?;
        Some(handler(sid.into(), payload).await)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn bind_handler(&self, event: &str, handler: EventHandler) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.reject_bindings {
            return Err(TransportError::Rejected {
                reason: reason.clone(),
            });
        }
        state.handlers.push((event.to_owned(), handler));
        Ok(())
    }

    async fn send(
        &self,
        event: &str,
        payload: Value,
        options: SendOptions,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        state.sent.push(SentMessage {
            event: event.to_owned(),
            payload,
            options,
        });
        Ok(())
    }
}

fn room_key(sid: &SessionId, namespace: Option<&str>) -> (SessionId, String) {
    (
        sid.clone(),
        namespace.unwrap_or(DEFAULT_NAMESPACE).to_owned(),
    )
}

#[async_trait]
impl TransportControl for MemoryTransport {
    async fn enter_room(
        &self,
        sid: &SessionId,
        room: &str,
        namespace: Option<&str>,
    ) -> Result<(), TransportError> {
        self.state
            .lock()
            .rooms
            .entry(room_key(sid, namespace))
            .or_default()
            .insert(room.to_owned());
        Ok(())
    }

    async fn leave_room(
        &self,
        sid: &SessionId,
        room: &str,
        namespace: Option<&str>,
    ) -> Result<(), TransportError> {
        if let Some(rooms) = self.state.lock().rooms.get_mut(&room_key(sid, namespace)) {
            rooms.remove(room);
        }
        Ok(())
    }

    async fn close_room(&self, room: &str, namespace: Option<&str>) -> Result<(), TransportError> {
        let namespace = namespace.unwrap_or(DEFAULT_NAMESPACE);
        for ((_, ns), rooms) in self.state.lock().rooms.iter_mut() {
            if ns == namespace {
                rooms.remove(room);
            }
        }
        Ok(())
    }

    fn rooms(&self, sid: &SessionId, namespace: Option<&str>) -> Vec<String> {
        self.state
            .lock()
            .rooms
            .get(&room_key(sid, namespace))
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn get_session(&self, sid: &SessionId) -> Result<Option<Value>, TransportError> {
        Ok(self.state.lock().sessions.get(sid).cloned())
    }

    async fn save_session(&self, sid: &SessionId, session: Value) -> Result<(), TransportError> {
        self.state.lock().sessions.insert(sid.clone(), session);
        Ok(())
    }

    async fn disconnect(
        &self,
        sid: &SessionId,
        namespace: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        let key = room_key(sid, namespace);
        state.rooms.remove(&key);
        state.disconnected.push(sid.clone());
        Ok(())
    }

    fn start_background_task(&self, task: BoxFuture<'static, ()>) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        state.background_tasks.push(task);
        Ok(())
    }

    /// 只记录时长，立即返回。
    async fn sleep(&self, duration: Duration) {
        self.state.lock().slept.push(duration);
    }
}
