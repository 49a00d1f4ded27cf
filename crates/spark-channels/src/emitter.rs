use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;

use crate::descriptor::EmitterDescriptor;
use crate::error::EmitError;
use crate::projection::Projection;
use crate::transport::{SendOptions, Transport};

/// 单次发送的附加参数。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmitOptions {
    /// 覆盖描述符中的投影策略；缺省时使用注册时的策略。
    pub projection: Option<Projection>,
    /// 调用方显式设置过的顶层字段（序列化后的键名），供 `exclude_unset` 使用。
    pub fields_set: Option<BTreeSet<String>>,
    /// 透传给传输层的参数。
    pub send: SendOptions,
}

impl EmitOptions {
    /// 指定传输层参数。
    pub fn with_send(send: SendOptions) -> Self {
        Self {
            send,
            ..Self::default()
        }
    }

    /// 覆盖投影策略。
    #[must_use]
    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// 声明显式设置过的字段。
    #[must_use]
    pub fn fields_set<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields_set = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// 绑定到单个出站通道的发送能力。
///
/// # 教案式说明
/// - **意图（Why）**：注册发送器后返回给调用方的能力对象，持有描述符（投影策略）与传输层句柄；
/// - **逻辑（How）**：`emit` 依次执行“序列化 → 投影 → 交给传输层”，不持有可变状态，
///   因此可以被任意多个并发处理器克隆后同时使用；
/// - **契约（What）**：负载是否满足模型由类型系统与 `serde` 保证，本层不再校验；
///   传输层错误通过 [`EmitError::Transport`] 原样返回，不重试。
pub struct Emitter<T> {
    descriptor: Arc<EmitterDescriptor>,
    transport: Arc<dyn Transport>,
    _payload: PhantomData<fn(&T)>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            transport: Arc::clone(&self.transport),
            _payload: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("event", &self.descriptor.event())
            .field("model", &self.descriptor.model().name())
            .finish()
    }
}

impl<T: Serialize> Emitter<T> {
    pub(crate) fn new(descriptor: Arc<EmitterDescriptor>, transport: Arc<dyn Transport>) -> Self {
        Self {
            descriptor,
            transport,
            _payload: PhantomData,
        }
    }

    /// 绑定的描述符。
    pub fn descriptor(&self) -> &Arc<EmitterDescriptor> {
        &self.descriptor
    }

    /// 通道事件名。
    pub fn event(&self) -> &str {
        self.descriptor.event()
    }

    /// 以注册时的策略广播负载。
    pub async fn emit(&self, payload: &T) -> Result<(), EmitError> {
        self.emit_with(payload, EmitOptions::default()).await
    }

    /// 以指定参数发送负载。
    pub async fn emit_with(&self, payload: &T, options: EmitOptions) -> Result<(), EmitError> {
        let event = self.descriptor.event();
        let value = serde_json::to_value(payload).map_err(|source| EmitError::Serialize {
            event: event.to_owned(),
            source,
        })?;

        let projection = options
            .projection
            .as_ref()
            .unwrap_or_else(|| self.descriptor.projection());
        let value = projection.apply(value, self.descriptor.model(), options.fields_set.as_ref());

        tracing::trace!(event, "emitting channel message");
        self.transport
            .send(event, value, options.send)
            .await
            .map_err(|source| EmitError::Transport {
                event: event.to_owned(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ChannelOptions, EmitterOptions};
    use crate::model::SchemaModel;
    use crate::projection::FieldSet;
    use crate::registry::ChannelRegistry;
    use crate::testing::MemoryTransport;
    use crate::transport::SessionId;
    use serde_json::{Value, json};
    use tracing_test::traced_test;

    #[derive(Serialize)]
    struct Purr {
        detail: String,
        #[serde(rename = "purrVolume")]
        volume: Option<u8>,
        secret: String,
    }

    fn purr_model() -> Arc<SchemaModel> {
        SchemaModel::new(
            "Purr",
            json!({
                "type": "object",
                "required": ["detail", "secret"],
                "properties": {
                    "detail": {"type": "string"},
                    "purrVolume": {"type": ["integer", "null"]},
                    "secret": {"type": "string"}
                }
            }),
        )
        .with_alias("volume", "purrVolume")
        .into_ref()
    }

    fn purr() -> Purr {
        Purr {
            detail: "rrrr".to_owned(),
            volume: None,
            secret: "tuna".to_owned(),
        }
    }

    #[traced_test]
    #[tokio::test]
    async fn emit_applies_registered_projection() {
        let transport = Arc::new(MemoryTransport::new());
        let mut registry = ChannelRegistry::new(transport.clone());
        let emitter = registry
            .create_emitter::<Purr>(EmitterDescriptor::new(
                "purrs",
                purr_model(),
                EmitterOptions::with_channel(ChannelOptions::new().summary("cat purrs"))
                    .exclude(FieldSet::new().with("secret"))
                    .exclude_none(true),
            ))
            .expect("注册发送器应成功");

        emitter.emit(&purr()).await.expect("发送应成功");

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event, "purrs");
        assert_eq!(sent[0].payload, json!({"detail": "rrrr"}));
        assert!(logs_contain("emitting channel message"));
    }

    #[tokio::test]
    async fn per_call_options_replace_projection_and_route() {
        let transport = Arc::new(MemoryTransport::new());
        let mut registry = ChannelRegistry::new(transport.clone());
        let emitter = registry
            .create_emitter::<Purr>(EmitterDescriptor::new(
                "purrs",
                purr_model(),
                EmitterOptions::new().exclude_none(true),
            ))
            .unwrap();

        let options = EmitOptions::with_send(
            SendOptions::default()
                .to("lobby")
                .skip_sid(SessionId::from("sid-1")),
        )
        .projection(Projection {
            by_alias: false,
            ..Projection::default()
        });
        emitter.emit_with(&purr(), options).await.unwrap();

        let sent = transport.sent();
        assert_eq!(
            sent[0].payload,
            json!({"detail": "rrrr", "volume": Value::Null, "secret": "tuna"})
        );
        assert_eq!(sent[0].options.to.as_deref(), Some("lobby"));
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_emit_error() {
        let transport = Arc::new(MemoryTransport::new());
        let mut registry = ChannelRegistry::new(transport.clone());
        let emitter = registry
            .create_emitter::<Purr>(EmitterDescriptor::new(
                "purrs",
                purr_model(),
                EmitterOptions::new(),
            ))
            .unwrap();
        transport.close();

        let err = emitter.emit(&purr()).await.unwrap_err();
        assert_eq!(err.code(), "channel.emit.transport");
        assert!(matches!(
            err,
            EmitError::Transport {
                source: crate::error::TransportError::Closed,
                ..
            }
        ));
    }
}
