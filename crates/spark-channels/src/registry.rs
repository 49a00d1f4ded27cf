use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::descriptor::{EmitterDescriptor, HandlerDescriptor};
use crate::emitter::Emitter;
use crate::error::RegistrationError;
use crate::model::SchemaModel;
use crate::transport::{EventHandler, Transport};

/// `ChannelRegistry` 维护一个应用实例内全部入站与出站通道。
///
/// # 教案级注释
/// - **目标 (Why)**
///   - 在启动阶段集中登记处理器与发送器，保证“运行时分发”与“文档描述”始终一致；
///   - 在注册时即捕获模型命名冲突，避免文档合成阶段才暴露问题。
/// - **架构位置 (Where)**
///   - 由宿主（`spark-channels-host`）持有；文档合成器只消费 [`RegistrySnapshot`]。
/// - **设计要点 (How)**
///   - 处理器与发送器分别保存在按注册顺序排列的 `Vec<Arc<_>>` 中，只追加不删除；
///   - `models` 以 `BTreeMap` 记录已出现的组件名与 Schema，用于冲突检测；
///   - 注册接口接收 `&mut self`：注册阶段单线程完成，合成阶段只读快照，二者由借用规则隔离。
/// - **契约 (What)**
///   - 处理器注册会先调用 [`Transport::bind_handler`]，绑定失败时不追加描述符；
///   - 同一事件名允许重复注册，文档合成时后注册者覆盖先注册者；
///   - 同名但结构不同的模型返回 [`RegistrationError::ModelNameCollision`]，先注册者保留。
pub struct ChannelRegistry {
    transport: Arc<dyn Transport>,
    handlers: Vec<Arc<HandlerDescriptor>>,
    emitters: Vec<Arc<EmitterDescriptor>>,
    models: BTreeMap<String, Value>,
}

impl fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers: Vec<&str> = self.handlers.iter().map(|h| h.event()).collect();
        let emitters: Vec<&str> = self.emitters.iter().map(|e| e.event()).collect();
        f.debug_struct("ChannelRegistry")
            .field("handlers", &handlers)
            .field("emitters", &emitters)
            .finish()
    }
}

impl ChannelRegistry {
    /// 以传输层句柄创建空注册表。
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            handlers: Vec::new(),
            emitters: Vec::new(),
            models: BTreeMap::new(),
        }
    }

    /// 传输层句柄。
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// 注册入站处理器。
    ///
    /// # 教案级注释
    /// - **执行逻辑 (How)**
    ///   1. 校验事件名与处理器名称非空；
    ///   2. 检查模型及其嵌套定义是否与已登记的同名 Schema 冲突；
    ///   3. 调用传输层绑定回调，失败则原样包装为 [`RegistrationError::Binding`]；
    ///   4. 登记模型并追加描述符。
    /// - **后置条件 (What)**：成功后处理器既可被传输层分发，也会出现在下一次文档合成中。
    pub fn register_handler(
        &mut self,
        descriptor: HandlerDescriptor,
        handler: EventHandler,
    ) -> Result<(), RegistrationError> {
        let event = descriptor.event();
        if event.is_empty() {
            return Err(RegistrationError::EmptyEvent);
        }
        if descriptor.handler_name().is_empty() {
            return Err(RegistrationError::EmptyHandlerName {
                event: event.to_owned(),
            });
        }
        if let Some(model) = descriptor.model() {
            self.check_model(model)?;
        }

        self.transport
            .bind_handler(event, handler)
            .map_err(|source| RegistrationError::Binding {
                event: event.to_owned(),
                source,
            })?;

        if let Some(model) = descriptor.model() {
            self.remember_model(model);
        }
        tracing::debug!(
            event,
            handler = descriptor.handler_name(),
            model = descriptor.model().map(|model| model.name()),
            "registered channel handler"
        );
        self.handlers.push(Arc::new(descriptor));
        Ok(())
    }

    /// 注册出站发送器并返回发送能力。
    ///
    /// 失败路径与 [`register_handler`](Self::register_handler) 一致，但不涉及传输层绑定。
    pub fn create_emitter<T: Serialize>(
        &mut self,
        descriptor: EmitterDescriptor,
    ) -> Result<Emitter<T>, RegistrationError> {
        if descriptor.event().is_empty() {
            return Err(RegistrationError::EmptyEvent);
        }
        self.check_model(descriptor.model())?;
        self.remember_model(descriptor.model());

        tracing::debug!(
            event = descriptor.event(),
            model = descriptor.model().name(),
            "registered channel emitter"
        );
        let descriptor = Arc::new(descriptor);
        self.emitters.push(Arc::clone(&descriptor));
        Ok(Emitter::new(descriptor, Arc::clone(&self.transport)))
    }

    /// 返回只读快照，顺序与注册顺序一致。
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            handlers: Arc::from(self.handlers.as_slice()),
            emitters: Arc::from(self.emitters.as_slice()),
        }
    }

    /// 已注册的处理器数量。
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// 已注册的发送器数量。
    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    fn check_model(&self, model: &SchemaModel) -> Result<(), RegistrationError> {
        for (name, schema) in model.components() {
            if let Some(known) = self.models.get(name) {
                if known != schema {
                    return Err(RegistrationError::ModelNameCollision {
                        name: name.to_owned(),
                    });
                }
            }
        }
        Ok(())
    }

    fn remember_model(&mut self, model: &SchemaModel) {
        for (name, schema) in model.components() {
            self.models
                .entry(name.to_owned())
                .or_insert_with(|| schema.clone());
        }
    }
}

/// 注册表的只读快照。
///
/// # 教案式说明
/// - **意图（Why）**：文档合成需要一个与注册表解耦的不可变视图，快照内部以 `Arc<[_]>` 共享描述符，
///   克隆成本与通道数量无关；
/// - **契约（What）**：元素顺序即注册顺序；快照创建后不会再观察到新的注册。
#[derive(Clone, Debug, Default)]
pub struct RegistrySnapshot {
    handlers: Arc<[Arc<HandlerDescriptor>]>,
    emitters: Arc<[Arc<EmitterDescriptor>]>,
}

impl RegistrySnapshot {
    /// 直接由描述符集合构造快照，主要用于测试与离线文档生成。
    pub fn new(
        handlers: impl IntoIterator<Item = HandlerDescriptor>,
        emitters: impl IntoIterator<Item = EmitterDescriptor>,
    ) -> Self {
        Self {
            handlers: handlers.into_iter().map(Arc::new).collect(),
            emitters: emitters.into_iter().map(Arc::new).collect(),
        }
    }

    /// 全部处理器描述符。
    pub fn handlers(&self) -> &[Arc<HandlerDescriptor>] {
        &self.handlers
    }

    /// 全部发送器描述符。
    pub fn emitters(&self) -> &[Arc<EmitterDescriptor>] {
        &self.emitters
    }

    /// 通道总数（处理器与发送器之和）。
    pub fn len(&self) -> usize {
        self.handlers.len() + self.emitters.len()
    }

    /// 是否没有任何通道。
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty() && self.emitters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ChannelOptions, EmitterOptions};
    use crate::error::TransportError;
    use crate::testing::MemoryTransport;
    use crate::transport::handler_fn;
    use proptest::prelude::*;
    use serde_json::json;

    fn noop() -> EventHandler {
        handler_fn(|_sid, _payload| async { Ok(None) })
    }

    fn purr(schema: Value) -> Arc<SchemaModel> {
        SchemaModel::new("Purr", schema).into_ref()
    }

    #[test]
    fn handler_registration_binds_transport() {
        let transport = Arc::new(MemoryTransport::new());
        let mut registry = ChannelRegistry::new(transport.clone());

        registry
            .register_handler(
                HandlerDescriptor::new("rubs", "handle_rub", ChannelOptions::new()),
                noop(),
            )
            .expect("注册应成功");

        assert_eq!(transport.bound_events(), vec!["rubs".to_owned()]);
        assert_eq!(registry.snapshot().handlers().len(), 1);
    }

    #[test]
    fn binding_failure_is_propagated_and_not_recorded() {
        let transport = Arc::new(MemoryTransport::new());
        transport.reject_bindings("maintenance");
        let mut registry = ChannelRegistry::new(transport);

        let err = registry
            .register_handler(
                HandlerDescriptor::new("rubs", "handle_rub", ChannelOptions::new()),
                noop(),
            )
            .expect_err("传输层拒绝时注册应失败");

        assert_eq!(err.code(), "channel.registration.binding");
        assert!(matches!(
            err,
            RegistrationError::Binding {
                source: TransportError::Rejected { .. },
                ..
            }
        ));
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn empty_event_and_name_are_rejected() {
        let mut registry = ChannelRegistry::new(Arc::new(MemoryTransport::new()));
        let err = registry
            .register_handler(HandlerDescriptor::new("", "h", ChannelOptions::new()), noop())
            .unwrap_err();
        assert!(matches!(err, RegistrationError::EmptyEvent));

        let err = registry
            .register_handler(HandlerDescriptor::new("e", "", ChannelOptions::new()), noop())
            .unwrap_err();
        assert!(matches!(err, RegistrationError::EmptyHandlerName { .. }));

        let err = registry
            .create_emitter::<Value>(EmitterDescriptor::new(
                "",
                purr(json!({"type": "object"})),
                EmitterOptions::new(),
            ))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::EmptyEvent));
    }

    #[test]
    fn same_model_on_many_channels_is_accepted() {
        let mut registry = ChannelRegistry::new(Arc::new(MemoryTransport::new()));
        let model = purr(json!({"type": "object"}));
        for event in ["a", "b"] {
            registry
                .create_emitter::<Value>(EmitterDescriptor::new(
                    event,
                    Arc::clone(&model),
                    EmitterOptions::new(),
                ))
                .expect("同一模型可被多个通道复用");
        }
        // 结构一致但实例不同的模型同样视为同一模型。
        registry
            .create_emitter::<Value>(EmitterDescriptor::new(
                "c",
                purr(json!({"type": "object"})),
                EmitterOptions::new(),
            ))
            .expect("结构一致的同名模型应被接受");
        assert_eq!(registry.emitter_count(), 3);
    }

    #[test]
    fn conflicting_model_names_keep_first_registration() {
        let mut registry = ChannelRegistry::new(Arc::new(MemoryTransport::new()));
        registry
            .create_emitter::<Value>(EmitterDescriptor::new(
                "purrs",
                purr(json!({"type": "object", "properties": {"detail": {"type": "string"}}})),
                EmitterOptions::new(),
            ))
            .unwrap();

        let err = registry
            .create_emitter::<Value>(EmitterDescriptor::new(
                "growls",
                purr(json!({"type": "object", "properties": {"volume": {"type": "integer"}}})),
                EmitterOptions::new(),
            ))
            .unwrap_err();

        assert_eq!(err.code(), "channel.registration.model_collision");
        assert_eq!(registry.emitter_count(), 1);
        assert_eq!(registry.snapshot().emitters()[0].event(), "purrs");
    }

    #[test]
    fn nested_definitions_participate_in_collision_checks() {
        let mut registry = ChannelRegistry::new(Arc::new(MemoryTransport::new()));
        let owner = SchemaModel::new("Cat", json!({"type": "object"}))
            .with_definition("Owner", json!({"type": "object", "title": "v1"}))
            .into_ref();
        registry
            .register_handler(
                HandlerDescriptor::new("pets", "handle_pet", ChannelOptions::new())
                    .with_model(owner),
                noop(),
            )
            .unwrap();

        let clash = SchemaModel::new("Owner", json!({"type": "object", "title": "v2"})).into_ref();
        let err = registry
            .create_emitter::<Value>(EmitterDescriptor::new("owners", clash, EmitterOptions::new()))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::ModelNameCollision { ref name } if name == "Owner"));
    }

    proptest! {
        #[test]
        fn snapshot_preserves_registration_order(
            handlers in proptest::collection::vec("[a-z]{1,8}", 0..16),
            emitters in proptest::collection::vec("[a-z]{1,8}", 0..16),
        ) {
            let mut registry = ChannelRegistry::new(Arc::new(MemoryTransport::new()));
            let model = purr(json!({"type": "object"}));
            for event in &handlers {
                registry
                    .register_handler(
                        HandlerDescriptor::new(event.as_str(), format!("handle_{event}"), ChannelOptions::new()),
                        noop(),
                    )
                    .unwrap();
            }
            for event in &emitters {
                registry
                    .create_emitter::<Value>(EmitterDescriptor::new(
                        event.as_str(),
                        Arc::clone(&model),
                        EmitterOptions::new(),
                    ))
                    .unwrap();
            }

            let snapshot = registry.snapshot();
            prop_assert_eq!(snapshot.handlers().len(), handlers.len());
            prop_assert_eq!(snapshot.emitters().len(), emitters.len());
            let seen_handlers: Vec<&str> = snapshot.handlers().iter().map(|h| h.event()).collect();
            let seen_emitters: Vec<&str> = snapshot.emitters().iter().map(|e| e.event()).collect();
            let expected_handlers: Vec<&str> = handlers.iter().map(String::as_str).collect();
            let expected_emitters: Vec<&str> = emitters.iter().map(String::as_str).collect();
            prop_assert_eq!(seen_handlers, expected_handlers);
            prop_assert_eq!(seen_emitters, expected_emitters);
        }
    }
}
