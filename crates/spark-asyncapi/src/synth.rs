//! 文档合成器。
//!
//! # 教案式说明
//! - **意图（Why）**：两种方言共享“模型收集 → 组件去重 → 元数据装配”三步，只在通道/操作的装配上分叉，
//!   因此以单个 [`synthesize`] 函数配合 [`DialectVersion`] 实现，避免两份近似的代码路径；
//! - **逻辑（How）**：
//!   1. 先处理器后发送器，按注册顺序收集去重后的模型；
//!   2. 将每个模型及其嵌套定义写入 `components.schemas`，同名不同构即报错；
//!   3. 按方言装配通道（2.x 逐字段合并，3.x 拆分通道与操作）；
//! - **契约（What）**：纯函数，不读取时钟或全局状态，相同输入产出逐字节一致的 JSON。

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use spark_channels::{ChannelMeta, RegistrySnapshot, SchemaModel};

use crate::document::{
    ASYNCAPI_V2, ASYNCAPI_V3, Action, ChannelItemV2, ChannelV3, Components, DocumentV2,
    DocumentV3, InfoV2, InfoV3, Message, OperationV2, OperationV3, Reference, ServerV3,
    SpecificationDocument,
};
use crate::error::SynthesisError;
use crate::metadata::DocumentMetadata;

/// 入站消息在 3.x 通道中的键。
pub const INBOUND_MESSAGE_KEY: &str = "inbound";
/// 出站消息在 3.x 通道中的键。
pub const OUTBOUND_MESSAGE_KEY: &str = "outbound";

/// 目标文档方言。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectVersion {
    /// AsyncAPI 2.4.0：通道内嵌 `publish` / `subscribe`。
    #[default]
    V2,
    /// AsyncAPI 3.0.0：通道与操作分离，以引用关联。
    V3,
}

impl DialectVersion {
    /// 方言对应的 `asyncapi` 字段值。
    pub fn asyncapi_version(self) -> &'static str {
        match self {
            DialectVersion::V2 => ASYNCAPI_V2,
            DialectVersion::V3 => ASYNCAPI_V3,
        }
    }
}

/// 由注册表快照与元数据合成完整文档。
///
/// # 教案级注释
/// - **前置条件 (Contract)**：快照中的模型 Schema 必须是 JSON 对象或布尔值；
/// - **后置条件 (Contract)**：空快照产出通道（及 3.x 操作）为空、`info` 与 `id` 完整的文档；
/// - **错误 (What)**：同名不同构的组件返回 [`SynthesisError::SchemaNameCollision`]；
///   3.x 中两个生效操作共用一个操作 ID 时返回 [`SynthesisError::OperationIdCollision`]。
pub fn synthesize(
    snapshot: &RegistrySnapshot,
    metadata: &DocumentMetadata,
    dialect: DialectVersion,
) -> Result<SpecificationDocument, SynthesisError> {
    let components = collect_components(snapshot)?;
    let schema_count = components.schemas.len();

    let document = match dialect {
        DialectVersion::V2 => SpecificationDocument::V2(assemble_v2(snapshot, metadata, components)),
        DialectVersion::V3 => {
            SpecificationDocument::V3(assemble_v3(snapshot, metadata, components)?)
        }
    };

    tracing::info!(
        dialect = dialect.asyncapi_version(),
        id = document.id(),
        channels = document.channel_names().len(),
        schemas = schema_count,
        "synthesized asyncapi document"
    );
    Ok(document)
}

/// 先处理器后发送器，按首次出现顺序返回去重后的模型。
fn distinct_models(snapshot: &RegistrySnapshot) -> Vec<&Arc<SchemaModel>> {
    let handler_models = snapshot.handlers().iter().filter_map(|h| h.model());
    let emitter_models = snapshot.emitters().iter().map(|e| e.model());

    let mut seen: Vec<&Arc<SchemaModel>> = Vec::new();
    for model in handler_models.chain(emitter_models) {
        let duplicate = seen
            .iter()
            .any(|known| Arc::ptr_eq(known, model) || **known == *model);
        if !duplicate {
            seen.push(model);
        }
    }
    seen
}

fn collect_components(snapshot: &RegistrySnapshot) -> Result<Components, SynthesisError> {
    let mut schemas: BTreeMap<String, Value> = BTreeMap::new();
    for model in distinct_models(snapshot) {
        for (name, schema) in model.components() {
            if !(schema.is_object() || schema.is_boolean()) {
                return Err(SynthesisError::Schema {
                    name: name.to_owned(),
                    reason: "expected a JSON object or boolean".to_owned(),
                });
            }
            match schemas.get(name) {
                Some(known) if known != schema => {
                    return Err(SynthesisError::SchemaNameCollision {
                        name: name.to_owned(),
                    });
                }
                Some(_) => {}
                None => {
                    schemas.insert(name.to_owned(), schema.clone());
                }
            }
        }
    }
    Ok(Components { schemas })
}

fn message(meta: &ChannelMeta, model: Option<&Arc<SchemaModel>>) -> Message {
    Message {
        payload: model.map(|model| Reference::new(model.reference())),
        content_type: Some(meta.media_type().to_owned()),
        name: model.map(|model| model.name().to_owned()),
        title: meta.title().map(str::to_owned),
        summary: None,
        description: meta.message_description().map(str::to_owned),
    }
}

fn assemble_v2(
    snapshot: &RegistrySnapshot,
    metadata: &DocumentMetadata,
    components: Components,
) -> DocumentV2 {
    let mut channels: BTreeMap<String, ChannelItemV2> = BTreeMap::new();

    for handler in snapshot.handlers() {
        let meta = handler.meta();
        let item = ChannelItemV2 {
            publish: Some(OperationV2 {
                operation_id: Some(handler.handler_name().to_owned()),
                summary: meta.summary().map(str::to_owned),
                description: meta.description().map(str::to_owned),
                message: message(meta, handler.model()),
            }),
            ..ChannelItemV2::default()
        };
        channels
            .entry(handler.event().to_owned())
            .or_default()
            .merge_from(item);
    }

    for emitter in snapshot.emitters() {
        let meta = emitter.meta();
        let item = ChannelItemV2 {
            subscribe: Some(OperationV2 {
                operation_id: emitter.operation_id().map(str::to_owned),
                summary: meta.summary().map(str::to_owned),
                description: meta.description().map(str::to_owned),
                message: message(meta, Some(emitter.model())),
            }),
            ..ChannelItemV2::default()
        };
        channels
            .entry(emitter.event().to_owned())
            .or_default()
            .merge_from(item);
    }

    DocumentV2 {
        asyncapi: ASYNCAPI_V2.to_owned(),
        id: metadata.document_id(),
        info: InfoV2 {
            title: metadata.title().to_owned(),
            version: metadata.version().to_owned(),
            description: metadata.description_text().map(str::to_owned),
            terms_of_service: metadata.terms_of_service_url().cloned(),
            contact: metadata.contact_info().cloned(),
            license: metadata.license_info().cloned(),
        },
        servers: metadata.server_map().clone(),
        default_content_type: metadata.content_type().to_owned(),
        channels,
        components,
        tags: metadata.tag_list().to_vec(),
        external_docs: metadata.external_docs_info().cloned(),
    }
}

/// JSON Pointer 片段转义：`~` → `~0`，`/` → `~1`。
fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn operation_v3(
    event: &str,
    meta: &ChannelMeta,
    action: Action,
    message_key: &str,
) -> OperationV3 {
    let channel = escape_pointer(event);
    OperationV3 {
        action,
        channel: Reference::new(format!("#/channels/{channel}")),
        summary: meta.summary().map(str::to_owned),
        description: meta.description().map(str::to_owned),
        messages: vec![Reference::new(format!(
            "#/channels/{channel}/messages/{message_key}"
        ))],
    }
}

/// 把操作写入 3.x 操作表。
///
/// 同一事件、同一方向上后注册者生效：先移除该事件此前的操作，再检查操作 ID 是否仍被其他操作占用。
fn place_operation<'a>(
    operations: &mut BTreeMap<String, OperationV3>,
    owners: &mut BTreeMap<&'a str, String>,
    event: &'a str,
    operation_id: String,
    operation: OperationV3,
) -> Result<(), SynthesisError> {
    if let Some(previous) = owners.remove(event) {
        operations.remove(&previous);
    }
    if operations.contains_key(&operation_id) {
        return Err(SynthesisError::OperationIdCollision { operation_id });
    }
    owners.insert(event, operation_id.clone());
    operations.insert(operation_id, operation);
    Ok(())
}

fn assemble_v3(
    snapshot: &RegistrySnapshot,
    metadata: &DocumentMetadata,
    components: Components,
) -> Result<DocumentV3, SynthesisError> {
    let mut channels: BTreeMap<String, ChannelV3> = BTreeMap::new();
    let mut operations: BTreeMap<String, OperationV3> = BTreeMap::new();
    let mut inbound_owners: BTreeMap<&str, String> = BTreeMap::new();
    let mut outbound_owners: BTreeMap<&str, String> = BTreeMap::new();

    for handler in snapshot.handlers() {
        let event = handler.event();
        channels
            .entry(event.to_owned())
            .or_insert_with(|| ChannelV3::new(event))
            .messages
            .insert(
                INBOUND_MESSAGE_KEY.to_owned(),
                message(handler.meta(), handler.model()),
            );
        place_operation(
            &mut operations,
            &mut inbound_owners,
            event,
            handler.handler_name().to_owned(),
            operation_v3(event, handler.meta(), Action::Send, INBOUND_MESSAGE_KEY),
        )?;
    }

    for emitter in snapshot.emitters() {
        let event = emitter.event();
        channels
            .entry(event.to_owned())
            .or_insert_with(|| ChannelV3::new(event))
            .messages
            .insert(
                OUTBOUND_MESSAGE_KEY.to_owned(),
                message(emitter.meta(), Some(emitter.model())),
            );
        let operation_id = emitter
            .operation_id()
            .map_or_else(|| format!("emit_{event}"), str::to_owned);
        place_operation(
            &mut operations,
            &mut outbound_owners,
            event,
            operation_id,
            operation_v3(event, emitter.meta(), Action::Receive, OUTBOUND_MESSAGE_KEY),
        )?;
    }

    Ok(DocumentV3 {
        asyncapi: ASYNCAPI_V3.to_owned(),
        id: metadata.document_id(),
        info: InfoV3 {
            title: metadata.title().to_owned(),
            version: metadata.version().to_owned(),
            description: metadata.description_text().map(str::to_owned),
            terms_of_service: metadata.terms_of_service_url().cloned(),
            contact: metadata.contact_info().cloned(),
            license: metadata.license_info().cloned(),
            tags: metadata.tag_list().to_vec(),
            external_docs: metadata.external_docs_info().cloned(),
        },
        servers: metadata
            .server_map()
            .iter()
            .map(|(name, server)| (name.clone(), ServerV3::from(server)))
            .collect(),
        default_content_type: metadata.content_type().to_owned(),
        channels,
        operations,
        components,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use spark_channels::{ChannelOptions, EmitterDescriptor, EmitterOptions, HandlerDescriptor};
    use tracing_test::traced_test;

    fn model(name: &str, schema: Value) -> Arc<SchemaModel> {
        SchemaModel::new(name, schema).into_ref()
    }

    #[test]
    fn pointer_segments_are_escaped() {
        assert_eq!(escape_pointer("chat/rooms~1"), "chat~1rooms~01");
    }

    #[test]
    fn dialect_parses_from_lowercase_names() {
        let dialect: DialectVersion = serde_json::from_value(json!("v3")).unwrap();
        assert_eq!(dialect, DialectVersion::V3);
        assert_eq!(DialectVersion::default().asyncapi_version(), "2.4.0");
    }

    #[test]
    fn shared_model_is_collected_once() {
        let shared = model("Purr", json!({"type": "object"}));
        let snapshot = RegistrySnapshot::new(
            [HandlerDescriptor::new("a", "handle_a", ChannelOptions::new())
                .with_model(Arc::clone(&shared))],
            [
                EmitterDescriptor::new("b", Arc::clone(&shared), EmitterOptions::new()),
                EmitterDescriptor::new(
                    "c",
                    model("Purr", json!({"type": "object"})),
                    EmitterOptions::new(),
                ),
            ],
        );
        assert_eq!(distinct_models(&snapshot).len(), 1);
        let components = collect_components(&snapshot).unwrap();
        assert_eq!(components.schemas.len(), 1);
    }

    #[test]
    fn hand_built_collision_is_reported() {
        let snapshot = RegistrySnapshot::new(
            Vec::<HandlerDescriptor>::new(),
            [
                EmitterDescriptor::new(
                    "a",
                    model("Purr", json!({"type": "object"})),
                    EmitterOptions::new(),
                ),
                EmitterDescriptor::new(
                    "b",
                    model("Purr", json!({"type": "string"})),
                    EmitterOptions::new(),
                ),
            ],
        );
        let err = collect_components(&snapshot).unwrap_err();
        assert_eq!(
            err,
            SynthesisError::SchemaNameCollision {
                name: "Purr".to_owned()
            }
        );
    }

    #[test]
    fn non_schema_values_are_rejected() {
        let snapshot = RegistrySnapshot::new(
            Vec::<HandlerDescriptor>::new(),
            [EmitterDescriptor::new(
                "a",
                model("Purr", json!(42)),
                EmitterOptions::new(),
            )],
        );
        let err = collect_components(&snapshot).unwrap_err();
        assert_eq!(err.code(), "asyncapi.synthesis.schema");
    }

    #[traced_test]
    #[test]
    fn synthesis_is_logged_with_counts() {
        let snapshot = RegistrySnapshot::new(
            [HandlerDescriptor::new("rubs", "handle_rub", ChannelOptions::new())],
            Vec::<EmitterDescriptor>::new(),
        );
        synthesize(
            &snapshot,
            &DocumentMetadata::new("Cats", "1.0"),
            DialectVersion::V3,
        )
        .expect("合成应成功");
        assert!(logs_contain("synthesized asyncapi document"));
        assert!(logs_contain("channels=1"));
    }
}
