//! 文档合成的端到端契约：注册表 → 快照 → 两种方言的 JSON。

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use proptest::prelude::*;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Value, json};
use spark_asyncapi::{DialectVersion, DocumentMetadata, Server, SynthesisError, synthesize};
use spark_channels::testing::MemoryTransport;
use spark_channels::{
    ChannelOptions, ChannelRegistry, EmitterDescriptor, EmitterOptions, HandlerDescriptor,
    RegistrySnapshot, SchemaModel, handler_fn,
};

#[derive(Serialize, JsonSchema)]
#[allow(dead_code)]
struct BellyRub {
    r#where: String,
    count: u32,
}

#[derive(Serialize, JsonSchema)]
#[allow(dead_code)]
struct Purr {
    detail: String,
    loudness: u8,
}

fn metadata() -> DocumentMetadata {
    DocumentMetadata::new("Cat Service", "1.0.0").description("Realtime cat events")
}

fn cat_registry() -> ChannelRegistry {
    let mut registry = ChannelRegistry::new(Arc::new(MemoryTransport::new()));
    registry
        .register_handler(
            HandlerDescriptor::new(
                "rubs",
                "handle_rub",
                ChannelOptions::new()
                    .summary("Rub the belly")
                    .message_description("Where and how often"),
            )
            .with_model(
                SchemaModel::of::<BellyRub>()
                    .expect("BellyRub 的 Schema 应可推导")
                    .into_ref(),
            ),
            handler_fn(|_, _| async { Ok(None) }),
        )
        .expect("注册处理器应成功");
    registry
        .create_emitter::<Purr>(EmitterDescriptor::new(
            "purrs",
            SchemaModel::of::<Purr>()
                .expect("Purr 的 Schema 应可推导")
                .into_ref(),
            EmitterOptions::with_channel(ChannelOptions::new().title("Purr")),
        ))
        .expect("注册发送器应成功");
    registry
}

fn render(snapshot: &RegistrySnapshot, dialect: DialectVersion) -> Value {
    synthesize(snapshot, &metadata(), dialect)
        .expect("合成应成功")
        .to_value()
        .expect("文档应可序列化")
}

fn keys(value: &Value) -> Vec<&str> {
    value
        .as_object()
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

#[test]
fn cat_scenario_documents_channels_and_components() {
    let document = render(&cat_registry().snapshot(), DialectVersion::V2);

    assert_eq!(document["asyncapi"], "2.4.0");
    assert_eq!(document["id"], "urn:com:cat_service");
    assert_eq!(document["defaultContentType"], "application/json");
    assert_eq!(keys(&document["channels"]), vec!["purrs", "rubs"]);
    assert_eq!(keys(&document["components"]["schemas"]), vec!["BellyRub", "Purr"]);

    let publish = &document["channels"]["rubs"]["publish"];
    assert_eq!(publish["operationId"], "handle_rub");
    assert_eq!(publish["summary"], "Rub the belly");
    assert_eq!(
        publish["message"],
        json!({
            "payload": {"$ref": "#/components/schemas/BellyRub"},
            "contentType": "application/json",
            "name": "BellyRub",
            "description": "Where and how often"
        })
    );

    let subscribe = &document["channels"]["purrs"]["subscribe"];
    assert!(subscribe.get("operationId").is_none());
    assert_eq!(subscribe["message"]["title"], "Purr");
    assert!(document["channels"]["purrs"].get("publish").is_none());
}

#[test]
fn synthesis_is_byte_for_byte_deterministic() {
    let snapshot = cat_registry().snapshot();
    for dialect in [DialectVersion::V2, DialectVersion::V3] {
        let first = synthesize(&snapshot, &metadata(), dialect)
            .unwrap()
            .to_json()
            .unwrap();
        let second = synthesize(&snapshot, &metadata(), dialect)
            .unwrap()
            .to_json()
            .unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn empty_registry_yields_valid_document() {
    let snapshot = RegistrySnapshot::default();

    let v2 = render(&snapshot, DialectVersion::V2);
    assert_eq!(v2["channels"], json!({}));
    assert_eq!(v2["servers"], json!({}));
    assert_eq!(v2["components"], json!({"schemas": {}}));
    assert_eq!(v2["info"]["title"], "Cat Service");
    assert_eq!(v2["id"], "urn:com:cat_service");

    let v3 = render(&snapshot, DialectVersion::V3);
    assert_eq!(v3["asyncapi"], "3.0.0");
    assert_eq!(v3["channels"], json!({}));
    assert_eq!(v3["operations"], json!({}));
    assert_eq!(v3["info"]["version"], "1.0.0");
}

#[test]
fn handler_and_emitter_on_same_event_merge_into_one_channel() {
    let echo = SchemaModel::new("Echo", json!({"type": "object"})).into_ref();
    let snapshot = RegistrySnapshot::new(
        [HandlerDescriptor::new("echo", "handle_echo", ChannelOptions::new())
            .with_model(Arc::clone(&echo))],
        [EmitterDescriptor::new(
            "echo",
            echo,
            EmitterOptions::new().operation_id("send_echo"),
        )],
    );

    let v2 = render(&snapshot, DialectVersion::V2);
    assert_eq!(keys(&v2["channels"]), vec!["echo"]);
    assert_eq!(v2["channels"]["echo"]["publish"]["operationId"], "handle_echo");
    assert_eq!(v2["channels"]["echo"]["subscribe"]["operationId"], "send_echo");

    let v3 = render(&snapshot, DialectVersion::V3);
    assert_eq!(keys(&v3["channels"]), vec!["echo"]);
    assert_eq!(keys(&v3["channels"]["echo"]["messages"]), vec!["inbound", "outbound"]);
    assert_eq!(keys(&v3["operations"]), vec!["handle_echo", "send_echo"]);
    assert_eq!(
        v3["operations"]["handle_echo"]["channel"],
        v3["operations"]["send_echo"]["channel"]
    );
}

#[test]
fn later_handler_on_same_event_wins() {
    let snapshot = RegistrySnapshot::new(
        [
            HandlerDescriptor::new("rubs", "first", ChannelOptions::new().summary("old")),
            HandlerDescriptor::new("rubs", "second", ChannelOptions::new()),
        ],
        Vec::<EmitterDescriptor>::new(),
    );
    let document = render(&snapshot, DialectVersion::V2);
    let publish = &document["channels"]["rubs"]["publish"];
    assert_eq!(publish["operationId"], "second");
    assert!(publish.get("summary").is_none());
    // 无模型时省略 payload。
    assert!(publish["message"].get("payload").is_none());
}

#[test]
fn later_handler_on_same_event_replaces_operation_in_dialect_b() {
    let snapshot = RegistrySnapshot::new(
        [
            HandlerDescriptor::new("rubs", "first", ChannelOptions::new().summary("old"))
                .with_model(SchemaModel::new("Scratch", json!({"type": "object"})).into_ref()),
            HandlerDescriptor::new("rubs", "second", ChannelOptions::new())
                .with_model(SchemaModel::new("Rub", json!({"type": "object"})).into_ref()),
        ],
        Vec::<EmitterDescriptor>::new(),
    );
    let document = render(&snapshot, DialectVersion::V3);

    assert_eq!(keys(&document["operations"]), vec!["second"]);
    assert!(document["operations"]["second"].get("summary").is_none());
    assert_eq!(document["channels"]["rubs"]["messages"]["inbound"]["name"], "Rub");
}

#[test]
fn later_emitter_on_same_event_replaces_operation_in_dialect_b() {
    let purr = SchemaModel::new("Purr", json!({"type": "object"})).into_ref();
    let snapshot = RegistrySnapshot::new(
        Vec::<HandlerDescriptor>::new(),
        [
            EmitterDescriptor::new("purrs", Arc::clone(&purr), EmitterOptions::new()),
            EmitterDescriptor::new("purrs", purr, EmitterOptions::new().operation_id("purr_loudly")),
        ],
    );
    let document = render(&snapshot, DialectVersion::V3);
    assert_eq!(keys(&document["operations"]), vec!["purr_loudly"]);
}

#[test]
fn shared_operation_id_across_channels_is_rejected() {
    let purr = SchemaModel::new("Purr", json!({"type": "object"})).into_ref();
    let snapshot = RegistrySnapshot::new(
        [HandlerDescriptor::new("echo", "emit_purrs", ChannelOptions::new())],
        [EmitterDescriptor::new("purrs", purr, EmitterOptions::new())],
    );

    let err = synthesize(&snapshot, &metadata(), DialectVersion::V3).unwrap_err();
    assert_eq!(
        err,
        SynthesisError::OperationIdCollision {
            operation_id: "emit_purrs".to_owned()
        }
    );
    assert_eq!(err.code(), "asyncapi.synthesis.operation_collision");

    // 2.x 的操作 ID 挂在各自的通道下，不会互相覆盖。
    let v2 = render(&snapshot, DialectVersion::V2);
    assert_eq!(keys(&v2["channels"]), vec!["echo", "purrs"]);
}

#[test]
fn same_handler_name_on_two_events_is_rejected() {
    let snapshot = RegistrySnapshot::new(
        [
            HandlerDescriptor::new("rubs", "handle", ChannelOptions::new()),
            HandlerDescriptor::new("pets", "handle", ChannelOptions::new()),
        ],
        Vec::<EmitterDescriptor>::new(),
    );
    let err = synthesize(&snapshot, &metadata(), DialectVersion::V3).unwrap_err();
    assert_eq!(err.code(), "asyncapi.synthesis.operation_collision");
}

#[test]
fn operation_channel_split_in_dialect_b() {
    let snapshot = cat_registry().snapshot();
    let metadata = metadata().server("production", Server::new("wss://cats.example.com/sio", "wss"));
    let document = synthesize(&snapshot, &metadata, DialectVersion::V3)
        .unwrap()
        .to_value()
        .unwrap();

    assert_eq!(
        document["servers"]["production"],
        json!({"host": "cats.example.com", "protocol": "wss", "pathname": "/sio"})
    );
    assert_eq!(document["channels"]["rubs"]["address"], "rubs");
    assert_eq!(
        document["channels"]["rubs"]["messages"]["inbound"]["payload"],
        json!({"$ref": "#/components/schemas/BellyRub"})
    );

    let rub = &document["operations"]["handle_rub"];
    assert_eq!(rub["action"], "send");
    assert_eq!(rub["channel"], json!({"$ref": "#/channels/rubs"}));
    assert_eq!(
        rub["messages"],
        json!([{"$ref": "#/channels/rubs/messages/inbound"}])
    );

    let purr = &document["operations"]["emit_purrs"];
    assert_eq!(purr["action"], "receive");
    assert_eq!(
        purr["messages"],
        json!([{"$ref": "#/channels/purrs/messages/outbound"}])
    );
    assert!(document.get("tags").is_none());
}

#[test]
fn colliding_model_names_keep_first_schema() {
    let mut registry = ChannelRegistry::new(Arc::new(MemoryTransport::new()));
    let first = json!({"type": "object", "properties": {"detail": {"type": "string"}}});
    registry
        .create_emitter::<Value>(EmitterDescriptor::new(
            "purrs",
            SchemaModel::new("Purr", first.clone()).into_ref(),
            EmitterOptions::new(),
        ))
        .unwrap();
    let rejected = registry.create_emitter::<Value>(EmitterDescriptor::new(
        "growls",
        SchemaModel::new("Purr", json!({"type": "integer"})).into_ref(),
        EmitterOptions::new(),
    ));
    assert!(rejected.is_err());

    let document = render(&registry.snapshot(), DialectVersion::V2);
    assert_eq!(document["components"]["schemas"]["Purr"], first);
    assert_eq!(keys(&document["channels"]), vec!["purrs"]);
}

proptest! {
    #[test]
    fn every_registered_event_becomes_one_channel(
        events in proptest::collection::vec("[a-z]{1,6}(/[a-z]{1,4})?", 0..12),
    ) {
        let handlers: Vec<HandlerDescriptor> = events
            .iter()
            .enumerate()
            .map(|(index, event)| {
                HandlerDescriptor::new(event.as_str(), format!("handle_{index}"), ChannelOptions::new())
            })
            .collect();
        let snapshot = RegistrySnapshot::new(handlers, Vec::<EmitterDescriptor>::new());
        let distinct: BTreeSet<&str> = events.iter().map(String::as_str).collect();
        // 同一事件上最后注册的处理器生效。
        let winners: BTreeMap<&str, usize> = events
            .iter()
            .enumerate()
            .map(|(index, event)| (event.as_str(), index))
            .collect();

        let v2 = render(&snapshot, DialectVersion::V2);
        prop_assert_eq!(keys(&v2["channels"]), distinct.iter().copied().collect::<Vec<_>>());

        let v3 = render(&snapshot, DialectVersion::V3);
        prop_assert_eq!(keys(&v3["channels"]).len(), distinct.len());
        prop_assert_eq!(keys(&v3["operations"]).len(), distinct.len());
        for (event, index) in winners {
            let expected = format!("#/channels/{}", event.replace('/', "~1"));
            prop_assert_eq!(
                &v3["operations"][format!("handle_{index}")]["channel"]["$ref"],
                &json!(expected)
            );
        }
    }
}
