#![doc = r#"
# spark-channels

## 设计动机（Why）
- 为实时事件服务提供“类型化通道”的统一登记点：每个入站处理器与出站发送器都以描述符形式登记，
  运行时分发与接口文档共享同一份事实来源；
- 与具体传输层解耦：本 crate 只依赖 [`Transport`] 的“绑定回调 / 发送”两个原语，
  连接、房间与线协议全部委托给外部实现。

## 核心契约（What）
- [`ChannelRegistry`] 负责校验与登记，注册失败时返回 [`RegistrationError`] 并保持注册表不变；
- [`Emitter`] 在发送前执行序列化与 [`Projection`] 投影，传输层错误以 [`EmitError`] 原样返回；
- [`RegistrySnapshot`] 是文档合成器的唯一输入，顺序与注册顺序一致。

## 实现策略（How）
- 负载模型以 [`SchemaModel`] 表达，默认通过 `schemars` 从 Rust 类型推导；
- 描述符在注册后不可变，注册表与发送器之间通过 `Arc` 共享；
- `test-util` 特性提供 [`testing::MemoryTransport`]，用于在不启动真实连接的情况下验证完整链路。
"#]

mod descriptor;
mod emitter;
mod error;
mod model;
mod projection;
mod registry;
mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use descriptor::{
    ChannelMeta, ChannelOptions, DEFAULT_MEDIA_TYPE, EmitterDescriptor, EmitterOptions,
    HandlerDescriptor,
};
pub use emitter::{EmitOptions, Emitter};
pub use error::{EmitError, HandlerError, RegistrationError, TransportError};
pub use model::{COMPONENTS_SCHEMA_PREFIX, ModelRef, SchemaModel};
pub use projection::{FieldSet, Projection};
pub use registry::{ChannelRegistry, RegistrySnapshot};
pub use transport::{
    EventHandler, HandlerResult, SendOptions, SessionId, Transport, TransportControl, handler_fn,
};

#[cfg(feature = "schemars")]
pub use schemars;
