//! 通道描述符。
//!
//! # 教案式说明
//! - **意图（Why）**：把“一个入站处理器”或“一个出站发送器”的文档元数据固化为不可变记录，
//!   注册表与文档合成器只读共享；
//! - **逻辑（How）**：公共字段集中在 [`ChannelMeta`]，[`HandlerDescriptor`] 追加操作 ID 与可选模型，
//!   [`EmitterDescriptor`] 追加必填模型与发送期投影策略；
//! - **契约（What）**：描述符在注册后不再修改，校验由 [`ChannelRegistry`](crate::ChannelRegistry)
//!   在注册入口完成。

use crate::model::ModelRef;
use crate::projection::{FieldSet, Projection};

/// 默认的消息媒体类型。
pub const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// 通道注册时可选的文档元数据。
///
/// `media_type` 缺省为 [`DEFAULT_MEDIA_TYPE`]。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelOptions {
    /// 消息标题。
    pub title: Option<String>,
    /// 操作摘要。
    pub summary: Option<String>,
    /// 操作描述。
    pub description: Option<String>,
    /// 消息描述。
    pub message_description: Option<String>,
    /// 消息媒体类型。
    pub media_type: Option<String>,
}

impl ChannelOptions {
    /// 创建空选项。
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置标题。
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// 设置摘要。
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// 设置描述。
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 设置消息描述。
    #[must_use]
    pub fn message_description(mut self, description: impl Into<String>) -> Self {
        self.message_description = Some(description.into());
        self
    }

    /// 设置媒体类型。
    #[must_use]
    pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// 发送器专属的注册选项：文档元数据 + 投影策略。
///
/// # 教案式说明
/// - **意图（Why）**：发送器在注册时就确定负载的投影方式，避免每次发送重复传参；
/// - **契约（What）**：`by_alias` 缺省为 `true`，其余开关缺省为 `false`；`operation_id`
///   为文档中的操作 ID，未设置时由合成器按方言决定。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitterOptions {
    /// 通用通道元数据。
    pub channel: ChannelOptions,
    /// 文档中的操作 ID。
    pub operation_id: Option<String>,
    /// 仅保留的字段路径。
    pub include: Option<FieldSet>,
    /// 需要剔除的字段路径。
    pub exclude: Option<FieldSet>,
    /// 是否以序列化别名输出字段。
    pub by_alias: bool,
    /// 是否剔除未显式设置的字段。
    pub exclude_unset: bool,
    /// 是否剔除等于默认值的字段。
    pub exclude_defaults: bool,
    /// 是否剔除值为 `null` 的字段。
    pub exclude_none: bool,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            channel: ChannelOptions::default(),
            operation_id: None,
            include: None,
            exclude: None,
            by_alias: true,
            exclude_unset: false,
            exclude_defaults: false,
            exclude_none: false,
        }
    }
}

impl EmitterOptions {
    /// 创建缺省选项。
    pub fn new() -> Self {
        Self::default()
    }

    /// 以通道元数据创建选项。
    pub fn with_channel(channel: ChannelOptions) -> Self {
        Self {
            channel,
            ..Self::default()
        }
    }

    /// 设置操作 ID。
    #[must_use]
    pub fn operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    /// 设置保留字段。
    #[must_use]
    pub fn include(mut self, fields: FieldSet) -> Self {
        self.include = Some(fields);
        self
    }

    /// 设置剔除字段。
    #[must_use]
    pub fn exclude(mut self, fields: FieldSet) -> Self {
        self.exclude = Some(fields);
        self
    }

    /// 设置别名开关。
    #[must_use]
    pub fn by_alias(mut self, by_alias: bool) -> Self {
        self.by_alias = by_alias;
        self
    }

    /// 设置未设置字段剔除开关。
    #[must_use]
    pub fn exclude_unset(mut self, exclude_unset: bool) -> Self {
        self.exclude_unset = exclude_unset;
        self
    }

    /// 设置默认值剔除开关。
    #[must_use]
    pub fn exclude_defaults(mut self, exclude_defaults: bool) -> Self {
        self.exclude_defaults = exclude_defaults;
        self
    }

    /// 设置空值剔除开关。
    #[must_use]
    pub fn exclude_none(mut self, exclude_none: bool) -> Self {
        self.exclude_none = exclude_none;
        self
    }

    fn projection(&self) -> Projection {
        Projection {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            by_alias: self.by_alias,
            exclude_unset: self.exclude_unset,
            exclude_defaults: self.exclude_defaults,
            exclude_none: self.exclude_none,
        }
    }
}

/// 处理器与发送器共享的通道元数据。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelMeta {
    event: String,
    title: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    message_description: Option<String>,
    media_type: String,
}

impl ChannelMeta {
    /// 由事件名与选项构造元数据。
    pub fn new(event: impl Into<String>, options: ChannelOptions) -> Self {
        Self {
            event: event.into(),
            title: options.title,
            summary: options.summary,
            description: options.description,
            message_description: options.message_description,
            media_type: options
                .media_type
                .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_owned()),
        }
    }

    /// 通道事件名。
    pub fn event(&self) -> &str {
        &self.event
    }

    /// 消息标题。
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// 操作摘要。
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// 操作描述。
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// 消息描述。
    pub fn message_description(&self) -> Option<&str> {
        self.message_description.as_deref()
    }

    /// 消息媒体类型。
    pub fn media_type(&self) -> &str {
        &self.media_type
    }
}

/// 入站通道描述符。
///
/// # 教案式说明
/// - **意图（Why）**：记录一个事件处理器在文档中的全部信息；
/// - **契约（What）**：`handler_name` 作为文档操作 ID，由调用方显式传入；`model` 缺省表示
///   该通道不携带结构化负载，文档中将省略 `payload`；
/// - **风险（Trade-offs）**：同名事件允许重复注册，合成时后注册者覆盖先注册者。
#[derive(Clone, Debug, PartialEq)]
pub struct HandlerDescriptor {
    meta: ChannelMeta,
    handler_name: String,
    model: Option<ModelRef>,
}

impl HandlerDescriptor {
    /// 构造处理器描述符。
    pub fn new(
        event: impl Into<String>,
        handler_name: impl Into<String>,
        options: ChannelOptions,
    ) -> Self {
        Self {
            meta: ChannelMeta::new(event, options),
            handler_name: handler_name.into(),
            model: None,
        }
    }

    /// 绑定负载模型。
    #[must_use]
    pub fn with_model(mut self, model: ModelRef) -> Self {
        self.model = Some(model);
        self
    }

    /// 公共元数据。
    pub fn meta(&self) -> &ChannelMeta {
        &self.meta
    }

    /// 事件名。
    pub fn event(&self) -> &str {
        self.meta.event()
    }

    /// 处理器名称，即文档操作 ID。
    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    /// 负载模型。
    pub fn model(&self) -> Option<&ModelRef> {
        self.model.as_ref()
    }
}

/// 出站通道描述符。
///
/// # 教案式说明
/// - **意图（Why）**：同时服务于文档（元数据、模型）与发送（投影策略）两条路径；
/// - **契约（What）**：`model` 必填；投影策略在发送期生效，
///   不影响文档内容；
/// - **所有权（Where）**：注册表与 [`Emitter`](crate::Emitter) 通过 `Arc` 共享只读实例。
#[derive(Clone, Debug, PartialEq)]
pub struct EmitterDescriptor {
    meta: ChannelMeta,
    model: ModelRef,
    operation_id: Option<String>,
    projection: Projection,
}

impl EmitterDescriptor {
    /// 构造发送器描述符。
    pub fn new(event: impl Into<String>, model: ModelRef, options: EmitterOptions) -> Self {
        let projection = options.projection();
        Self {
            meta: ChannelMeta::new(event, options.channel),
            model,
            operation_id: options.operation_id,
            projection,
        }
    }

    /// 公共元数据。
    pub fn meta(&self) -> &ChannelMeta {
        &self.meta
    }

    /// 事件名。
    pub fn event(&self) -> &str {
        self.meta.event()
    }

    /// 负载模型。
    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    /// 显式指定的操作 ID。
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// 发送期投影策略。
    pub fn projection(&self) -> &Projection {
        &self.projection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SchemaModel;
    use serde_json::json;

    #[test]
    fn media_type_defaults_to_json() {
        let descriptor = HandlerDescriptor::new("rubs", "handle_rub", ChannelOptions::new());
        assert_eq!(descriptor.meta().media_type(), DEFAULT_MEDIA_TYPE);
        assert!(descriptor.model().is_none());
    }

    #[test]
    fn emitter_options_defaults_mirror_serializer() {
        let model = SchemaModel::new("Purr", json!({"type": "object"})).into_ref();
        let descriptor = EmitterDescriptor::new(
            "purrs",
            model,
            EmitterOptions::with_channel(ChannelOptions::new().media_type("text/plain")),
        );
        let projection = descriptor.projection();
        assert!(projection.by_alias);
        assert!(!projection.exclude_unset);
        assert!(!projection.exclude_defaults);
        assert!(!projection.exclude_none);
        assert_eq!(descriptor.meta().media_type(), "text/plain");
        assert_eq!(descriptor.operation_id(), None);
    }
}
