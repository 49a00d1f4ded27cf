//! 负载模型引用。
//!
//! # 教案式说明
//! - **意图（Why）**：通道只需要知道负载模型的“名字”与“结构化 Schema”，Schema 的推导交给外部库
//!   （默认 `schemars`），核心层保持对具体类型的无感知；
//! - **逻辑（How）**：[`SchemaModel`] 保存模型名、根 Schema、嵌套定义与别名表，注册表与文档合成器
//!   通过 [`ModelRef`] 共享同一份只读实例；
//! - **契约（What）**：嵌套定义中的 `$ref` 必须已经指向 [`COMPONENTS_SCHEMA_PREFIX`]，
//!   文档合成时不会再改写引用路径。

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

/// 文档中 `components/schemas` 的引用前缀。
pub const COMPONENTS_SCHEMA_PREFIX: &str = "#/components/schemas/";

/// 共享的模型引用，描述符与文档合成器之间只读共享。
pub type ModelRef = Arc<SchemaModel>;

/// 带名称的负载 Schema。
///
/// # 教案式说明
/// - **意图（Why）**：作为通道与外部 Schema 库之间的唯一边界，保证文档合成只依赖 JSON 形态的数据；
/// - **契约（What）**：
///   - `name` 是组件键，同名且结构一致的模型被视为同一模型；
///   - `definitions` 为模型引用到的嵌套模型，会与根模型一起进入 `components/schemas`；
///   - `aliases` 记录“字段名 → 序列化别名”，只在 `by_alias = false` 的投影中使用。
/// - **风险（Trade-offs）**：结构比较基于 `serde_json::Value` 的相等性，字段顺序不影响结果，
///   但语义等价而写法不同的 Schema 仍会被视为不同模型。
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaModel {
    name: String,
    schema: Value,
    definitions: BTreeMap<String, Value>,
    aliases: BTreeMap<String, String>,
}

impl SchemaModel {
    /// 以名称与根 Schema 构造模型。
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            definitions: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }

    /// 追加一个嵌套模型定义。
    #[must_use]
    pub fn with_definition(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.definitions.insert(name.into(), schema);
        self
    }

    /// 登记字段别名：`field` 为 Rust 字段名，`alias` 为序列化后出现在负载中的键。
    #[must_use]
    pub fn with_alias(mut self, field: impl Into<String>, alias: impl Into<String>) -> Self {
        self.aliases.insert(field.into(), alias.into());
        self
    }

    /// 包装为共享引用。
    pub fn into_ref(self) -> ModelRef {
        Arc::new(self)
    }

    /// 模型名称，即组件键。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 根 Schema。
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// 嵌套定义。
    pub fn definitions(&self) -> &BTreeMap<String, Value> {
        &self.definitions
    }

    /// 字段别名表。
    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// `$ref` 形式的组件引用路径。
    pub fn reference(&self) -> String {
        format!("{COMPONENTS_SCHEMA_PREFIX}{}", self.name)
    }

    /// 依次产出根模型与全部嵌套定义的 `(名称, Schema)` 对。
    ///
    /// 根模型总是第一个元素，嵌套定义按名称排序。
    pub fn components(&self) -> impl Iterator<Item = (&str, &Value)> {
        std::iter::once((self.name.as_str(), &self.schema)).chain(
            self.definitions
                .iter()
                .map(|(name, schema)| (name.as_str(), schema)),
        )
    }

    /// 根 Schema 中声明为必填的属性集合。
    pub(crate) fn is_required(&self, property: &str) -> bool {
        self.schema
            .get("required")
            .and_then(Value::as_array)
            .is_some_and(|required| required.iter().any(|item| item == property))
    }

    /// 根 Schema 中某个属性声明的默认值。
    pub(crate) fn declared_default(&self, property: &str) -> Option<&Value> {
        self.schema
            .get("properties")
            .and_then(|properties| properties.get(property))
            .and_then(|schema| schema.get("default"))
    }
}

#[cfg(feature = "schemars")]
mod derive {
    use schemars::JsonSchema;
    use schemars::r#gen::SchemaSettings;

    use super::{COMPONENTS_SCHEMA_PREFIX, SchemaModel};
    use crate::error::RegistrationError;

    impl SchemaModel {
        /// 通过 `schemars` 从 Rust 类型推导模型。
        ///
        /// # 教案式说明
        /// - **逻辑（How）**：使用 draft-07 设置并把定义路径改写为 [`COMPONENTS_SCHEMA_PREFIX`]，
        ///   嵌套类型因此直接引用文档组件；根 Schema 去掉 `$schema` 元信息后保存。
        /// - **契约（What）**：模型名取 [`JsonSchema::schema_name`]；根 Schema 或任一嵌套定义无法转换为
        ///   JSON 时返回 [`RegistrationError::ModelSchema`]，不会产出残缺模型。
        pub fn of<T: JsonSchema>() -> Result<Self, RegistrationError> {
            let settings = SchemaSettings::draft07().with(|settings| {
                settings.definitions_path = COMPONENTS_SCHEMA_PREFIX.to_owned();
                settings.meta_schema = None;
            });
            let root = settings.into_generator().into_root_schema_for::<T>();
            let name = T::schema_name();

            let schema_error = |source| RegistrationError::ModelSchema {
                name: name.clone(),
                source,
            };
            let schema = serde_json::to_value(&root.schema).map_err(schema_error)?;
            let mut model = SchemaModel::new(name.clone(), schema);
            for (definition_name, definition) in &root.definitions {
                let value = serde_json::to_value(definition).map_err(schema_error)?;
                model = model.with_definition(definition_name.clone(), value);
            }
            Ok(model)
        }
    }
}
