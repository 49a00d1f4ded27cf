//! 发送期的负载投影策略。
//!
//! # 教案式说明
//! - **意图（Why）**：发送器在把类型化负载交给传输层前，需要按注册时声明的策略裁剪字段，
//!   行为对齐常见序列化库的 `include/exclude/by_alias/exclude_*` 语义；
//! - **逻辑（How）**：负载先经 `serde_json` 序列化为 [`Value`]，随后依次执行
//!   “缺省值剔除 → 空值剔除 → 别名还原 → 字段筛选 → 别名恢复”；
//! - **契约（What）**：
//!   - `include`/`exclude` 使用字段名（非别名）的点分路径，递归穿透对象与数组；
//!   - “未设置”优先依据调用方提供的 `fields_set`（序列化后的键名），缺失时退化为
//!     “可选字段仍持有默认值”；
//!   - 缺省值来自模型根 Schema 的 `properties.<key>.default`，可选字段未声明默认值时视为 `null`。

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::model::SchemaModel;

/// 点分字段路径集合，例如 `{"detail", "owner.name"}`。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldSet {
    paths: BTreeSet<String>,
}

impl FieldSet {
    /// 创建空集合。
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条路径。
    #[must_use]
    pub fn with(mut self, path: impl Into<String>) -> Self {
        self.paths.insert(path.into());
        self
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// 遍历全部路径。
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    fn tree(&self) -> FieldTree {
        let mut root = FieldTree::new();
        for path in &self.paths {
            let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
            insert_path(&mut root, &segments);
        }
        root
    }
}

impl<S: Into<String>> FromIterator<S> for FieldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

type FieldTree = BTreeMap<String, FieldNode>;

#[derive(Debug)]
enum FieldNode {
    Whole,
    Nested(FieldTree),
}

fn insert_path(tree: &mut FieldTree, segments: &[&str]) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        tree.insert((*head).to_owned(), FieldNode::Whole);
        return;
    }
    let node = tree
        .entry((*head).to_owned())
        .or_insert_with(|| FieldNode::Nested(FieldTree::new()));
    // 已经整体选中的字段不再细分。
    if let FieldNode::Nested(children) = node {
        insert_path(children, rest);
    }
}

/// 发送器的投影策略。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Projection {
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
    /// 是否递归剔除 `null` 字段。
    pub exclude_none: bool,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            include: None,
            exclude: None,
            by_alias: true,
            exclude_unset: false,
            exclude_defaults: false,
            exclude_none: false,
        }
    }
}

impl Projection {
    /// 对序列化后的负载执行投影。
    ///
    /// # 教案式说明
    /// - **输入（What）**：`value` 为 `serde_json` 序列化结果；`model` 提供必填/默认值/别名信息；
    ///   `fields_set` 为调用方显式设置过的顶层键（可选）。
    /// - **输出（What）**：新的负载值；非对象负载只受 `exclude_none` 与筛选规则影响。
    pub fn apply(
        &self,
        mut value: Value,
        model: &SchemaModel,
        fields_set: Option<&BTreeSet<String>>,
    ) -> Value {
        if let Value::Object(members) = &mut value {
            if self.exclude_unset {
                members.retain(|key, member| match fields_set {
                    Some(set) => set.contains(key),
                    None => !holds_default(model, key, member),
                });
            }
            if self.exclude_defaults {
                members.retain(|key, member| !holds_default(model, key, member));
            }
        }

        if self.exclude_none {
            strip_nulls(&mut value);
        }

        let aliases = model.aliases();
        if !aliases.is_empty() {
            rename_top_level(&mut value, |key| {
                aliases
                    .iter()
                    .find(|(_, alias)| alias.as_str() == key)
                    .map(|(field, _)| field.clone())
            });
        }

        if let Some(include) = &self.include {
            retain_included(&mut value, &include.tree());
        }
        if let Some(exclude) = &self.exclude {
            remove_excluded(&mut value, &exclude.tree());
        }

        if self.by_alias && !aliases.is_empty() {
            rename_top_level(&mut value, |key| aliases.get(key).cloned());
        }

        value
    }
}

fn holds_default(model: &SchemaModel, key: &str, member: &Value) -> bool {
    match model.declared_default(key) {
        Some(default) => default == member,
        None => member.is_null() && !model.is_required(key),
    }
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(members) => {
            members.retain(|_, member| !member.is_null());
            for member in members.values_mut() {
                strip_nulls(member);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_nulls(item);
            }
        }
        _ => {}
    }
}

fn rename_top_level(value: &mut Value, lookup: impl Fn(&str) -> Option<String>) {
    if let Value::Object(members) = value {
        let renamed: Map<String, Value> = std::mem::take(members)
            .into_iter()
            .map(|(key, member)| (lookup(&key).unwrap_or(key), member))
            .collect();
        *members = renamed;
    }
}

fn retain_included(value: &mut Value, tree: &FieldTree) {
    match value {
        Value::Object(members) => {
            members.retain(|key, _| tree.contains_key(key));
            for (key, member) in members.iter_mut() {
                if let Some(FieldNode::Nested(children)) = tree.get(key) {
                    retain_included(member, children);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                retain_included(item, tree);
            }
        }
        _ => {}
    }
}

fn remove_excluded(value: &mut Value, tree: &FieldTree) {
    match value {
        Value::Object(members) => {
            members.retain(|key, _| !matches!(tree.get(key), Some(FieldNode::Whole)));
            for (key, member) in members.iter_mut() {
                if let Some(FieldNode::Nested(children)) = tree.get(key) {
                    remove_excluded(member, children);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                remove_excluded(item, tree);
            }
        }
        _ => {}
    }
}
