use std::collections::BTreeMap;

use crate::document::{Contact, ExternalDocs, License, Server, Tag};
use crate::error::ValidationError;
use crate::validate::{validate_email, validate_uri};

/// 文档缺省的消息媒体类型。
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// 由应用标题推导文档标识：`urn:com:` + 小写标题，单个空格替换为 `_`。
///
/// ```
/// assert_eq!(
///     spark_asyncapi::derive_document_id("Cat Service"),
///     "urn:com:cat_service"
/// );
/// ```
pub fn derive_document_id(title: &str) -> String {
    let lowered = title.to_lowercase();
    let joined: Vec<&str> = lowered.split(' ').collect();
    format!("urn:com:{}", joined.join("_"))
}

/// 文档的静态元数据。
///
/// # 教案式说明
/// - **意图（Why）**：把与通道无关的顶层信息（标题、版本、服务器、联系人等）从注册表中剥离，
///   合成函数因此只依赖“快照 + 元数据”两个输入；
/// - **逻辑（How）**：构建器风格的设置方法；涉及 URI 或邮箱的字段在设置时立即校验，
///   失败返回 [`ValidationError`] 并丢弃本次修改；
/// - **契约（What）**：
///   - `title` 与 `version` 必填，其余字段可选；
///   - 未显式设置标识时，[`document_id`](Self::document_id) 按 [`derive_document_id`] 推导；
///   - `servers` 缺省为空映射，序列化为 `{}`。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentMetadata {
    id: Option<String>,
    title: String,
    version: String,
    description: Option<String>,
    servers: BTreeMap<String, Server>,
    default_content_type: String,
    terms_of_service: Option<String>,
    contact: Option<Contact>,
    license: Option<License>,
    tags: Vec<Tag>,
    external_docs: Option<ExternalDocs>,
}

impl DocumentMetadata {
    /// 以标题与版本构造元数据。
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            version: version.into(),
            description: None,
            servers: BTreeMap::new(),
            default_content_type: DEFAULT_CONTENT_TYPE.to_owned(),
            terms_of_service: None,
            contact: None,
            license: None,
            tags: Vec::new(),
            external_docs: None,
        }
    }

    /// 显式指定文档标识，必须是绝对 URI。
    pub fn id(mut self, id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        validate_uri("id", &id)?;
        self.id = Some(id);
        Ok(self)
    }

    /// 设置描述。
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 设置可选描述，`None` 时保持原值。
    #[must_use]
    pub fn maybe_description(mut self, description: Option<String>) -> Self {
        if description.is_some() {
            self.description = description;
        }
        self
    }

    /// 追加或替换一个服务器。
    #[must_use]
    pub fn server(mut self, name: impl Into<String>, server: Server) -> Self {
        self.servers.insert(name.into(), server);
        self
    }

    /// 整体替换服务器映射。
    #[must_use]
    pub fn servers(mut self, servers: BTreeMap<String, Server>) -> Self {
        self.servers = servers;
        self
    }

    /// 覆盖缺省媒体类型。
    #[must_use]
    pub fn default_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.default_content_type = content_type.into();
        self
    }

    /// 设置服务条款链接。
    pub fn terms_of_service(mut self, url: impl Into<String>) -> Result<Self, ValidationError> {
        let url = url.into();
        validate_uri("termsOfService", &url)?;
        self.terms_of_service = Some(url);
        Ok(self)
    }

    /// 设置联系人；`url` 与 `email` 存在时分别校验。
    pub fn contact(mut self, contact: Contact) -> Result<Self, ValidationError> {
        if let Some(url) = &contact.url {
            validate_uri("contact.url", url)?;
        }
        if let Some(email) = &contact.email {
            validate_email("contact.email", email)?;
        }
        self.contact = Some(contact);
        Ok(self)
    }

    /// 设置许可证。
    pub fn license(mut self, license: License) -> Result<Self, ValidationError> {
        if let Some(url) = &license.url {
            validate_uri("license.url", url)?;
        }
        self.license = Some(license);
        Ok(self)
    }

    /// 追加标签。
    pub fn tag(mut self, tag: Tag) -> Result<Self, ValidationError> {
        if let Some(docs) = &tag.external_docs {
            validate_uri("tags.externalDocs.url", &docs.url)?;
        }
        self.tags.push(tag);
        Ok(self)
    }

    /// 设置外部文档链接。
    pub fn external_docs(mut self, docs: ExternalDocs) -> Result<Self, ValidationError> {
        validate_uri("externalDocs.url", &docs.url)?;
        self.external_docs = Some(docs);
        Ok(self)
    }

    /// 最终的文档标识。
    pub fn document_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| derive_document_id(&self.title))
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn server_map(&self) -> &BTreeMap<String, Server> {
        &self.servers
    }

    pub fn content_type(&self) -> &str {
        &self.default_content_type
    }

    pub(crate) fn terms_of_service_url(&self) -> Option<&String> {
        self.terms_of_service.as_ref()
    }

    pub(crate) fn contact_info(&self) -> Option<&Contact> {
        self.contact.as_ref()
    }

    pub(crate) fn license_info(&self) -> Option<&License> {
        self.license.as_ref()
    }

    pub(crate) fn tag_list(&self) -> &[Tag] {
        &self.tags
    }

    pub(crate) fn external_docs_info(&self) -> Option<&ExternalDocs> {
        self.external_docs.as_ref()
    }
}
