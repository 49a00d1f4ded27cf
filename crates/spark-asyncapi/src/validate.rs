//! 文档元数据字段的语法校验。
//!
//! URI 的解析交给 `url` crate；邮箱只做结构检查（单个 `@`、两侧非空、无空白），
//! 并接受 `Name <addr>` 形式。

use url::Url;

use crate::error::ValidationError;

/// 校验绝对 URI（含 `urn:` 等非层级形式）。
pub fn validate_uri(field: &'static str, value: &str) -> Result<(), ValidationError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|err| ValidationError::new(field, format!("`{value}` is not an absolute URI: {err}")))
}

/// 校验邮箱地址。
pub fn validate_email(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let address = match (value.rfind('<'), value.strip_suffix('>')) {
        (Some(open), Some(inner)) => &inner[open + 1..],
        _ => value,
    };

    if address.is_empty() {
        return Err(ValidationError::new(field, "email address is empty"));
    }
    if address.chars().any(char::is_whitespace) {
        return Err(ValidationError::new(
            field,
            format!("`{address}` must not contain whitespace"),
        ));
    }
    let mut parts = address.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ValidationError::new(
            field,
            format!("`{address}` must contain exactly one `@`"),
        ));
    };
    if local.is_empty() {
        return Err(ValidationError::new(
            field,
            format!("`{address}` has an empty local part"),
        ));
    }
    if domain.is_empty() || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ValidationError::new(
            field,
            format!("`{address}` has an invalid domain"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_accepts_urls_and_urns() {
        assert!(validate_uri("id", "urn:com:cat_service").is_ok());
        assert!(validate_uri("url", "https://example.com/docs").is_ok());
    }

    #[test]
    fn uri_rejects_relative_references() {
        let err = validate_uri("url", "/docs").unwrap_err();
        assert_eq!(err.field, "url");
        assert!(err.reason.contains("/docs"));
    }

    #[test]
    fn email_accepts_plain_and_named_forms() {
        assert!(validate_email("email", "cat@example.com").is_ok());
        assert!(validate_email("email", "Tom Cat <tom@example.com>").is_ok());
    }

    #[test]
    fn email_rejects_malformed_addresses() {
        for bad in ["", "cat", "cat@", "@example.com", "a@b@c", "c at@example.com", "cat@.com"] {
            assert!(validate_email("email", bad).is_err(), "`{bad}` 应被拒绝");
        }
    }
}
