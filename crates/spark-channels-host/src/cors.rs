//! 从宿主中间件链推导传输层的 CORS 来源策略。
//!
//! # 教案式说明
//! - **意图（Why）**：宿主框架与传输层各自检查来源，二者语义不同：宿主把 `["*"]` 视为“全部允许”，
//!   传输层只认裸通配符；正则配置也需要转成传输层可调用的判定函数；
//! - **逻辑（How）**：按顺序扫描中间件，命中第一个带有效配置的 CORS 项即返回；
//!   既无列表也无正则的 CORS 项被跳过；
//! - **契约（What）**：无副作用；中间件链为空或没有 CORS 项时原样返回调用方提供的缺省值。

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::app::Middleware;
use crate::error::CorsError;

/// 来源判定函数。
pub type OriginMatcher = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// 交给传输层的来源策略。
#[derive(Clone)]
pub enum OriginPolicy {
    /// 允许任意来源。
    Any,
    /// 仅允许列表中的来源。
    List(Vec<String>),
    /// 由判定函数决定。
    Matcher(OriginMatcher),
}

impl Default for OriginPolicy {
    fn default() -> Self {
        OriginPolicy::List(Vec::new())
    }
}

impl fmt::Debug for OriginPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginPolicy::Any => f.write_str("OriginPolicy::Any"),
            OriginPolicy::List(origins) => f.debug_tuple("OriginPolicy::List").field(origins).finish(),
            OriginPolicy::Matcher(_) => f.write_str("OriginPolicy::Matcher(..)"),
        }
    }
}

impl OriginPolicy {
    /// 判定来源是否被允许；缺失来源只在 [`OriginPolicy::Any`] 下放行。
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match (self, origin) {
            (OriginPolicy::Any, _) => true,
            (_, None) => false,
            (OriginPolicy::List(origins), Some(origin)) => origins.iter().any(|o| o == origin),
            (OriginPolicy::Matcher(matcher), Some(origin)) => matcher(origin),
        }
    }
}

/// 扫描中间件链并返回来源策略。
pub fn resolve_origin_policy(
    middleware: &[Middleware],
    default: OriginPolicy,
) -> Result<OriginPolicy, CorsError> {
    for entry in middleware {
        let Middleware::Cors(options) = entry else {
            continue;
        };

        if !options.allow_origins.is_empty() {
            if options.allow_origins.len() == 1 && options.allow_origins[0] == "*" {
                return Ok(OriginPolicy::Any);
            }
            return Ok(OriginPolicy::List(options.allow_origins.clone()));
        }

        if let Some(pattern) = &options.allow_origin_regex {
            // 与宿主一致：只锚定开头。
            let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
                CorsError::InvalidOriginRegex {
                    pattern: pattern.clone(),
                    source,
                }
            })?;
            tracing::debug!(pattern = pattern.as_str(), "resolved CORS origin regex");
            return Ok(OriginPolicy::Matcher(Arc::new(move |origin: &str| {
                regex.is_match(origin)
            })));
        }
    }
    Ok(default)
}
