//! 日志订阅器的一次性安装入口。

use std::sync::OnceLock;

use thiserror::Error;
use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

/// 缺省的日志过滤指令，`RUST_LOG` 存在时以其为准。
pub const DEFAULT_FILTER: &str = "info";

static INSTALLED: OnceLock<()> = OnceLock::new();

/// 安装失败的原因。
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// `install` 已被调用过。
    #[error("channel host telemetry is already installed")]
    AlreadyInstalled,
    /// 外部已设置全局订阅器。
    #[error("a global tracing subscriber is already set")]
    SubscriberAlreadySet,
    /// 设置全局订阅器失败。
    #[error("failed to set global tracing subscriber")]
    SetGlobalSubscriber(#[source] tracing::subscriber::SetGlobalDefaultError),
}

/// 以缺省过滤指令安装 `fmt` 订阅器。
///
/// # 教案式说明
/// - **意图（Why）**：通道注册、文档合成与告警日志都通过 `tracing` 输出，宿主进程需要一个开箱即用的订阅器；
/// - **逻辑（How）**：`registry + EnvFilter + fmt` 组合后设置为全局订阅器，`OnceLock` 记录安装状态；
/// - **契约（What）**：重复调用返回 [`TelemetryError::AlreadyInstalled`]；外部已设置订阅器时返回
///   [`TelemetryError::SubscriberAlreadySet`]，不会覆盖。
pub fn install() -> Result<(), TelemetryError> {
    install_with_filter(DEFAULT_FILTER)
}

/// 以指定的过滤指令安装订阅器；`RUST_LOG` 优先。
pub fn install_with_filter(default_filter: &str) -> Result<(), TelemetryError> {
    if INSTALLED.get().is_some() {
        return Err(TelemetryError::AlreadyInstalled);
    }
    if dispatcher::has_been_set() {
        return Err(TelemetryError::SubscriberAlreadySet);
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true));
    tracing::subscriber::set_global_default(subscriber)
        .map_err(TelemetryError::SetGlobalSubscriber)?;

    INSTALLED
        .set(())
        .map_err(|_| TelemetryError::AlreadyInstalled)
}
