//! 日志初始化
//!
//! 基于 tracing-subscriber 的结构化日志，输出到 stderr，stdout 保留给评估报告。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别或过滤指令，例如 `info` 或 `info,tbscreen_radiology=debug`
    pub level: String,
    /// 是否输出事件目标（模块路径）
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}

/// 构建日志过滤器，`RUST_LOG` 非空时优先
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(env) if !env.trim().is_empty() => env,
        _ => config.level.clone(),
    };

    parse_filter(&directives)
}

/// 解析过滤指令
pub fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .with_context(|| format!("Invalid log filter directives: {}", directives))
}

/// 加载配置期间使用的临时订阅器
///
/// 配置文件尚未读取时无法得知日志级别，这里使用命令行覆盖值或默认级别，
/// 配合 `tracing::subscriber::with_default` 在配置加载范围内生效。
pub fn bootstrap_subscriber(level: Option<&str>) -> Result<impl tracing::Subscriber + Send + Sync> {
    let defaults = LoggingConfig::default();
    let config = LoggingConfig {
        level: level.map(str::to_string).unwrap_or(defaults.level),
        ..defaults
    };
    let filter = build_filter(&config)?;

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_writer(std::io::stderr)
        .finish())
}

/// 初始化全局日志订阅器
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("Logging initialized with level: {}", config.level);
    Ok(())
}
