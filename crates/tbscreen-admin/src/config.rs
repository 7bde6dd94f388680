//! 配置管理
//!
//! 配置来源按优先级从低到高：内置默认值、配置文件（可选）、`TBSCREEN_` 前缀环境变量。
//! 例如 `TBSCREEN_PIPELINE__RADIOLOGY_TIMEOUT_SECS=10`。

use crate::logging::{parse_filter, LoggingConfig};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tbscreen_core::TbError;
use tbscreen_fusion::FusionWeights;
use tbscreen_workflow::PipelineConfig;
use tracing::{error, info};

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: ScreeningConfig,
    /// 配置文件路径
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

/// 筛查系统完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScreeningConfig {
    /// 评估流水线配置
    pub pipeline: PipelineConfig,
    /// 融合权重
    pub fusion: FusionWeights,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 配置验证器
pub struct ConfigValidator {
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
struct ValidationRule {
    field_path: String,
    validator: fn(&ScreeningConfig) -> Result<()>,
    error_message: String,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config,
            config_path: config_path.map(str::to_string),
            validator,
        })
    }

    /// 从已有配置创建，仍然执行验证
    pub fn from_config(config: ScreeningConfig) -> Result<Self> {
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config,
            config_path: None,
            validator,
        })
    }

    /// 加载配置
    fn load_config(config_path: Option<&str>) -> Result<ScreeningConfig> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("TBSCREEN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: ScreeningConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        match config_path {
            Some(path) => info!("Configuration loaded successfully from: {}", path),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    /// 获取配置
    pub fn get_config(&self) -> &ScreeningConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&str> {
        self.config_path.as_deref()
    }

    /// 按点分路径获取配置值，例如 `fusion.radiology_weight`
    pub fn get_value<T>(&self, path: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let value = self
            .extract_nested_value(path)
            .context(format!("Configuration path not found: {}", path))?;

        serde_json::from_value(value).context("Failed to deserialize configuration value")
    }

    /// 提取嵌套值
    fn extract_nested_value(&self, path: &str) -> Result<serde_json::Value> {
        let config_json =
            serde_json::to_value(&self.config).context("Failed to serialize config to JSON")?;

        let mut current = &config_json;
        for part in path.split('.') {
            match current {
                serde_json::Value::Object(map) => {
                    current = map
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Path segment not found: {}", part))?;
                }
                _ => return Err(anyhow::anyhow!("Invalid path at segment: {}", part)),
            }
        }

        Ok(current.clone())
    }

    /// 保存配置为 TOML 文件
    pub fn save_config(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_str =
            toml::to_string_pretty(&self.config).context("Failed to serialize configuration")?;

        std::fs::write(path, config_str).context("Failed to write configuration file")?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// 验证配置
    pub fn validate_config(&self) -> Result<()> {
        self.validator.validate(&self.config)
    }
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "pipeline.radiology_timeout_secs".to_string(),
                validator: |config| {
                    if config.pipeline.radiology_timeout_secs == 0 {
                        Err(anyhow::Error::from(TbError::Config(
                            "radiology timeout cannot be 0".to_string(),
                        )))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid radiology timeout".to_string(),
            },
            ValidationRule {
                field_path: "fusion".to_string(),
                validator: |config| config.fusion.validate().map_err(anyhow::Error::from),
                error_message: "Invalid fusion weights".to_string(),
            },
            ValidationRule {
                field_path: "logging.level".to_string(),
                validator: |config| {
                    parse_filter(&config.logging.level)
                        .map(|_| ())
                        .map_err(|e| anyhow::Error::from(TbError::Config(format!("{:#}", e))))
                },
                error_message: "Invalid log level".to_string(),
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &ScreeningConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("{}: {}", rule.error_message, e));
            }
        }

        info!("Configuration validation passed");
        Ok(())
    }
}

impl std::fmt::Debug for ConfigValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.validation_rules.iter().map(|r| r.field_path.as_str()).collect();
        f.debug_struct("ConfigValidator").field("rules", &fields).finish()
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
