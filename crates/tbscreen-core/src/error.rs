//! 错误定义模块

use thiserror::Error;

/// 筛查系统统一错误类型
#[derive(Error, Debug)]
pub enum TbError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("影像处理错误: {0}")]
    Image(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("处理超时: {0}")]
    Timeout(String),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

impl TbError {
    /// 不带分类前缀的错误原因，用于写入面向临床的发现文本
    pub fn reason(&self) -> String {
        match self {
            TbError::Config(msg)
            | TbError::Validation(msg)
            | TbError::Image(msg)
            | TbError::Timeout(msg)
            | TbError::Internal(msg) => msg.clone(),
            TbError::Io(e) => e.to_string(),
            TbError::Serialization(e) => e.to_string(),
        }
    }
}

/// 筛查系统统一结果类型
pub type Result<T> = std::result::Result<T, TbError>;
