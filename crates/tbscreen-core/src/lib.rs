//! # TB Screening Core
//!
//! 结核病筛查系统的核心模块，提供临床、影像和融合三个引擎共享的数据结构、错误定义和数值工具。

pub mod error;
pub mod models;
pub mod utils;

pub use error::{Result, TbError};
pub use models::*;
