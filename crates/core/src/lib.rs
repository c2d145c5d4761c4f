//! 核心类型模块
//!
//! 包含纯数据类型（models）、会话配置（config）、日志配置（logger）
//!
//! 本 crate 不包含任何会话逻辑，只提供基础类型定义。

pub mod config;
pub mod logger;
pub mod models;

// 重新导出常用类型
pub use config::{
    AbortMode, ConfigError, SessionConfig, TransportKind, DEFAULT_BAUD_RATE, DEFAULT_ENCODING,
};
pub use logger::{init_logging, LogConfig, LoggerError};
pub use models::{Key, KeyEvent, Modifiers};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
