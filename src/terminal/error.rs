//! 终端模块错误类型
//!
//! 定义会话桥接相关的错误类型。
//!
//! ## 功能
//! - 连接错误（打开失败、连接超时）
//! - 读写错误
//! - 编码与配置错误
//! - 序列化支持

use linkterm_core::ConfigError;
use linkterm_infra::CodecError;
use thiserror::Error;

/// 终端错误类型
#[derive(Debug, Error)]
pub enum TerminalError {
    /// 端点打开失败（不存在、被占用、名称错误）
    #[error("could not open {endpoint}: {reason}")]
    OpenFailed { endpoint: String, reason: String },

    /// 连接超时
    #[error("timed out after {timeout_ms} ms waiting for {endpoint}")]
    ConnectTimeout { endpoint: String, timeout_ms: u64 },

    /// 未连接
    #[error("not connected")]
    NotConnected,

    /// 读取失败
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// 写入失败
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// 控制台错误
    #[error("console error: {0}")]
    Console(String),

    /// 编码错误
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TerminalError {
    pub fn open_failed(endpoint: &str, reason: impl std::fmt::Display) -> Self {
        Self::OpenFailed {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    /// 是否为连接阶段的错误
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, Self::OpenFailed { .. } | Self::ConnectTimeout { .. })
    }
}

impl From<TerminalError> for String {
    fn from(err: TerminalError) -> Self {
        err.to_string()
    }
}

impl serde::Serialize for TerminalError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
