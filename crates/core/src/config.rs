//! 会话配置模块
//!
//! 定义一次会话所需的全部不可变配置：端点、传输类型、波特率、超时、
//! 中止键模式、重试策略和文本编码。
//!
//! 配置在启动时构造一次，之后以 `Arc<SessionConfig>` 的形式传入各组件，
//! 不存在全局查找。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 默认波特率
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// 默认文本编码
pub const DEFAULT_ENCODING: &str = "utf-8";

/// 配置错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 端点为空
    #[error("no endpoint given")]
    EmptyEndpoint,

    /// 波特率无效
    #[error("invalid baud rate: {0}")]
    InvalidBaudRate(u32),

    /// 无效的中止键模式
    #[error("invalid abort mode: {0} (expected ctrlc, ctrlb or tildedot)")]
    InvalidAbortMode(String),
}

// ============================================================================
// 传输类型
// ============================================================================

/// 传输类型
///
/// - `Line`: 串口线路，由底层自行完成文本解码
/// - `Channel`: 本地命名管道，只提供原始字节
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Line,
    Channel,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Line => write!(f, "line"),
            Self::Channel => write!(f, "channel"),
        }
    }
}

// ============================================================================
// 中止键模式
// ============================================================================

/// 中止键模式
///
/// 决定用哪个按键（或两键组合）结束会话。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbortMode {
    /// Ctrl+C
    CtrlC,
    /// Ctrl+B
    CtrlB,
    /// `~` 后接 `.`
    #[default]
    TildeDot,
}

impl AbortMode {
    /// 面向用户的按键描述，用于会话开始时的提示
    pub fn key_sequence(&self) -> &'static str {
        match self {
            Self::CtrlC => "CTRL+C",
            Self::CtrlB => "CTRL+B",
            Self::TildeDot => "~.",
        }
    }
}

impl std::fmt::Display for AbortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CtrlC => write!(f, "ctrlc"),
            Self::CtrlB => write!(f, "ctrlb"),
            Self::TildeDot => write!(f, "tildedot"),
        }
    }
}

impl std::str::FromStr for AbortMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ctrlc" | "ctrl-c" | "ctrl+c" => Ok(Self::CtrlC),
            "ctrlb" | "ctrl-b" | "ctrl+b" => Ok(Self::CtrlB),
            "tildedot" | "~." => Ok(Self::TildeDot),
            _ => Err(ConfigError::InvalidAbortMode(s.to_string())),
        }
    }
}

// ============================================================================
// 会话配置
// ============================================================================

/// 会话配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 端点标识（串口设备名或管道名）
    pub endpoint: String,
    /// 传输类型
    pub transport: TransportKind,
    /// 波特率（仅线路传输）
    pub baud_rate: u32,
    /// 连接超时（毫秒，仅通道传输，0 表示不设上限）
    pub connect_timeout_ms: u64,
    /// 中止键模式
    pub abort_mode: AbortMode,
    /// 是否无限重试
    pub retry_forever: bool,
    /// 文本编码标签
    pub encoding: String,
    /// 是否输出详细信息
    pub verbose: bool,
}

impl SessionConfig {
    /// 使用默认值创建配置
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport: TransportKind::default(),
            baud_rate: DEFAULT_BAUD_RATE,
            connect_timeout_ms: 0,
            abort_mode: AbortMode::default(),
            retry_forever: false,
            encoding: DEFAULT_ENCODING.to_string(),
            verbose: false,
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        if self.transport == TransportKind::Line && self.baud_rate == 0 {
            return Err(ConfigError::InvalidBaudRate(self.baud_rate));
        }
        Ok(())
    }

    /// 通道连接的等待上限，`None` 表示不设上限
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }

    /// 连接失败时是否静默
    ///
    /// 无限重试且非详细模式下，重复的失败信息只会刷屏。
    pub fn quiet_connect_failures(&self) -> bool {
        self.retry_forever && !self.verbose
    }
}
