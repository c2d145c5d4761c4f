//! 日志配置模块
//!
//! 安装 `tracing-subscriber` 的 fmt 订阅者，日志输出到 stderr。
//!
//! 会话期间控制台处于 raw 模式，单独的 `\n` 不会回到行首，
//! 因此写入器会把 `\n` 展开为 `\r\n`。
use std::io::{self, Write};

use thiserror::Error;
use tracing::Level;

/// 日志错误
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("failed to install log subscriber: {0}")]
    Init(String),
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub verbose: bool,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    pub fn max_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        }
    }
}

/// 初始化全局日志订阅者
///
/// 重复调用返回错误，不会覆盖已安装的订阅者。
pub fn init_logging(config: &LogConfig) -> Result<(), LoggerError> {
    tracing_subscriber::fmt()
        .with_max_level(config.max_level())
        .with_ansi(config.ansi)
        .with_target(false)
        .with_writer(|| CrlfWriter::new(io::stderr()))
        .try_init()
        .map_err(|e| LoggerError::Init(e.to_string()))
}

/// 把 `\n` 展开为 `\r\n` 的写入器
pub struct CrlfWriter<W: Write> {
    inner: W,
}

impl<W: Write> CrlfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut start = 0;
        for (i, byte) in buf.iter().enumerate() {
            if *byte == b'\n' && (i == 0 || buf[i - 1] != b'\r') {
                self.inner.write_all(&buf[start..i])?;
                self.inner.write_all(b"\r\n")?;
                start = i + 1;
            }
        }
        self.inner.write_all(&buf[start..])?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
