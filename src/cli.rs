//! 命令行参数
//!
//! 使用 clap derive 解析参数，并构造不可变的 [`SessionConfig`]。

use clap::Parser;
use linkterm_core::{AbortMode, ConfigError, SessionConfig, DEFAULT_BAUD_RATE, DEFAULT_ENCODING};

use crate::terminal::connections::ConnectionRouter;

/// Interactive console bridge for serial lines and local pipes.
#[derive(Debug, Parser)]
#[command(name = "linkterm", version, about)]
pub struct Cli {
    /// Serial port (COM3, /dev/ttyUSB0) or pipe name
    #[arg(required_unless_present = "list")]
    pub endpoint: Option<String>,

    /// Baud rate for serial lines
    #[arg(short = 'b', long = "baud", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud_rate: u32,

    /// Treat the endpoint as a named pipe
    #[arg(short = 'p', long)]
    pub pipe: bool,

    /// Key sequence that ends the session: ctrlc, ctrlb or tildedot
    #[arg(short = 'a', long, default_value_t = AbortMode::TildeDot)]
    pub abort: AbortMode,

    /// Pipe connect timeout in milliseconds (0 waits on a single attempt)
    #[arg(short = 't', long = "timeout", default_value_t = 0)]
    pub timeout_ms: u64,

    /// Reconnect forever until the session is ended by the user
    #[arg(short = 'r', long)]
    pub retry: bool,

    /// Text encoding of the endpoint
    #[arg(short = 'e', long, default_value = DEFAULT_ENCODING)]
    pub encoding: String,

    /// Print diagnostics and every connect failure
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// List available serial ports and exit
    #[arg(short = 'l', long)]
    pub list: bool,
}

impl Cli {
    /// 构造会话配置
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(ConfigError::EmptyEndpoint)?;

        let mut config = SessionConfig::new(endpoint);
        config.transport = ConnectionRouter::route(endpoint, self.pipe);
        config.baud_rate = self.baud_rate;
        config.connect_timeout_ms = self.timeout_ms;
        config.abort_mode = self.abort;
        config.retry_forever = self.retry;
        config.encoding = self.encoding.clone();
        config.verbose = self.verbose;

        config.validate()?;
        Ok(config)
    }
}
