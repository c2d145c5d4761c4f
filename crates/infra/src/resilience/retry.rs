//! 会话重试策略
//!
//! 决定一次会话尝试结束后是否重新连接，以及重连前等待多久。
//! 用户主动中止永远不重试，与是否开启无限重试无关。

use std::time::Duration;

use linkterm_core::SessionConfig;

/// 默认重试间隔
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    forever: bool,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::never()
    }
}

impl RetryPolicy {
    pub fn new(forever: bool, delay: Duration) -> Self {
        Self { forever, delay }
    }

    /// 不重试
    pub fn never() -> Self {
        Self::new(false, DEFAULT_RETRY_DELAY)
    }

    /// 按会话配置创建
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.retry_forever, DEFAULT_RETRY_DELAY)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn is_forever(&self) -> bool {
        self.forever
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// 本次尝试结束后是否重试
    pub fn should_retry(&self, user_aborted: bool) -> bool {
        self.forever && !user_aborted
    }
}
