//! 会话控制器
//!
//! 编排一次完整的会话：连接 → 交互读取循环 → 断开 → 按策略重试。
//!
//! ## 状态流转
//! `Disconnected → Connecting → Connected → Reading → Disconnecting →
//! (Disconnected | RetryWait → Connecting)`
//!
//! ## 并发模型
//! 每次连接尝试由前台读取循环和后台按键任务组成。两者只通过中断标志
//! 和传输写入句柄通信：读取只在前台进行，写入只由按键任务发出。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use linkterm_core::SessionConfig;
use linkterm_infra::RetryPolicy;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::terminal::connections::{EndpointCatalog, Transport, TransportWriter, READ_WAIT};
use crate::terminal::console::SessionConsole;
use crate::terminal::error::TerminalError;
use crate::terminal::input::{KeyReader, KeySource, KEY_POLL_INTERVAL};

// ============================================================================
// 会话状态
// ============================================================================

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Reading,
    Disconnecting,
    RetryWait,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reading => write!(f, "reading"),
            Self::Disconnecting => write!(f, "disconnecting"),
            Self::RetryWait => write!(f, "retry_wait"),
        }
    }
}

/// 会话结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// 用户输入了中止序列，或外部请求中止
    UserAborted,
    /// 连接断开（或连接失败后不再重试）
    ConnectionLost,
}

/// 会话节奏参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// 读取为空时的退避时间
    pub read_backoff: Duration,
    /// 按键轮询间隔
    pub key_poll: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            read_backoff: READ_WAIT,
            key_poll: KEY_POLL_INTERVAL,
        }
    }
}

// ============================================================================
// 会话控制器
// ============================================================================

/// 会话控制器
pub struct SessionController {
    config: Arc<SessionConfig>,
    transport: Box<dyn Transport>,
    /// 按键来源，运行按键任务期间被任务持有
    keys: Option<Box<dyn KeySource>>,
    console: SessionConsole,
    catalog: Arc<dyn EndpointCatalog>,
    retry: RetryPolicy,
    timing: SessionTiming,
    cancel: CancellationToken,
    state: SessionState,
    attempts: u32,
}

impl SessionController {
    pub fn new(
        config: Arc<SessionConfig>,
        transport: Box<dyn Transport>,
        keys: Box<dyn KeySource>,
        console: SessionConsole,
        catalog: Arc<dyn EndpointCatalog>,
    ) -> Self {
        Self {
            retry: RetryPolicy::from_config(&config),
            config,
            transport,
            keys: Some(keys),
            console,
            catalog,
            timing: SessionTiming::default(),
            cancel: CancellationToken::new(),
            state: SessionState::Disconnected,
            attempts: 0,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timing(mut self, timing: SessionTiming) -> Self {
        self.timing = timing;
        self
    }

    /// 外部中止句柄，取消后会话在任意阶段结束
    pub fn abort_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 已发起的连接次数
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            tracing::debug!("[SessionController] 状态: {} -> {}", self.state, state);
            self.state = state;
        }
    }

    /// 运行会话直到用户中止，或在不重试时直到一次尝试结束
    ///
    /// 不重试时连接失败作为错误返回。
    pub async fn run(&mut self) -> Result<SessionOutcome, TerminalError> {
        tracing::info!(
            "[SessionController] 会话开始: endpoint={}, kind={}, retry={}",
            self.config.endpoint,
            self.transport.kind(),
            self.retry.is_forever()
        );

        loop {
            if self.cancel.is_cancelled() {
                return self.finish(SessionOutcome::UserAborted);
            }

            let outcome = match self.attempt().await {
                Ok(outcome) => outcome,
                Err(e) if e.is_connect_failure() => {
                    self.report_connect_failure(&e)?;
                    if !self.retry.should_retry(false) {
                        self.set_state(SessionState::Disconnected);
                        return Err(e);
                    }
                    SessionOutcome::ConnectionLost
                }
                Err(e) => {
                    self.set_state(SessionState::Disconnected);
                    return Err(e);
                }
            };

            let user_aborted = outcome == SessionOutcome::UserAborted;
            if !self.retry.should_retry(user_aborted) {
                return self.finish(outcome);
            }

            if self.wait_before_retry().await? {
                return self.finish(SessionOutcome::UserAborted);
            }
        }
    }

    fn finish(&mut self, outcome: SessionOutcome) -> Result<SessionOutcome, TerminalError> {
        self.set_state(SessionState::Disconnected);
        if outcome == SessionOutcome::UserAborted {
            self.console.user_aborted()?;
        }
        tracing::info!(
            "[SessionController] 会话结束: outcome={:?}, attempts={}",
            outcome,
            self.attempts
        );
        Ok(outcome)
    }

    /// 一次连接尝试
    async fn attempt(&mut self) -> Result<SessionOutcome, TerminalError> {
        self.attempts += 1;
        self.set_state(SessionState::Connecting);

        tokio::select! {
            result = self.transport.connect() => result?,
            _ = self.cancel.cancelled() => return Ok(SessionOutcome::UserAborted),
        }

        self.set_state(SessionState::Connected);
        self.console
            .connected(self.transport.endpoint(), &self.transport.describe())?;
        self.console
            .abort_hint(self.config.abort_mode.key_sequence())?;

        let interrupted = Arc::new(AtomicBool::new(false));
        let reader = match self.spawn_key_reader(self.transport.writer(), interrupted.clone()) {
            Ok(reader) => reader,
            Err(e) => {
                self.transport.disconnect().await;
                return Err(e);
            }
        };

        self.set_state(SessionState::Reading);
        let outcome = self.read_loop(&interrupted, &reader).await;

        self.set_state(SessionState::Disconnecting);
        let stopped = reader.stop().await;
        if self.transport.disconnect().await {
            self.console.disconnected(self.transport.endpoint())?;
        }
        self.keys = Some(stopped?);

        outcome
    }

    fn spawn_key_reader(
        &mut self,
        writer: Option<Arc<dyn TransportWriter>>,
        interrupted: Arc<AtomicBool>,
    ) -> Result<KeyReader, TerminalError> {
        let source = self
            .keys
            .take()
            .ok_or_else(|| TerminalError::Console("key source unavailable".to_string()))?;

        Ok(KeyReader::spawn(
            source,
            self.config.abort_mode,
            writer,
            interrupted,
            self.timing.key_poll,
        ))
    }

    /// 前台读取循环
    async fn read_loop(
        &mut self,
        interrupted: &AtomicBool,
        reader: &KeyReader,
    ) -> Result<SessionOutcome, TerminalError> {
        loop {
            if interrupted.load(Ordering::SeqCst) || self.cancel.is_cancelled() {
                return Ok(SessionOutcome::UserAborted);
            }

            if !self.transport.is_connected() {
                tracing::info!(
                    "[SessionController] 连接已断开: {}",
                    self.transport.endpoint()
                );
                return Ok(SessionOutcome::ConnectionLost);
            }

            match self.transport.read().await {
                Ok(text) if !text.is_empty() => self.console.write_text(&text)?,
                Ok(_) => {
                    tokio::select! {
                        _ = reader.aborted() => {}
                        _ = self.cancel.cancelled() => {}
                        _ = tokio::time::sleep(self.timing.read_backoff) => {}
                    }
                }
                Err(e) => {
                    tracing::warn!("[SessionController] 读取失败: {}", e);
                    return Ok(SessionOutcome::ConnectionLost);
                }
            }
        }
    }

    /// 重连前等待
    ///
    /// 等待期间仍监听中止序列（按键不转发），返回是否被中止。
    async fn wait_before_retry(&mut self) -> Result<bool, TerminalError> {
        self.set_state(SessionState::RetryWait);
        tracing::debug!(
            "[SessionController] {:?} 后重连: {}",
            self.retry.delay(),
            self.config.endpoint
        );

        let interrupted = Arc::new(AtomicBool::new(false));
        let reader = self.spawn_key_reader(None, interrupted.clone())?;

        tokio::select! {
            _ = tokio::time::sleep(self.retry.delay()) => {}
            _ = reader.aborted() => {}
            _ = self.cancel.cancelled() => {}
        }

        self.keys = Some(reader.stop().await?);
        Ok(interrupted.load(Ordering::SeqCst) || self.cancel.is_cancelled())
    }

    fn report_connect_failure(&mut self, err: &TerminalError) -> Result<(), TerminalError> {
        if self.config.quiet_connect_failures() {
            tracing::debug!("[SessionController] 连接失败: {}", err);
            return Ok(());
        }
        tracing::warn!("[SessionController] 连接失败: {}", err);
        let endpoints = self.catalog.available_endpoints();
        self.console.connect_failed(err, &endpoints)
    }
}
