//! 后台按键读取任务
//!
//! 与前台读取循环并发运行：轮询按键来源，经中止检测器处理后
//! 把字符逐个写入传输，识别到中止序列时设置中断标志并退出。
//!
//! ## 功能
//! - 每个轮询间隔（默认 1ms）检查一次按键
//! - 写入句柄为空时只检测中止序列，不转发按键（用于重连等待期间）
//! - 通过 CancellationToken 停止，停止后归还按键来源

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use linkterm_core::{AbortMode, KeyEvent};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::abort_detector::{AbortDetector, KeyAction};
use crate::terminal::connections::TransportWriter;
use crate::terminal::error::TerminalError;

/// 默认按键轮询间隔
pub const KEY_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// 按键来源
///
/// 非阻塞：没有待处理的按键时立即返回 `Ok(None)`。
pub trait KeySource: Send {
    fn poll_key(&mut self) -> Result<Option<KeyEvent>, TerminalError>;
}

/// 后台按键读取任务句柄
pub struct KeyReader {
    cancel: CancellationToken,
    aborted: CancellationToken,
    handle: JoinHandle<Box<dyn KeySource>>,
}

impl KeyReader {
    /// 启动按键读取任务
    pub fn spawn(
        source: Box<dyn KeySource>,
        mode: AbortMode,
        writer: Option<Arc<dyn TransportWriter>>,
        interrupted: Arc<AtomicBool>,
        poll_interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let aborted = CancellationToken::new();

        let handle = tokio::spawn(Self::run(
            source,
            AbortDetector::new(mode),
            writer,
            interrupted,
            poll_interval,
            cancel.clone(),
            aborted.clone(),
        ));

        Self {
            cancel,
            aborted,
            handle,
        }
    }

    async fn run(
        mut source: Box<dyn KeySource>,
        mut detector: AbortDetector,
        writer: Option<Arc<dyn TransportWriter>>,
        interrupted: Arc<AtomicBool>,
        poll_interval: Duration,
        cancel: CancellationToken,
        aborted: CancellationToken,
    ) -> Box<dyn KeySource> {
        tracing::debug!("[KeyReader] 按键读取开始: mode={}", detector.mode());

        while !cancel.is_cancelled() {
            let polled = source.poll_key().unwrap_or_else(|e| {
                tracing::warn!("[KeyReader] 读取按键失败: {}", e);
                None
            });

            let Some(event) = polled else {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }
                continue;
            };

            match detector.feed(&event) {
                KeyAction::Abort => {
                    tracing::info!("[KeyReader] 检测到中止序列");
                    interrupted.store(true, Ordering::SeqCst);
                    aborted.cancel();
                    break;
                }
                KeyAction::Forward(ch) => {
                    if let Some(writer) = &writer {
                        if let Err(e) = writer.write_char(ch).await {
                            tracing::debug!("[KeyReader] 转发按键失败: {}", e);
                        }
                    }
                }
                KeyAction::Ignore => {}
            }
        }

        tracing::debug!("[KeyReader] 按键读取结束");
        source
    }

    /// 识别到中止序列后完成
    pub async fn aborted(&self) {
        self.aborted.cancelled().await
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_cancelled()
    }

    /// 停止任务并等待其退出，归还按键来源
    pub async fn stop(self) -> Result<Box<dyn KeySource>, TerminalError> {
        self.cancel.cancel();
        self.handle
            .await
            .map_err(|e| TerminalError::Console(format!("key reader failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use linkterm_core::Key;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// 按顺序吐出预设按键的来源
    struct ScriptedKeys(VecDeque<KeyEvent>);

    impl ScriptedKeys {
        fn boxed(events: impl IntoIterator<Item = KeyEvent>) -> Box<dyn KeySource> {
            Box::new(Self(events.into_iter().collect()))
        }
    }

    impl KeySource for ScriptedKeys {
        fn poll_key(&mut self) -> Result<Option<KeyEvent>, TerminalError> {
            Ok(self.0.pop_front())
        }
    }

    #[derive(Default)]
    struct RecordingWriter(Mutex<Vec<char>>);

    #[async_trait]
    impl TransportWriter for RecordingWriter {
        async fn write_char(&self, ch: char) -> Result<(), TerminalError> {
            self.0.lock().push(ch);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_forwards_until_abort() {
        let writer = Arc::new(RecordingWriter::default());
        let interrupted = Arc::new(AtomicBool::new(false));
        let keys = ScriptedKeys::boxed([
            KeyEvent::char('l'),
            KeyEvent::char('s'),
            KeyEvent::plain(Key::Enter),
            KeyEvent::char('~'),
            KeyEvent::char('.'),
            KeyEvent::char('z'),
        ]);

        let reader = KeyReader::spawn(
            keys,
            AbortMode::TildeDot,
            Some(writer.clone()),
            interrupted.clone(),
            KEY_POLL_INTERVAL,
        );
        tokio::time::timeout(Duration::from_secs(2), reader.aborted())
            .await
            .unwrap();

        assert!(interrupted.load(Ordering::SeqCst));
        assert_eq!(*writer.0.lock(), vec!['l', 's', '\r', '~']);

        // 中止后剩余的按键留在来源中
        let mut source = reader.stop().await.unwrap();
        assert_eq!(source.poll_key().unwrap(), Some(KeyEvent::char('z')));
    }

    #[tokio::test]
    async fn test_stop_without_abort() {
        let interrupted = Arc::new(AtomicBool::new(false));
        let reader = KeyReader::spawn(
            ScriptedKeys::boxed([]),
            AbortMode::CtrlC,
            None,
            interrupted.clone(),
            KEY_POLL_INTERVAL,
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!reader.is_aborted());
        assert!(reader.stop().await.is_ok());
        assert!(!interrupted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_detects_abort_without_writer() {
        let interrupted = Arc::new(AtomicBool::new(false));
        let reader = KeyReader::spawn(
            ScriptedKeys::boxed([KeyEvent::char('a'), KeyEvent::ctrl('b')]),
            AbortMode::CtrlB,
            None,
            interrupted.clone(),
            KEY_POLL_INTERVAL,
        );

        tokio::time::timeout(Duration::from_secs(2), reader.aborted())
            .await
            .unwrap();
        assert!(reader.is_aborted());
        assert!(interrupted.load(Ordering::SeqCst));
    }
}
