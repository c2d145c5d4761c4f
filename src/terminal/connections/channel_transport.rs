//! 通道传输实现
//!
//! 封装本地命名管道（Unix 上为 Unix 域套接字）。端点只提供原始字节，
//! 每次 `read` 拉取固定大小的块，经 DecodeBuffer 还原为完整文本。
//!
//! ## 功能
//! - 通过 ChannelConnector 建立连接（可选连接超时）
//! - 端点不存在或忙时，在超时内每 50ms 重试一次
//! - 读写分离：读半部由前台读取循环独占，写半部交给后台按键任务
//! - EOF / 读写错误时标记连接断开

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use linkterm_core::{SessionConfig, TransportKind};
use linkterm_infra::{DecodeBuffer, TextEncoding};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use super::traits::{Transport, TransportWriter, READ_WAIT};
use crate::terminal::error::TerminalError;

/// 每次读取的块大小
pub const CHANNEL_READ_CHUNK: usize = 1024;

/// 端点未就绪时的重连间隔
pub const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// 通道字节流
///
/// 传输需要在线程间共享，底层流必须同时满足 `Send + Sync`。
pub trait ChannelStream: AsyncRead + AsyncWrite + Unpin + Send + Sync {}

impl<T> ChannelStream for T where T: AsyncRead + AsyncWrite + Unpin + Send + Sync {}

/// 通道连接器
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> io::Result<Box<dyn ChannelStream>>;
}

/// 本地管道连接器
///
/// Windows 上连接 `\\.\pipe\<name>`，其他平台连接同名的 Unix 域套接字。
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPipeConnector;

#[async_trait]
impl ChannelConnector for LocalPipeConnector {
    #[cfg(unix)]
    async fn connect(&self, endpoint: &str) -> io::Result<Box<dyn ChannelStream>> {
        let stream = tokio::net::UnixStream::connect(pipe_path(endpoint)).await?;
        Ok(Box::new(stream))
    }

    #[cfg(windows)]
    async fn connect(&self, endpoint: &str) -> io::Result<Box<dyn ChannelStream>> {
        use tokio::net::windows::named_pipe::ClientOptions;

        let client = ClientOptions::new().open(pipe_path(endpoint))?;
        Ok(Box::new(client))
    }
}

/// 规范化管道路径
pub fn pipe_path(endpoint: &str) -> String {
    const PIPE_PREFIX: &str = r"\\.\pipe\";

    if cfg!(windows) && !endpoint.starts_with(PIPE_PREFIX) {
        format!("{PIPE_PREFIX}{endpoint}")
    } else {
        endpoint.to_string()
    }
}

/// 端点暂不可用（不存在、拒绝、忙），值得在超时内重试
fn is_not_ready(err: &io::Error) -> bool {
    // ERROR_PIPE_BUSY
    const PIPE_BUSY: i32 = 231;

    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
    ) || err.raw_os_error() == Some(PIPE_BUSY)
}

struct ChannelLink {
    reader: ReadHalf<Box<dyn ChannelStream>>,
    decoder: DecodeBuffer,
    writer: Arc<ChannelWriter>,
    alive: Arc<AtomicBool>,
}

/// 通道传输
pub struct ChannelTransport {
    endpoint: String,
    connect_timeout: Option<Duration>,
    encoding: TextEncoding,
    connector: Arc<dyn ChannelConnector>,
    link: Option<ChannelLink>,
}

impl ChannelTransport {
    /// 创建通道传输（尚未连接）
    pub fn new(
        config: &SessionConfig,
        connector: Arc<dyn ChannelConnector>,
    ) -> Result<Self, TerminalError> {
        Ok(Self {
            endpoint: config.endpoint.clone(),
            connect_timeout: config.connect_timeout(),
            encoding: TextEncoding::for_label(&config.encoding)?,
            connector,
            link: None,
        })
    }

    /// 打开字节流
    ///
    /// `keep_trying` 为 true 时，端点未就绪会持续重试，由外层超时截止。
    async fn open_stream(&self, keep_trying: bool) -> io::Result<Box<dyn ChannelStream>> {
        loop {
            match self.connector.connect(&self.endpoint).await {
                Ok(stream) => return Ok(stream),
                Err(e) if keep_trying && is_not_ready(&e) => {
                    tracing::trace!("[ChannelTransport] 端点未就绪: {}, {}", self.endpoint, e);
                    tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn connect(&mut self) -> Result<(), TerminalError> {
        if self.is_connected() {
            return Ok(());
        }
        self.link = None;

        tracing::debug!(
            "[ChannelTransport] 连接通道: {}, timeout={:?}",
            self.endpoint,
            self.connect_timeout
        );

        let stream = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, self.open_stream(true))
                .await
                .map_err(|_| TerminalError::ConnectTimeout {
                    endpoint: self.endpoint.clone(),
                    timeout_ms: limit.as_millis() as u64,
                })?,
            None => self.open_stream(false).await,
        }
        .map_err(|e| TerminalError::open_failed(&self.endpoint, e))?;

        let (reader, writer) = tokio::io::split(stream);
        let alive = Arc::new(AtomicBool::new(true));
        let writer = Arc::new(ChannelWriter {
            endpoint: self.endpoint.clone(),
            half: tokio::sync::Mutex::new(writer),
            encoding: self.encoding,
            alive: alive.clone(),
        });

        self.link = Some(ChannelLink {
            reader,
            decoder: DecodeBuffer::new(self.encoding),
            writer,
            alive,
        });

        tracing::info!("[ChannelTransport] 通道已连接: {}", self.endpoint);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.link
            .as_ref()
            .is_some_and(|link| link.alive.load(Ordering::SeqCst))
    }

    async fn read(&mut self) -> Result<String, TerminalError> {
        let link = self.link.as_mut().ok_or(TerminalError::NotConnected)?;
        let mut chunk = [0u8; CHANNEL_READ_CHUNK];

        match tokio::time::timeout(READ_WAIT, link.reader.read(&mut chunk)).await {
            Err(_) => Ok(String::new()),
            Ok(Ok(0)) => {
                tracing::info!("[ChannelTransport] 对端已关闭: {}", self.endpoint);
                link.alive.store(false, Ordering::SeqCst);
                Ok(link.decoder.flush())
            }
            Ok(Ok(n)) => Ok(link.decoder.push(&chunk[..n])),
            Ok(Err(e)) => {
                tracing::error!(
                    "[ChannelTransport] 读取错误: {}, error={}",
                    self.endpoint,
                    e
                );
                link.alive.store(false, Ordering::SeqCst);
                Err(TerminalError::ReadFailed(e.to_string()))
            }
        }
    }

    fn writer(&self) -> Option<Arc<dyn TransportWriter>> {
        self.link
            .as_ref()
            .map(|link| link.writer.clone() as Arc<dyn TransportWriter>)
    }

    async fn disconnect(&mut self) -> bool {
        let Some(link) = self.link.take() else {
            return false;
        };
        link.alive.store(false, Ordering::SeqCst);
        if link.decoder.pending_len() > 0 {
            tracing::debug!(
                "[ChannelTransport] 丢弃 {} 个未解码字节",
                link.decoder.pending_len()
            );
        }
        tracing::info!("[ChannelTransport] 通道已关闭: {}", self.endpoint);
        true
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Channel
    }

    fn describe(&self) -> String {
        match self.connect_timeout {
            Some(limit) => format!("pipe, timeout {} ms", limit.as_millis()),
            None => "pipe".to_string(),
        }
    }
}

/// 通道写入句柄
struct ChannelWriter {
    endpoint: String,
    half: tokio::sync::Mutex<WriteHalf<Box<dyn ChannelStream>>>,
    encoding: TextEncoding,
    alive: Arc<AtomicBool>,
}

#[async_trait]
impl TransportWriter for ChannelWriter {
    async fn write_char(&self, ch: char) -> Result<(), TerminalError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TerminalError::NotConnected);
        }

        let bytes = self.encoding.encode_char(ch);
        let mut half = self.half.lock().await;
        let result = match half.write_all(&bytes).await {
            Ok(()) => half.flush().await,
            Err(e) => Err(e),
        };

        result.map_err(|e| {
            tracing::error!(
                "[ChannelTransport] 写入失败: {}, error={}",
                self.endpoint,
                e
            );
            self.alive.store(false, Ordering::SeqCst);
            TerminalError::WriteFailed(e.to_string())
        })
    }
}
