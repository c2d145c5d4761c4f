//! 线路传输实现
//!
//! 封装串口线路：打开设备后由独立读取线程拉取字节，并用编码库的流式解码器
//! 完成解码，`read` 只需取走已经解码好的文本。
//!
//! ## 功能
//! - 通过 LineOpener 打开设备（默认使用 serialport）
//! - 读取线程解码输出并通过通道推送
//! - 读取线程结束（EOF / 错误）时标记连接断开
//! - 写入句柄按配置编码发送单个字符

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use linkterm_core::{SessionConfig, TransportKind};
use linkterm_infra::TextEncoding;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::traits::{EndpointCatalog, Transport, TransportWriter, READ_WAIT};
use crate::terminal::error::TerminalError;

/// 读取线程的单次阻塞上限，到时检查关闭标志
pub const LINE_POLL_TIMEOUT: Duration = Duration::from_millis(50);

const LINE_READ_BUFFER: usize = 1024;

/// 打开后的读写流
pub struct LineStreams {
    pub reader: Box<dyn Read + Send>,
    pub writer: Box<dyn Write + Send>,
}

/// 线路打开器
///
/// 负责真正的系统调用，会话核心只关心「打开成功得到读写流，或失败」。
pub trait LineOpener: Send + Sync {
    fn open(&self, endpoint: &str, baud_rate: u32) -> io::Result<LineStreams>;
}

/// 基于 serialport 的串口打开器
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialLineOpener;

impl LineOpener for SerialLineOpener {
    fn open(&self, endpoint: &str, baud_rate: u32) -> io::Result<LineStreams> {
        let port = serialport::new(endpoint, baud_rate)
            .timeout(LINE_POLL_TIMEOUT)
            .open()?;
        let reader = port.try_clone()?;
        Ok(LineStreams {
            reader: Box::new(reader),
            writer: Box::new(port),
        })
    }
}

impl EndpointCatalog for SerialLineOpener {
    fn available_endpoints(&self) -> Vec<String> {
        match serialport::available_ports() {
            Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
            Err(e) => {
                tracing::warn!("[SerialLineOpener] 枚举串口失败: {}", e);
                Vec::new()
            }
        }
    }
}

/// 一次打开的连接
struct LineLink {
    writer: Arc<LineWriter>,
    text_rx: mpsc::UnboundedReceiver<String>,
    alive: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

/// 线路传输
pub struct LineTransport {
    endpoint: String,
    baud_rate: u32,
    encoding: TextEncoding,
    opener: Arc<dyn LineOpener>,
    link: Option<LineLink>,
}

impl LineTransport {
    /// 创建线路传输（尚未连接）
    pub fn new(config: &SessionConfig, opener: Arc<dyn LineOpener>) -> Result<Self, TerminalError> {
        Ok(Self {
            endpoint: config.endpoint.clone(),
            baud_rate: config.baud_rate,
            encoding: TextEncoding::for_label(&config.encoding)?,
            opener,
            link: None,
        })
    }

    /// 启动读取线程
    ///
    /// 线程退出前把 `alive` 置为 false，随后丢弃发送端。
    fn spawn_reader(
        endpoint: String,
        mut reader: Box<dyn Read + Send>,
        encoding: TextEncoding,
        text_tx: mpsc::UnboundedSender<String>,
        alive: Arc<AtomicBool>,
        shutdown: Arc<AtomicBool>,
    ) {
        std::thread::spawn(move || {
            let mut buffer = [0u8; LINE_READ_BUFFER];
            let mut decoder = encoding.stream_decoder();

            loop {
                if shutdown.load(Ordering::Relaxed) {
                    tracing::debug!("[LineTransport] 收到关闭信号: {}", endpoint);
                    break;
                }

                match reader.read(&mut buffer) {
                    Ok(0) => {
                        tracing::info!("[LineTransport] 线路已关闭: {}", endpoint);
                        break;
                    }
                    Ok(n) => {
                        let text = decoder.decode(&buffer[..n]);
                        if !text.is_empty() && text_tx.send(text).is_err() {
                            break;
                        }
                    }
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::TimedOut
                                | io::ErrorKind::WouldBlock
                                | io::ErrorKind::Interrupted
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        if !shutdown.load(Ordering::Relaxed) {
                            tracing::error!("[LineTransport] 读取错误: {}, error={}", endpoint, e);
                        }
                        break;
                    }
                }
            }

            let tail = decoder.finish();
            if !tail.is_empty() {
                let _ = text_tx.send(tail);
            }
            alive.store(false, Ordering::SeqCst);
        });
    }
}

#[async_trait]
impl Transport for LineTransport {
    async fn connect(&mut self) -> Result<(), TerminalError> {
        if self.is_connected() {
            return Ok(());
        }
        self.link = None;

        tracing::debug!(
            "[LineTransport] 打开线路: {}, baud={}",
            self.endpoint,
            self.baud_rate
        );

        let streams = self
            .opener
            .open(&self.endpoint, self.baud_rate)
            .map_err(|e| TerminalError::open_failed(&self.endpoint, e))?;

        let alive = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(AtomicBool::new(false));
        let (text_tx, text_rx) = mpsc::unbounded_channel();

        Self::spawn_reader(
            self.endpoint.clone(),
            streams.reader,
            self.encoding,
            text_tx,
            alive.clone(),
            shutdown.clone(),
        );

        let writer = Arc::new(LineWriter {
            endpoint: self.endpoint.clone(),
            writer: Mutex::new(streams.writer),
            encoding: self.encoding,
            alive: alive.clone(),
        });

        self.link = Some(LineLink {
            writer,
            text_rx,
            alive,
            shutdown,
        });

        tracing::info!("[LineTransport] 线路已打开: {}", self.endpoint);
        Ok(())
    }

    /// 读取线程退出后，已排队的文本取完之前仍视为连接
    fn is_connected(&self) -> bool {
        self.link.as_ref().is_some_and(|link| {
            link.alive.load(Ordering::SeqCst) || !link.text_rx.is_empty()
        })
    }

    async fn read(&mut self) -> Result<String, TerminalError> {
        let link = self.link.as_mut().ok_or(TerminalError::NotConnected)?;

        let mut text = match tokio::time::timeout(READ_WAIT, link.text_rx.recv()).await {
            Ok(Some(text)) => text,
            // 读取线程已退出或本窗口内无数据
            Ok(None) | Err(_) => return Ok(String::new()),
        };

        while let Ok(more) = link.text_rx.try_recv() {
            text.push_str(&more);
        }
        Ok(text)
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
        link.shutdown.store(true, Ordering::SeqCst);
        link.alive.store(false, Ordering::SeqCst);
        tracing::info!("[LineTransport] 线路已关闭: {}", self.endpoint);
        true
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Line
    }

    fn describe(&self) -> String {
        format!("{} baud", self.baud_rate)
    }
}

/// 线路写入句柄
struct LineWriter {
    endpoint: String,
    writer: Mutex<Box<dyn Write + Send>>,
    encoding: TextEncoding,
    alive: Arc<AtomicBool>,
}

#[async_trait]
impl TransportWriter for LineWriter {
    async fn write_char(&self, ch: char) -> Result<(), TerminalError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TerminalError::NotConnected);
        }

        let bytes = self.encoding.encode_char(ch);
        let mut writer = self.writer.lock();
        writer
            .write_all(&bytes)
            .and_then(|_| writer.flush())
            .map_err(|e| {
                tracing::error!("[LineTransport] 写入失败: {}, error={}", self.endpoint, e);
                self.alive.store(false, Ordering::SeqCst);
                TerminalError::WriteFailed(e.to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;

    /// 由测试喂数据的读取端，无数据时模拟串口超时
    struct FeedReader {
        rx: std_mpsc::Receiver<Vec<u8>>,
    }

    impl Read for FeedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.rx.recv_timeout(Duration::from_millis(10)) {
                Ok(bytes) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Err(std_mpsc::RecvTimeoutError::Timeout) => {
                    Err(io::Error::new(io::ErrorKind::TimedOut, "timeout"))
                }
                Err(std_mpsc::RecvTimeoutError::Disconnected) => Ok(0),
            }
        }
    }

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// 每次 open 取走预先准备好的一组读写流
    struct FakeOpener {
        streams: Mutex<Option<LineStreams>>,
    }

    impl LineOpener for FakeOpener {
        fn open(&self, endpoint: &str, _baud_rate: u32) -> io::Result<LineStreams> {
            self.streams.lock().take().ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("{endpoint} not found"))
            })
        }
    }

    fn fake_line(encoding: &str) -> (LineTransport, std_mpsc::Sender<Vec<u8>>, SharedSink) {
        let (tx, rx) = std_mpsc::channel();
        let sink = SharedSink::default();
        let opener = FakeOpener {
            streams: Mutex::new(Some(LineStreams {
                reader: Box::new(FeedReader { rx }),
                writer: Box::new(sink.clone()),
            })),
        };
        let mut config = SessionConfig::new("/dev/ttyTEST0");
        config.encoding = encoding.to_string();
        let transport = LineTransport::new(&config, Arc::new(opener)).unwrap();
        (transport, tx, sink)
    }

    #[tokio::test]
    async fn test_connect_failure_names_endpoint() {
        let opener = FakeOpener {
            streams: Mutex::new(None),
        };
        let mut transport =
            LineTransport::new(&SessionConfig::new("COM9"), Arc::new(opener)).unwrap();

        let err = transport.connect().await.unwrap_err();
        assert!(err.is_connect_failure());
        assert!(err.to_string().contains("COM9"));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_read_reassembles_split_characters() {
        let (mut transport, tx, _sink) = fake_line("utf-8");
        transport.connect().await.unwrap();
        assert!(transport.is_connected());

        let bytes = "温度: 21°C".as_bytes();
        tx.send(bytes[..2].to_vec()).unwrap();
        tx.send(bytes[2..].to_vec()).unwrap();

        let mut received = String::new();
        for _ in 0..20 {
            received.push_str(&transport.read().await.unwrap());
            if received.len() == bytes.len() {
                break;
            }
        }
        assert_eq!(received, "温度: 21°C");
    }

    #[tokio::test]
    async fn test_read_is_empty_without_data() {
        let (mut transport, _tx, _sink) = fake_line("utf-8");
        transport.connect().await.unwrap();

        let started = std::time::Instant::now();
        assert_eq!(transport.read().await.unwrap(), "");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_eof_marks_disconnected() {
        let (mut transport, tx, _sink) = fake_line("utf-8");
        transport.connect().await.unwrap();
        drop(tx);

        for _ in 0..50 {
            if !transport.is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_text_before_eof_is_delivered() {
        let (mut transport, tx, _sink) = fake_line("utf-8");
        transport.connect().await.unwrap();

        let euro = "€".as_bytes();
        let mut bytes = b"bye".to_vec();
        bytes.extend_from_slice(&euro[..2]);
        tx.send(bytes).unwrap();
        drop(tx);

        let mut received = String::new();
        for _ in 0..50 {
            if !transport.is_connected() {
                break;
            }
            received.push_str(&transport.read().await.unwrap());
        }

        // 不完整的尾部在线路关闭时替换为 U+FFFD
        assert_eq!(received, "bye\u{FFFD}");
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_iso_2022_jp_line() {
        let (mut transport, tx, _sink) = fake_line("iso-2022-jp");
        transport.connect().await.unwrap();

        let (bytes, _, _) = encoding_rs::ISO_2022_JP.encode("温度");
        tx.send(bytes[..4].to_vec()).unwrap();
        tx.send(bytes[4..].to_vec()).unwrap();

        let mut received = String::new();
        for _ in 0..20 {
            received.push_str(&transport.read().await.unwrap());
            if received.chars().count() == 2 {
                break;
            }
        }
        assert_eq!(received, "温度");
    }

    #[tokio::test]
    async fn test_write_encodes_characters() {
        let (mut transport, _tx, sink) = fake_line("utf-16le");
        assert!(matches!(
            transport.write('a').await,
            Err(TerminalError::NotConnected)
        ));

        transport.connect().await.unwrap();
        transport.write('a').await.unwrap();
        transport.write('\x10').await.unwrap();

        assert_eq!(*sink.0.lock(), vec![0x61, 0x00, 0x10, 0x00]);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (mut transport, _tx, _sink) = fake_line("utf-8");
        assert!(!transport.disconnect().await);

        transport.connect().await.unwrap();
        assert!(transport.disconnect().await);
        assert!(!transport.is_connected());
        assert!(transport.writer().is_none());
        assert!(!transport.disconnect().await);
    }

    #[test]
    fn test_describe_includes_baud_rate() {
        let (transport, _tx, _sink) = fake_line("utf-8");
        assert_eq!(transport.describe(), "38400 baud");
        assert_eq!(transport.kind(), TransportKind::Line);
    }
}
