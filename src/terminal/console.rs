//! 会话控制台输出
//!
//! 负责所有面向用户的提示信息和远端文本的回显。
//! 会话期间控制台处于原始模式，所有提示行都以 CRLF 结尾。

use std::fmt::Display;
use std::io::{self, Write};

use crossterm::style::Stylize;
use crossterm::terminal;

use crate::terminal::error::TerminalError;

const CRLF: &str = "\r\n";

/// 控制台输出
pub struct SessionConsole {
    out: Box<dyn Write + Send>,
}

impl SessionConsole {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    /// 输出到标准输出
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// 原样输出远端文本
    pub fn write_text(&mut self, text: &str) -> Result<(), TerminalError> {
        self.out.write_all(text.as_bytes()).map_err(console_error)?;
        self.out.flush().map_err(console_error)
    }

    fn line(&mut self, line: impl Display) -> Result<(), TerminalError> {
        write!(self.out, "{line}{CRLF}").map_err(console_error)?;
        self.out.flush().map_err(console_error)
    }

    pub fn connected(&mut self, endpoint: &str, details: &str) -> Result<(), TerminalError> {
        self.line(format!("Connected to {endpoint} ({details})."))
    }

    pub fn disconnected(&mut self, endpoint: &str) -> Result<(), TerminalError> {
        self.line(format!("Disconnected from {endpoint}."))
    }

    pub fn abort_hint(&mut self, key_sequence: &str) -> Result<(), TerminalError> {
        self.line(format!("Press {key_sequence} to end the session."))
    }

    /// 连接失败信息，附带可用端点列表
    pub fn connect_failed(
        &mut self,
        error: &TerminalError,
        endpoints: &[String],
    ) -> Result<(), TerminalError> {
        self.line(format!("Failed to connect: {error}").red())?;
        self.endpoints(endpoints)
    }

    /// 可用端点列表
    pub fn endpoints(&mut self, endpoints: &[String]) -> Result<(), TerminalError> {
        if endpoints.is_empty() {
            return self.line("No serial ports found.");
        }
        self.line("Available ports:")?;
        for name in endpoints {
            self.line(format!("  {name}"))?;
        }
        Ok(())
    }

    pub fn user_aborted(&mut self) -> Result<(), TerminalError> {
        self.line("Session ended by user.".yellow())
    }
}

fn console_error(err: io::Error) -> TerminalError {
    TerminalError::Console(err.to_string())
}

/// 原始模式守卫
///
/// 创建时开启原始模式，drop 时恢复。
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn enable() -> Result<Self, TerminalError> {
        terminal::enable_raw_mode().map_err(console_error)?;
        tracing::debug!("[Console] 已进入原始模式");
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::warn!("[Console] 恢复控制台模式失败: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn console() -> (SessionConsole, Captured) {
        let captured = Captured::default();
        (SessionConsole::new(Box::new(captured.clone())), captured)
    }

    #[test]
    fn test_messages_end_with_crlf() {
        let (mut console, captured) = console();
        console.connected("COM3", "38400 baud").unwrap();
        console.abort_hint("~.").unwrap();
        console.disconnected("COM3").unwrap();

        assert_eq!(
            captured.text(),
            "Connected to COM3 (38400 baud).\r\nPress ~. to end the session.\r\nDisconnected from COM3.\r\n"
        );
    }

    #[test]
    fn test_text_is_verbatim() {
        let (mut console, captured) = console();
        console.write_text("login:\n\x1b[1m").unwrap();
        assert_eq!(captured.text(), "login:\n\x1b[1m");
    }

    #[test]
    fn test_connect_failed_lists_ports() {
        let (mut console, captured) = console();
        let err = TerminalError::open_failed("COM9", "The system cannot find the file specified.");
        console
            .connect_failed(&err, &["COM1".to_string(), "COM4".to_string()])
            .unwrap();

        let text = captured.text();
        assert!(text.contains("Failed to connect: could not open COM9"));
        assert!(text.contains("Available ports:\r\n  COM1\r\n  COM4\r\n"));
    }

    #[test]
    fn test_empty_port_list() {
        let (mut console, captured) = console();
        console.endpoints(&[]).unwrap();
        assert_eq!(captured.text(), "No serial ports found.\r\n");
    }

    #[test]
    fn test_user_aborted() {
        let (mut console, captured) = console();
        console.user_aborted().unwrap();
        assert!(captured.text().contains("Session ended by user."));
        assert!(captured.text().ends_with("\r\n"));
    }
}
