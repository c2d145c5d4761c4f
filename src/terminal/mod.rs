//! 终端会话模块
//!
//! 把本地控制台连接到远端字节端点：转发按键，把收到的字节解码后回显，
//! 直到用户输入中止序列或连接断开。
//!
//! ## 模块结构
//! - `error` - 错误类型定义
//! - `connections` - 传输模块（串口线路、本地命名管道）
//! - `input` - 按键输入（中止检测、后台按键任务、控制台按键来源）
//! - `console` - 控制台输出与原始模式
//! - `session_controller` - 会话控制器（连接、读取循环、重试）
//!
//! ## 使用示例
//! ```ignore
//! use linkterm_lib::terminal::{ConnectionRouter, CrosstermKeySource, SessionConsole, SessionController};
//!
//! let router = ConnectionRouter::default();
//! let transport = router.build(&config)?;
//! let mut controller = SessionController::new(
//!     config,
//!     transport,
//!     Box::new(CrosstermKeySource),
//!     SessionConsole::stdout(),
//!     router.catalog(),
//! );
//! let outcome = controller.run().await?;
//! ```

pub mod connections;
pub mod console;
pub mod error;
pub mod input;
pub mod session_controller;


// 重新导出常用类型
pub use connections::{
    ChannelTransport, ConnectionRouter, EndpointCatalog, LineTransport, Transport,
    TransportWriter,
};
pub use console::{RawModeGuard, SessionConsole};
pub use error::TerminalError;
pub use input::{AbortDetector, CrosstermKeySource, KeyAction, KeyReader, KeySource};
pub use session_controller::{SessionController, SessionOutcome, SessionState, SessionTiming};
