//! linkterm 库
//!
//! 把本地控制台桥接到串口线路或本地命名管道的交互式会话引擎。
//!
//! ## 模块结构
//! - `cli` - 命令行参数
//! - `terminal` - 传输、按键输入、控制台输出和会话控制器

pub mod cli;
pub mod terminal;

pub use cli::Cli;
pub use terminal::{SessionController, SessionOutcome, TerminalError};
