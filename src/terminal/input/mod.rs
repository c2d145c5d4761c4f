//! 输入模块
//!
//! ## 模块结构
//! - `abort_detector` - 中止序列检测与按键翻译
//! - `key_reader` - 后台按键读取任务与 KeySource 接口
//! - `console_keys` - crossterm 按键来源

pub mod abort_detector;
pub mod console_keys;
pub mod key_reader;

pub use abort_detector::{translate_key, AbortDetector, KeyAction};
pub use console_keys::{convert_key, CrosstermKeySource};
pub use key_reader::{KeyReader, KeySource, KEY_POLL_INTERVAL};
