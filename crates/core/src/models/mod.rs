//! 纯数据类型

pub mod key_event;

pub use key_event::{Key, KeyEvent, Modifiers};
