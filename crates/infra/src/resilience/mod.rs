//! 容错模块
//!
//! - `retry` - 会话重试策略

pub mod retry;

pub use retry::{RetryPolicy, DEFAULT_RETRY_DELAY};
