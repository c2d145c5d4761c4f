//! 基础设施模块
//!
//! 包含独立的基础设施组件，不依赖会话逻辑：
//! - codec: 文本编码与增量解码缓冲区
//! - resilience: 重试策略

pub mod codec;
pub mod resilience;

// 重新导出常用类型
pub use codec::{
    CodecError, DecodeBuffer, MalformedRun, StreamDecoder, TextEncoding, DEFAULT_DECODE_CAPACITY,
};
pub use resilience::{RetryPolicy, DEFAULT_RETRY_DELAY};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
