//! 文本编解码模块
//!
//! - `text_encoding` - 基于 encoding_rs 的编码封装
//! - `decode_buffer` - 切分安全的增量解码缓冲区

pub mod decode_buffer;
pub mod text_encoding;

use thiserror::Error;

pub use decode_buffer::{DecodeBuffer, DEFAULT_DECODE_CAPACITY};
pub use text_encoding::{MalformedRun, StreamDecoder, TextEncoding};

/// 编解码错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown text encoding: {0}")]
    UnknownEncoding(String),
}
