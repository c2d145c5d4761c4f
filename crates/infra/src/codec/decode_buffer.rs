//! 增量解码缓冲区
//!
//! 把任意切分的字节块还原为完整的文本片段。多字节字符被切在两个块之间时，
//! 不完整的尾部会保留到下一个块到达；输出的片段永远不会截断字符。
//!
//! ## 算法
//! 1. 追加后超出容量：对整段做容错解码并清空（以正确性换取前进）
//! 2. 严格解码整个累积区，成功则全部输出
//! 3. 失败时区分「非法」与「不完整」：
//!    - 含非法序列：输出其前的合法文本和 U+FFFD，丢弃该非法序列后继续
//!    - 仅尾部不完整：从末尾逐字节收缩，找到最长的可严格解码前缀并输出，
//!      只保留不完整的尾部
//!    - 找不到非空前缀：整个累积区都属于同一个不完整字符，继续等待
//!
//! 带移位状态的编码（ISO-2022-JP）不能对片段单独解码，改用跨块保留状态的
//! 流式解码器，累积区始终为空。

use super::{StreamDecoder, TextEncoding};

/// 默认累积上限（字节）
pub const DEFAULT_DECODE_CAPACITY: usize = 4096;

/// 增量解码缓冲区
#[derive(Debug)]
pub struct DecodeBuffer {
    encoding: TextEncoding,
    /// 尚不能安全解码的字节
    pending: Vec<u8>,
    capacity: usize,
    overflows: u64,
    /// 仅用于带移位状态的编码
    stream: Option<StreamDecoder>,
}

impl DecodeBuffer {
    pub fn new(encoding: TextEncoding) -> Self {
        Self::with_capacity(encoding, DEFAULT_DECODE_CAPACITY)
    }

    pub fn with_capacity(encoding: TextEncoding, capacity: usize) -> Self {
        Self {
            encoding,
            pending: Vec::new(),
            capacity: capacity.max(1),
            overflows: 0,
            stream: encoding.is_stateful().then(|| encoding.stream_decoder()),
        }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 当前保留的字节数
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 发生溢出回退的次数
    pub fn overflow_count(&self) -> u64 {
        self.overflows
    }

    /// 送入一个字节块，返回本次可以安全输出的文本（可能为空）
    pub fn push(&mut self, chunk: &[u8]) -> String {
        if chunk.is_empty() {
            return String::new();
        }

        if let Some(stream) = self.stream.as_mut() {
            return stream.decode(chunk);
        }

        if self.pending.len() + chunk.len() > self.capacity {
            let mut run = std::mem::take(&mut self.pending);
            run.extend_from_slice(chunk);
            self.overflows += 1;
            tracing::debug!(
                "[DecodeBuffer] 超出容量 {}，容错解码 {} 字节",
                self.capacity,
                run.len()
            );
            return self.encoding.decode_lossy(&run);
        }

        self.pending.extend_from_slice(chunk);
        self.drain()
    }

    /// 容错解码并清空剩余字节（流结束时使用）
    pub fn flush(&mut self) -> String {
        if let Some(stream) = self.stream.as_mut() {
            return stream.finish();
        }
        if self.pending.is_empty() {
            return String::new();
        }
        let run = std::mem::take(&mut self.pending);
        self.encoding.decode_lossy(&run)
    }

    /// 丢弃剩余字节
    pub fn reset(&mut self) {
        self.pending.clear();
        if let Some(stream) = self.stream.as_mut() {
            stream.reset();
        }
    }

    fn drain(&mut self) -> String {
        let mut out = String::new();

        while !self.pending.is_empty() {
            if let Some(text) = self.encoding.decode_strict(&self.pending) {
                out.push_str(&text);
                self.pending.clear();
                break;
            }

            if let Some(run) = self.encoding.find_malformed(&self.pending) {
                tracing::debug!(
                    "[DecodeBuffer] 丢弃非法序列，位置 {}",
                    run.consumed.saturating_sub(1)
                );
                out.push_str(&run.decoded);
                out.push(char::REPLACEMENT_CHARACTER);
                self.pending.drain(..run.consumed);
                continue;
            }

            if let Some((end, text)) = self.longest_valid_prefix() {
                out.push_str(&text);
                self.pending.drain(..end);
            }
            break;
        }

        out
    }

    /// 从末尾逐字节收缩，返回最长的可严格解码的非空前缀
    fn longest_valid_prefix(&self) -> Option<(usize, String)> {
        (1..self.pending.len()).rev().find_map(|end| {
            self.encoding
                .decode_strict(&self.pending[..end])
                .map(|text| (end, text))
        })
    }
}
