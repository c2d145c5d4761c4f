//! 文本编码封装
//!
//! 基于 `encoding_rs`，提供严格解码、容错解码、流式解码器以及
//! 单字符编码。所有解码都不做 BOM 处理，字节原样进入解码器。

use encoding_rs::{
    CoderResult, Decoder, DecoderResult, Encoding, ISO_2022_JP, REPLACEMENT, UTF_16BE, UTF_16LE,
    UTF_8,
};

use super::CodecError;

/// 一段以非法序列结尾的解码结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRun {
    /// 非法序列之前已解码的合法文本
    pub decoded: String,
    /// 消耗的字节数（合法部分 + 非法序列本身）
    pub consumed: usize,
}

/// 文本编码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding {
    encoding: &'static Encoding,
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}

impl TextEncoding {
    /// 按 WHATWG 标签查找编码（如 "utf-8"、"utf-16le"、"shift_jis"、"gbk"）
    pub fn for_label(label: &str) -> Result<Self, CodecError> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| CodecError::UnknownEncoding(label.to_string()))?;
        if encoding == REPLACEMENT {
            return Err(CodecError::UnknownEncoding(label.to_string()));
        }
        Ok(Self { encoding })
    }

    pub fn utf8() -> Self {
        Self { encoding: UTF_8 }
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// 严格解码：遇到非法或不完整的序列返回 `None`
    pub fn decode_strict(&self, bytes: &[u8]) -> Option<String> {
        self.encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
    }

    /// 容错解码：非法序列替换为 U+FFFD
    pub fn decode_lossy(&self, bytes: &[u8]) -> String {
        let (text, _) = self.encoding.decode_without_bom_handling(bytes);
        text.into_owned()
    }

    /// 是否带移位状态
    ///
    /// 这类编码的字节含义取决于之前出现的转义序列，不能对片段单独解码。
    pub fn is_stateful(&self) -> bool {
        self.encoding == ISO_2022_JP
    }

    /// 新建流式解码器
    pub fn stream_decoder(&self) -> StreamDecoder {
        StreamDecoder {
            encoding: *self,
            decoder: self.raw_decoder(),
        }
    }

    fn raw_decoder(&self) -> Decoder {
        self.encoding.new_decoder_without_bom_handling()
    }

    /// 查找第一个非法序列
    ///
    /// 返回 `None` 表示输入只是合法文本加上（可能存在的）不完整尾部；
    /// 否则返回非法序列之前的文本以及截至非法序列末尾消耗的字节数。
    pub fn find_malformed(&self, bytes: &[u8]) -> Option<MalformedRun> {
        let mut decoder = self.raw_decoder();
        let mut decoded = String::new();
        let needed = decoder
            .max_utf8_buffer_length_without_replacement(bytes.len())
            .unwrap_or(bytes.len().saturating_mul(3).saturating_add(16));
        decoded.reserve(needed);

        let (result, read) = decoder.decode_to_string_without_replacement(bytes, &mut decoded, false);
        match result {
            DecoderResult::Malformed(_, extra) => Some(MalformedRun {
                decoded,
                consumed: read.saturating_sub(extra as usize).max(1),
            }),
            DecoderResult::InputEmpty | DecoderResult::OutputFull => None,
        }
    }

    /// 编码单个字符
    ///
    /// 目标编码无法表示的字符以 `?` 代替。
    pub fn encode_char(&self, ch: char) -> Vec<u8> {
        if self.encoding == UTF_16LE || self.encoding == UTF_16BE {
            let mut units = [0u16; 2];
            let little_endian = self.encoding == UTF_16LE;
            return ch
                .encode_utf16(&mut units)
                .iter()
                .flat_map(|unit| {
                    if little_endian {
                        unit.to_le_bytes()
                    } else {
                        unit.to_be_bytes()
                    }
                })
                .collect();
        }

        let mut buf = [0u8; 4];
        let (bytes, _, had_errors) = self.encoding.encode(ch.encode_utf8(&mut buf));
        if had_errors {
            vec![b'?']
        } else {
            bytes.into_owned()
        }
    }
}

/// 流式解码器
///
/// 跨调用保留不完整的尾部序列和移位状态，非法序列替换为 U+FFFD。
pub struct StreamDecoder {
    encoding: TextEncoding,
    decoder: Decoder,
}

impl std::fmt::Debug for StreamDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDecoder")
            .field("encoding", &self.encoding.name())
            .finish()
    }
}

impl StreamDecoder {
    /// 解码一个字节块，不完整的尾部留到下一次
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.decode_inner(bytes, false)
    }

    /// 结束输入：剩余的不完整序列替换为 U+FFFD，并回到初始状态
    pub fn finish(&mut self) -> String {
        let text = self.decode_inner(&[], true);
        self.reset();
        text
    }

    /// 丢弃内部状态
    pub fn reset(&mut self) {
        self.decoder = self.encoding.raw_decoder();
    }

    fn decode_inner(&mut self, mut bytes: &[u8], last: bool) -> String {
        let mut out = String::new();
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(bytes.len())
                .unwrap_or(bytes.len().saturating_mul(3).saturating_add(16));
            out.reserve(needed);

            let (result, read, _) = self.decoder.decode_to_string(bytes, &mut out, last);
            bytes = &bytes[read..];
            match result {
                CoderResult::InputEmpty => return out,
                CoderResult::OutputFull => continue,
            }
        }
    }
}
