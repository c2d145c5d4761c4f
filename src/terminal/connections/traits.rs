//! Transport trait 定义
//!
//! 定义统一的传输接口，线路传输和通道传输都必须实现此 trait。
//!
//! ## 功能
//! - 定义 Transport trait 接口（connect / is_connected / read / write / disconnect）
//! - 定义 TransportWriter 写入句柄，供后台按键任务使用
//! - 定义 EndpointCatalog，用于连接失败时列出可用端点

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use linkterm_core::TransportKind;

use crate::terminal::TerminalError;

/// `read` 内部等待数据的时间窗口
pub const READ_WAIT: Duration = Duration::from_millis(200);

/// 传输写入句柄
///
/// 每次写入都要等待完成后再发下一个字符，保证输入顺序。
#[async_trait]
pub trait TransportWriter: Send + Sync {
    /// 按配置的编码发送一个字符
    async fn write_char(&self, ch: char) -> Result<(), TerminalError>;
}

/// 传输 trait
///
/// 会话控制器只通过此接口操作连接，两种传输在启动时选定一次。
#[async_trait]
pub trait Transport: Send + Sync {
    /// 打开连接
    ///
    /// 失败时返回可直接展示给用户的错误，不会 panic。
    async fn connect(&mut self) -> Result<(), TerminalError>;

    /// 连接是否仍然存活
    ///
    /// 必须廉价且无副作用，反映实时状态（包括对端异步断开）。
    fn is_connected(&self) -> bool;

    /// 读取已到达的文本
    ///
    /// 在 [`READ_WAIT`] 内没有新数据时返回空字符串。
    /// 返回的文本不会截断多字节字符。
    async fn read(&mut self) -> Result<String, TerminalError>;

    /// 获取写入句柄，未连接时返回 `None`
    fn writer(&self) -> Option<Arc<dyn TransportWriter>>;

    /// 发送一个字符
    async fn write(&self, ch: char) -> Result<(), TerminalError> {
        let writer = self.writer().ok_or(TerminalError::NotConnected)?;
        writer.write_char(ch).await
    }

    /// 关闭连接
    ///
    /// 幂等；返回是否确实关闭了一个存活的连接。
    async fn disconnect(&mut self) -> bool;

    /// 端点名称
    fn endpoint(&self) -> &str;

    /// 传输类型
    fn kind(&self) -> TransportKind;

    /// 连接参数描述，显示在连接提示的括号内
    fn describe(&self) -> String {
        self.kind().to_string()
    }
}

/// 可用端点目录
pub trait EndpointCatalog: Send + Sync {
    fn available_endpoints(&self) -> Vec<String>;
}
