//! 连接模块
//!
//! 提供两种传输实现：串口线路、本地命名管道。
//!
//! ## 模块结构
//! - `traits` - Transport / TransportWriter / EndpointCatalog 接口
//! - `line_transport` - 线路传输（底层自行解码）
//! - `channel_transport` - 通道传输（原始字节 + DecodeBuffer）
//! - `connection_router` - 传输类型路由与工厂

pub mod channel_transport;
pub mod connection_router;
pub mod line_transport;
pub mod traits;

pub use channel_transport::{
    pipe_path, ChannelConnector, ChannelStream, ChannelTransport, LocalPipeConnector,
    CHANNEL_READ_CHUNK, CONNECT_RETRY_INTERVAL,
};
pub use connection_router::ConnectionRouter;
pub use line_transport::{LineOpener, LineStreams, LineTransport, SerialLineOpener};
pub use traits::{EndpointCatalog, Transport, TransportWriter, READ_WAIT};
