//! 连接类型路由模块
//!
//! 根据配置和端点名称选择传输类型，实现传输工厂。
//!
//! ## 路由规则
//! 1. 显式指定通道模式 → Channel
//! 2. 端点以 `\\.\pipe\` 开头 → Channel
//! 3. 其他 → Line

use std::sync::Arc;

use linkterm_core::{SessionConfig, TransportKind};

use super::channel_transport::{ChannelConnector, ChannelTransport, LocalPipeConnector};
use super::line_transport::{LineOpener, LineTransport, SerialLineOpener};
use super::traits::{EndpointCatalog, Transport};
use crate::terminal::error::TerminalError;

const WINDOWS_PIPE_PREFIX: &str = r"\\.\pipe\";

/// 连接路由器
///
/// 持有两种传输的底层打开器，启动时选定一次传输实现。
pub struct ConnectionRouter {
    line_opener: Arc<dyn LineOpener>,
    channel_connector: Arc<dyn ChannelConnector>,
    catalog: Arc<dyn EndpointCatalog>,
}

impl Default for ConnectionRouter {
    fn default() -> Self {
        let serial = Arc::new(SerialLineOpener);
        Self {
            line_opener: serial.clone(),
            channel_connector: Arc::new(LocalPipeConnector),
            catalog: serial,
        }
    }
}

impl ConnectionRouter {
    pub fn new(
        line_opener: Arc<dyn LineOpener>,
        channel_connector: Arc<dyn ChannelConnector>,
        catalog: Arc<dyn EndpointCatalog>,
    ) -> Self {
        Self {
            line_opener,
            channel_connector,
            catalog,
        }
    }

    /// 根据端点名称和通道开关确定传输类型
    ///
    /// # 示例
    /// ```
    /// use linkterm_lib::terminal::connections::ConnectionRouter;
    /// use linkterm_core::TransportKind;
    ///
    /// assert_eq!(ConnectionRouter::route("COM3", false), TransportKind::Line);
    /// assert_eq!(ConnectionRouter::route("console", true), TransportKind::Channel);
    /// assert_eq!(ConnectionRouter::route(r"\\.\pipe\vm1", false), TransportKind::Channel);
    /// ```
    pub fn route(endpoint: &str, channel: bool) -> TransportKind {
        if channel || endpoint.trim().starts_with(WINDOWS_PIPE_PREFIX) {
            TransportKind::Channel
        } else {
            TransportKind::Line
        }
    }

    /// 可用的线路端点
    pub fn catalog(&self) -> Arc<dyn EndpointCatalog> {
        self.catalog.clone()
    }

    /// 按配置创建传输
    pub fn build(&self, config: &SessionConfig) -> Result<Box<dyn Transport>, TerminalError> {
        config.validate()?;

        tracing::debug!(
            "[ConnectionRouter] 创建传输: endpoint={}, kind={}",
            config.endpoint,
            config.transport
        );

        let transport: Box<dyn Transport> = match config.transport {
            TransportKind::Line => Box::new(LineTransport::new(config, self.line_opener.clone())?),
            TransportKind::Channel => Box::new(ChannelTransport::new(
                config,
                self.channel_connector.clone(),
            )?),
        };
        Ok(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkterm_core::ConfigError;
    use linkterm_infra::CodecError;

    #[test]
    fn test_route() {
        assert_eq!(ConnectionRouter::route("/dev/ttyS0", false), TransportKind::Line);
        assert_eq!(ConnectionRouter::route("/dev/ttyS0", true), TransportKind::Channel);
        assert_eq!(
            ConnectionRouter::route(r"\\.\pipe\com_1", false),
            TransportKind::Channel
        );
    }

    #[test]
    fn test_build_selects_variant() {
        let router = ConnectionRouter::default();

        let line = router.build(&SessionConfig::new("COM3")).unwrap();
        assert_eq!(line.kind(), TransportKind::Line);
        assert!(!line.is_connected());

        let mut config = SessionConfig::new("vm-console");
        config.transport = TransportKind::Channel;
        let channel = router.build(&config).unwrap();
        assert_eq!(channel.kind(), TransportKind::Channel);
        assert_eq!(channel.endpoint(), "vm-console");
    }

    #[test]
    fn test_build_rejects_bad_config() {
        let router = ConnectionRouter::default();

        let err = router.build(&SessionConfig::new("")).err().unwrap();
        assert!(matches!(err, TerminalError::Config(ConfigError::EmptyEndpoint)));

        let mut config = SessionConfig::new("COM3");
        config.encoding = "no-such-encoding".to_string();
        let err = router.build(&config).err().unwrap();
        assert!(matches!(err, TerminalError::Codec(CodecError::UnknownEncoding(_))));
    }
}
