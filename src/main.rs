//! linkterm 入口
//!
//! 解析参数、初始化日志、进入原始模式并运行会话。
//! 不重试时连接失败以状态码 1 退出。

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use linkterm_core::{init_logging, LogConfig};
use linkterm_lib::cli::Cli;
use linkterm_lib::terminal::{
    ConnectionRouter, CrosstermKeySource, RawModeGuard, SessionConsole, SessionController,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig {
        verbose: cli.verbose,
        ..Default::default()
    };
    if let Err(e) = init_logging(&log_config) {
        eprintln!("linkterm: {e}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("linkterm: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("[Main] 运行失败: {:#}", e);
            eprintln!("linkterm: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let router = ConnectionRouter::default();

    if cli.list {
        let mut console = SessionConsole::stdout();
        console.endpoints(&router.catalog().available_endpoints())?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = Arc::new(cli.session_config()?);
    let transport = router.build(&config)?;

    let _raw_mode = RawModeGuard::enable().context("console does not support raw mode")?;

    let mut controller = SessionController::new(
        config,
        transport,
        Box::new(CrosstermKeySource),
        SessionConsole::stdout(),
        router.catalog(),
    );

    let abort = controller.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("[Main] 收到中断信号");
            abort.cancel();
        }
    });

    match controller.run().await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        // 失败信息已由控制器输出
        Err(e) if e.is_connect_failure() => Ok(ExitCode::FAILURE),
        Err(e) => Err(e.into()),
    }
}
