mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // 初始化日志系统
    rucurl::logger::init_logger();

    let cli = Cli::parse();
    let passed = cli::run(cli).await?;

    // 有断言失败时以非零状态退出
    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
