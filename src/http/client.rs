use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, warn};

use crate::http::script::ScriptFile;
use crate::http::types::ProcessOutput;
use crate::parser::tokenizer::tokenize;
use crate::{Result, RucurlError};

/// 执行一条已替换完变量的命令
pub trait CommandRunner {
    fn run(&self, command: &str) -> impl Future<Output = Result<ProcessOutput>> + Send;
}

/// 通过临时脚本执行 curl 命令
///
/// 自动补上 `-v`，因为状态码和响应头都依赖 verbose 输出。
/// stdout 和 stderr 分开捕获。超时后子进程被杀掉，输出丢弃。
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    shell: String,
    timeout: Option<Duration>,
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRunner {
    pub const DEFAULT_SHELL: &'static str = "/bin/bash";

    pub fn new() -> Self {
        Self {
            shell: Self::DEFAULT_SHELL.to_string(),
            timeout: None,
        }
    }

    /// POSIX 下执行脚本的解释器
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// 命令中没有 verbose 参数时，在命令名之后插入 `-v`
    pub fn ensure_verbose(command: &str) -> String {
        if tokenize(command).into_iter().any(is_verbose_flag) {
            return command.to_string();
        }

        let leading = command.len() - command.trim_start().len();
        let name_len = command[leading..]
            .find(char::is_whitespace)
            .unwrap_or(command.len() - leading);
        let insert_at = leading + name_len;

        format!("{} -v{}", &command[..insert_at], &command[insert_at..])
    }

    fn build_command(&self, script: &Path) -> Command {
        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(script);
            cmd
        } else {
            let mut cmd = Command::new(&self.shell);
            cmd.arg(script);
            cmd
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn execute(&self, script: &Path) -> Result<ProcessOutput> {
        let start = Instant::now();

        let child = self.build_command(script).spawn().map_err(|e| {
            RucurlError::ExecutionError(format!("Failed to launch {}: {}", self.shell, e))
        })?;

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    // TODO: kill the whole process group so curl does not outlive the shell
                    warn!("Command timed out after {:?}", limit);
                    return Ok(ProcessOutput::timed_out(start.elapsed()));
                }
            },
            None => child.wait_with_output().await,
        };

        let output = waited
            .map_err(|e| RucurlError::ExecutionError(format!("Failed to wait for process: {}", e)))?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            timed_out: false,
            elapsed: start.elapsed(),
        })
    }
}

impl CommandRunner for ScriptRunner {
    async fn run(&self, command: &str) -> Result<ProcessOutput> {
        let command = Self::ensure_verbose(command);
        debug!("Executing: {}", command);

        let script = ScriptFile::create(&command, &self.shell)?;
        let result = self.execute(script.path()).await;
        script.remove();

        result
    }
}

/// `-v`、`-sv` 这类短参数组合，或 `--verbose`
fn is_verbose_flag(token: &str) -> bool {
    if token == "--verbose" {
        return true;
    }
    match token.strip_prefix('-') {
        Some(flags) if !flags.is_empty() && !flags.starts_with('-') => {
            flags.chars().all(|c| c.is_ascii_alphabetic()) && flags.contains('v')
        }
        _ => false,
    }
}
