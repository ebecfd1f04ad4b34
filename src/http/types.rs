use crate::http::response::ResponseParser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// 子进程的原始执行结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOutput {
    /// 退出码；被信号终止或超时被杀时为 None
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// 是否因超时被终止（此时输出被丢弃）
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn timed_out(elapsed: Duration) -> Self {
        Self {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
            elapsed,
        }
    }
}

/// 一次执行的完整结果，写入结果文件的 `response` 字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// 最后一个 HTTP 状态码（重定向链取最终响应）
    pub code: Option<u16>,

    pub stdout: String,

    pub stderr: String,

    /// 进程退出码
    pub returncode: Option<i32>,

    /// stdout 与 stderr 拼接后的全文
    pub raw: String,

    /// 最终响应的 headers
    pub headers: BTreeMap<String, String>,

    /// 响应 body（即 stdout）
    pub body: String,

    #[serde(default)]
    pub timed_out: bool,

    #[serde(default)]
    pub elapsed_ms: u64,
}

impl ExecutionOutcome {
    pub fn from_output(output: ProcessOutput) -> Self {
        let code = ResponseParser::extract_status(&output.stdout, &output.stderr);
        let (headers, body) = ResponseParser::parse_parts(&output.stdout, &output.stderr);
        let raw = format!("{}\n{}", output.stdout, output.stderr)
            .trim()
            .to_string();

        Self {
            code,
            returncode: output.exit_code,
            raw,
            headers,
            body,
            timed_out: output.timed_out,
            elapsed_ms: output.elapsed.as_millis() as u64,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.code, Some(200..=299))
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.code, Some(400..=499))
    }

    /// 退出状态的简短描述
    pub fn exit_label(&self) -> String {
        if self.timed_out {
            return "timed out".to_string();
        }
        match self.returncode {
            Some(code) => format!("exit {}", code),
            None => "killed".to_string(),
        }
    }
}
