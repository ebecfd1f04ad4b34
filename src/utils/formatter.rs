use crate::http::ExecutionOutcome;
use colored::*;

pub enum OutcomeFormat {
    Compact,
    Verbose,
}

pub struct OutcomeFormatter {
    format: OutcomeFormat,
    color: bool,
    show_body: bool,
    show_headers: bool,
    show_timing: bool,
}

impl OutcomeFormatter {
    pub fn new(format: OutcomeFormat) -> Self {
        Self {
            format,
            color: true,
            show_body: true,
            show_headers: true,
            show_timing: true,
        }
    }

    /// 关闭颜色，用于测试和管道输出
    pub fn without_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn format(&self, outcome: &ExecutionOutcome) -> String {
        match self.format {
            OutcomeFormat::Compact => self.format_compact(outcome),
            OutcomeFormat::Verbose => self.format_verbose(outcome),
        }
    }

    fn format_compact(&self, outcome: &ExecutionOutcome) -> String {
        let mut output = vec![self.status_line(outcome, false)];

        if self.show_timing {
            output.push(self.paint_timing(outcome));
        }

        if self.show_body {
            let body = &outcome.body;
            if !body.is_empty() && body.len() < 200 {
                output.push(try_format_json(body).unwrap_or_else(|| body.to_string()));
            } else if !body.is_empty() {
                output.push(format!("Body: {} bytes", body.len()));
            }
        }

        output.join("\n")
    }

    fn format_verbose(&self, outcome: &ExecutionOutcome) -> String {
        let mut output = vec![self.status_line(outcome, true)];

        if self.show_timing {
            output.push(self.paint_timing(outcome));
        }

        if self.show_headers && !outcome.headers.is_empty() {
            output.push(String::new());
            output.push(self.paint_title("Headers:"));
            for (key, value) in &outcome.headers {
                let line = format!("   {}: {}", key, value);
                output.push(if self.color { line.blue().to_string() } else { line });
            }
        }

        if self.show_body && !outcome.body.is_empty() {
            output.push(String::new());
            output.push(self.paint_title("Body:"));
            output.push(try_format_json(&outcome.body).unwrap_or_else(|| outcome.body.clone()));
        }

        if outcome.code.is_none() && !outcome.stderr.trim().is_empty() {
            output.push(String::new());
            output.push(self.paint_title("Stderr:"));
            output.push(outcome.stderr.trim_end().to_string());
        }

        output.join("\n")
    }

    fn status_line(&self, outcome: &ExecutionOutcome, bold: bool) -> String {
        let line = match outcome.code {
            Some(code) => format!("HTTP {} ({})", code, outcome.exit_label()),
            None => format!("No HTTP status ({})", outcome.exit_label()),
        };
        if !self.color {
            return line;
        }

        let colored = if outcome.is_success() {
            line.green()
        } else if outcome.is_client_error() {
            line.yellow()
        } else {
            line.red()
        };
        if bold {
            colored.bold().to_string()
        } else {
            colored.to_string()
        }
    }

    fn paint_timing(&self, outcome: &ExecutionOutcome) -> String {
        let timing = format!("Time: {}ms", outcome.elapsed_ms);
        if self.color {
            timing.cyan().to_string()
        } else {
            timing
        }
    }

    fn paint_title(&self, title: &str) -> String {
        if self.color {
            title.blue().bold().to_string()
        } else {
            title.to_string()
        }
    }
}

/// body 是合法 JSON 时格式化输出
fn try_format_json(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    serde_json::to_string_pretty(&value).ok()
}
