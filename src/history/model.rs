use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assertion::AssertionResult;
use crate::http::ExecutionOutcome;
use crate::parser::ParsedRequest;

/// 执行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// 单次执行
    Single,
    /// 同一组变量重复执行
    Repeat,
    /// JSON 数组逐行执行
    Array,
    /// 表格数据逐行执行
    Tabular,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Repeat => "repeat",
            Self::Array => "array",
            Self::Tabular => "tabular",
        }
    }
}

/// 单次迭代的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    /// 行号（从 1 开始，与数据源中的位置一致）
    pub row_index: usize,

    /// 本次使用的变量（数组模式下可能不是对象）
    pub variables: Value,

    /// 替换变量后的命令
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curl_command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ParsedRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ExecutionOutcome>,

    #[serde(default)]
    pub assertions: Vec<AssertionResult>,

    /// 没有断言时为 None，否则为所有断言的 AND
    pub success: Option<bool>,

    /// 本次迭代的错误（模板或执行失败）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IterationResult {
    pub fn completed(
        row_index: usize,
        variables: Value,
        curl_command: String,
        request: ParsedRequest,
        response: ExecutionOutcome,
        assertions: Vec<AssertionResult>,
    ) -> Self {
        let success = if assertions.is_empty() {
            None
        } else {
            Some(assertions.iter().all(|a| a.success))
        };

        Self {
            row_index,
            variables,
            curl_command: Some(curl_command),
            request: Some(request),
            response: Some(response),
            assertions,
            success,
            error: None,
        }
    }

    pub fn failed(row_index: usize, variables: Value, error: impl Into<String>) -> Self {
        Self {
            row_index,
            variables,
            curl_command: None,
            request: None,
            response: None,
            assertions: Vec::new(),
            success: Some(false),
            error: Some(error.into()),
        }
    }
}

/// 一次完整执行的持久化记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,

    pub timestamp: DateTime<Utc>,

    pub mode: RunMode,

    /// 数据来源（如 CSV 文件路径）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// 原始命令模板
    pub template: String,

    /// 原始断言列表
    pub assertions: Vec<String>,

    pub results: Vec<IterationResult>,

    pub total_rows: usize,

    pub success_count: usize,

    pub failure_count: usize,

    pub success: Option<bool>,

    /// 中止整个执行的错误
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunRecord {
    pub fn new(
        id: String,
        mode: RunMode,
        template: impl Into<String>,
        assertions: Vec<String>,
    ) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            mode,
            source: None,
            template: template.into(),
            assertions,
            results: Vec::new(),
            total_rows: 0,
            success_count: 0,
            failure_count: 0,
            success: None,
            error: None,
        }
    }

    pub fn is_batch(&self) -> bool {
        self.mode != RunMode::Single
    }

    /// 结果文件名：单次为 `result_<id>.json`，批量为 `<id>.json`
    pub fn filename(&self) -> String {
        if self.is_batch() {
            format!("{}.json", self.id)
        } else {
            format!("result_{}.json", self.id)
        }
    }

    /// 根据迭代结果计算汇总字段
    pub fn finalize(&mut self) {
        self.total_rows = self.results.len();
        self.success_count = self
            .results
            .iter()
            .filter(|r| r.success == Some(true))
            .count();
        self.failure_count = self
            .results
            .iter()
            .filter(|r| r.success == Some(false))
            .count();

        self.success = if !self.is_batch() {
            self.results.first().and_then(|r| r.success)
        } else if self.results.iter().any(|r| r.success.is_some()) {
            Some(self.failure_count == 0)
        } else {
            None
        };
    }

    pub fn summary(&self, filename: impl Into<String>) -> RunSummary {
        RunSummary {
            id: self.id.clone(),
            timestamp: self.timestamp,
            is_batch: self.is_batch(),
            mode: self.mode,
            success: self.success,
            total_rows: self.total_rows,
            success_count: self.success_count,
            failure_count: self.failure_count,
            filename: filename.into(),
        }
    }
}

/// 历史列表中的一项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub is_batch: bool,
    pub mode: RunMode,
    pub success: Option<bool>,
    pub total_rows: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub filename: String,
}

/// 清理结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClearReport {
    pub removed: usize,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn passed(row: usize, success: Option<bool>) -> IterationResult {
        IterationResult {
            row_index: row,
            variables: json!({}),
            curl_command: None,
            request: None,
            response: None,
            assertions: Vec::new(),
            success,
            error: None,
        }
    }

    #[test]
    fn test_finalize_batch_counts() {
        let mut record = RunRecord::new("BATCH1".to_string(), RunMode::Array, "curl x", vec![]);
        record.results = vec![
            passed(1, Some(true)),
            IterationResult::failed(2, json!(42), "boom"),
            passed(3, None),
        ];
        record.finalize();

        assert_eq!(record.total_rows, 3);
        assert_eq!(record.success_count, 1);
        assert_eq!(record.failure_count, 1);
        assert_eq!(record.success, Some(false));
    }

    #[test]
    fn test_finalize_without_assertions() {
        let mut record = RunRecord::new("BATCH2".to_string(), RunMode::Repeat, "curl x", vec![]);
        record.results = vec![passed(1, None), passed(2, None)];
        record.finalize();

        assert_eq!(record.success_count, 0);
        assert_eq!(record.failure_count, 0);
        assert_eq!(record.success, None);
    }

    #[test]
    fn test_filename() {
        let single = RunRecord::new("20250101-120000-001".to_string(), RunMode::Single, "", vec![]);
        assert_eq!(single.filename(), "result_20250101-120000-001.json");

        let batch = RunRecord::new("BATCH20250101-120000-002".to_string(), RunMode::Tabular, "", vec![]);
        assert_eq!(batch.filename(), "BATCH20250101-120000-002.json");
    }

    #[test]
    fn test_failed_iteration_serialization() {
        let failed = IterationResult::failed(2, json!(42), "变量必须是 JSON 对象");
        let value = serde_json::to_value(&failed).unwrap();

        assert_eq!(value["row_index"], 2);
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "变量必须是 JSON 对象");
        assert!(value.get("response").is_none());
        assert!(value.get("request").is_none());
    }
}
