use crate::assertion::AssertionResult;
use crate::history::RunRecord;
use crate::variable::VariableBatch;
use serde::Serialize;

/// 一次执行请求
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// 带 `{{name}}` 占位符的命令模板
    pub template: String,

    /// 单组变量或变量数组
    pub variables: VariableBatch,

    /// 断言表达式
    pub assertions: Vec<String>,

    /// 执行次数；数组模式下为行数上限
    pub iterations: Option<usize>,
}

impl RunRequest {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    pub fn with_variables(mut self, variables: VariableBatch) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_assertions(mut self, assertions: Vec<String>) -> Self {
        self.assertions = assertions;
        self
    }

    pub fn with_iterations(mut self, iterations: Option<usize>) -> Self {
        self.iterations = iterations;
        self
    }
}

/// 单次执行返回给调用方的精简视图
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleRunView {
    pub result_id: String,
    pub stdout: String,
    pub stderr: String,
    pub returncode: Option<i32>,
    pub status_code: Option<u16>,
    pub assertions: Vec<AssertionResult>,
    /// 没有断言时为 None
    pub all_assertions_passed: Option<bool>,
}

/// 执行结果
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Single(SingleRunView),
    Batch(RunRecord),
}

impl RunOutcome {
    pub fn id(&self) -> &str {
        match self {
            RunOutcome::Single(view) => &view.result_id,
            RunOutcome::Batch(record) => &record.id,
        }
    }

    /// 整体是否通过；没有任何断言时为 None
    pub fn success(&self) -> Option<bool> {
        match self {
            RunOutcome::Single(view) => view.all_assertions_passed,
            RunOutcome::Batch(record) => record.success,
        }
    }
}
