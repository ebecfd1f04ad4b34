use crate::assertion::evaluate_all;
use crate::history::{IterationResult, RunMode, RunRecord, RunStore, generate_id};
use crate::http::{CommandRunner, ExecutionOutcome, ProcessOutput};
use crate::parser::parse_command;
use crate::runner::types::{RunOutcome, RunRequest, SingleRunView};
use crate::table::TabularSource;
use crate::variable::{TemplateResolver, VariableBatch, VariableSet};
use crate::{Result, RucurlError};
use serde_json::Value;
use tracing::{debug, info, warn};

/// 批量执行器
///
/// 每次迭代：合并变量层、替换模板、解析命令、执行、解析响应、求值断言。
/// 迭代严格按顺序执行，`row_index` 与数据源中的位置一致。
pub struct Orchestrator<R: CommandRunner> {
    runner: R,
    store: RunStore,
    /// 环境变量层，位于每行变量之下
    base: VariableSet,
    /// CLI 覆盖层，位于每行变量之上
    overrides: VariableSet,
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn new(runner: R, store: RunStore) -> Self {
        Self {
            runner,
            store,
            base: VariableSet::new(),
            overrides: VariableSet::new(),
        }
    }

    pub fn with_layers(mut self, base: VariableSet, overrides: VariableSet) -> Self {
        self.base = base;
        self.overrides = overrides;
        self
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    /// 执行单次、重复或数组模式
    pub async fn execute(&self, request: RunRequest) -> Result<RunOutcome> {
        if request.template.trim().is_empty() {
            return Err(RucurlError::InvalidInput("Command template is empty".to_string()));
        }

        let RunRequest {
            template,
            variables,
            assertions,
            iterations,
        } = request;

        match variables {
            VariableBatch::Rows(rows) => {
                if rows.is_empty() {
                    return Err(RucurlError::InvalidInput(
                        "Variable array is empty".to_string(),
                    ));
                }
                let count = iterations.map_or(rows.len(), |n| n.max(1).min(rows.len()));
                let record = self.execute_rows(&template, &assertions, rows, count).await?;
                Ok(RunOutcome::Batch(record))
            }
            VariableBatch::Single(variables) => {
                let count = iterations.unwrap_or(1).max(1);
                if count > 1 {
                    let record = self
                        .execute_repeat(&template, &assertions, &variables, count)
                        .await?;
                    Ok(RunOutcome::Batch(record))
                } else {
                    let view = self.execute_single(&template, &assertions, &variables).await?;
                    Ok(RunOutcome::Single(view))
                }
            }
        }
    }

    /// 逐行执行表格数据
    ///
    /// `row_limit` 为 0 或 None 时执行全部行。读取某一行失败会中止整个执行：
    /// 已完成的行连同错误一起保存，然后返回该错误。
    pub async fn execute_table(
        &self,
        source: &dyn TabularSource,
        source_ref: Option<&str>,
        template: &str,
        assertions: &[String],
        row_limit: Option<usize>,
    ) -> Result<RunRecord> {
        if template.trim().is_empty() {
            return Err(RucurlError::InvalidInput("Command template is empty".to_string()));
        }

        let mut record = RunRecord::new(
            generate_id(true),
            RunMode::Tabular,
            template,
            assertions.to_vec(),
        );
        record.source = source_ref.map(str::to_string);

        let limit = row_limit.filter(|n| *n > 0).unwrap_or(usize::MAX);
        debug!(
            "Tabular run {} over columns {:?} (limit {:?})",
            record.id,
            source.columns(),
            row_limit
        );

        for (index, row) in source.rows().take(limit).enumerate() {
            let row_index = index + 1;
            let variables = match row {
                Ok(variables) => variables,
                Err(e) => {
                    warn!("Aborting run {} at row {}: {}", record.id, row_index, e);
                    record.error = Some(format!("row {}: {}", row_index, e));
                    self.finish(&mut record)?;
                    return Err(e);
                }
            };

            let result = self
                .run_isolated(row_index, template, assertions, &variables)
                .await;
            record.results.push(result);
        }

        self.finish(&mut record)?;
        Ok(record)
    }

    async fn execute_rows(
        &self,
        template: &str,
        assertions: &[String],
        rows: Vec<Value>,
        count: usize,
    ) -> Result<RunRecord> {
        let mut record = RunRecord::new(
            generate_id(true),
            RunMode::Array,
            template,
            assertions.to_vec(),
        );

        for (index, row) in rows.into_iter().take(count).enumerate() {
            let row_index = index + 1;
            let result = match VariableSet::try_from(row.clone()) {
                Ok(variables) => {
                    self.run_isolated(row_index, template, assertions, &variables)
                        .await
                }
                Err(e) => {
                    debug!("Row {} rejected: {}", row_index, e);
                    IterationResult::failed(row_index, row, e.to_string())
                }
            };
            record.results.push(result);
        }

        self.finish(&mut record)?;
        Ok(record)
    }

    async fn execute_repeat(
        &self,
        template: &str,
        assertions: &[String],
        variables: &VariableSet,
        count: usize,
    ) -> Result<RunRecord> {
        let mut record = RunRecord::new(
            generate_id(true),
            RunMode::Repeat,
            template,
            assertions.to_vec(),
        );

        for row_index in 1..=count {
            let result = self
                .run_isolated(row_index, template, assertions, variables)
                .await;
            record.results.push(result);
        }

        self.finish(&mut record)?;
        Ok(record)
    }

    async fn execute_single(
        &self,
        template: &str,
        assertions: &[String],
        variables: &VariableSet,
    ) -> Result<SingleRunView> {
        let mut record = RunRecord::new(
            generate_id(false),
            RunMode::Single,
            template,
            assertions.to_vec(),
        );

        // 单次模式下启动失败直接返回给调用方
        let result = self.run_iteration(1, template, assertions, variables).await?;
        let outcome = result.response.clone();
        let view_assertions = result.assertions.clone();
        let all_assertions_passed = result.success;
        record.results.push(result);

        self.finish(&mut record)?;

        let outcome =
            outcome.unwrap_or_else(|| ExecutionOutcome::from_output(ProcessOutput::default()));
        Ok(SingleRunView {
            result_id: record.id,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            returncode: outcome.returncode,
            status_code: outcome.code,
            assertions: view_assertions,
            all_assertions_passed,
        })
    }

    /// 执行一次迭代，错误记录为失败的迭代结果而不是向上传播
    async fn run_isolated(
        &self,
        row_index: usize,
        template: &str,
        assertions: &[String],
        variables: &VariableSet,
    ) -> IterationResult {
        match self
            .run_iteration(row_index, template, assertions, variables)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!("Iteration {} failed: {}", row_index, e);
                IterationResult::failed(row_index, variables.to_value(), e.to_string())
            }
        }
    }

    async fn run_iteration(
        &self,
        row_index: usize,
        template: &str,
        assertions: &[String],
        variables: &VariableSet,
    ) -> Result<IterationResult> {
        let merged = self.base.layered(variables).layered(&self.overrides);
        let command = TemplateResolver::resolve(template, &merged);
        let request = parse_command(&command);

        debug!(
            "Iteration {}: {} {}",
            row_index, request.method, request.url
        );

        let output = self.runner.run(&command).await?;
        let outcome = ExecutionOutcome::from_output(output);
        let results = evaluate_all(assertions, &outcome);

        debug!(
            "Iteration {} finished with status {:?} ({})",
            row_index,
            outcome.code,
            outcome.exit_label()
        );

        Ok(IterationResult::completed(
            row_index,
            merged.to_value(),
            command,
            request,
            outcome,
            results,
        ))
    }

    fn finish(&self, record: &mut RunRecord) -> Result<()> {
        record.finalize();
        self.store.save(record)?;
        info!(
            "Run {} ({}) finished: {} rows, {} passed, {} failed",
            record.id,
            record.mode.as_str(),
            record.total_rows,
            record.success_count,
            record.failure_count
        );
        Ok(())
    }
}
