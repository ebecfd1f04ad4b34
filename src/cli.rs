use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use rucurl::history::{RunStore, SelectionStrategy, list_history, select_run};
use rucurl::http::ScriptRunner;
use rucurl::runner::{Orchestrator, RunOutcome, RunReporter, RunRequest};
use rucurl::table::{CsvSource, TabularSource};
use rucurl::variable::{ConfigLoader, VariableBatch, VariableConfig};

pub type Result<T> = std::result::Result<T, anyhow::Error>;

#[derive(Parser)]
#[command(name = "rucurl", author, version, about, long_about = None)]
pub struct Cli {
    /// 配置文件路径（默认查找 rucurl.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 结果文件目录
    #[arg(long, global = true)]
    pub results_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 执行命令模板（单次、重复或 JSON 数组逐行）
    Run(RunArgs),

    /// 以 CSV 每一行作为变量执行命令模板
    Table(TableArgs),

    /// 查看或清理执行记录
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

#[derive(Args)]
pub struct TemplateArgs {
    /// curl 命令模板，占位符写作 {{name}}
    pub template: Option<String>,

    /// 从文件读取命令模板
    #[arg(short = 'f', long = "file", conflicts_with = "template")]
    pub file: Option<PathBuf>,

    /// 断言表达式，可重复
    #[arg(short = 'a', long = "assert")]
    pub assertions: Vec<String>,

    /// 使用 rucurl.toml 中的环境
    #[arg(long)]
    pub env: Option<String>,

    /// 覆盖变量 key=value，可重复
    #[arg(long = "var", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// 单次执行超时（秒）
    #[arg(long)]
    pub timeout: Option<u64>,

    /// 以 JSON 输出结果
    #[arg(long)]
    pub json: bool,

    /// 显示完整响应
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: TemplateArgs,

    /// 变量：JSON 对象或 JSON 数组
    #[arg(long = "vars", conflicts_with = "vars_file")]
    pub variables: Option<String>,

    /// 从文件读取变量 JSON
    #[arg(long)]
    pub vars_file: Option<PathBuf>,

    /// 执行次数；数组变量时为行数上限
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,
}

#[derive(Args)]
pub struct TableArgs {
    /// CSV 文件，首行为列名
    pub csv: PathBuf,

    #[command(flatten)]
    pub common: TemplateArgs,

    /// 最多执行的行数
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum HistoryCommand {
    /// 列出执行记录
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// 查看一条记录；省略 ID 时交互选择
    Show {
        id: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// 删除所有执行记录
    Clear,
}

fn parse_var(s: &str) -> std::result::Result<(String, String), String> {
    ConfigLoader::parse_cli_var(s).ok_or_else(|| format!("expected key=value, got '{}'", s))
}

/// 执行命令，返回是否全部通过
pub async fn run(cli: Cli) -> Result<bool> {
    let config = load_config(cli.config.as_deref())?;
    let store = match cli.results_dir.or_else(|| config.settings.results_dir.clone().map(PathBuf::from)) {
        Some(dir) => RunStore::new(dir),
        None => RunStore::default(),
    };

    match cli.command {
        Commands::Run(args) => run_template(args, &config, store).await,
        Commands::Table(args) => run_table(args, &config, store).await,
        Commands::History { command } => run_history(command, &store),
    }
}

fn load_config(path: Option<&Path>) -> Result<VariableConfig> {
    match path {
        Some(path) => Ok(ConfigLoader::load_from_path(path)?),
        None => Ok(ConfigLoader::find_and_load().unwrap_or_default()),
    }
}

fn load_template(common: &TemplateArgs) -> Result<String> {
    let template = match (&common.template, &common.file) {
        (Some(template), _) => template.clone(),
        (None, Some(file)) => fs::read_to_string(file)
            .with_context(|| format!("Failed to read template {}", file.display()))?,
        (None, None) => bail!("A command template or --file is required"),
    };
    Ok(template)
}

fn load_variables(vars: Option<&str>, vars_file: Option<&Path>) -> Result<VariableBatch> {
    let text = match (vars, vars_file) {
        (Some(text), _) => text.to_string(),
        (None, Some(file)) => fs::read_to_string(file)
            .with_context(|| format!("Failed to read variables {}", file.display()))?,
        (None, None) => return Ok(VariableBatch::default()),
    };

    serde_json::from_str(&text).context("Variables must be a JSON object or a JSON array")
}

fn build_orchestrator(
    common: &TemplateArgs,
    config: &VariableConfig,
    store: RunStore,
) -> Result<Orchestrator<ScriptRunner>> {
    let timeout = common
        .timeout
        .or(config.settings.timeout_secs)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    let mut runner = ScriptRunner::new().with_timeout(timeout);
    if let Some(shell) = &config.settings.shell {
        runner = runner.with_shell(shell.clone());
    }

    let (base, overrides) = ConfigLoader::build_layers(config, common.env.as_deref(), &common.vars)?;
    Ok(Orchestrator::new(runner, store).with_layers(base, overrides))
}

async fn run_template(args: RunArgs, config: &VariableConfig, store: RunStore) -> Result<bool> {
    let template = load_template(&args.common)?;
    let variables = load_variables(args.variables.as_deref(), args.vars_file.as_deref())?;
    let orchestrator = build_orchestrator(&args.common, config, store)?;

    let request = RunRequest::new(template)
        .with_variables(variables)
        .with_assertions(args.common.assertions.clone())
        .with_iterations(args.iterations);

    let outcome = orchestrator.execute(request).await?;
    let passed = outcome.success() != Some(false);

    if args.common.json {
        let json = match &outcome {
            RunOutcome::Single(view) => serde_json::to_string_pretty(view)?,
            RunOutcome::Batch(record) => serde_json::to_string_pretty(record)?,
        };
        println!("{}", json);
        return Ok(passed);
    }

    let reporter = RunReporter::new(args.common.verbose);
    match &outcome {
        RunOutcome::Single(view) => reporter.print_single(view),
        RunOutcome::Batch(record) => {
            reporter.print_header(&format!("{} run", record.mode.as_str()), Some(record.total_rows));
            reporter.print_record(record);
            reporter.print_summary(record);
        }
    }

    Ok(passed)
}

async fn run_table(args: TableArgs, config: &VariableConfig, store: RunStore) -> Result<bool> {
    let template = load_template(&args.common)?;
    let source = CsvSource::open(&args.csv)?;
    let orchestrator = build_orchestrator(&args.common, config, store)?;

    let reporter = RunReporter::new(args.common.verbose);
    if !args.common.json {
        let total = source
            .total_rows()
            .ok()
            .map(|rows| args.limit.filter(|n| *n > 0).map_or(rows, |n| n.min(rows)));
        reporter.print_header(source.name(), total);
    }

    let record = orchestrator
        .execute_table(
            &source,
            Some(source.name()),
            &template,
            &args.common.assertions,
            args.limit,
        )
        .await?;
    let passed = record.success != Some(false);

    if args.common.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        reporter.print_record(&record);
        reporter.print_summary(&record);
    }

    Ok(passed)
}

fn run_history(command: HistoryCommand, store: &RunStore) -> Result<bool> {
    match command {
        HistoryCommand::List { limit } => list_history(store, limit)?,
        HistoryCommand::Show { id, json } => {
            let id = match id {
                Some(id) => id,
                None => match select_run(store, SelectionStrategy::Interactive)? {
                    Some(id) => id,
                    None => {
                        println!("No runs found in {}", store.results_dir().display());
                        return Ok(true);
                    }
                },
            };

            let record = store.get(&id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                let reporter = RunReporter::new(true);
                println!("{}", record.template);
                reporter.print_record(&record);
                reporter.print_summary(&record);
            }
        }
        HistoryCommand::Clear => {
            let report = store.clear()?;
            println!("Removed {} file(s)", report.removed);
            for error in &report.errors {
                eprintln!("  {}", error);
            }
            return Ok(report.errors.is_empty());
        }
    }
    Ok(true)
}
