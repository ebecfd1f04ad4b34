use crate::assertion::AssertionResult;
use crate::history::{IterationResult, RunRecord};
use crate::runner::types::SingleRunView;
use crate::utils::{OutcomeFormat, OutcomeFormatter};
use colored::Colorize;

pub struct RunReporter {
    verbose: bool,
    formatter: OutcomeFormatter,
}

impl RunReporter {
    pub fn new(verbose: bool) -> Self {
        let format = if verbose {
            OutcomeFormat::Verbose
        } else {
            OutcomeFormat::Compact
        };

        Self {
            verbose,
            formatter: OutcomeFormatter::new(format),
        }
    }

    /// 打印批量执行开始
    pub fn print_header(&self, source: &str, total: Option<usize>) {
        match total {
            Some(total) => println!("\nRunning {} rows from {}...\n", total, source.bold()),
            None => println!("\nRunning {}...\n", source.bold()),
        }
    }

    /// 打印单次执行结果
    pub fn print_single(&self, view: &SingleRunView) {
        let status = view
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "-".to_string());
        let returncode = view
            .returncode
            .map(|code| code.to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            " {} {} status {} exit {}",
            symbol(view.all_assertions_passed),
            view.result_id.bold(),
            status.cyan(),
            returncode
        );

        if self.verbose || view.all_assertions_passed == Some(false) {
            if !view.stdout.is_empty() {
                for line in view.stdout.lines() {
                    println!("   {}", line);
                }
            }
            if view.status_code.is_none() && !view.stderr.trim().is_empty() {
                for line in view.stderr.trim_end().lines() {
                    println!("   {}", line.dimmed());
                }
            }
            println!();
        }

        print_assertions(&view.assertions);
    }

    /// 打印批量执行中的每一行
    pub fn print_record(&self, record: &RunRecord) {
        for result in &record.results {
            self.print_iteration(result);
        }
        if let Some(error) = &record.error {
            println!(" {}: {}", "Aborted".red().bold(), error);
        }
    }

    fn print_iteration(&self, result: &IterationResult) {
        let target = match &result.request {
            Some(request) => format!("{} {}", request.method.cyan(), request.url),
            None => "(not executed)".dimmed().to_string(),
        };
        let elapsed = result
            .response
            .as_ref()
            .map(|outcome| format!(" ({}ms)", outcome.elapsed_ms))
            .unwrap_or_default();

        println!(
            " {} [{}] {}{}",
            symbol(result.success),
            result.row_index,
            target,
            elapsed
        );

        // verbose 或失败时显示响应详情
        if (self.verbose || result.success == Some(false))
            && let Some(outcome) = &result.response
        {
            for line in self.formatter.format(outcome).lines() {
                println!("   {}", line);
            }
            println!();
        }

        if let Some(error) = &result.error {
            println!("   {}: {}", "Error".red().bold(), error);
            println!();
        }

        print_assertions(&result.assertions);
    }

    /// 打印汇总
    pub fn print_summary(&self, record: &RunRecord) {
        println!("\n{}", "━".repeat(50));
        println!("{} {}", "Summary".bold(), record.id.dimmed());
        println!("{}", "━".repeat(50));

        let unchecked = record.total_rows - record.success_count - record.failure_count;
        if record.failure_count == 0 {
            println!(
                "  {}: {} passed, {} total",
                "Rows".bold(),
                record.success_count.to_string().green(),
                record.total_rows
            );
        } else {
            println!(
                "  {}: {} passed, {} failed, {} total",
                "Rows".bold(),
                record.success_count.to_string().green(),
                record.failure_count.to_string().red(),
                record.total_rows
            );
        }
        if unchecked > 0 {
            println!(
                "  {}: {} without assertions",
                "Unchecked".bold(),
                unchecked.to_string().dimmed()
            );
        }

        let total_assertions: usize = record.results.iter().map(|r| r.assertions.len()).sum();
        if total_assertions > 0 {
            let passed = record
                .results
                .iter()
                .flat_map(|r| &r.assertions)
                .filter(|a| a.success)
                .count();
            println!(
                "  {}: {} passed, {} failed, {} total",
                "Assertions".bold(),
                passed.to_string().green(),
                (total_assertions - passed).to_string().red(),
                total_assertions
            );
        }

        let elapsed_ms: u64 = record
            .results
            .iter()
            .filter_map(|r| r.response.as_ref())
            .map(|o| o.elapsed_ms)
            .sum();
        println!("  {}: {:.3}s", "Duration".bold(), elapsed_ms as f64 / 1000.0);
        println!();
    }
}

impl Default for RunReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

fn symbol(success: Option<bool>) -> String {
    match success {
        Some(true) => "✓".green().to_string(),
        Some(false) => "✗".red().to_string(),
        None => "•".dimmed().to_string(),
    }
}

fn print_assertions(assertions: &[AssertionResult]) {
    if assertions.is_empty() {
        return;
    }
    println!("   Assertions:");
    for assertion in assertions {
        if assertion.success {
            println!("     {} {}", "✓".green(), assertion.assertion);
        } else {
            println!("     {} {}", "✗".red(), assertion.assertion);
            if let Some(msg) = &assertion.error {
                println!("       {}", msg.red());
            }
        }
    }
    println!();
}
