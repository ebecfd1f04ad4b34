use crate::Result;
use crate::RucurlError;
use crate::history::model::RunSummary;
use crate::history::storage::RunStore;
use chrono::Local;
use inquire::Select;

/// 选择要查看的执行记录
pub enum SelectionStrategy {
    Interactive,
    Latest,
}

/// 按策略挑出一条记录的 ID；结果目录为空时返回 None
pub fn select_run(store: &RunStore, strategy: SelectionStrategy) -> Result<Option<String>> {
    let summaries = store.list()?;
    if summaries.is_empty() {
        return Ok(None);
    }

    match strategy {
        SelectionStrategy::Latest => Ok(summaries.into_iter().next().map(|s| s.id)),
        SelectionStrategy::Interactive => select_interactive(summaries).map(Some),
    }
}

fn select_interactive(summaries: Vec<RunSummary>) -> Result<String> {
    #[derive(Clone)]
    struct SummaryWrapper {
        id: String,
        display: String,
    }

    impl std::fmt::Display for SummaryWrapper {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.display)
        }
    }

    let options: Vec<SummaryWrapper> = summaries
        .iter()
        .map(|s| SummaryWrapper {
            id: s.id.clone(),
            display: format_summary_for_display(s),
        })
        .collect();

    let selected = Select::new("Select a run to show:", options)
        .with_page_size(15)
        .with_help_message("Enter to select, type to filter")
        .prompt()
        .map_err(|e| RucurlError::Other(format!("Interaction canceled or failed: {}", e)))?;

    Ok(selected.id)
}

fn format_summary_for_display(s: &RunSummary) -> String {
    let time = s.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
    let status = match s.success {
        Some(true) => "PASS",
        Some(false) => "FAIL",
        None => "----",
    };
    format!(
        "[{status}] {} {} {}/{} ({time})",
        s.id,
        s.mode.as_str(),
        s.success_count,
        s.total_rows
    )
}
