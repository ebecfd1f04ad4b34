use super::model::RunSummary;
use super::storage::RunStore;
use crate::Result;
use chrono::Local;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, Table};

/// 打印最近的执行记录
pub fn list_history(store: &RunStore, limit: usize) -> Result<()> {
    let summaries = store.list()?;
    if summaries.is_empty() {
        println!("No runs found in {}", store.results_dir().display());
        return Ok(());
    }

    let shown = &summaries[..limit.min(summaries.len())];
    println!("{}", render_table(shown));
    if shown.len() < summaries.len() {
        println!("({} of {} runs shown)", shown.len(), summaries.len());
    }
    Ok(())
}

pub fn render_table(summaries: &[RunSummary]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Time", "Mode", "Rows", "Passed", "Failed", "Result"]);

    for summary in summaries {
        let (label, color) = result_label(summary.success);
        table.add_row(vec![
            Cell::new(&summary.id),
            Cell::new(
                summary
                    .timestamp
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S"),
            )
            .add_attribute(Attribute::Dim),
            Cell::new(summary.mode.as_str()),
            Cell::new(summary.total_rows),
            Cell::new(summary.success_count),
            Cell::new(summary.failure_count),
            Cell::new(label).fg(color),
        ]);
    }

    table
}

fn result_label(success: Option<bool>) -> (&'static str, Color) {
    match success {
        Some(true) => ("PASS", Color::Green),
        Some(false) => ("FAIL", Color::Red),
        None => ("-", Color::Grey),
    }
}
