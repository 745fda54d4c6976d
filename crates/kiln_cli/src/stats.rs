//! `kiln stats` — the cross-shard usage summary.

use kiln_common::format_size;
use kiln_stats::{DisplayAs, StatsStore, Summary, STAT_INFO};

use crate::{ReportFormat, StatsArgs};

/// Runs the `kiln stats` command.
pub fn run(store: &StatsStore, args: &StatsArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let summary = store.summary();
    match args.format {
        ReportFormat::Text => print!("{}", render_text(&summary)),
        ReportFormat::Json => println!("{}", render_json(&summary)),
    }
    Ok(0)
}

/// Renders the summary as the classic aligned text table.
///
/// Zero-valued rows are hidden unless the statistic is flagged as always
/// shown; sizes render human-readably.
fn render_text(summary: &Summary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<31} {}\n",
        "cache directory",
        summary.cache_dir.display()
    ));

    for info in &STAT_INFO {
        let value = summary.counters[info.kind];
        if value == 0 && !info.always_show {
            continue;
        }
        let rendered = match info.display_as {
            DisplayAs::Count => value.to_string(),
            DisplayAs::Size => format_size(value),
        };
        out.push_str(&format!("{:<31} {:>15}\n", info.label, rendered));
    }
    out
}

/// Renders the summary as a JSON object.
///
/// Every statistic appears (including zeros) under its kind name, with raw
/// counter values; sizes stay in kibibytes for machine consumption.
fn render_json(summary: &Summary) -> serde_json::Value {
    let mut counters = serde_json::Map::new();
    for info in &STAT_INFO {
        counters.insert(
            format!("{:?}", info.kind),
            serde_json::Value::from(summary.counters[info.kind]),
        );
    }
    serde_json::json!({
        "cache_directory": summary.cache_dir.display().to_string(),
        "counters": counters,
    })
}
