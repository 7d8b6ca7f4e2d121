use serde::Serialize;
use serde_json::Value;
use xqk_core::entities::{FilesystemInfo, QuotaRecord, QuotaReport};
use xqk_core::responses::MonitorSample;
use xqk_core::size::format_size;

use crate::cli::OutputFormat;
use crate::ui;

pub mod table;

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Table => render_value_table(value),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

/// Print one quota record: an object in JSON, a one-row table otherwise.
pub fn output_record(record: &QuotaRecord, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => output_records(std::slice::from_ref(record), format),
        _ => output(record, format),
    }
}

/// Print quota records; the table form shows human sizes and a status column.
pub fn output_records(records: &[QuotaRecord], format: OutputFormat) -> anyhow::Result<()> {
    let rendered = match format {
        OutputFormat::Table => render_records(records),
        _ => render(&records, format)?,
    };
    println!("{rendered}");
    Ok(())
}

pub fn output_report(report: &QuotaReport, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = match format {
        OutputFormat::Table => render_report(report),
        _ => render(report, format)?,
    };
    println!("{rendered}");
    Ok(())
}

pub fn output_filesystem(info: &FilesystemInfo, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = match format {
        OutputFormat::Table => render_filesystem(info),
        _ => render(info, format)?,
    };
    println!("{rendered}");
    Ok(())
}

pub fn output_sample(sample: &MonitorSample, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = match format {
        OutputFormat::Table => render_sample(sample),
        _ => render(sample, format)?,
    };
    println!("{rendered}");
    Ok(())
}

fn options() -> table::TableOptions {
    let prefs = ui::prefs();
    table::TableOptions {
        max_width: prefs.term_width,
        color: prefs.table_color,
    }
}

const RECORD_HEADERS: [&str; 10] = [
    "id",
    "type",
    "block used",
    "block soft",
    "block hard",
    "inode used",
    "inode soft",
    "inode hard",
    "usage",
    "status",
];

/// KB limit to a human size; zero limits are unlimited.
fn limit_cell(kb: u64) -> String {
    if kb == 0 {
        String::from("-")
    } else {
        format_size(kb.saturating_mul(1024))
    }
}

fn count_cell(count: u64) -> String {
    if count == 0 {
        String::from("-")
    } else {
        count.to_string()
    }
}

fn record_row(record: &QuotaRecord) -> Vec<String> {
    let usage = record.block_usage_percent().max(record.inode_usage_percent());
    vec![
        record.id.to_string(),
        record.kind.to_string(),
        format_size(record.block_used.saturating_mul(1024)),
        limit_cell(record.block_soft),
        limit_cell(record.block_hard),
        record.inode_used.to_string(),
        count_cell(record.inode_soft),
        count_cell(record.inode_hard),
        format!("{usage:.1}%"),
        record.status().to_string(),
    ]
}

pub(crate) fn render_records(records: &[QuotaRecord]) -> String {
    if records.is_empty() {
        return String::from("No quotas found.");
    }
    let rows = records.iter().map(record_row).collect::<Vec<_>>();
    table::render_table(&RECORD_HEADERS, &rows, options())
}

pub(crate) fn render_report(report: &QuotaReport) -> String {
    let summary = vec![
        vec![String::from("filesystem"), report.filesystem.display().to_string()],
        vec![
            String::from("generated at"),
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ],
        vec![String::from("total"), report.total_quotas.to_string()],
        vec![String::from("over"), report.over_quotas.to_string()],
        vec![String::from("warning"), report.warning_quotas.to_string()],
        vec![String::from("ok"), report.ok_quotas().to_string()],
    ];
    let mut out = table::render_table(&["field", "value"], &summary, options());
    out.push_str("\n\n");
    out.push_str(&render_records(&report.quotas));
    out
}

pub(crate) fn render_filesystem(info: &FilesystemInfo) -> String {
    let accounting = &info.quota_accounting;
    let enabled = [
        ("user", accounting.user),
        ("group", accounting.group),
        ("project", accounting.project),
    ]
    .iter()
    .filter(|(_, on)| *on)
    .map(|(name, _)| *name)
    .collect::<Vec<_>>();

    let rows = vec![
        vec![String::from("path"), info.path.display().to_string()],
        vec![String::from("device"), info.device.clone()],
        vec![String::from("mount point"), info.mount_point.display().to_string()],
        vec![String::from("type"), info.fs_type.clone()],
        vec![String::from("magic"), info.fs_magic.clone()],
        vec![String::from("xfs"), info.is_xfs.to_string()],
        vec![String::from("block size"), info.block_size.to_string()],
        vec![String::from("size"), format_size(info.total_bytes)],
        vec![String::from("used"), format_size(info.used_bytes)],
        vec![String::from("free"), format_size(info.free_bytes)],
        vec![String::from("inodes"), info.total_inodes.to_string()],
        vec![String::from("inodes free"), info.free_inodes.to_string()],
        vec![
            String::from("quota accounting"),
            if enabled.is_empty() {
                String::from("none")
            } else {
                enabled.join(", ")
            },
        ],
    ];
    table::render_table(&["field", "value"], &rows, options())
}

pub(crate) fn render_sample(sample: &MonitorSample) -> String {
    let mut out = format!(
        "{} {}: {} quotas, {} over, {} warning, {} at or above {}%",
        sample.checked_at.format("%Y-%m-%d %H:%M:%S"),
        sample.filesystem.display(),
        sample.total_quotas,
        sample.over_quotas,
        sample.warning_quotas,
        sample.alerts.len(),
        sample.threshold,
    );
    if !sample.alerts.is_empty() {
        let rows = sample
            .alerts
            .iter()
            .map(|alert| {
                vec![
                    alert.kind.to_string(),
                    alert.id.to_string(),
                    format!("{:.1}%", alert.block_percent),
                    format!("{:.1}%", alert.inode_percent),
                    if alert.over_quota { "over" } else { "warning" }.to_string(),
                ]
            })
            .collect::<Vec<_>>();
        out.push('\n');
        out.push_str(&table::render_table(
            &["type", "id", "blocks", "inodes", "status"],
            &rows,
            options(),
        ));
    }
    out
}

fn render_value_table<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let value = serde_json::to_value(value)?;
    let out = match value {
        Value::Array(items) => render_array_table(&items),
        Value::Object(map) => {
            let rows = map
                .into_iter()
                .map(|(key, value)| vec![key, value_to_cell(&value)])
                .collect::<Vec<_>>();
            table::render_table(&["key", "value"], &rows, options())
        }
        scalar => value_to_cell(&scalar),
    };
    Ok(out)
}

fn render_array_table(items: &[Value]) -> String {
    if items.is_empty() {
        return String::from("(no rows)");
    }
    if !items.iter().all(Value::is_object) {
        let rows = items
            .iter()
            .map(|item| vec![value_to_cell(item)])
            .collect::<Vec<_>>();
        return table::render_table(&["value"], &rows, options());
    }

    let mut headers = Vec::<String>::new();
    for map in items.iter().filter_map(Value::as_object) {
        for key in map.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = items
        .iter()
        .filter_map(Value::as_object)
        .map(|map| {
            headers
                .iter()
                .map(|header| map.get(header).map_or_else(|| String::from("-"), value_to_cell))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let header_refs = headers.iter().map(String::as_str).collect::<Vec<_>>();
    table::render_table(&header_refs, &rows, options())
}

fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("-"),
        Value::Bool(v) => v.to_string(),
        Value::Number(v) => v.to_string(),
        Value::String(v) => v.clone(),
        Value::Array(items) => items.iter().map(value_to_cell).collect::<Vec<_>>().join(", "),
        Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| String::from("<invalid-json>"))
        }
    }
}
