use colored::Colorize;

use super::status_fmt::{
    colorize_absolute, colorize_percent, format_bytes, print_section_header, progress_bar,
};
use crate::domain::entities::metric_tree::{MetricNode, Snapshot};
use crate::domain::entities::threshold::{is_ratio_path, ThresholdConfig};
use crate::domain::tree::walk_leaves;

/// Leaf keys carrying byte counts.
fn is_byte_quantity(key: &str) -> bool {
    key.ends_with("_bytes")
        || key.ends_with("_memory")
        || matches!(key, "total" | "used" | "free")
}

/// One display line for a leaf, without the category prefix.
#[must_use]
pub fn render_leaf(path: &[&str], node: &MetricNode, limit: Option<f64>) -> String {
    let label = path.get(1..).unwrap_or_default().join(".");
    let key = path.last().copied().unwrap_or_default();
    match node {
        MetricNode::Label(text) => format!("  {label}: {}", text.dimmed()),
        MetricNode::Value(v) if is_ratio_path(path) => format!(
            "  {label}: {} {}",
            progress_bar(*v, 20, limit),
            colorize_percent(*v, limit)
        ),
        MetricNode::Value(v) => {
            let text = if is_byte_quantity(key) {
                format_bytes(*v)
            } else {
                format!("{v}")
            };
            format!("  {label}: {}", colorize_absolute(text, *v, limit))
        }
        MetricNode::Branch(_) => format!("  {label}"),
    }
}

/// Print every category with its leaves, marking values against `config`.
pub fn print_snapshot(snapshot: &Snapshot, config: Option<&ThresholdConfig>) {
    println!(
        "{} {}",
        "webspecs sample".bold().cyan(),
        snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string().dimmed()
    );

    let mut current = None;
    walk_leaves(&snapshot.metrics, &mut |path, node| {
        let category = path.first().copied();
        if category != current {
            if let Some(name) = category {
                println!();
                print_section_header(name);
            }
            current = category;
        }
        let limit = config.and_then(|c| c.get(path)).and_then(|n| n.limit());
        println!("{}", render_leaf(path, node, limit));
    });
    println!();
}
