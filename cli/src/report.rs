use waterline_core::{CriticalPath, DurationFormatter, Waterfall};

const BAR_WIDTH: usize = 40;

fn bar(start: i64, end: i64, total: i64) -> String {
    if total <= 0 {
        return " ".repeat(BAR_WIDTH);
    }
    let scale = |value: i64| -> usize {
        let clamped = value.clamp(0, total);
        (clamped as f64 / total as f64 * BAR_WIDTH as f64).round() as usize
    };
    let from = scale(start);
    let to = scale(end).max(from + 1).min(BAR_WIDTH);
    let from = from.min(to.saturating_sub(1));

    let mut line = String::with_capacity(BAR_WIDTH);
    line.push_str(&" ".repeat(from));
    line.push_str(&"█".repeat(to - from));
    line.push_str(&" ".repeat(BAR_WIDTH - to));
    line
}

/// Plain-text waterfall: one row per item, indented by depth
pub fn render_waterfall(waterfall: &Waterfall, formatter: &DurationFormatter) -> String {
    let Some(entry) = waterfall.entry_item() else {
        return "No waterfall: entry transaction not found in the trace\n".to_string();
    };

    let mut out = format!(
        "Trace {} · entry {} · total {}\n",
        waterfall.trace_id.as_deref().unwrap_or("-"),
        entry.id,
        formatter.format(waterfall.total_duration_micros)
    );

    let depths = waterfall.depths();
    for (item, depth) in waterfall.items.iter().zip(depths) {
        let errors = waterfall.get_error_count(&item.id);
        let error_note = if errors > 0 {
            format!(" [{} error(s)]", errors)
        } else {
            String::new()
        };
        let skew_note = if item.skew_micros != 0 {
            format!(" (skew {})", formatter.format(item.skew_micros))
        } else {
            String::new()
        };
        out.push_str(&format!(
            "|{}| {:>12} {}{} {} · {}{}{}\n",
            bar(
                item.rendered_start(),
                item.rendered_end(),
                waterfall.total_duration_micros
            ),
            formatter.format(item.duration_micros),
            "  ".repeat(depth),
            item.doc_type,
            item.service_name,
            item.name,
            skew_note,
            error_note
        ));
    }

    if !waterfall.legends.is_empty() {
        out.push_str("Legend:");
        for legend in &waterfall.legends {
            let value = if legend.value.is_empty() {
                "(none)"
            } else {
                legend.value.as_str()
            };
            out.push_str(&format!(" {}={}", value, legend.color));
        }
        out.push('\n');
    }

    if waterfall.orphan_items_count > 0 {
        out.push_str(&format!(
            "{} item(s) reference parents missing from the trace\n",
            waterfall.orphan_items_count
        ));
    }
    if waterfall.exceeds_max {
        out.push_str("Trace exceeds the document ceiling; waterfall is partial\n");
    }

    out
}

/// Self time per item on the critical path, largest first
pub fn render_critical_path(
    waterfall: &Waterfall,
    path: &CriticalPath,
    formatter: &DurationFormatter,
) -> String {
    if path.segments.is_empty() {
        return "No critical path: waterfall is empty\n".to_string();
    }

    let total = waterfall.total_duration_micros.max(1);
    let mut out = String::from("Critical path (self time):\n");
    for (index, self_time) in path.self_time_by_item() {
        let item = &waterfall.items[index];
        out.push_str(&format!(
            "{:>12} {:>5.1}%  {} {} · {}\n",
            formatter.format(self_time),
            self_time as f64 / total as f64 * 100.0,
            item.doc_type,
            item.service_name,
            item.name
        ));
    }
    out
}
