use crate::document::DocType;
use crate::item::WaterfallItem;
use itertools::Itertools;
use serde::Serialize;

/// Colors handed out in first-seen order before falling back to generated ones
pub const PALETTE: [&str; 7] = [
    "#54b399", "#6092c0", "#d36086", "#9170b8", "#ca8eae", "#d6bf57", "#b9a888",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendType {
    ServiceName,
    #[default]
    SpanType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Legend {
    pub legend_type: LegendType,
    pub value: String,
    pub color: String,
}

/// Color for the `index`-th distinct legend key
pub fn color_for_index(index: usize) -> String {
    if let Some(color) = PALETTE.get(index) {
        return color.to_string();
    }

    // Golden-angle hue walk; the lightness band changes every full palette
    // length so generated colors stay distinct from each other.
    let generated = index - PALETTE.len();
    let hue = (generated as f64 * 137.508) % 360.0;
    let lightness = 45 + (generated / PALETTE.len() % 3) * 10;
    format!("hsl({:.1}, 60%, {}%)", hue, lightness)
}

fn legend_key(item: &WaterfallItem, legend_type: LegendType) -> &str {
    match legend_type {
        LegendType::ServiceName => &item.legend_values.service_name,
        LegendType::SpanType => &item.legend_values.span_type,
    }
}

/// Pick the legend mode and assign a color per distinct key.
///
/// Only transactions and spans take part. Coloring by service is used when
/// more than one service is present, otherwise by span type.
pub fn build_legends(items: &[WaterfallItem]) -> (LegendType, Vec<Legend>) {
    let base_items = || {
        items
            .iter()
            .filter(|item| matches!(item.doc_type, DocType::Transaction | DocType::Span))
    };

    let service_count = base_items()
        .map(|item| item.legend_values.service_name.as_str())
        .unique()
        .count();
    let color_by = if service_count > 1 {
        LegendType::ServiceName
    } else {
        LegendType::SpanType
    };

    let legends = base_items()
        .map(|item| legend_key(item, color_by))
        .unique()
        .enumerate()
        .map(|(index, value)| Legend {
            legend_type: color_by,
            value: value.to_string(),
            color: color_for_index(index),
        })
        .collect();

    (color_by, legends)
}

/// Rebuild items with the color of their legend key. Items without a
/// legend entry (errors) keep no color.
pub fn apply_colors(items: Vec<WaterfallItem>, color_by: LegendType, legends: &[Legend]) -> Vec<WaterfallItem> {
    items
        .into_iter()
        .map(|item| {
            let color = match item.doc_type {
                DocType::Error => None,
                DocType::Transaction | DocType::Span => legends
                    .iter()
                    .find(|legend| legend.value == legend_key(&item, color_by))
                    .map(|legend| legend.color.clone()),
            };
            WaterfallItem { color, ..item }
        })
        .collect()
}
