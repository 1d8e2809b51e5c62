use crate::item::ParentKey;
use crate::waterfall::Waterfall;
use serde::Serialize;
use std::collections::HashMap;

/// Gaps shorter than this are not reported as the parent's own time.
pub const MIN_GAP_MICROS: i64 = 1_000;

/// A time range attributed to one waterfall item.
///
/// `self_time == false` segments mark the window a subtree covers;
/// `self_time == true` segments partition the scanned window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CriticalPathSegment {
    /// Index into `Waterfall::items`
    pub item_index: usize,
    pub start: i64,
    pub end: i64,
    pub self_time: bool,
}

impl CriticalPathSegment {
    pub fn duration(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CriticalPath {
    pub segments: Vec<CriticalPathSegment>,
}

impl CriticalPath {
    pub fn self_time_segments(&self) -> impl Iterator<Item = &CriticalPathSegment> {
        self.segments.iter().filter(|segment| segment.self_time)
    }

    /// Self time per item index, largest first; ties keep the order in
    /// which the items were attributed.
    pub fn self_time_by_item(&self) -> Vec<(usize, i64)> {
        let mut order = Vec::new();
        let mut totals: HashMap<usize, i64> = HashMap::new();
        for segment in self.self_time_segments() {
            let total = totals.entry(segment.item_index).or_insert_with(|| {
                order.push(segment.item_index);
                0
            });
            *total = total.saturating_add(segment.duration());
        }

        let mut ranked: Vec<(usize, i64)> = order
            .into_iter()
            .map(|index| (index, totals[&index]))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    pub fn contains_item(&self, item_index: usize) -> bool {
        self.self_time_segments()
            .any(|segment| segment.item_index == item_index && segment.duration() > 0)
    }
}

/// Critical path of the whole waterfall, scanned from the entry item over its
/// rendered extent.
pub fn critical_path(waterfall: &Waterfall) -> CriticalPath {
    let Some(entry) = waterfall.entry_item() else {
        return CriticalPath::default();
    };
    scan_critical_path(waterfall, 0, entry.rendered_start(), entry.rendered_end())
}

/// Attribute every instant of `[start, end]` below `item_index` to the one
/// item blocking progress at that instant.
pub fn scan_critical_path(waterfall: &Waterfall, item_index: usize, start: i64, end: i64) -> CriticalPath {
    let mut segments = Vec::new();
    if item_index < waterfall.items.len() {
        scan(waterfall, item_index, start, end, &mut segments);
    }
    CriticalPath { segments }
}

/// Recursive step of [`scan_critical_path`]. When the gap after a child is
/// shorter than [`MIN_GAP_MICROS`], the child is scanned up to `scan_time`,
/// so its `self_time == false` marker may end after the child itself.
fn scan(waterfall: &Waterfall, item_index: usize, start: i64, end: i64, segments: &mut Vec<CriticalPathSegment>) {
    segments.push(CriticalPathSegment {
        item_index,
        start,
        end,
        self_time: false,
    });

    let item = &waterfall.items[item_index];
    let mut children: Vec<usize> = waterfall
        .children_by_parent_id
        .get(&ParentKey::Id(item.id.clone()))
        .cloned()
        .unwrap_or_default();

    if children.is_empty() {
        segments.push(CriticalPathSegment {
            item_index,
            start,
            end,
            self_time: true,
        });
        return;
    }

    // Latest finisher first; the sort is stable so equal ends keep
    // timestamp order.
    children.sort_by(|a, b| {
        let a_end = waterfall.items[*a].rendered_end();
        let b_end = waterfall.items[*b].rendered_end();
        b_end.cmp(&a_end)
    });

    let mut scan_time = end;
    for child_index in children {
        let child = &waterfall.items[child_index];
        let child_start = child.rendered_start().max(start);
        let child_end = child.rendered_end();
        let normalized_end = child_end.min(scan_time);

        let on_critical_path =
            !(child_start >= scan_time || normalized_end < start || child_end > scan_time);
        if !on_critical_path {
            continue;
        }

        let window_end = if normalized_end < scan_time.saturating_sub(MIN_GAP_MICROS) {
            segments.push(CriticalPathSegment {
                item_index,
                start: normalized_end,
                end: scan_time,
                self_time: true,
            });
            child_end
        } else {
            // Too short to show on its own: the child's window absorbs it.
            scan_time
        };

        scan(waterfall, child_index, child_start, window_end, segments);
        scan_time = child_start;
    }

    if scan_time > start {
        segments.push(CriticalPathSegment {
            item_index,
            start,
            end: scan_time,
            self_time: true,
        });
    }
}
