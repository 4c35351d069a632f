use serde::Serialize;

use crate::category::Category;

/// Ceiling applied to each match count before normalization.
pub const MATCH_COUNT_CAP: u64 = 10;

/// A matcher that reported at least one match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveItem {
    pub name: String,
    pub match_count: u64,
    pub category: Category,
    /// Normalized relevance in `[0, 1]`; zero until [`rank`] assigns it.
    pub score: f64,
}

impl ActiveItem {
    #[must_use]
    pub fn new(name: impl Into<String>, match_count: u64, category: Category) -> Self {
        Self {
            name: name.into(),
            match_count,
            category,
            score: 0.0,
        }
    }

    #[must_use]
    pub fn capped_count(&self) -> u64 {
        self.match_count.min(MATCH_COUNT_CAP)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub max_capped: u64,
    pub items: Vec<ActiveItem>,
}

impl Ranking {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(count: u64, max: u64) -> f64 {
    if max == 0 {
        return 0.0;
    }
    count as f64 / max as f64
}

/// Normalize and order the active items.
///
/// Each score is the capped count divided by the largest capped count. Items
/// are sorted by descending score; equal scores keep their evaluation order.
#[must_use]
pub fn rank(mut items: Vec<ActiveItem>) -> Ranking {
    let max_capped = items
        .iter()
        .map(ActiveItem::capped_count)
        .max()
        .unwrap_or(0);

    for item in &mut items {
        item.score = ratio(item.capped_count(), max_capped);
    }

    // `sort_by` is stable.
    items.sort_by(|a, b| b.score.total_cmp(&a.score));

    Ranking { max_capped, items }
}
