//! Eight-tier colour scale used for both region fills and the legend.

use serde::Serialize;

/// Lower bounds of the buckets, lightest first.
pub const THRESHOLDS: [u32; 8] = [0, 10, 20, 50, 100, 200, 500, 1000];

/// Fill colours, lightest first. `COLORS[i]` belongs to `THRESHOLDS[i]`.
pub const COLORS: [&str; 8] = [
    "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c", "#08306b",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Bucket {
    /// 0 is the lightest tier, 7 the darkest.
    pub rank: usize,
    pub threshold: u32,
    pub color: &'static str,
}

impl Bucket {
    pub fn all() -> impl Iterator<Item = Bucket> {
        (0..THRESHOLDS.len()).map(|rank| Bucket {
            rank,
            threshold: THRESHOLDS[rank],
            color: COLORS[rank],
        })
    }

    /// Next bucket's lower bound, `None` for the open-ended top tier.
    pub fn upper(&self) -> Option<u32> {
        THRESHOLDS.get(self.rank + 1).copied()
    }
}

/// Bucket for a weight. A weight must be strictly above a threshold to reach
/// the next tier, so `10` stays in the first bucket and `11` moves up.
/// `None` (no airports recorded) classifies like zero.
pub fn bucket_for(weight: Option<u32>) -> Bucket {
    let w = weight.unwrap_or(0);
    let rank = THRESHOLDS
        .iter()
        .skip(1)
        .rposition(|&t| w > t)
        .map(|i| i + 1)
        .unwrap_or(0);

    Bucket {
        rank,
        threshold: THRESHOLDS[rank],
        color: COLORS[rank],
    }
}

pub fn color_for(weight: Option<u32>) -> &'static str {
    bucket_for(weight).color
}
